pub mod bill;
pub mod point_of_sale;
pub mod purchasing;
pub mod report;

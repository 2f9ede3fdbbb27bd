pub mod categorization;
pub mod cost_allocation;
pub mod food_cost;
pub mod margin;
pub mod point_of_sale;
pub mod sales_analysis;
pub mod validation;

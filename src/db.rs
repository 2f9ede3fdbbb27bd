pub mod bill_repo;
pub use bill_repo::BillRepository;
pub mod document_repo;
pub use document_repo::DocumentRepository;

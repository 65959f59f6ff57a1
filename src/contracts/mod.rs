pub mod handlers;
pub mod models;
pub mod repository;
pub mod scheduler;
pub mod tracker;

pub use models::{Contract, ContractStatus, ContractType, ExpirationAlert};
pub use repository::ContractRepository;
pub use tracker::LeaseTracker;

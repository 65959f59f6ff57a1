pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{Parameter, ParameterType};
pub use repository::ParameterRepository;

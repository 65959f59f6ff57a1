pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{BalanceCredit, Beneficiary, CreditStatus};
pub use repository::CreditLedger;

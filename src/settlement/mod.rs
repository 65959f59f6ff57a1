pub mod calculator;
pub mod handlers;
pub mod models;
pub mod repository;

pub use calculator::SettlementCalculator;
pub use models::{Adjustment, AdjustmentKind, Period, Settlement, SettlementStatus};
pub use repository::SettlementRepository;

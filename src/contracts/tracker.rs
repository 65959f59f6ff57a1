use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::models::{expiration_alerts, Contract, ExpirationAlert};
use super::repository::ContractRepository;
use crate::error::{AppError, AppResult, ContractError};
use crate::parameters::ParameterRepository;

/// Default alert window when the `dias_alerta_vencimiento` parameter is absent
pub const DEFAULT_ALERT_WINDOW_DAYS: i64 = 90;

/// Parameter holding the alert window, category ALERTAS
pub const ALERT_WINDOW_PARAMETER: &str = "dias_alerta_vencimiento";

/// Parameter holding the annual IPC percentage, category IPC
pub const IPC_PARAMETER: &str = "incremento_ipc";

/// Lease status tracker: expiration alerts, termination, IPC increases
pub struct LeaseTracker {
    contracts: Arc<ContractRepository>,
    parameters: Arc<ParameterRepository>,
}

impl LeaseTracker {
    pub fn new(contracts: Arc<ContractRepository>, parameters: Arc<ParameterRepository>) -> Self {
        Self { contracts, parameters }
    }

    /// Active contracts expiring within the window, most urgent first.
    /// `window_days = None` reads the configured window, falling back to 90.
    pub async fn upcoming_expirations(
        &self,
        window_days: Option<i64>,
    ) -> AppResult<Vec<ExpirationAlert>> {
        let window = match window_days {
            Some(days) if days > 0 => days,
            Some(days) => {
                return Err(AppError::InvalidInput(format!(
                    "window_days must be positive, got {}",
                    days
                )))
            }
            None => self.configured_window().await,
        };

        let contracts = self.contracts.list_active().await?;
        let today = Utc::now().date_naive();
        Ok(expiration_alerts(&contracts, today, window))
    }

    pub async fn terminate(&self, id: Uuid, reason: &str, actor: &str) -> AppResult<Contract> {
        if reason.trim().is_empty() {
            return Err(ContractError::InvalidContract(
                "termination reason must not be blank".to_string(),
            )
            .into());
        }
        self.contracts.terminate(id, reason.trim(), actor).await
    }

    /// Apply the annual IPC increase to an active contract's canon.
    pub async fn apply_ipc_increase(&self, id: Uuid, actor: &str) -> AppResult<Contract> {
        let contract = self.contracts.get(id).await?;
        if !contract.is_active() {
            return Err(ContractError::NotActive {
                id: id.to_string(),
                status: contract.status.to_string(),
            }
            .into());
        }

        let ipc_pct = self.parameters.get(IPC_PARAMETER).await?.as_percent_points()?;
        let new_canon = increase_canon(contract.canon, ipc_pct);

        info!(contract_id = %id, %ipc_pct, old_canon = contract.canon, new_canon, "applying IPC increase");
        self.contracts.update_canon(id, new_canon, actor).await
    }

    async fn configured_window(&self) -> i64 {
        match self.parameters.get(ALERT_WINDOW_PARAMETER).await {
            Ok(parameter) => parameter
                .as_integer()
                .ok()
                .filter(|days| *days > 0)
                .unwrap_or(DEFAULT_ALERT_WINDOW_DAYS),
            Err(_) => DEFAULT_ALERT_WINDOW_DAYS,
        }
    }
}

/// canon * (1 + pct/100), rounded half away from zero to minor units
pub fn increase_canon(canon: i64, ipc_pct: Decimal) -> i64 {
    let factor = dec!(1) + ipc_pct / dec!(100);
    (Decimal::from(canon) * factor)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(canon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipc_increase_rounds_to_minor_units() {
        // 1,000,000 at 5.2% -> 1,052,000
        assert_eq!(increase_canon(1_000_000, dec!(5.2)), 1_052_000);
        // 333,333 at 7% -> 356,666.31 -> 356,666
        assert_eq!(increase_canon(333_333, dec!(7)), 356_666);
        // zero percent leaves the canon alone
        assert_eq!(increase_canon(850_000, dec!(0)), 850_000);
    }
}

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::models::{compute_breakdown, Period, Settlement, SettlementStatus};
use super::repository::SettlementRepository;
use crate::contracts::{Contract, ContractRepository};
use crate::error::{AppResult, ContractError, SettlementError};
use crate::ledger::{Beneficiary, CreditLedger};
use crate::parameters::ParameterRepository;

/// Parameter holding the brokerage commission, category COMISIONES
pub const COMMISSION_PARAMETER: &str = "porcentaje_comision";

/// Per-contract failure inside a bulk run
#[derive(Debug, Clone, Serialize)]
pub struct SkippedContract {
    pub contract_id: Uuid,
    pub reason: String,
}

/// Outcome of settling every active contract of one owner for a period.
/// Failures are collected, never aborted on.
#[derive(Debug, Serialize)]
pub struct BulkSettlementReport {
    pub party_id: Uuid,
    pub period: Period,
    pub settled: Vec<Settlement>,
    pub skipped: Vec<SkippedContract>,
}

/// Settlement calculator - computes liquidaciones and drives their lifecycle
pub struct SettlementCalculator {
    settlements: Arc<SettlementRepository>,
    contracts: Arc<ContractRepository>,
    parameters: Arc<ParameterRepository>,
    ledger: Arc<CreditLedger>,
}

impl SettlementCalculator {
    pub fn new(
        settlements: Arc<SettlementRepository>,
        contracts: Arc<ContractRepository>,
        parameters: Arc<ParameterRepository>,
        ledger: Arc<CreditLedger>,
    ) -> Self {
        Self {
            settlements,
            contracts,
            parameters,
            ledger,
        }
    }

    /// Compute and persist the settlement for one contract and period.
    ///
    /// When deductions push the net below zero the settlement is stored with
    /// net_payable = 0 and the shortfall becomes a pending balance credit
    /// against the contract's owner, to be offset in a later period.
    pub async fn compute(
        &self,
        contract_id: Uuid,
        period: Period,
        actor: &str,
    ) -> AppResult<Settlement> {
        let contract = self.contracts.get(contract_id).await?;
        if !contract.is_active() {
            return Err(ContractError::NotActive {
                id: contract_id.to_string(),
                status: contract.status.to_string(),
            }
            .into());
        }

        if self.settlements.exists(contract_id, &period).await? {
            return Err(SettlementError::Duplicate {
                contract_id: contract_id.to_string(),
                period: period.to_string(),
            }
            .into());
        }

        let commission_pct = self.resolve_commission_pct(&contract).await?;
        let (deductions, bonuses) = self
            .settlements
            .adjustment_totals(contract_id, &period)
            .await?;

        let breakdown = compute_breakdown(contract.canon, commission_pct, deductions, bonuses);

        info!(
            contract_id = %contract_id,
            period = %period,
            gross_canon = breakdown.gross_canon,
            commission_amount = breakdown.commission_amount,
            net_payable = breakdown.net_payable,
            "settlement computed"
        );

        let settlement = self
            .settlements
            .insert(contract_id, &period, &breakdown, actor)
            .await?;

        if breakdown.owner_shortfall > 0 {
            warn!(
                contract_id = %contract_id,
                period = %period,
                shortfall = breakdown.owner_shortfall,
                "deductions exceed canon; registering owner balance credit"
            );
            self.ledger
                .register(
                    Beneficiary::Owner(contract.party_id),
                    breakdown.owner_shortfall,
                    &format!(
                        "saldo en contra por liquidación {} del contrato {}",
                        period, contract_id
                    ),
                    actor,
                )
                .await?;
        }

        Ok(settlement)
    }

    /// Settle every active contract of one owner for the period, collecting
    /// per-contract failures into the report instead of aborting.
    pub async fn settle_owner(
        &self,
        party_id: Uuid,
        period: Period,
        actor: &str,
    ) -> AppResult<BulkSettlementReport> {
        let contracts = self.contracts.list_active_for_party(party_id).await?;
        let mut report = BulkSettlementReport {
            party_id,
            period: period.clone(),
            settled: Vec::new(),
            skipped: Vec::new(),
        };

        for contract in contracts {
            match self.compute(contract.id, period.clone(), actor).await {
                Ok(settlement) => report.settled.push(settlement),
                Err(e) => {
                    warn!(contract_id = %contract.id, error = %e, "contract skipped in bulk settlement");
                    report.skipped.push(SkippedContract {
                        contract_id: contract.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            party_id = %party_id,
            period = %period,
            settled = report.settled.len(),
            skipped = report.skipped.len(),
            "bulk settlement finished"
        );
        Ok(report)
    }

    pub async fn approve(&self, id: Uuid, actor: &str) -> AppResult<Settlement> {
        self.settlements
            .transition(id, SettlementStatus::InProcess, SettlementStatus::Approved, None, actor)
            .await
    }

    pub async fn mark_paid(&self, id: Uuid, actor: &str) -> AppResult<Settlement> {
        self.settlements
            .transition(id, SettlementStatus::Approved, SettlementStatus::Paid, None, actor)
            .await
    }

    /// Cancel from InProcess or Approved. Paid settlements stay paid.
    pub async fn cancel(&self, id: Uuid, reason: &str, actor: &str) -> AppResult<Settlement> {
        if reason.trim().is_empty() {
            return Err(SettlementError::MissingCancelReason.into());
        }

        let settlement = self.settlements.get(id).await?;
        SettlementStatus::validate_transition(settlement.status, SettlementStatus::Cancelled)?;

        self.settlements
            .transition(
                id,
                settlement.status,
                SettlementStatus::Cancelled,
                Some(reason.trim()),
                actor,
            )
            .await
    }

    async fn resolve_commission_pct(
        &self,
        contract: &Contract,
    ) -> AppResult<rust_decimal::Decimal> {
        if let Some(pct) = contract.commission_pct {
            return Ok(pct);
        }
        Ok(self
            .parameters
            .get(COMMISSION_PARAMETER)
            .await?
            .as_percent_points()?)
    }
}

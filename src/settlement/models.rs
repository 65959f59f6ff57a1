use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::SettlementError;

/// Billing period, `YYYY-MM`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, SettlementError> {
        if !(1..=12).contains(&month) || !(2000..=2100).contains(&year) {
            return Err(SettlementError::InvalidPeriod(format!("{:04}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SettlementError::InvalidPeriod(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Period::new(year, month)
    }
}

impl TryFrom<String> for Period {
    type Error = SettlementError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Period::from_str(&s)
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

/// Settlement lifecycle. InProcess -> Approved -> Paid, with Cancelled
/// reachable from InProcess or Approved. Paid and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    InProcess,
    Approved,
    Paid,
    Cancelled,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::InProcess => "in_process",
            SettlementStatus::Approved => "approved",
            SettlementStatus::Paid => "paid",
            SettlementStatus::Cancelled => "cancelled",
        }
    }

    /// Validate a status change against the state machine.
    pub fn validate_transition(from: SettlementStatus, to: SettlementStatus) -> Result<(), SettlementError> {
        let allowed = match from {
            SettlementStatus::InProcess => {
                vec![SettlementStatus::Approved, SettlementStatus::Cancelled]
            }
            SettlementStatus::Approved => {
                vec![SettlementStatus::Paid, SettlementStatus::Cancelled]
            }
            // Terminal states
            SettlementStatus::Paid | SettlementStatus::Cancelled => vec![],
        };
        if allowed.contains(&to) {
            Ok(())
        } else {
            Err(SettlementError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SettlementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_process" => Ok(SettlementStatus::InProcess),
            "approved" => Ok(SettlementStatus::Approved),
            "paid" => Ok(SettlementStatus::Paid),
            "cancelled" => Ok(SettlementStatus::Cancelled),
            other => Err(format!("unknown settlement status: {}", other)),
        }
    }
}

/// Liquidación entity - what a contract's owner is owed for one period.
/// All money fields are integer minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub period: Period,
    pub gross_canon: i64,
    /// Percent points, e.g. 10 or 8.5
    pub commission_pct: Decimal,
    pub commission_amount: i64,
    pub deductions_total: i64,
    pub bonuses_total: i64,
    pub net_payable: i64,
    pub status: SettlementStatus,
    pub cancel_reason: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Deduction (repairs, charged-back late fees) or bonus line item for a
/// contract and period, summed into the settlement when it is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    Deduction,
    Bonus,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Deduction => "deduction",
            AdjustmentKind::Bonus => "bonus",
        }
    }
}

impl fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AdjustmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deduction" => Ok(AdjustmentKind::Deduction),
            "bonus" => Ok(AdjustmentKind::Bonus),
            other => Err(format!("unknown adjustment kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub period: Period,
    pub kind: AdjustmentKind,
    pub concept: String,
    pub amount: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Adjustment {
    pub fn validate_new(amount: i64, concept: &str) -> Result<(), SettlementError> {
        if amount <= 0 {
            return Err(SettlementError::InvalidAdjustment(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        if concept.trim().is_empty() {
            return Err(SettlementError::InvalidAdjustment(
                "concept must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of the settlement arithmetic, before persistence.
///
/// A negative raw net is clamped to zero; `owner_shortfall` carries the
/// excess so the calculator can register it as a balance credit against
/// the owner instead of paying a negative amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementBreakdown {
    pub gross_canon: i64,
    pub commission_pct: Decimal,
    pub commission_amount: i64,
    pub deductions_total: i64,
    pub bonuses_total: i64,
    pub net_payable: i64,
    pub owner_shortfall: i64,
}

/// Deterministic settlement arithmetic over integer minor units.
/// commission = round-half-away-from-zero(gross * pct / 100).
pub fn compute_breakdown(
    gross_canon: i64,
    commission_pct: Decimal,
    deductions_total: i64,
    bonuses_total: i64,
) -> SettlementBreakdown {
    let commission_amount = (Decimal::from(gross_canon) * commission_pct / dec!(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0);

    let raw_net = gross_canon - commission_amount - deductions_total + bonuses_total;
    let (net_payable, owner_shortfall) = if raw_net < 0 { (0, -raw_net) } else { (raw_net, 0) };

    SettlementBreakdown {
        gross_canon,
        commission_pct,
        commission_amount,
        deductions_total,
        bonuses_total,
        net_payable,
        owner_shortfall,
    }
}

/// Persistence row for `settlements`
#[derive(Debug, FromRow)]
pub struct SettlementRow {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub period: String,
    pub gross_canon: i64,
    pub commission_pct: Decimal,
    pub commission_amount: i64,
    pub deductions_total: i64,
    pub bonuses_total: i64,
    pub net_payable: i64,
    pub status: String,
    pub cancel_reason: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SettlementRow> for Settlement {
    type Error = SettlementError;

    fn try_from(row: SettlementRow) -> Result<Self, Self::Error> {
        let period = Period::from_str(&row.period)?;
        let status = SettlementStatus::from_str(&row.status).map_err(|_| {
            SettlementError::InvalidState {
                current: row.status.clone(),
                expected: "in_process|approved|paid|cancelled".to_string(),
            }
        })?;
        Ok(Settlement {
            id: row.id,
            contract_id: row.contract_id,
            period,
            gross_canon: row.gross_canon,
            commission_pct: row.commission_pct,
            commission_amount: row.commission_amount,
            deductions_total: row.deductions_total,
            bonuses_total: row.bonuses_total,
            net_payable: row.net_payable,
            status,
            cancel_reason: row.cancel_reason,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Persistence row for `settlement_adjustments`
#[derive(Debug, FromRow)]
pub struct AdjustmentRow {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub period: String,
    pub kind: String,
    pub concept: String,
    pub amount: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AdjustmentRow> for Adjustment {
    type Error = SettlementError;

    fn try_from(row: AdjustmentRow) -> Result<Self, Self::Error> {
        let period = Period::from_str(&row.period)?;
        let kind = AdjustmentKind::from_str(&row.kind)
            .map_err(SettlementError::InvalidAdjustment)?;
        Ok(Adjustment {
            id: row.id,
            contract_id: row.contract_id,
            period,
            kind,
            concept: row.concept,
            amount: row.amount,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_and_rejects() {
        assert_eq!(Period::from_str("2026-03").unwrap().to_string(), "2026-03");
        assert!(Period::from_str("2026-13").is_err());
        assert!(Period::from_str("2026-0").is_err());
        assert!(Period::from_str("26-03").is_err());
        assert!(Period::from_str("2026/03").is_err());
    }

    #[test]
    fn breakdown_matches_worked_example() {
        // canon 1,000,000 at 10% -> commission 100,000, net 900,000
        let b = compute_breakdown(1_000_000, dec!(10), 0, 0);
        assert_eq!(b.commission_amount, 100_000);
        assert_eq!(b.net_payable, 900_000);
        assert_eq!(b.owner_shortfall, 0);
    }

    #[test]
    fn breakdown_identity_holds() {
        let b = compute_breakdown(1_250_000, dec!(8.5), 90_000, 15_000);
        assert_eq!(b.commission_amount, 106_250);
        assert_eq!(
            b.net_payable,
            b.gross_canon - b.commission_amount - b.deductions_total + b.bonuses_total
        );
    }

    #[test]
    fn breakdown_is_deterministic() {
        let a = compute_breakdown(777_777, dec!(9.3), 12_345, 678);
        let b = compute_breakdown(777_777, dec!(9.3), 12_345, 678);
        assert_eq!(a, b);
    }

    #[test]
    fn commission_rounds_half_away_from_zero() {
        // 5 * 10% = 0.50 -> 1
        assert_eq!(compute_breakdown(5, dec!(10), 0, 0).commission_amount, 1);
        // 1,005 * 0.5% = 5.025 -> 5
        assert_eq!(compute_breakdown(1_005, dec!(0.5), 0, 0).commission_amount, 5);
    }

    #[test]
    fn negative_net_clamps_and_reports_shortfall() {
        // deductions exceed the canon
        let b = compute_breakdown(500_000, dec!(10), 600_000, 0);
        assert_eq!(b.net_payable, 0);
        assert_eq!(b.owner_shortfall, 150_000);
    }

    #[test]
    fn forward_transitions_are_legal() {
        use SettlementStatus::*;
        assert!(SettlementStatus::validate_transition(InProcess, Approved).is_ok());
        assert!(SettlementStatus::validate_transition(Approved, Paid).is_ok());
        assert!(SettlementStatus::validate_transition(InProcess, Cancelled).is_ok());
        assert!(SettlementStatus::validate_transition(Approved, Cancelled).is_ok());
    }

    #[test]
    fn terminal_and_backward_transitions_fail() {
        use SettlementStatus::*;
        for (from, to) in [
            (Paid, Cancelled),
            (Paid, Approved),
            (Paid, InProcess),
            (Cancelled, Approved),
            (Cancelled, InProcess),
            (Approved, InProcess),
            (InProcess, Paid),
        ] {
            assert!(
                SettlementStatus::validate_transition(from, to).is_err(),
                "{:?} -> {:?} should be rejected",
                from,
                to
            );
        }
    }

    #[test]
    fn adjustment_validation() {
        assert!(Adjustment::validate_new(0, "reparación").is_err());
        assert!(Adjustment::validate_new(10_000, "  ").is_err());
        assert!(Adjustment::validate_new(10_000, "reparación tubería").is_ok());
    }
}

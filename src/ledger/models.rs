use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LedgerError;

/// Who a saldo a favor credit belongs to.
///
/// Exactly one of the two references exists; the variant carries it so the
/// XOR invariant lives in the type instead of a runtime check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "beneficiary_type", content = "beneficiary_id", rename_all = "lowercase")]
pub enum Beneficiary {
    Owner(Uuid),
    Advisor(Uuid),
}

impl Beneficiary {
    pub fn kind(&self) -> &'static str {
        match self {
            Beneficiary::Owner(_) => "owner",
            Beneficiary::Advisor(_) => "advisor",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Beneficiary::Owner(id) | Beneficiary::Advisor(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Result<Self, LedgerError> {
        match kind {
            "owner" => Ok(Beneficiary::Owner(id)),
            "advisor" => Ok(Beneficiary::Advisor(id)),
            other => Err(LedgerError::InvalidCredit(format!(
                "unknown beneficiary type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Beneficiary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Credit lifecycle. Pending is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    Pending,
    Applied,
    Returned,
}

impl CreditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::Pending => "pending",
            CreditStatus::Applied => "applied",
            CreditStatus::Returned => "returned",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, CreditStatus::Pending)
    }
}

impl fmt::Display for CreditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CreditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CreditStatus::Pending),
            "applied" => Ok(CreditStatus::Applied),
            "returned" => Ok(CreditStatus::Returned),
            other => Err(format!("unknown credit status: {}", other)),
        }
    }
}

/// Saldo a favor entity - a credit owed to an owner or advisor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceCredit {
    pub id: Uuid,
    pub beneficiary: Beneficiary,
    /// Minor currency units, always positive
    pub amount: i64,
    pub reason: String,
    pub status: CreditStatus,
    pub resolved_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl BalanceCredit {
    /// Validate the fields of a credit before it is registered.
    pub fn validate_new(amount: i64, reason: &str) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidCredit(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        if reason.trim().is_empty() {
            return Err(LedgerError::InvalidCredit("reason must not be blank".to_string()));
        }
        Ok(())
    }

    /// Mark the credit as applied against a future settlement.
    ///
    /// Resolution happens once; a second call is an error, not a no-op.
    pub fn apply(&mut self, note: Option<&str>, today: NaiveDate) -> Result<(), LedgerError> {
        self.resolve(CreditStatus::Applied, note, today)
    }

    /// Mark the credit as returned (refunded) to the beneficiary.
    pub fn mark_returned(
        &mut self,
        note: Option<&str>,
        today: NaiveDate,
    ) -> Result<(), LedgerError> {
        self.resolve(CreditStatus::Returned, note, today)
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }

    fn resolve(
        &mut self,
        target: CreditStatus,
        note: Option<&str>,
        today: NaiveDate,
    ) -> Result<(), LedgerError> {
        if self.is_resolved() {
            return Err(LedgerError::AlreadyResolved {
                id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        self.status = target;
        self.resolved_date = Some(today);
        if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
            self.notes = Some(match self.notes.take() {
                Some(existing) => format!("{}\n{}", existing, note),
                None => note.to_string(),
            });
        }
        Ok(())
    }
}

/// Persistence row for `balance_credits`. The two nullable id columns are
/// collapsed into the `Beneficiary` variant by the mapper.
#[derive(Debug, FromRow)]
pub struct BalanceCreditRow {
    pub id: Uuid,
    pub beneficiary_type: String,
    pub owner_id: Option<Uuid>,
    pub advisor_id: Option<Uuid>,
    pub amount: i64,
    pub reason: String,
    pub status: String,
    pub resolved_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BalanceCreditRow> for BalanceCredit {
    type Error = LedgerError;

    fn try_from(row: BalanceCreditRow) -> Result<Self, Self::Error> {
        let beneficiary = match (row.beneficiary_type.as_str(), row.owner_id, row.advisor_id) {
            ("owner", Some(id), None) => Beneficiary::Owner(id),
            ("advisor", None, Some(id)) => Beneficiary::Advisor(id),
            _ => return Err(LedgerError::InconsistentBeneficiary(row.id.to_string())),
        };
        let status = CreditStatus::from_str(&row.status)
            .map_err(|_| LedgerError::InvalidCredit(format!("credit {}: {}", row.id, row.status)))?;

        Ok(BalanceCredit {
            id: row.id,
            beneficiary,
            amount: row.amount,
            reason: row.reason,
            status,
            resolved_date: row.resolved_date,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_credit(amount: i64) -> BalanceCredit {
        BalanceCredit {
            id: Uuid::new_v4(),
            beneficiary: Beneficiary::Owner(Uuid::new_v4()),
            amount,
            reason: "pago duplicado de canon".to_string(),
            status: CreditStatus::Pending,
            resolved_date: None,
            notes: None,
            created_by: "tester".to_string(),
            created_at: Utc::now(),
        }
    }

    fn row(beneficiary_type: &str, owner: Option<Uuid>, advisor: Option<Uuid>) -> BalanceCreditRow {
        BalanceCreditRow {
            id: Uuid::new_v4(),
            beneficiary_type: beneficiary_type.to_string(),
            owner_id: owner,
            advisor_id: advisor,
            amount: 50_000,
            reason: "sobrante".to_string(),
            status: "pending".to_string(),
            resolved_date: None,
            notes: None,
            created_by: "tester".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn apply_stamps_status_and_date() {
        let mut credit = pending_credit(50_000);
        let today = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        credit.apply(Some("aplicado a liquidación 2026-03"), today).unwrap();

        assert_eq!(credit.status, CreditStatus::Applied);
        assert_eq!(credit.resolved_date, Some(today));
        assert!(credit.notes.as_deref().unwrap().contains("2026-03"));
    }

    #[test]
    fn second_resolution_fails() {
        let mut credit = pending_credit(50_000);
        let today = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        credit.apply(None, today).unwrap();

        let err = credit.apply(None, today).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyResolved { .. }));

        let err = credit.mark_returned(None, today).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyResolved { .. }));
    }

    #[test]
    fn returned_is_terminal_too() {
        let mut credit = pending_credit(20_000);
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        credit.mark_returned(Some("devuelto por transferencia"), today).unwrap();
        assert!(credit.apply(None, today).is_err());
    }

    #[test]
    fn validate_new_rejects_bad_input() {
        assert!(BalanceCredit::validate_new(0, "motivo").is_err());
        assert!(BalanceCredit::validate_new(-5, "motivo").is_err());
        assert!(BalanceCredit::validate_new(100, "   ").is_err());
        assert!(BalanceCredit::validate_new(100, "motivo").is_ok());
    }

    #[test]
    fn row_mapping_enforces_xor() {
        let owner = Uuid::new_v4();
        let advisor = Uuid::new_v4();

        let credit = BalanceCredit::try_from(row("owner", Some(owner), None)).unwrap();
        assert_eq!(credit.beneficiary, Beneficiary::Owner(owner));

        let credit = BalanceCredit::try_from(row("advisor", None, Some(advisor))).unwrap();
        assert_eq!(credit.beneficiary, Beneficiary::Advisor(advisor));

        // both set, neither set, or mismatched type are all rejected
        assert!(BalanceCredit::try_from(row("owner", Some(owner), Some(advisor))).is_err());
        assert!(BalanceCredit::try_from(row("owner", None, None)).is_err());
        assert!(BalanceCredit::try_from(row("advisor", Some(owner), None)).is_err());
    }
}

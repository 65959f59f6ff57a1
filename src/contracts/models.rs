use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ContractError;

/// Lease with a tenant, or a management mandate with an owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Lease,
    Mandate,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Lease => "lease",
            ContractType::Mandate => "mandate",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContractType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lease" => Ok(ContractType::Lease),
            "mandate" => Ok(ContractType::Mandate),
            other => Err(format!("unknown contract type: {}", other)),
        }
    }
}

/// Termination is irreversible; there is no way back to Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Active,
    Terminated,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ContractStatus::Active),
            "terminated" => Ok(ContractStatus::Terminated),
            other => Err(format!("unknown contract status: {}", other)),
        }
    }
}

/// Contract entity (lease or mandate) over a single property.
///
/// `party_id` is the owner being settled: the mandate holder, or the owner
/// behind a leased property. `canon` is the monthly rent in minor units,
/// already carrying any IPC increases applied to date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub contract_type: ContractType,
    pub property_id: Uuid,
    pub party_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub canon: i64,
    /// Per-contract commission override in percent points; the parameter
    /// store value applies when absent
    pub commission_pct: Option<Decimal>,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }

    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days()
    }
}

/// Expiration alert surfaced to the UI. `days_remaining` may be negative
/// for contracts past their end date but still marked Active; those are
/// rendered distinctly, never hidden.
#[derive(Debug, Clone, Serialize)]
pub struct ExpirationAlert {
    pub contract_id: Uuid,
    pub contract_type: ContractType,
    pub property_id: Uuid,
    pub end_date: NaiveDate,
    pub days_remaining: i64,
    pub already_expired: bool,
}

/// Select Active contracts ending within `window_days` of `today`,
/// most urgent first.
pub fn expiration_alerts(
    contracts: &[Contract],
    today: NaiveDate,
    window_days: i64,
) -> Vec<ExpirationAlert> {
    let mut alerts: Vec<ExpirationAlert> = contracts
        .iter()
        .filter(|c| c.is_active())
        .filter_map(|c| {
            let days_remaining = c.days_remaining(today);
            if days_remaining <= window_days {
                Some(ExpirationAlert {
                    contract_id: c.id,
                    contract_type: c.contract_type,
                    property_id: c.property_id,
                    end_date: c.end_date,
                    days_remaining,
                    already_expired: days_remaining < 0,
                })
            } else {
                None
            }
        })
        .collect();
    alerts.sort_by_key(|a| a.days_remaining);
    alerts
}

/// Persistence row for `contracts`
#[derive(Debug, FromRow)]
pub struct ContractRow {
    pub id: Uuid,
    pub contract_type: String,
    pub property_id: Uuid,
    pub party_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub canon: i64,
    pub commission_pct: Option<Decimal>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ContractRow> for Contract {
    type Error = ContractError;

    fn try_from(row: ContractRow) -> Result<Self, Self::Error> {
        let contract_type = ContractType::from_str(&row.contract_type)
            .map_err(ContractError::InvalidContract)?;
        let status =
            ContractStatus::from_str(&row.status).map_err(ContractError::InvalidContract)?;
        Ok(Contract {
            id: row.id,
            contract_type,
            property_id: row.property_id,
            party_id: row.party_id,
            start_date: row.start_date,
            end_date: row.end_date,
            canon: row.canon,
            commission_pct: row.commission_pct,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(end_date: NaiveDate, status: ContractStatus) -> Contract {
        Contract {
            id: Uuid::new_v4(),
            contract_type: ContractType::Lease,
            property_id: Uuid::new_v4(),
            party_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date,
            canon: 1_000_000,
            commission_pct: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn window_selects_and_orders_by_urgency() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let in_10 = contract(today + chrono::Duration::days(10), ContractStatus::Active);
        let in_45 = contract(today + chrono::Duration::days(45), ContractStatus::Active);
        let in_100 = contract(today + chrono::Duration::days(100), ContractStatus::Active);

        let alerts = expiration_alerts(&[in_45.clone(), in_100, in_10.clone()], today, 90);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].contract_id, in_10.id);
        assert_eq!(alerts[0].days_remaining, 10);
        assert_eq!(alerts[1].contract_id, in_45.id);
    }

    #[test]
    fn expired_but_active_is_flagged_not_hidden() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let overdue = contract(today - chrono::Duration::days(5), ContractStatus::Active);

        let alerts = expiration_alerts(&[overdue], today, 90);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].days_remaining, -5);
        assert!(alerts[0].already_expired);
    }

    #[test]
    fn terminated_contracts_never_alert() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let done = contract(today + chrono::Duration::days(10), ContractStatus::Terminated);
        assert!(expiration_alerts(&[done], today, 90).is_empty());
    }
}

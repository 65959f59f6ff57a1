use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::models::{
    Adjustment, AdjustmentKind, AdjustmentRow, Period, Settlement, SettlementBreakdown,
    SettlementRow, SettlementStatus,
};
use crate::error::{AppError, AppResult, SettlementError};

const SETTLEMENT_COLUMNS: &str = "id, contract_id, period, gross_canon, commission_pct, \
                                  commission_amount, deductions_total, bonuses_total, \
                                  net_payable, status, cancel_reason, created_by, \
                                  created_at, updated_at";

const ADJUSTMENT_COLUMNS: &str = "id, contract_id, period, kind, concept, amount, created_by, created_at";

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Settlement repository backed by `settlements` and `settlement_adjustments`
pub struct SettlementRepository {
    pool: PgPool,
}

impl SettlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a freshly computed settlement in InProcess. The unique index
    /// on (contract_id, period) is the duplicate guard of record.
    pub async fn insert(
        &self,
        contract_id: Uuid,
        period: &Period,
        breakdown: &SettlementBreakdown,
        actor: &str,
    ) -> AppResult<Settlement> {
        let result = sqlx::query_as::<_, SettlementRow>(&format!(
            r#"
            INSERT INTO settlements
                (contract_id, period, gross_canon, commission_pct, commission_amount,
                 deductions_total, bonuses_total, net_payable, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'in_process', $9)
            RETURNING {}
            "#,
            SETTLEMENT_COLUMNS
        ))
        .bind(contract_id)
        .bind(period.to_string())
        .bind(breakdown.gross_canon)
        .bind(breakdown.commission_pct)
        .bind(breakdown.commission_amount)
        .bind(breakdown.deductions_total)
        .bind(breakdown.bonuses_total)
        .bind(breakdown.net_payable)
        .bind(actor)
        .fetch_one(&self.pool)
        .await;

        let row = result.map_err(|e| map_insert_error(e, contract_id, period))?;

        let settlement = Settlement::try_from(row)?;
        info!(
            settlement_id = %settlement.id,
            contract_id = %contract_id,
            period = %period,
            net_payable = settlement.net_payable,
            "settlement created"
        );
        Ok(settlement)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Settlement> {
        let row = sqlx::query_as::<_, SettlementRow>(&format!(
            "SELECT {} FROM settlements WHERE id = $1",
            SETTLEMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SettlementError::NotFound(id.to_string()))?;

        Ok(Settlement::try_from(row)?)
    }

    pub async fn exists(&self, contract_id: Uuid, period: &Period) -> AppResult<bool> {
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM settlements WHERE contract_id = $1 AND period = $2",
        )
        .bind(contract_id)
        .bind(period.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    pub async fn list_for_contract(&self, contract_id: Uuid) -> AppResult<Vec<Settlement>> {
        let rows = sqlx::query_as::<_, SettlementRow>(&format!(
            r#"
            SELECT {}
            FROM settlements
            WHERE contract_id = $1
            ORDER BY period DESC
            "#,
            SETTLEMENT_COLUMNS
        ))
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Settlement::try_from(row).map_err(Into::into))
            .collect()
    }

    /// Advance the settlement state machine with a guarded compare-and-set:
    /// the WHERE clause carries the expected predecessor state so a stale
    /// caller loses instead of overwriting.
    pub async fn transition(
        &self,
        id: Uuid,
        from: SettlementStatus,
        to: SettlementStatus,
        cancel_reason: Option<&str>,
        actor: &str,
    ) -> AppResult<Settlement> {
        SettlementStatus::validate_transition(from, to)?;

        let result = sqlx::query(
            r#"
            UPDATE settlements
            SET status = $3, cancel_reason = COALESCE($4, cancel_reason), updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(cancel_reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get(id).await?;
            return Err(SettlementError::InvalidState {
                current: current.status.to_string(),
                expected: from.to_string(),
            }
            .into());
        }

        info!(settlement_id = %id, from = %from, to = %to, actor, "settlement transitioned");
        self.get(id).await
    }

    // ========== ADJUSTMENTS ==========

    pub async fn register_adjustment(
        &self,
        contract_id: Uuid,
        period: &Period,
        kind: AdjustmentKind,
        concept: &str,
        amount: i64,
        actor: &str,
    ) -> AppResult<Adjustment> {
        Adjustment::validate_new(amount, concept)?;

        let row = sqlx::query_as::<_, AdjustmentRow>(&format!(
            r#"
            INSERT INTO settlement_adjustments (contract_id, period, kind, concept, amount, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ADJUSTMENT_COLUMNS
        ))
        .bind(contract_id)
        .bind(period.to_string())
        .bind(kind.as_str())
        .bind(concept.trim())
        .bind(amount)
        .bind(actor)
        .fetch_one(&self.pool)
        .await?;

        Ok(Adjustment::try_from(row)?)
    }

    pub async fn list_adjustments(
        &self,
        contract_id: Uuid,
        period: &Period,
    ) -> AppResult<Vec<Adjustment>> {
        let rows = sqlx::query_as::<_, AdjustmentRow>(&format!(
            r#"
            SELECT {}
            FROM settlement_adjustments
            WHERE contract_id = $1 AND period = $2
            ORDER BY created_at
            "#,
            ADJUSTMENT_COLUMNS
        ))
        .bind(contract_id)
        .bind(period.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Adjustment::try_from(row).map_err(Into::into))
            .collect()
    }

    /// Sum adjustments for a contract/period as (deductions, bonuses).
    pub async fn adjustment_totals(
        &self,
        contract_id: Uuid,
        period: &Period,
    ) -> AppResult<(i64, i64)> {
        let adjustments = self.list_adjustments(contract_id, period).await?;
        let mut deductions = 0;
        let mut bonuses = 0;
        for adjustment in adjustments {
            match adjustment.kind {
                AdjustmentKind::Deduction => deductions += adjustment.amount,
                AdjustmentKind::Bonus => bonuses += adjustment.amount,
            }
        }
        Ok((deductions, bonuses))
    }
}

/// Translate the unique-index violation on (contract_id, period) into a
/// duplicate-settlement error; everything else stays a database error.
fn map_insert_error(e: sqlx::Error, contract_id: Uuid, period: &Period) -> AppError {
    match e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            SettlementError::Duplicate {
                contract_id: contract_id.to_string(),
                period: period.to_string(),
            }
            .into()
        }
        e => AppError::Database(e),
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct UniqueIndexViolation;

    impl fmt::Display for UniqueIndexViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "duplicate key value violates unique constraint")
        }
    }

    impl StdError for UniqueIndexViolation {}

    impl sqlx::error::DatabaseError for UniqueIndexViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(UNIQUE_VIOLATION.into())
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn second_settlement_for_same_period_is_a_duplicate() {
        let contract_id = Uuid::new_v4();
        let period = Period::new(2026, 3).unwrap();
        let e = sqlx::Error::Database(Box::new(UniqueIndexViolation));

        match map_insert_error(e, contract_id, &period) {
            AppError::Settlement(SettlementError::Duplicate {
                contract_id: c,
                period: p,
            }) => {
                assert_eq!(c, contract_id.to_string());
                assert_eq!(p, "2026-03");
            }
            other => panic!("expected Duplicate, got {:?}", other),
        }
    }

    #[test]
    fn other_insert_failures_stay_database_errors() {
        let period = Period::new(2026, 3).unwrap();
        let mapped = map_insert_error(sqlx::Error::RowNotFound, Uuid::new_v4(), &period);
        assert!(matches!(mapped, AppError::Database(_)));
    }
}

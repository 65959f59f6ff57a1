use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::models::{BalanceCredit, BalanceCreditRow, Beneficiary, CreditStatus};
use crate::error::{AppResult, LedgerError};

const CREDIT_COLUMNS: &str = "id, beneficiary_type, owner_id, advisor_id, amount, reason, \
                              status, resolved_date, notes, created_by, created_at";

/// Balance ledger backed by the `balance_credits` table
pub struct CreditLedger {
    pool: PgPool,
}

impl CreditLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(
        &self,
        beneficiary: Beneficiary,
        amount: i64,
        reason: &str,
        actor: &str,
    ) -> AppResult<BalanceCredit> {
        BalanceCredit::validate_new(amount, reason)?;

        let (owner_id, advisor_id) = match beneficiary {
            Beneficiary::Owner(id) => (Some(id), None),
            Beneficiary::Advisor(id) => (None, Some(id)),
        };

        let row = sqlx::query_as::<_, BalanceCreditRow>(&format!(
            r#"
            INSERT INTO balance_credits (beneficiary_type, owner_id, advisor_id, amount, reason, status, created_by)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            RETURNING {}
            "#,
            CREDIT_COLUMNS
        ))
        .bind(beneficiary.kind())
        .bind(owner_id)
        .bind(advisor_id)
        .bind(amount)
        .bind(reason.trim())
        .bind(actor)
        .fetch_one(&self.pool)
        .await?;

        let credit = BalanceCredit::try_from(row)?;
        info!(credit_id = %credit.id, beneficiary = %credit.beneficiary, amount, "credit registered");
        Ok(credit)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<BalanceCredit> {
        let row = sqlx::query_as::<_, BalanceCreditRow>(&format!(
            "SELECT {} FROM balance_credits WHERE id = $1",
            CREDIT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;

        Ok(BalanceCredit::try_from(row)?)
    }

    pub async fn list_for_beneficiary(
        &self,
        beneficiary: Beneficiary,
    ) -> AppResult<Vec<BalanceCredit>> {
        let rows = sqlx::query_as::<_, BalanceCreditRow>(&format!(
            r#"
            SELECT {}
            FROM balance_credits
            WHERE beneficiary_type = $1 AND (owner_id = $2 OR advisor_id = $2)
            ORDER BY created_at DESC
            "#,
            CREDIT_COLUMNS
        ))
        .bind(beneficiary.kind())
        .bind(beneficiary.id())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| BalanceCredit::try_from(row).map_err(Into::into))
            .collect()
    }

    /// Apply the credit (offset against a settlement). Fails once resolved.
    pub async fn apply(
        &self,
        id: Uuid,
        note: Option<&str>,
        actor: &str,
    ) -> AppResult<BalanceCredit> {
        self.resolve(id, CreditStatus::Applied, note, actor).await
    }

    /// Return (refund) the credit to its beneficiary. Fails once resolved.
    pub async fn return_credit(
        &self,
        id: Uuid,
        note: Option<&str>,
        actor: &str,
    ) -> AppResult<BalanceCredit> {
        self.resolve(id, CreditStatus::Returned, note, actor).await
    }

    /// Sum of pending amounts for one beneficiary, in minor units.
    pub async fn pending_total(&self, beneficiary: Beneficiary) -> AppResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount)::BIGINT
            FROM balance_credits
            WHERE status = 'pending'
              AND beneficiary_type = $1
              AND (owner_id = $2 OR advisor_id = $2)
            "#,
        )
        .bind(beneficiary.kind())
        .bind(beneficiary.id())
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// Hard-delete a credit. Only pending credits can be removed.
    pub async fn delete(&self, id: Uuid, actor: &str) -> AppResult<bool> {
        let credit = self.get(id).await?;
        if credit.is_resolved() {
            return Err(LedgerError::AlreadyResolved {
                id: id.to_string(),
                status: credit.status.to_string(),
            }
            .into());
        }

        let result = sqlx::query("DELETE FROM balance_credits WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(credit_id = %id, actor, "credit deleted");
        Ok(result.rows_affected() > 0)
    }

    async fn resolve(
        &self,
        id: Uuid,
        target: CreditStatus,
        note: Option<&str>,
        actor: &str,
    ) -> AppResult<BalanceCredit> {
        let mut credit = self.get(id).await?;
        let today = Utc::now().date_naive();
        match target {
            CreditStatus::Applied => credit.apply(note, today)?,
            CreditStatus::Returned => credit.mark_returned(note, today)?,
            CreditStatus::Pending => {
                return Err(LedgerError::InvalidCredit(
                    "cannot resolve a credit back to pending".to_string(),
                )
                .into())
            }
        }

        // Guarded write: the WHERE clause rejects a concurrent resolution
        let result = sqlx::query(
            r#"
            UPDATE balance_credits
            SET status = $2, resolved_date = $3, notes = $4
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(credit.status.as_str())
        .bind(credit.resolved_date)
        .bind(credit.notes.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::AlreadyResolved {
                id: id.to_string(),
                status: credit.status.to_string(),
            }
            .into());
        }

        info!(credit_id = %id, status = %credit.status, actor, "credit resolved");
        Ok(credit)
    }
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::models::{Contract, ContractRow, ContractType};
use crate::error::{AppResult, ContractError};

const CONTRACT_COLUMNS: &str = "id, contract_type, property_id, party_id, start_date, end_date, \
                                canon, commission_pct, status, created_at, updated_at";

/// Contract repository backed by the `contracts` and `properties` tables
pub struct ContractRepository {
    pool: PgPool,
}

impl ContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        contract_type: ContractType,
        property_id: Uuid,
        party_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        canon: i64,
        commission_pct: Option<Decimal>,
    ) -> AppResult<Contract> {
        if end_date <= start_date {
            return Err(ContractError::InvalidContract(
                "end_date must fall after start_date".to_string(),
            )
            .into());
        }
        if canon <= 0 {
            return Err(
                ContractError::InvalidContract("canon must be positive".to_string()).into(),
            );
        }

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            INSERT INTO contracts
                (contract_type, property_id, party_id, start_date, end_date, canon, commission_pct, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'active')
            RETURNING {}
            "#,
            CONTRACT_COLUMNS
        ))
        .bind(contract_type.as_str())
        .bind(property_id)
        .bind(party_id)
        .bind(start_date)
        .bind(end_date)
        .bind(canon)
        .bind(commission_pct)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE properties SET available = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(property_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let contract = Contract::try_from(row)?;
        info!(contract_id = %contract.id, %contract_type, "contract created");
        Ok(contract)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Contract> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {} FROM contracts WHERE id = $1",
            CONTRACT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ContractError::NotFound(id.to_string()))?;

        Ok(Contract::try_from(row)?)
    }

    pub async fn list_active(&self) -> AppResult<Vec<Contract>> {
        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {} FROM contracts WHERE status = 'active' ORDER BY end_date",
            CONTRACT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Contract::try_from(row).map_err(Into::into))
            .collect()
    }

    pub async fn list_active_for_party(&self, party_id: Uuid) -> AppResult<Vec<Contract>> {
        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            SELECT {}
            FROM contracts
            WHERE status = 'active' AND party_id = $1
            ORDER BY end_date
            "#,
            CONTRACT_COLUMNS
        ))
        .bind(party_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Contract::try_from(row).map_err(Into::into))
            .collect()
    }

    /// Flip an Active contract to Terminated and free its property.
    /// The WHERE guard makes the flip race-safe and one-way.
    pub async fn terminate(&self, id: Uuid, reason: &str, actor: &str) -> AppResult<Contract> {
        let contract = self.get(id).await?;
        if !contract.is_active() {
            return Err(ContractError::NotActive {
                id: id.to_string(),
                status: contract.status.to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET status = 'terminated', termination_reason = $2, terminated_by = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(reason)
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ContractError::NotActive {
                id: id.to_string(),
                status: "terminated".to_string(),
            }
            .into());
        }

        sqlx::query("UPDATE properties SET available = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(contract.property_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(contract_id = %id, actor, reason, "contract terminated");
        self.get(id).await
    }

    /// Persist a new canon after an IPC increase.
    pub async fn update_canon(&self, id: Uuid, new_canon: i64, actor: &str) -> AppResult<Contract> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET canon = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(new_canon)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let contract = self.get(id).await?;
            return Err(ContractError::NotActive {
                id: id.to_string(),
                status: contract.status.to_string(),
            }
            .into());
        }

        info!(contract_id = %id, new_canon, actor, "canon updated");
        self.get(id).await
    }
}

use sqlx::PgPool;
use tracing::info;

use super::models::{Parameter, ParameterRow};
use crate::error::{AppResult, ParameterError};

/// Parameter store backed by the `parameters` table
pub struct ParameterRepository {
    pool: PgPool,
}

impl ParameterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, name: &str) -> AppResult<Parameter> {
        let row = sqlx::query_as::<_, ParameterRow>(
            r#"
            SELECT name, value, data_type, category, editable, updated_by, updated_at
            FROM parameters
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ParameterError::NotFound(name.to_string()))?;

        Ok(Parameter::try_from(row)?)
    }

    pub async fn list(&self, category: Option<&str>) -> AppResult<Vec<Parameter>> {
        let rows = match category {
            Some(category) => {
                sqlx::query_as::<_, ParameterRow>(
                    r#"
                    SELECT name, value, data_type, category, editable, updated_by, updated_at
                    FROM parameters
                    WHERE category = $1
                    ORDER BY name
                    "#,
                )
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ParameterRow>(
                    r#"
                    SELECT name, value, data_type, category, editable, updated_by, updated_at
                    FROM parameters
                    ORDER BY category, name
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|row| Parameter::try_from(row).map_err(Into::into))
            .collect()
    }

    /// Update a parameter value. The declared type and editable flag gate the
    /// write; identity fields never change.
    pub async fn update(&self, name: &str, new_value: &str, actor: &str) -> AppResult<Parameter> {
        let current = self.get(name).await?;

        if !current.editable {
            return Err(ParameterError::NotEditable(name.to_string()).into());
        }
        current.validate_value(new_value)?;

        let row = sqlx::query_as::<_, ParameterRow>(
            r#"
            UPDATE parameters
            SET value = $2, updated_by = $3, updated_at = NOW()
            WHERE name = $1
            RETURNING name, value, data_type, category, editable, updated_by, updated_at
            "#,
        )
        .bind(name)
        .bind(new_value)
        .bind(actor)
        .fetch_one(&self.pool)
        .await?;

        info!(parameter = name, actor = actor, "parameter updated");
        Ok(Parameter::try_from(row)?)
    }
}

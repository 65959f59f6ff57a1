use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::error::ParameterError;

/// Declared data type of a configuration parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Integer,
    Decimal,
    Boolean,
    Text,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::Integer => "integer",
            ParameterType::Decimal => "decimal",
            ParameterType::Boolean => "boolean",
            ParameterType::Text => "text",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integer" => Ok(ParameterType::Integer),
            "decimal" => Ok(ParameterType::Decimal),
            "boolean" => Ok(ParameterType::Boolean),
            "text" => Ok(ParameterType::Text),
            other => Err(format!("unknown parameter type: {}", other)),
        }
    }
}

/// Accepted spellings for a true boolean parameter
const TRUE_VALUES: &[&str] = &["1", "true", "True", "TRUE", "yes", "Yes", "YES"];

/// A named, typed configuration value.
///
/// Identity (name, type, category) is immutable; only the value may change,
/// and only when the editable flag is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    pub data_type: ParameterType,
    pub category: String,
    pub editable: bool,
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Parameter {
    pub fn as_integer(&self) -> Result<i64, ParameterError> {
        self.expect_type(ParameterType::Integer, "integer")?;
        self.value
            .trim()
            .parse::<i64>()
            .map_err(|_| self.invalid_value("integer"))
    }

    pub fn as_decimal(&self) -> Result<Decimal, ParameterError> {
        self.expect_type(ParameterType::Decimal, "decimal")?;
        Decimal::from_str(self.value.trim()).map_err(|_| self.invalid_value("decimal"))
    }

    pub fn as_boolean(&self) -> Result<bool, ParameterError> {
        self.expect_type(ParameterType::Boolean, "boolean")?;
        Ok(TRUE_VALUES.contains(&self.value.trim()))
    }

    pub fn as_text(&self) -> Result<&str, ParameterError> {
        self.expect_type(ParameterType::Text, "text")?;
        Ok(&self.value)
    }

    /// Integer parameter interpreted as a percentage, e.g. "10" -> 0.10
    pub fn as_percentage(&self) -> Result<Decimal, ParameterError> {
        let raw = self.as_integer()?;
        Ok(Decimal::from(raw) / dec!(100))
    }

    /// A percentage expressed in whole points, e.g. "10" -> 10.
    ///
    /// Decimal parameters are accepted as well so a commission can be 8.5.
    pub fn as_percent_points(&self) -> Result<Decimal, ParameterError> {
        match self.data_type {
            ParameterType::Integer => Ok(Decimal::from(self.as_integer()?)),
            ParameterType::Decimal => self.as_decimal(),
            _ => Err(ParameterError::TypeMismatch {
                name: self.name.clone(),
                declared: self.data_type.to_string(),
                requested: "integer|decimal".to_string(),
            }),
        }
    }

    /// Check a candidate value against the declared type before persisting.
    pub fn validate_value(&self, candidate: &str) -> Result<(), ParameterError> {
        let ok = match self.data_type {
            ParameterType::Integer => candidate.trim().parse::<i64>().is_ok(),
            ParameterType::Decimal => Decimal::from_str(candidate.trim()).is_ok(),
            // Any string is a legal boolean; non-true spellings read as false
            ParameterType::Boolean => true,
            ParameterType::Text => true,
        };
        if ok {
            Ok(())
        } else {
            Err(ParameterError::InvalidValue {
                name: self.name.clone(),
                value: candidate.to_string(),
                expected: self.data_type.to_string(),
            })
        }
    }

    fn expect_type(
        &self,
        expected: ParameterType,
        requested: &str,
    ) -> Result<(), ParameterError> {
        if self.data_type == expected {
            Ok(())
        } else {
            Err(ParameterError::TypeMismatch {
                name: self.name.clone(),
                declared: self.data_type.to_string(),
                requested: requested.to_string(),
            })
        }
    }

    fn invalid_value(&self, expected: &str) -> ParameterError {
        ParameterError::InvalidValue {
            name: self.name.clone(),
            value: self.value.clone(),
            expected: expected.to_string(),
        }
    }
}

/// Persistence row for `parameters`; mapped into `Parameter` at the boundary
#[derive(Debug, FromRow)]
pub struct ParameterRow {
    pub name: String,
    pub value: String,
    pub data_type: String,
    pub category: String,
    pub editable: bool,
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ParameterRow> for Parameter {
    type Error = ParameterError;

    fn try_from(row: ParameterRow) -> Result<Self, Self::Error> {
        let data_type = ParameterType::from_str(&row.data_type).map_err(|_| {
            ParameterError::InvalidValue {
                name: row.name.clone(),
                value: row.data_type.clone(),
                expected: "integer|decimal|boolean|text".to_string(),
            }
        })?;
        Ok(Parameter {
            name: row.name,
            value: row.value,
            data_type,
            category: row.category,
            editable: row.editable,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameter(value: &str, data_type: ParameterType) -> Parameter {
        Parameter {
            name: "porcentaje_comision".to_string(),
            value: value.to_string(),
            data_type,
            category: "COMISIONES".to_string(),
            editable: true,
            updated_by: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn integer_accessor_parses_and_rejects() {
        assert_eq!(parameter("10", ParameterType::Integer).as_integer().unwrap(), 10);
        assert!(parameter("diez", ParameterType::Integer).as_integer().is_err());
    }

    #[test]
    fn typed_read_against_wrong_declared_type_fails() {
        let p = parameter("10", ParameterType::Integer);
        let err = p.as_text().unwrap_err();
        assert!(matches!(err, ParameterError::TypeMismatch { .. }));
    }

    #[test]
    fn boolean_membership_set() {
        for v in ["1", "true", "True", "TRUE", "yes", "Yes", "YES"] {
            assert!(parameter(v, ParameterType::Boolean).as_boolean().unwrap(), "{}", v);
        }
        for v in ["0", "false", "no", "si", "y", ""] {
            assert!(!parameter(v, ParameterType::Boolean).as_boolean().unwrap(), "{}", v);
        }
    }

    #[test]
    fn percentage_is_integer_over_hundred() {
        let p = parameter("10", ParameterType::Integer);
        assert_eq!(p.as_percentage().unwrap(), dec!(0.10));
    }

    #[test]
    fn percent_points_accepts_decimal_parameters() {
        assert_eq!(
            parameter("8.5", ParameterType::Decimal).as_percent_points().unwrap(),
            dec!(8.5)
        );
        assert_eq!(
            parameter("10", ParameterType::Integer).as_percent_points().unwrap(),
            dec!(10)
        );
    }

    #[test]
    fn validate_value_honours_declared_type() {
        let p = parameter("10", ParameterType::Integer);
        assert!(p.validate_value("42").is_ok());
        assert!(p.validate_value("42.5").is_err());

        let d = parameter("8.5", ParameterType::Decimal);
        assert!(d.validate_value("9.75").is_ok());
        assert!(d.validate_value("nueve").is_err());
    }
}

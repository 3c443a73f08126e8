//! Input hardening for values that end up inside generated SQL or configuration.
//!
//! Column names come straight from user data, so they are never spliced into
//! SQL unquoted. Numeric configuration values are checked for finiteness and
//! range before a run starts.

use crate::error::{DriftError, Result};

/// Maximum accepted identifier length in bytes.
const MAX_IDENTIFIER_LENGTH: usize = 256;

/// SQL identifier validation and escaping utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates and quotes a SQL identifier (table or column name).
    ///
    /// The identifier is wrapped in double quotes with embedded quotes doubled,
    /// so any printable column name is accepted verbatim and case is preserved.
    ///
    /// ```rust
    /// use drift_guard::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("user_id").unwrap(), "\"user_id\"");
    /// assert_eq!(SqlSecurity::escape_identifier("a\"b").unwrap(), "\"a\"\"b\"");
    /// assert!(SqlSecurity::escape_identifier("").is_err());
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;

        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Validates an identifier without quoting it.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(DriftError::Security(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(DriftError::Security(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} bytes)"
            )));
        }

        if identifier.contains('\0') {
            return Err(DriftError::Security(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validation helpers for numeric configuration inputs.
pub struct InputValidator;

impl InputValidator {
    /// Validates that a value is finite.
    pub fn validate_finite(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() {
            return Err(DriftError::Configuration(format!(
                "Invalid {name} value: must be finite (not NaN or infinite)"
            )));
        }
        Ok(())
    }

    /// Validates a fraction in `[0.0, 1.0]`.
    pub fn validate_fraction(value: f64, name: &str) -> Result<()> {
        Self::validate_finite(value, name)?;

        if !(0.0..=1.0).contains(&value) {
            return Err(DriftError::Configuration(format!(
                "Invalid {name} value: must be between 0.0 and 1.0, got {value}"
            )));
        }
        Ok(())
    }

    /// Validates a strictly positive finite value.
    pub fn validate_positive(value: f64, name: &str) -> Result<()> {
        Self::validate_finite(value, name)?;

        if value <= 0.0 {
            return Err(DriftError::Configuration(format!(
                "Invalid {name} value: must be greater than 0, got {value}"
            )));
        }
        Ok(())
    }

    /// Validates that a count is at least `minimum`.
    pub fn validate_at_least(value: usize, minimum: usize, name: &str) -> Result<()> {
        if value < minimum {
            return Err(DriftError::Configuration(format!(
                "Invalid {name} value: must be at least {minimum}, got {value}"
            )));
        }
        Ok(())
    }
}

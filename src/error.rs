//! Error types shared across the crate.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by caller-facing operations.
///
/// Generation itself never fails; these cover values supplied from outside
/// the engine (forecast inputs, operator commands, query selectors).
#[derive(Debug, Error)]
pub enum MicrogridError {
    /// A caller-supplied value is outside its accepted range.
    #[error("invalid input: {field} {message}")]
    InvalidInput {
        /// Name of the offending parameter.
        field: &'static str,
        /// Constraint that was violated.
        message: String,
    },

    /// Forecast selector is not one of `load`, `solar`, `battery`, `weather`, `all`.
    #[error("unknown forecast type \"{0}\", expected one of: load, solar, battery, weather, all")]
    UnknownForecastKind(String),

    /// Operator asked for a shedding level above 3.
    #[error("shedding level {0} out of range, expected 0..=3")]
    InvalidSheddingLevel(u8),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MicrogridError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }
}

/// Checks that `value` is finite and lies in `[lo, hi]`.
pub(crate) fn ensure_range(
    field: &'static str,
    value: f64,
    lo: f64,
    hi: f64,
) -> Result<f64, MicrogridError> {
    if !value.is_finite() {
        return Err(MicrogridError::invalid(field, "must be finite"));
    }
    if value < lo || value > hi {
        return Err(MicrogridError::invalid(
            field,
            format!("must be in [{lo}, {hi}], got {value}"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_range_accepts_bounds() {
        assert_eq!(ensure_range("soc", 0.0, 0.0, 100.0).ok(), Some(0.0));
        assert_eq!(ensure_range("soc", 100.0, 0.0, 100.0).ok(), Some(100.0));
    }

    #[test]
    fn ensure_range_rejects_nan_and_outside() {
        assert!(ensure_range("soc", f64::NAN, 0.0, 100.0).is_err());
        assert!(ensure_range("soc", 100.5, 0.0, 100.0).is_err());
        let err = ensure_range("soc", -1.0, 0.0, 100.0).unwrap_err();
        assert!(err.to_string().contains("soc"));
    }
}

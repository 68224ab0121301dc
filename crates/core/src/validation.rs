//! Schema checks applied at the input boundary.
//!
//! Each helper returns a typed [`EotsError::Validation`] naming the record
//! and field, so a rejected cycle reports exactly what was wrong.

use crate::error::{EotsError, EotsResult};

/// Requires a finite value.
///
/// # Errors
/// Returns a validation error for NaN or infinite values.
pub fn ensure_finite(record: &str, field: &str, value: f64) -> EotsResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EotsError::validation(
            record,
            field,
            format!("must be finite, got {value}"),
        ))
    }
}

/// Requires a finite value when present.
///
/// # Errors
/// Returns a validation error for NaN or infinite values.
pub fn ensure_finite_opt(record: &str, field: &str, value: Option<f64>) -> EotsResult<()> {
    match value {
        Some(v) => ensure_finite(record, field, v),
        None => Ok(()),
    }
}

/// Requires a finite, strictly positive value.
///
/// # Errors
/// Returns a validation error if the value is not finite or not > 0.
pub fn ensure_positive(record: &str, field: &str, value: f64) -> EotsResult<()> {
    ensure_finite(record, field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(EotsError::validation(
            record,
            field,
            format!("must be > 0, got {value}"),
        ))
    }
}

/// Requires a finite, non-negative value.
///
/// # Errors
/// Returns a validation error if the value is not finite or is negative.
pub fn ensure_non_negative(record: &str, field: &str, value: f64) -> EotsResult<()> {
    ensure_finite(record, field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(EotsError::validation(
            record,
            field,
            format!("must be >= 0, got {value}"),
        ))
    }
}

/// Requires a finite, non-negative value when present.
///
/// # Errors
/// Returns a validation error if a present value is not finite or negative.
pub fn ensure_non_negative_opt(record: &str, field: &str, value: Option<f64>) -> EotsResult<()> {
    match value {
        Some(v) => ensure_non_negative(record, field, v),
        None => Ok(()),
    }
}

/// Requires a value in the closed unit interval `[0.0, 1.0]`.
///
/// # Errors
/// Returns a validation error if the value is outside `[0.0, 1.0]`.
pub fn ensure_unit_interval(record: &str, field: &str, value: f64) -> EotsResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EotsError::validation(
            record,
            field,
            format!("must be in [0.0, 1.0], got {value}"),
        ))
    }
}

/// Requires a value in `[-bound, bound]`.
///
/// # Errors
/// Returns a validation error if the value is outside the symmetric range.
pub fn ensure_symmetric_range(record: &str, field: &str, value: f64, bound: f64) -> EotsResult<()> {
    if value.is_finite() && value.abs() <= bound {
        Ok(())
    } else {
        Err(EotsError::validation(
            record,
            field,
            format!("must be in [-{bound}, {bound}], got {value}"),
        ))
    }
}

/// Requires a non-blank string.
///
/// # Errors
/// Returns a validation error for empty or whitespace-only strings.
pub fn ensure_not_blank(record: &str, field: &str, value: &str) -> EotsResult<()> {
    if value.trim().is_empty() {
        Err(EotsError::validation(record, field, "must not be empty"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_rejects_nan_and_infinity() {
        assert!(ensure_finite("r", "f", 1.0).is_ok());
        assert!(ensure_finite("r", "f", f64::NAN).is_err());
        assert!(ensure_finite("r", "f", f64::INFINITY).is_err());
    }

    #[test]
    fn positive_rejects_zero() {
        assert!(ensure_positive("r", "f", 0.0).is_err());
        assert!(ensure_positive("r", "f", 0.01).is_ok());
    }

    #[test]
    fn non_negative_allows_zero() {
        assert!(ensure_non_negative("r", "f", 0.0).is_ok());
        assert!(ensure_non_negative("r", "f", -0.5).is_err());
        assert!(ensure_non_negative_opt("r", "f", None).is_ok());
        assert!(ensure_non_negative_opt("r", "f", Some(-1.0)).is_err());
    }

    #[test]
    fn unit_interval_bounds_are_inclusive() {
        assert!(ensure_unit_interval("r", "f", 0.0).is_ok());
        assert!(ensure_unit_interval("r", "f", 1.0).is_ok());
        assert!(ensure_unit_interval("r", "f", 1.01).is_err());
        assert!(ensure_unit_interval("r", "f", f64::NAN).is_err());
    }

    #[test]
    fn symmetric_range_checks_magnitude() {
        assert!(ensure_symmetric_range("r", "f", -100.0, 100.0).is_ok());
        assert!(ensure_symmetric_range("r", "f", 100.5, 100.0).is_err());
    }

    #[test]
    fn blank_strings_rejected() {
        let err = ensure_not_blank("underlying", "symbol", "   ").unwrap_err();
        assert!(err.to_string().contains("underlying.symbol"));
    }
}

//! Confidence values reported by the extraction oracle
//!
//! Confidences are always produced by the oracle, never computed here.
//! These helpers only bound-check and clamp them.

/// Check that a confidence lies in [0.0, 1.0]
pub fn in_unit_range(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Clamp a reported confidence into [0.0, 1.0]
///
/// NaN maps to 0.0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_range() {
        assert!(in_unit_range(0.0));
        assert!(in_unit_range(1.0));
        assert!(in_unit_range(0.42));
        assert!(!in_unit_range(-0.01));
        assert!(!in_unit_range(1.5));
        assert!(!in_unit_range(f64::NAN));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-3.0), 0.0);
        assert_eq!(clamp_unit(0.25), 0.25);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }
}

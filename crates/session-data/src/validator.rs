//! Stream Validation

use crate::error::SessionError;

/// Shape and ordering checks applied while resolving a session
pub struct Validator;

impl Validator {
    /// Pose and time arrays must pair 1:1
    pub fn check_lengths(poses: usize, timestamps: usize) -> Result<(), SessionError> {
        if poses != timestamps {
            Err(SessionError::LengthMismatch { poses, timestamps })
        } else {
            Ok(())
        }
    }

    /// Timestamps must never decrease (repeats are allowed)
    pub fn check_monotonic(timestamps: &[f64]) -> Result<(), SessionError> {
        for i in 1..timestamps.len() {
            // NaN compares false on both sides and is rejected here too
            if !(timestamps[i] >= timestamps[i - 1]) {
                return Err(SessionError::NonMonotonicTimestamps { index: i });
            }
        }
        Ok(())
    }

    /// Every row must have at least `expected` columns
    pub fn check_rows(dataset: &str, rows: &[Vec<f64>], expected: usize) -> Result<(), SessionError> {
        match rows.iter().position(|row| row.len() < expected) {
            Some(index) => Err(SessionError::MalformedRow {
                dataset: dataset.to_string(),
                index,
                expected,
                actual: rows[index].len(),
            }),
            None => Ok(()),
        }
    }

    /// Paired datasets inside one group must have the same number of entries
    pub fn check_paired(dataset: &str, values: usize, timestamps: usize) -> Result<(), SessionError> {
        if values != timestamps {
            Err(SessionError::InvalidFormat(format!(
                "{} has {} entries but {} timestamps",
                dataset, values, timestamps
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_accepts_repeats() {
        assert!(Validator::check_monotonic(&[0.0, 1.0, 1.0, 2.0]).is_ok());
        assert!(Validator::check_monotonic(&[]).is_ok());
    }

    #[test]
    fn test_monotonic_rejects_decrease() {
        assert_eq!(
            Validator::check_monotonic(&[0.0, 2.0, 1.0]),
            Err(SessionError::NonMonotonicTimestamps { index: 2 })
        );
        assert!(Validator::check_monotonic(&[0.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_rows() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![1.0]];
        let err = Validator::check_rows("wrench", &rows, 3).unwrap_err();
        assert!(matches!(err, SessionError::MalformedRow { index: 1, actual: 1, .. }));
        assert!(Validator::check_rows("wrench", &rows[..1], 3).is_ok());
    }

    #[test]
    fn test_paired() {
        assert!(Validator::check_paired("voxel_color", 3, 3).is_ok());
        assert!(Validator::check_paired("voxel_color", 3, 2).is_err());
    }
}

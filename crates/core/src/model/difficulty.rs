use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slack applied to band edges so that `0.3 ± 0.2` still admits `0.1` and
/// `0.5` despite binary float rounding.
const BAND_EPSILON: f64 = 1e-9;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum DifficultyError {
    #[error("difficulty must be a finite value in [0, 1], got {provided}")]
    OutOfRange { provided: f64 },

    #[error("band width must be finite and >= 0, got {provided}")]
    InvalidBandWidth { provided: f64 },
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Item difficulty on the same 0..=1 scale as mastery strength.
///
/// Caller-supplied values outside the range are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Difficulty(f64);

impl Difficulty {
    /// # Errors
    ///
    /// Returns `DifficultyError::OutOfRange` for NaN, infinities and values
    /// outside `[0, 1]`.
    pub fn new(value: f64) -> Result<Self, DifficultyError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(DifficultyError::OutOfRange { provided: value });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Difficulty {
    type Error = DifficultyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Difficulty> for f64 {
    fn from(d: Difficulty) -> Self {
        d.0
    }
}

//
// ─── BAND ──────────────────────────────────────────────────────────────────────
//

/// Inclusive difficulty window used when looking up items near a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyBand {
    min: f64,
    max: f64,
}

impl DifficultyBand {
    /// Window of `target ± width`, limited to the `[0, 1]` scale.
    ///
    /// # Errors
    ///
    /// Returns `DifficultyError::InvalidBandWidth` for negative or non-finite widths.
    pub fn around(target: f64, width: f64) -> Result<Self, DifficultyError> {
        if !width.is_finite() || width < 0.0 {
            return Err(DifficultyError::InvalidBandWidth { provided: width });
        }
        let target = target.clamp(0.0, 1.0);
        Ok(Self {
            min: (target - width - BAND_EPSILON).max(0.0),
            max: (target + width + BAND_EPSILON).min(1.0),
        })
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn contains(&self, difficulty: Difficulty) -> bool {
        (self.min..=self.max).contains(&difficulty.value())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_rejects_out_of_range() {
        assert!(Difficulty::new(0.0).is_ok());
        assert!(Difficulty::new(1.0).is_ok());
        assert!(Difficulty::new(-0.01).is_err());
        assert!(Difficulty::new(1.01).is_err());
        assert!(Difficulty::new(f64::NAN).is_err());
    }

    #[test]
    fn band_edges_are_inclusive() {
        let band = DifficultyBand::around(0.3, 0.2).unwrap();
        assert!(band.contains(Difficulty::new(0.1).unwrap()));
        assert!(band.contains(Difficulty::new(0.5).unwrap()));
        assert!(!band.contains(Difficulty::new(0.7).unwrap()));

        let upper = DifficultyBand::around(0.7, 0.2).unwrap();
        assert!(upper.contains(Difficulty::new(0.5).unwrap()));
        assert!(upper.contains(Difficulty::new(0.9).unwrap()));
        assert!(!upper.contains(Difficulty::new(0.3).unwrap()));
    }

    #[test]
    fn band_is_limited_to_scale() {
        let band = DifficultyBand::around(0.05, 0.3).unwrap();
        assert_eq!(band.min(), 0.0);
        let band = DifficultyBand::around(0.95, 0.3).unwrap();
        assert_eq!(band.max(), 1.0);
    }

    #[test]
    fn negative_width_is_rejected() {
        assert!(matches!(
            DifficultyBand::around(0.5, -0.1),
            Err(DifficultyError::InvalidBandWidth { .. })
        ));
    }
}

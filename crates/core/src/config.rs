use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("learning rate must be in (0, 1], got {provided}")]
    InvalidLearningRate { provided: f64 },

    #[error("{field} must be in [0, 1], got {provided}")]
    OutOfUnitRange { field: &'static str, provided: f64 },

    #[error("{field} band width must be in [0, 1], got {provided}")]
    InvalidBand { field: &'static str, provided: f64 },

    #[error("volatility must be finite and >= 0, got {provided}")]
    InvalidVolatility { provided: f64 },

    #[error("default top-n must be > 0")]
    InvalidTopN,
}

fn unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange {
            field,
            provided: value,
        })
    }
}

fn band(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidBand {
            field,
            provided: value,
        })
    }
}

//
// ─── MASTERY ───────────────────────────────────────────────────────────────────
//

/// Parameters of the mastery update rule.
///
/// - `learning_rate`: base step per answer (0.1)
/// - `initial_strength`: strength of a lazily created node (0.1)
/// - `default_volatility`: stored on new nodes, not read by the rule (0.5)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteryConfig {
    learning_rate: f64,
    initial_strength: f64,
    default_volatility: f64,
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            initial_strength: 0.1,
            default_volatility: 0.5,
        }
    }
}

impl MasteryConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if any value is out of range.
    pub fn new(
        learning_rate: f64,
        initial_strength: f64,
        default_volatility: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            learning_rate,
            initial_strength,
            default_volatility,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 || self.learning_rate > 1.0
        {
            return Err(ConfigError::InvalidLearningRate {
                provided: self.learning_rate,
            });
        }
        unit("initial_strength", self.initial_strength)?;
        if !self.default_volatility.is_finite() || self.default_volatility < 0.0 {
            return Err(ConfigError::InvalidVolatility {
                provided: self.default_volatility,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    #[must_use]
    pub fn initial_strength(&self) -> f64 {
        self.initial_strength
    }

    #[must_use]
    pub fn default_volatility(&self) -> f64 {
        self.default_volatility
    }
}

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// Parameters of next-item selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    weak_threshold: f64,
    weak_probe_probability: f64,
    min_probe_difficulty: f64,
    new_topic_difficulty: f64,
    mock_target_difficulty: f64,
    standard_band: f64,
    mock_band: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            weak_threshold: 0.4,
            weak_probe_probability: 0.3,
            min_probe_difficulty: 0.1,
            new_topic_difficulty: 0.3,
            mock_target_difficulty: 0.5,
            standard_band: 0.2,
            mock_band: 0.3,
        }
    }
}

impl SelectionConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if any value lies outside `[0, 1]`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        weak_threshold: f64,
        weak_probe_probability: f64,
        min_probe_difficulty: f64,
        new_topic_difficulty: f64,
        mock_target_difficulty: f64,
        standard_band: f64,
        mock_band: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            weak_threshold,
            weak_probe_probability,
            min_probe_difficulty,
            new_topic_difficulty,
            mock_target_difficulty,
            standard_band,
            mock_band,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if any value lies outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit("weak_threshold", self.weak_threshold)?;
        unit("weak_probe_probability", self.weak_probe_probability)?;
        unit("min_probe_difficulty", self.min_probe_difficulty)?;
        unit("new_topic_difficulty", self.new_topic_difficulty)?;
        unit("mock_target_difficulty", self.mock_target_difficulty)?;
        band("standard", self.standard_band)?;
        band("mock", self.mock_band)?;
        Ok(())
    }

    /// Nodes strictly below this strength count as weak.
    #[must_use]
    pub fn weak_threshold(&self) -> f64 {
        self.weak_threshold
    }

    /// Chance of re-testing a weak node instead of exploring.
    #[must_use]
    pub fn weak_probe_probability(&self) -> f64 {
        self.weak_probe_probability
    }

    #[must_use]
    pub fn min_probe_difficulty(&self) -> f64 {
        self.min_probe_difficulty
    }

    #[must_use]
    pub fn new_topic_difficulty(&self) -> f64 {
        self.new_topic_difficulty
    }

    #[must_use]
    pub fn mock_target_difficulty(&self) -> f64 {
        self.mock_target_difficulty
    }

    #[must_use]
    pub fn standard_band(&self) -> f64 {
        self.standard_band
    }

    #[must_use]
    pub fn mock_band(&self) -> f64 {
        self.mock_band
    }
}

//
// ─── RISK ──────────────────────────────────────────────────────────────────────
//

/// Parameters of weak-area ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    critical_threshold: f64,
    fail_probability_cap: f64,
    default_top_n: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            critical_threshold: 0.3,
            fail_probability_cap: 0.9,
            default_top_n: 3,
        }
    }
}

impl RiskConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` for thresholds outside `[0, 1]` or a zero top-n.
    pub fn new(
        critical_threshold: f64,
        fail_probability_cap: f64,
        default_top_n: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            critical_threshold,
            fail_probability_cap,
            default_top_n,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for thresholds outside `[0, 1]` or a zero top-n.
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit("critical_threshold", self.critical_threshold)?;
        unit("fail_probability_cap", self.fail_probability_cap)?;
        if self.default_top_n == 0 {
            return Err(ConfigError::InvalidTopN);
        }
        Ok(())
    }

    #[must_use]
    pub fn critical_threshold(&self) -> f64 {
        self.critical_threshold
    }

    #[must_use]
    pub fn fail_probability_cap(&self) -> f64 {
        self.fail_probability_cap
    }

    #[must_use]
    pub fn default_top_n(&self) -> usize {
        self.default_top_n
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// All tunables of the adaptive core in one place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    pub mastery: MasteryConfig,
    pub selection: SelectionConfig,
    pub risk: RiskConfig,
}

impl AdaptiveConfig {
    /// # Errors
    ///
    /// Returns the first `ConfigError` found in any section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mastery.validate()?;
        self.selection.validate()?;
        self.risk.validate()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AdaptiveConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mastery.learning_rate(), 0.1);
        assert_eq!(config.selection.weak_threshold(), 0.4);
        assert_eq!(config.selection.weak_probe_probability(), 0.3);
        assert_eq!(config.risk.default_top_n(), 3);
    }

    #[test]
    fn zero_learning_rate_is_rejected() {
        assert_eq!(
            MasteryConfig::new(0.0, 0.1, 0.5).unwrap_err(),
            ConfigError::InvalidLearningRate { provided: 0.0 }
        );
    }

    #[test]
    fn selection_probabilities_must_be_unit() {
        let err = SelectionConfig::new(0.4, 1.5, 0.1, 0.3, 0.5, 0.2, 0.3).unwrap_err();
        assert_eq!(
            err,
            ConfigError::OutOfUnitRange {
                field: "weak_probe_probability",
                provided: 1.5
            }
        );
    }

    #[test]
    fn negative_band_is_rejected() {
        let err = SelectionConfig::new(0.4, 0.3, 0.1, 0.3, 0.5, -0.2, 0.3).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBand { field: "standard", .. }));
    }

    #[test]
    fn zero_top_n_is_rejected() {
        assert_eq!(RiskConfig::new(0.3, 0.9, 0).unwrap_err(), ConfigError::InvalidTopN);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: AdaptiveConfig =
            serde_json::from_str(r#"{"mastery":{"learning_rate":0.2}}"#).unwrap();
        assert_eq!(config.mastery.learning_rate(), 0.2);
        assert_eq!(config.mastery.initial_strength(), 0.1);
        assert_eq!(config.selection, SelectionConfig::default());
    }

    #[test]
    fn deserialized_config_is_checked_by_validate() {
        let config: AdaptiveConfig =
            serde_json::from_str(r#"{"risk":{"default_top_n":0}}"#).unwrap();
        assert_eq!(config.validate().unwrap_err(), ConfigError::InvalidTopN);
    }
}

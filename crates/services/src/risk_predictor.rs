use std::sync::Arc;

use practice_core::model::{LearnerId, MasteryNode};
use practice_core::{ConfigError, RiskConfig, WeakArea, rank_weak_areas};
use storage::repository::MasteryRepository;

use crate::error::RiskError;

/// Ranks a learner's topics by predicted failure risk.
#[derive(Clone)]
pub struct RiskPredictor {
    config: RiskConfig,
    mastery: Arc<dyn MasteryRepository>,
}

impl RiskPredictor {
    #[must_use]
    pub fn new(mastery: Arc<dyn MasteryRepository>) -> Self {
        Self {
            config: RiskConfig::default(),
            mastery,
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if `config` fails validation.
    pub fn with_config(
        config: RiskConfig,
        mastery: Arc<dyn MasteryRepository>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, mastery })
    }

    #[must_use]
    pub fn default_top_n(&self) -> usize {
        self.config.default_top_n()
    }

    /// The learner's `top_n` weakest topics, weakest first.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::Storage` if the mastery graph cannot be read.
    pub async fn predict_weak_areas(
        &self,
        learner_id: LearnerId,
        top_n: usize,
    ) -> Result<Vec<WeakArea>, RiskError> {
        let nodes = self.mastery.nodes_for_learner(learner_id).await?;
        let ranked = self.rank(&nodes, top_n);
        tracing::debug!(
            learner = %learner_id,
            nodes = nodes.len(),
            weak = ranked.len(),
            "predicted weak areas"
        );
        Ok(ranked)
    }

    /// Rank already-loaded nodes with this predictor's thresholds.
    #[must_use]
    pub fn rank(&self, nodes: &[MasteryNode], top_n: usize) -> Vec<WeakArea> {
        rank_weak_areas(nodes, top_n, &self.config)
    }
}

use std::sync::Arc;

use practice_core::model::{
    Difficulty, LearnerId, MasteryEntry, MasteryKey, MasteryNode, Strength, SubjectId, Topic,
};
use practice_core::{Clock, ConfigError, MasteryConfig, MasteryRule};
use storage::repository::MasteryRepository;

use crate::error::MasteryError;

/// Owns every write to the mastery graph.
///
/// Nodes are created lazily on a learner's first answer for a topic and then
/// moved by `MasteryRule`. Each write carries the next revision, so a
/// concurrent update of the same node surfaces as `StorageError::Conflict`
/// instead of being lost.
#[derive(Clone)]
pub struct MasteryTracker {
    clock: Clock,
    config: MasteryConfig,
    rule: MasteryRule,
    mastery: Arc<dyn MasteryRepository>,
}

impl MasteryTracker {
    #[must_use]
    pub fn new(clock: Clock, mastery: Arc<dyn MasteryRepository>) -> Self {
        Self::build(clock, MasteryConfig::default(), mastery)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if `config` fails validation.
    pub fn with_config(
        clock: Clock,
        config: MasteryConfig,
        mastery: Arc<dyn MasteryRepository>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(clock, config, mastery))
    }

    fn build(clock: Clock, config: MasteryConfig, mastery: Arc<dyn MasteryRepository>) -> Self {
        let rule = MasteryRule::new(&config);
        Self {
            clock,
            config,
            rule,
            mastery,
        }
    }

    /// Apply one answer to the learner's node for `topic` and return the new strength.
    ///
    /// # Errors
    ///
    /// Returns `MasteryError::Storage` if the node cannot be read or written,
    /// including a revision conflict with a concurrent writer.
    pub async fn update(
        &self,
        learner_id: LearnerId,
        topic: &Topic,
        is_correct: bool,
        difficulty: Difficulty,
        subject: Option<SubjectId>,
    ) -> Result<Strength, MasteryError> {
        let key = MasteryKey::new(learner_id, topic.clone(), subject);
        let now = self.clock.now();

        let existing = self.mastery.get_node(&key).await?;
        let mut node = match existing {
            Some(node) => node,
            None => MasteryNode::fresh(
                key,
                Strength::clamped(self.config.initial_strength()),
                self.config.default_volatility(),
                now,
            ),
        };

        let before = node.strength();
        let next = self.rule.next_strength(before, is_correct, difficulty);
        node.apply_strength(next, now);
        self.mastery.upsert_node(&node).await?;

        tracing::debug!(
            learner = %learner_id,
            topic = %topic,
            is_correct,
            difficulty = difficulty.value(),
            before = before.value(),
            strength = next.value(),
            revision = node.revision(),
            "mastery updated"
        );
        Ok(next)
    }

    /// `update` for unvalidated input; the topic and difficulty are checked first.
    ///
    /// # Errors
    ///
    /// Returns `MasteryError::Invalid` for an empty topic or a difficulty
    /// outside `[0, 1]`; otherwise as `update`.
    pub async fn update_raw(
        &self,
        learner_id: LearnerId,
        topic: &str,
        is_correct: bool,
        difficulty: f64,
        subject: Option<SubjectId>,
    ) -> Result<Strength, MasteryError> {
        let topic = Topic::new(topic).map_err(practice_core::Error::from)?;
        let difficulty = Difficulty::new(difficulty).map_err(practice_core::Error::from)?;
        self.update(learner_id, &topic, is_correct, difficulty, subject)
            .await
    }

    /// Current node for a key, if the learner has answered that topic.
    ///
    /// # Errors
    ///
    /// Returns `MasteryError::Storage` on store failure.
    pub async fn node(&self, key: &MasteryKey) -> Result<Option<MasteryNode>, MasteryError> {
        Ok(self.mastery.get_node(key).await?)
    }

    /// Every node of the learner, ordered by topic then subject.
    ///
    /// # Errors
    ///
    /// Returns `MasteryError::Storage` on store failure.
    pub async fn nodes(&self, learner_id: LearnerId) -> Result<Vec<MasteryNode>, MasteryError> {
        Ok(self.mastery.nodes_for_learner(learner_id).await?)
    }

    /// Read projection of the learner's graph.
    ///
    /// # Errors
    ///
    /// Returns `MasteryError::Storage` on store failure.
    pub async fn graph(&self, learner_id: LearnerId) -> Result<Vec<MasteryEntry>, MasteryError> {
        let nodes = self.nodes(learner_id).await?;
        Ok(nodes.iter().map(MasteryNode::to_entry).collect())
    }

    /// Delete every node of the learner.
    ///
    /// # Errors
    ///
    /// Returns `MasteryError::Storage` on store failure.
    pub async fn reset(&self, learner_id: LearnerId) -> Result<u64, MasteryError> {
        Ok(self.mastery.delete_nodes_for_learner(learner_id).await?)
    }
}

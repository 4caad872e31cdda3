//! Next-item selection.
//!
//! Adaptive sessions mostly explore topics that still have unanswered items,
//! targeting the learner's current strength on the chosen topic. With a fixed
//! probability, and only when weak topics with unanswered items exist, they
//! probe a weak topic instead. Topic-locked and final-mock sessions override
//! the topic choice and use a wider band around a mid difficulty.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use practice_core::model::{
    AnsweredSet, AttemptId, DifficultyBand, Item, LearnerId, MasteryNode, SelectionMode,
    SessionContext, SubjectId, Topic,
};
use practice_core::{ConfigError, RiskConfig, SelectionConfig};
use storage::repository::{AnswerLogRepository, ItemQuery, ItemRepository, MasteryRepository};

use crate::error::SelectionError;
use crate::random::{RandomSource, SeededRandom, chance, choose};
use crate::risk_predictor::RiskPredictor;

/// Which branch produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    WeakProbe,
    Explore,
    SubjectFallback,
    TopicLocked,
    FinalMock,
}

/// An item chosen for the learner, with the context it was chosen in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedItem {
    pub item: Item,
    pub attempt_id: Option<AttemptId>,
    pub reason: SelectionReason,
    /// Difficulty the lookup band was centred on; `None` for the subject fallback.
    pub target_difficulty: Option<f64>,
}

struct Plan {
    topic: Topic,
    target: f64,
    band_width: f64,
    reason: SelectionReason,
}

pub struct QuestionSelector {
    config: SelectionConfig,
    items: Arc<dyn ItemRepository>,
    answers: Arc<dyn AnswerLogRepository>,
    mastery: Arc<dyn MasteryRepository>,
    risk: RiskPredictor,
    rng: Mutex<Box<dyn RandomSource>>,
}

impl QuestionSelector {
    #[must_use]
    pub fn new(
        items: Arc<dyn ItemRepository>,
        answers: Arc<dyn AnswerLogRepository>,
        mastery: Arc<dyn MasteryRepository>,
    ) -> Self {
        let risk = RiskPredictor::new(Arc::clone(&mastery));
        Self::build(SelectionConfig::default(), risk, items, answers, mastery)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if either config fails validation.
    pub fn with_config(
        config: SelectionConfig,
        risk: RiskConfig,
        items: Arc<dyn ItemRepository>,
        answers: Arc<dyn AnswerLogRepository>,
        mastery: Arc<dyn MasteryRepository>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let risk = RiskPredictor::with_config(risk, Arc::clone(&mastery))?;
        Ok(Self::build(config, risk, items, answers, mastery))
    }

    fn build(
        config: SelectionConfig,
        risk: RiskPredictor,
        items: Arc<dyn ItemRepository>,
        answers: Arc<dyn AnswerLogRepository>,
        mastery: Arc<dyn MasteryRepository>,
    ) -> Self {
        Self {
            config,
            items,
            answers,
            mastery,
            risk,
            rng: Mutex::new(Box::new(SeededRandom::from_os_rng())),
        }
    }

    /// Replace the random source (usually for deterministic testing).
    #[must_use]
    pub fn with_random(self, rng: impl RandomSource + 'static) -> Self {
        self.replace_random(Box::new(rng));
        self
    }

    /// Swap the random source of a selector that is already shared.
    pub fn replace_random(&self, rng: Box<dyn RandomSource>) {
        *self.rng.lock().unwrap_or_else(PoisonError::into_inner) = rng;
    }

    fn draw<R>(&self, f: impl FnOnce(&mut dyn RandomSource) -> R) -> R {
        let mut guard = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(guard.as_mut())
    }

    /// Pick the next unanswered item for the learner.
    ///
    /// Returns `Ok(None)` when no eligible item is left.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::UnresolvableTopic` when a topic-locked context
    /// names a topic without items, and `SelectionError::Storage` when a store
    /// read fails.
    pub async fn next(
        &self,
        learner_id: LearnerId,
        subject: Option<SubjectId>,
        context: &SessionContext,
    ) -> Result<Option<SelectedItem>, SelectionError> {
        let answered = self.answers.answered_item_ids(learner_id).await?;
        let nodes: Vec<MasteryNode> = self
            .mastery
            .nodes_for_learner(learner_id)
            .await?
            .into_iter()
            .filter(|n| subject.is_none() || n.subject() == subject)
            .collect();

        let plan = match &context.mode {
            SelectionMode::TopicLocked { topic } => {
                self.ensure_topic_exists(topic, subject).await?;
                Some(Plan {
                    topic: topic.clone(),
                    target: self.config.mock_target_difficulty(),
                    band_width: self.config.mock_band(),
                    reason: SelectionReason::TopicLocked,
                })
            }
            SelectionMode::FinalMock => match self.mock_plan(&nodes, subject, &answered).await? {
                Some(plan) => Some(plan),
                None => {
                    tracing::debug!(learner = %learner_id, "no weak areas for mock; selecting adaptively");
                    self.adaptive_plan(&nodes, subject, &answered).await?
                }
            },
            SelectionMode::Adaptive => self.adaptive_plan(&nodes, subject, &answered).await?,
        };

        let Some(plan) = plan else {
            return self
                .subject_fallback(subject, &answered, context.attempt_id)
                .await;
        };

        tracing::debug!(
            learner = %learner_id,
            mode = context.mode.as_str(),
            override_mode = context.mode.is_override(),
            topic = %plan.topic,
            target = plan.target,
            reason = ?plan.reason,
            "selection plan"
        );

        let Some(item) = self.lookup(&plan, subject, &answered).await? else {
            return Ok(None);
        };
        Ok(Some(SelectedItem {
            item,
            attempt_id: context.attempt_id,
            reason: plan.reason,
            target_difficulty: Some(plan.target),
        }))
    }

    async fn ensure_topic_exists(
        &self,
        topic: &Topic,
        subject: Option<SubjectId>,
    ) -> Result<(), SelectionError> {
        let nothing = AnsweredSet::new();
        let all = self
            .items
            .find_items(&ItemQuery::new(&nothing).topic(topic).subject(subject))
            .await?;
        if all.is_empty() {
            tracing::warn!(topic = %topic, ?subject, "topic-locked session names an unknown topic");
            return Err(SelectionError::UnresolvableTopic {
                topic: topic.clone(),
            });
        }
        Ok(())
    }

    async fn mock_plan(
        &self,
        nodes: &[MasteryNode],
        subject: Option<SubjectId>,
        answered: &AnsweredSet,
    ) -> Result<Option<Plan>, SelectionError> {
        let weak = self.risk.rank(nodes, self.risk.default_top_n());
        if weak.is_empty() {
            return Ok(None);
        }
        let open = self.items.distinct_topics(subject, answered).await?;
        let pool: Vec<Topic> = weak
            .into_iter()
            .map(|area| area.topic)
            .filter(|topic| open.binary_search(topic).is_ok())
            .collect();

        Ok(self.draw(|rng| choose(rng, &pool).cloned()).map(|topic| Plan {
            topic,
            target: self.config.mock_target_difficulty(),
            band_width: self.config.mock_band(),
            reason: SelectionReason::FinalMock,
        }))
    }

    async fn adaptive_plan(
        &self,
        nodes: &[MasteryNode],
        subject: Option<SubjectId>,
        answered: &AnsweredSet,
    ) -> Result<Option<Plan>, SelectionError> {
        let topics = self.items.distinct_topics(subject, answered).await?;
        let weak: Vec<&MasteryNode> = nodes
            .iter()
            .filter(|n| n.strength().value() < self.config.weak_threshold())
            .filter(|n| topics.binary_search(n.topic()).is_ok())
            .collect();

        let probe = self.draw(|rng| {
            if weak.is_empty() || !chance(rng, self.config.weak_probe_probability()) {
                return None;
            }
            choose(rng, &weak).copied()
        });
        if let Some(node) = probe {
            return Ok(Some(Plan {
                topic: node.topic().clone(),
                target: node.strength().value().max(self.config.min_probe_difficulty()),
                band_width: self.config.standard_band(),
                reason: SelectionReason::WeakProbe,
            }));
        }

        let Some(topic) = self.draw(|rng| choose(rng, &topics).cloned()) else {
            return Ok(None);
        };

        let exact = nodes
            .iter()
            .find(|n| n.topic() == &topic && n.subject() == subject);
        let node = match (exact, subject) {
            (Some(node), _) => Some(node),
            (None, None) => nodes.iter().find(|n| n.topic() == &topic),
            (None, Some(_)) => None,
        };
        let target = node.map_or(self.config.new_topic_difficulty(), |n| n.strength().value());

        Ok(Some(Plan {
            topic,
            target,
            band_width: self.config.standard_band(),
            reason: SelectionReason::Explore,
        }))
    }

    /// Any unanswered item of the subject, used when no topic could be planned.
    ///
    /// With a consistent store this finds nothing, since no open topic means no
    /// open item either. It still guards stores whose topic listing lags
    /// their items.
    async fn subject_fallback(
        &self,
        subject: Option<SubjectId>,
        answered: &AnsweredSet,
        attempt_id: Option<AttemptId>,
    ) -> Result<Option<SelectedItem>, SelectionError> {
        if subject.is_none() {
            return Ok(None);
        }
        let candidates = self
            .items
            .find_items(&ItemQuery::new(answered).subject(subject))
            .await?;
        Ok(self
            .draw(|rng| choose(rng, &candidates).cloned())
            .map(|item| SelectedItem {
                item,
                attempt_id,
                reason: SelectionReason::SubjectFallback,
                target_difficulty: None,
            }))
    }

    async fn lookup(
        &self,
        plan: &Plan,
        subject: Option<SubjectId>,
        answered: &AnsweredSet,
    ) -> Result<Option<Item>, SelectionError> {
        let band = DifficultyBand::around(plan.target, plan.band_width)?;
        let query = ItemQuery::new(answered).topic(&plan.topic).subject(subject);

        let mut candidates = self.items.find_items(&query.band(band)).await?;
        if candidates.is_empty() {
            tracing::warn!(
                topic = %plan.topic,
                min = band.min(),
                max = band.max(),
                "difficulty band exhausted; widening to the whole topic"
            );
            candidates = self.items.find_items(&query).await?;
        }
        Ok(self.draw(|rng| choose(rng, &candidates).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use practice_core::model::{ItemDraft, ItemId, MasteryKey, Strength};
    use practice_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    async fn repo_with(items: &[(u64, &str, f64)]) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for (id, topic, difficulty) in items {
            let item = ItemDraft::multiple_choice(*topic, *difficulty, format!("Q{id}"), &["a", "b"])
                .validate(ItemId::new(*id))
                .unwrap();
            repo.upsert_item(&item).await.unwrap();
        }
        repo
    }

    async fn set_strength(repo: &InMemoryRepository, topic: &str, strength: f64) {
        let key = MasteryKey::new(LearnerId::new(1), Topic::new(topic).unwrap(), None);
        let mut node = MasteryNode::fresh(key, Strength::clamped(0.1), 0.5, fixed_now());
        node.apply_strength(Strength::clamped(strength), fixed_now());
        repo.upsert_node(&node).await.unwrap();
    }

    fn selector(repo: &InMemoryRepository, rng: ScriptedRandom) -> QuestionSelector {
        QuestionSelector::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
        .with_random(rng)
    }

    #[tokio::test]
    async fn weak_probe_targets_the_weak_topics_strength() {
        let repo = repo_with(&[(1, "Optics", 0.1), (2, "Optics", 0.9), (3, "Waves", 0.5)]).await;
        set_strength(&repo, "Optics", 0.05).await;
        set_strength(&repo, "Waves", 0.9).await;

        // 0.1 < 0.3 fires the probe
        let sel = selector(&repo, ScriptedRandom::new().with_units([0.1]));
        let picked = sel
            .next(LearnerId::new(1), None, &SessionContext::adaptive())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(picked.reason, SelectionReason::WeakProbe);
        assert_eq!(picked.target_difficulty, Some(0.1));
        assert_eq!(picked.item.id(), ItemId::new(1));
    }

    #[tokio::test]
    async fn explore_uses_current_strength_as_target() {
        let repo = repo_with(&[(1, "Waves", 0.2), (2, "Waves", 0.8)]).await;
        set_strength(&repo, "Waves", 0.75).await;

        let sel = selector(&repo, ScriptedRandom::new());
        let picked = sel
            .next(LearnerId::new(1), None, &SessionContext::adaptive())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(picked.reason, SelectionReason::Explore);
        assert_eq!(picked.target_difficulty, Some(0.75));
        assert_eq!(picked.item.id(), ItemId::new(2));
    }

    #[tokio::test]
    async fn empty_band_widens_to_whole_topic() {
        let repo = repo_with(&[(1, "Waves", 0.95)]).await;

        let sel = selector(&repo, ScriptedRandom::new());
        let picked = sel
            .next(LearnerId::new(1), None, &SessionContext::adaptive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.item.id(), ItemId::new(1));
    }

    #[tokio::test]
    async fn empty_bank_selects_nothing() {
        let repo = InMemoryRepository::new();
        let sel = selector(&repo, ScriptedRandom::new());
        let picked = sel
            .next(LearnerId::new(1), Some(SubjectId::new(3)), &SessionContext::final_mock())
            .await
            .unwrap();
        assert!(picked.is_none());
    }

    /// Item store whose topic listing is always empty.
    struct NoTopicIndex(InMemoryRepository);

    #[async_trait::async_trait]
    impl ItemRepository for NoTopicIndex {
        async fn upsert_item(&self, item: &Item) -> Result<(), StorageError> {
            self.0.upsert_item(item).await
        }

        async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StorageError> {
            self.0.get_item(id).await
        }

        async fn find_items(&self, query: &ItemQuery<'_>) -> Result<Vec<Item>, StorageError> {
            self.0.find_items(query).await
        }

        async fn distinct_topics(
            &self,
            _subject: Option<SubjectId>,
            _excluding: &AnsweredSet,
        ) -> Result<Vec<Topic>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn subject_fallback_serves_any_open_item_of_the_subject() {
        let repo = InMemoryRepository::new();
        let item = ItemDraft::multiple_choice("Optics", 0.6, "Q1", &["a", "b"])
            .with_subject(SubjectId::new(1))
            .validate(ItemId::new(1))
            .unwrap();
        repo.upsert_item(&item).await.unwrap();

        let sel = QuestionSelector::new(
            Arc::new(NoTopicIndex(repo.clone())),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
        .with_random(ScriptedRandom::new());

        let picked = sel
            .next(LearnerId::new(1), Some(SubjectId::new(1)), &SessionContext::adaptive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.reason, SelectionReason::SubjectFallback);
        assert_eq!(picked.target_difficulty, None);
        assert_eq!(picked.item.id(), ItemId::new(1));

        // without a subject filter there is nothing to fall back to
        let none = sel
            .next(LearnerId::new(1), None, &SessionContext::adaptive())
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn invalid_selection_config_is_rejected() {
        let repo = InMemoryRepository::new();
        let config: SelectionConfig =
            serde_json::from_str(r#"{"weak_probe_probability": 1.5}"#).unwrap();
        let result = QuestionSelector::with_config(
            config,
            RiskConfig::default(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        assert!(matches!(result, Err(ConfigError::OutOfUnitRange { .. })));
    }

    #[tokio::test]
    async fn attempt_id_is_carried_through() {
        let repo = repo_with(&[(1, "Waves", 0.3)]).await;
        let sel = selector(&repo, ScriptedRandom::new());
        let ctx = SessionContext::adaptive().with_attempt(AttemptId::new(12));
        let picked = sel
            .next(LearnerId::new(1), None, &ctx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.attempt_id, Some(AttemptId::new(12)));
    }
}

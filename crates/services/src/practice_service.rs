use std::sync::Arc;

use serde::Serialize;

use practice_core::model::{
    AnswerRecord, AttemptId, ItemId, LearnerId, MasteryEntry, MasteryNode, SessionContext,
    SubjectId,
};
use practice_core::numeric::round_to;
use practice_core::{AdaptiveConfig, Clock, WeakArea};
use storage::repository::{AnswerLogRepository, ItemRepository, Storage};

use crate::analytics::{LearnerStats, learner_stats};
use crate::error::PracticeError;
use crate::mastery_tracker::MasteryTracker;
use crate::question_selector::{QuestionSelector, SelectedItem};
use crate::random::RandomSource;
use crate::risk_predictor::RiskPredictor;

/// Outcome of a submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_answer: String,
    /// Two decimals.
    pub new_topic_strength: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    pub answers_removed: u64,
    pub nodes_removed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub stats: LearnerStats,
    pub weak_areas: Vec<WeakArea>,
    pub graph: Vec<MasteryEntry>,
}

/// Assembles the tracker, selector and predictor over one `Storage`.
#[derive(Clone)]
pub struct PracticeService {
    clock: Clock,
    items: Arc<dyn ItemRepository>,
    answers: Arc<dyn AnswerLogRepository>,
    tracker: Arc<MasteryTracker>,
    selector: Arc<QuestionSelector>,
    risk: Arc<RiskPredictor>,
}

impl PracticeService {
    /// Build services over an existing storage aggregate.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Config` if `config` fails validation.
    pub fn new(
        clock: Clock,
        storage: &Storage,
        config: &AdaptiveConfig,
    ) -> Result<Self, PracticeError> {
        config.validate()?;

        let tracker = Arc::new(MasteryTracker::with_config(
            clock,
            config.mastery.clone(),
            Arc::clone(&storage.mastery),
        )?);
        let selector = Arc::new(QuestionSelector::with_config(
            config.selection.clone(),
            config.risk.clone(),
            Arc::clone(&storage.items),
            Arc::clone(&storage.answers),
            Arc::clone(&storage.mastery),
        )?);
        let risk = Arc::new(RiskPredictor::with_config(
            config.risk.clone(),
            Arc::clone(&storage.mastery),
        )?);

        Ok(Self {
            clock,
            items: Arc::clone(&storage.items),
            answers: Arc::clone(&storage.answers),
            tracker,
            selector,
            risk,
        })
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError` if storage initialization or config validation fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: &AdaptiveConfig,
    ) -> Result<Self, PracticeError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::new(clock, &storage, config)
    }

    /// Replace the selector's random source (usually for deterministic testing).
    #[must_use]
    pub fn with_random(self, rng: impl RandomSource + 'static) -> Self {
        self.selector.replace_random(Box::new(rng));
        self
    }

    #[must_use]
    pub fn tracker(&self) -> Arc<MasteryTracker> {
        Arc::clone(&self.tracker)
    }

    #[must_use]
    pub fn selector(&self) -> Arc<QuestionSelector> {
        Arc::clone(&self.selector)
    }

    #[must_use]
    pub fn risk_predictor(&self) -> Arc<RiskPredictor> {
        Arc::clone(&self.risk)
    }

    /// # Errors
    ///
    /// See `QuestionSelector::next`.
    pub async fn next_item(
        &self,
        learner_id: LearnerId,
        subject: Option<SubjectId>,
        context: &SessionContext,
    ) -> Result<Option<SelectedItem>, PracticeError> {
        Ok(self.selector.next(learner_id, subject, context).await?)
    }

    /// Grade an answer, log it, and move the learner's mastery on the item's topic.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::ItemNotFound` for an unknown item; store and
    /// mastery failures propagate.
    pub async fn submit_answer(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
        selected: &str,
        time_taken_secs: f64,
        attempt_id: Option<AttemptId>,
    ) -> Result<AnswerFeedback, PracticeError> {
        let item = self
            .items
            .get_item(item_id)
            .await?
            .ok_or(PracticeError::ItemNotFound(item_id))?;

        let correct = item.is_correct(selected);
        let record = AnswerRecord::new(
            learner_id,
            item_id,
            attempt_id,
            selected,
            correct,
            time_taken_secs,
            item.difficulty(),
            self.clock.now(),
        )
        .map_err(practice_core::Error::from)?;
        let log_id = self.answers.append_answer(&record).await?;

        let strength = self
            .tracker
            .update(
                learner_id,
                item.topic(),
                correct,
                item.difficulty(),
                item.subject(),
            )
            .await?;

        tracing::info!(
            learner = %learner_id,
            item = %item_id,
            log_id,
            correct,
            strength = strength.value(),
            "answer recorded"
        );

        let feedback = if correct {
            "Correct! Well done.".to_owned()
        } else {
            format!("Incorrect. The right answer was {}.", item.correct_answer())
        };
        Ok(AnswerFeedback {
            correct,
            correct_answer: item.correct_answer().to_owned(),
            new_topic_strength: round_to(strength.value(), 2),
            feedback,
        })
    }

    /// Delete the learner's answer log and mastery graph.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError` if either store fails.
    pub async fn reset_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<ResetSummary, PracticeError> {
        let answers_removed = self.answers.delete_answers_for_learner(learner_id).await?;
        let nodes_removed = self.tracker.reset(learner_id).await?;
        tracing::info!(learner = %learner_id, answers_removed, nodes_removed, "progress reset");
        Ok(ResetSummary {
            answers_removed,
            nodes_removed,
        })
    }

    /// Stats, weak areas and mastery graph in one read.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError` if a store read fails.
    pub async fn dashboard(&self, learner_id: LearnerId) -> Result<Dashboard, PracticeError> {
        let answers = self.answers.answers_for_learner(learner_id).await?;
        let nodes = self.tracker.nodes(learner_id).await?;

        Ok(Dashboard {
            stats: learner_stats(&answers, &nodes),
            weak_areas: self.risk.rank(&nodes, self.risk.default_top_n()),
            graph: nodes.iter().map(MasteryNode::to_entry).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use practice_core::model::ItemDraft;
    use practice_core::time::fixed_clock;

    async fn service() -> PracticeService {
        let storage = Storage::in_memory();
        let item = ItemDraft::multiple_choice("Optics", 0.8, "Index of glass?", &["1.5", "1.0"])
            .validate(ItemId::new(1))
            .unwrap();
        storage.items.upsert_item(&item).await.unwrap();
        PracticeService::new(fixed_clock(), &storage, &AdaptiveConfig::default())
            .unwrap()
            .with_random(ScriptedRandom::new())
    }

    #[tokio::test]
    async fn correct_answer_reports_new_strength() {
        let svc = service().await;
        let fb = svc
            .submit_answer(LearnerId::new(1), ItemId::new(1), "1.5", 20.0, None)
            .await
            .unwrap();
        assert!(fb.correct);
        assert_eq!(fb.feedback, "Correct! Well done.");
        // 0.1 + 0.1 * (1 + 0.7)
        assert_eq!(fb.new_topic_strength, 0.27);
    }

    #[tokio::test]
    async fn wrong_answer_names_the_right_one() {
        let svc = service().await;
        let fb = svc
            .submit_answer(LearnerId::new(1), ItemId::new(1), "1.0", 20.0, None)
            .await
            .unwrap();
        assert!(!fb.correct);
        assert_eq!(fb.correct_answer, "1.5");
        assert_eq!(fb.feedback, "Incorrect. The right answer was 1.5.");
        assert_eq!(fb.new_topic_strength, 0.0);
    }

    #[tokio::test]
    async fn unknown_item_is_reported() {
        let svc = service().await;
        let err = svc
            .submit_answer(LearnerId::new(1), ItemId::new(42), "x", 1.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PracticeError::ItemNotFound(id) if id == ItemId::new(42)));
    }

    #[tokio::test]
    async fn negative_time_taken_is_rejected_before_logging() {
        let svc = service().await;
        let learner = LearnerId::new(1);
        let err = svc
            .submit_answer(learner, ItemId::new(1), "1.5", -2.0, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PracticeError::Invalid(practice_core::Error::Answer(_))
        ));

        let dashboard = svc.dashboard(learner).await.unwrap();
        assert_eq!(dashboard.stats.total_answers, 0);
        assert!(dashboard.graph.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let json = r#"{"risk": {"default_top_n": 0}}"#;
        let config: AdaptiveConfig = serde_json::from_str(json).unwrap();
        let result = PracticeService::new(fixed_clock(), &Storage::in_memory(), &config);
        assert!(matches!(result, Err(PracticeError::Config(_))));
    }
}

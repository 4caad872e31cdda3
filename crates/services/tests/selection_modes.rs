use std::sync::Arc;

use async_trait::async_trait;
use practice_core::AdaptiveConfig;
use practice_core::model::{
    AnswerRecord, AnsweredSet, ItemDraft, ItemId, LearnerId, MasteryKey, MasteryNode,
    SessionContext, Strength, SubjectId, Topic,
};
use practice_core::time::{fixed_clock, fixed_now};
use services::{
    MasteryError, PracticeError, PracticeService, QuestionSelector, ScriptedRandom,
    SelectionError, SelectionReason,
};
use storage::repository::{
    AnswerLogRepository, InMemoryRepository, ItemRepository, MasteryRepository, Storage,
    StorageError,
};

async fn bank(items: &[(u64, &str, f64, Option<u64>)]) -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    for (id, topic, difficulty, subject) in items {
        let mut draft =
            ItemDraft::multiple_choice(*topic, *difficulty, format!("Q{id}"), &["a", "b"]);
        if let Some(s) = subject {
            draft = draft.with_subject(SubjectId::new(*s));
        }
        repo.upsert_item(&draft.validate(ItemId::new(*id)).unwrap())
            .await
            .unwrap();
    }
    repo
}

async fn strength(repo: &InMemoryRepository, topic: &str, value: f64) {
    let key = MasteryKey::new(LearnerId::new(1), Topic::new(topic).unwrap(), None);
    let mut node = MasteryNode::fresh(key, Strength::clamped(0.1), 0.5, fixed_now());
    node.apply_strength(Strength::clamped(value), fixed_now());
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

async fn answer(repo: &InMemoryRepository, item: u64) {
    let record = AnswerRecord::new(
        LearnerId::new(1),
        ItemId::new(item),
        None,
        "a",
        true,
        1.0,
        practice_core::model::Difficulty::new(0.5).unwrap(),
        fixed_now(),
    )
    .unwrap();
    repo.append_answer(&record).await.unwrap();
}

#[tokio::test]
async fn topic_locked_uses_the_wide_band_around_mid_difficulty() {
    let repo = bank(&[
        (1, "Optics", 0.1, None),
        (2, "Optics", 0.75, None),
        (3, "Waves", 0.5, None),
    ])
    .await;
    // a weak node elsewhere must not pull the selection away
    strength(&repo, "Waves", 0.05).await;

    let sel = selector(&repo, ScriptedRandom::new().with_units([0.0]));
    let ctx = SessionContext::topic_locked(Topic::new("Optics").unwrap());
    let picked = sel.next(LearnerId::new(1), None, &ctx).await.unwrap().unwrap();

    assert_eq!(picked.reason, SelectionReason::TopicLocked);
    assert_eq!(picked.target_difficulty, Some(0.5));
    assert_eq!(picked.item.id(), ItemId::new(2));
}

#[tokio::test]
async fn topic_locked_exhausted_topic_is_none_not_an_error() {
    let repo = bank(&[(1, "Optics", 0.5, None), (2, "Waves", 0.5, None)]).await;
    answer(&repo, 1).await;

    let sel = selector(&repo, ScriptedRandom::new());
    let ctx = SessionContext::topic_locked(Topic::new("Optics").unwrap());
    assert!(sel.next(LearnerId::new(1), None, &ctx).await.unwrap().is_none());
}

#[tokio::test]
async fn topic_locked_unknown_topic_is_unresolvable() {
    let repo = bank(&[(1, "Optics", 0.5, Some(1))]).await;
    let sel = selector(&repo, ScriptedRandom::new());

    let ctx = SessionContext::topic_locked(Topic::new("Acoustics").unwrap());
    let err = sel.next(LearnerId::new(1), None, &ctx).await.unwrap_err();
    assert!(matches!(err, SelectionError::UnresolvableTopic { ref topic } if topic.as_str() == "Acoustics"));

    // known topic, wrong subject
    let ctx = SessionContext::topic_locked(Topic::new("Optics").unwrap());
    let err = sel
        .next(LearnerId::new(1), Some(SubjectId::new(2)), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, SelectionError::UnresolvableTopic { .. }));
}

#[tokio::test]
async fn final_mock_draws_from_weak_areas() {
    let repo = bank(&[
        (1, "Optics", 0.5, None),
        (2, "Waves", 0.5, None),
        (3, "Atoms", 0.5, None),
    ])
    .await;
    strength(&repo, "Waves", 0.9).await;
    strength(&repo, "Optics", 0.2).await;

    // index 0 picks the weakest area
    let sel = selector(&repo, ScriptedRandom::new().with_indices([0]));
    let picked = sel
        .next(LearnerId::new(1), None, &SessionContext::final_mock())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(picked.reason, SelectionReason::FinalMock);
    assert_eq!(picked.item.topic().as_str(), "Optics");
    assert_eq!(picked.target_difficulty, Some(0.5));
}

#[tokio::test]
async fn final_mock_without_history_selects_adaptively() {
    let repo = bank(&[(1, "Optics", 0.3, None)]).await;
    let sel = selector(&repo, ScriptedRandom::new());
    let picked = sel
        .next(LearnerId::new(1), None, &SessionContext::final_mock())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(picked.reason, SelectionReason::Explore);
}

#[tokio::test]
async fn subject_filter_scopes_every_branch() {
    let repo = bank(&[(1, "Optics", 0.3, Some(1)), (2, "Optics", 0.3, Some(2))]).await;
    let sel = selector(&repo, ScriptedRandom::new());
    let picked = sel
        .next(LearnerId::new(1), Some(SubjectId::new(2)), &SessionContext::adaptive())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(picked.item.id(), ItemId::new(2));

    answer(&repo, 2).await;
    assert!(
        sel.next(LearnerId::new(1), Some(SubjectId::new(2)), &SessionContext::adaptive())
            .await
            .unwrap()
            .is_none()
    );
}

/// Store that is always down.
struct Unavailable;

fn down() -> StorageError {
    StorageError::Connection("store unavailable".into())
}

#[async_trait]
impl AnswerLogRepository for Unavailable {
    async fn append_answer(&self, _record: &AnswerRecord) -> Result<i64, StorageError> {
        Err(down())
    }

    async fn answered_item_ids(&self, _learner_id: LearnerId) -> Result<AnsweredSet, StorageError> {
        Err(down())
    }

    async fn answers_for_learner(
        &self,
        _learner_id: LearnerId,
    ) -> Result<Vec<AnswerRecord>, StorageError> {
        Err(down())
    }

    async fn delete_answers_for_learner(
        &self,
        _learner_id: LearnerId,
    ) -> Result<u64, StorageError> {
        Err(down())
    }
}

#[async_trait]
impl MasteryRepository for Unavailable {
    async fn get_node(&self, _key: &MasteryKey) -> Result<Option<MasteryNode>, StorageError> {
        Err(down())
    }

    async fn upsert_node(&self, _node: &MasteryNode) -> Result<(), StorageError> {
        Err(down())
    }

    async fn nodes_for_learner(
        &self,
        _learner_id: LearnerId,
    ) -> Result<Vec<MasteryNode>, StorageError> {
        Err(down())
    }

    async fn delete_nodes_for_learner(&self, _learner_id: LearnerId) -> Result<u64, StorageError> {
        Err(down())
    }
}

#[tokio::test]
async fn store_failures_propagate_instead_of_selecting_nothing() {
    let repo = bank(&[(1, "Optics", 0.3, None)]).await;
    let sel = QuestionSelector::new(
        Arc::new(repo.clone()),
        Arc::new(Unavailable),
        Arc::new(repo.clone()),
    );
    let err = sel
        .next(LearnerId::new(1), None, &SessionContext::adaptive())
        .await
        .unwrap_err();
    assert!(matches!(err, SelectionError::Storage(StorageError::Connection(_))));
}

#[tokio::test]
async fn mastery_store_failure_surfaces_from_submit() {
    let repo = bank(&[(1, "Optics", 0.3, None)]).await;
    let storage = Storage {
        items: Arc::new(repo.clone()),
        answers: Arc::new(repo.clone()),
        mastery: Arc::new(Unavailable),
    };
    let svc = PracticeService::new(fixed_clock(), &storage, &AdaptiveConfig::default()).unwrap();

    let err = svc
        .submit_answer(LearnerId::new(1), ItemId::new(1), "a", 2.0, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PracticeError::Mastery(MasteryError::Storage(StorageError::Connection(_)))
    ));
}

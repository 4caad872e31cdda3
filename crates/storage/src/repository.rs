use async_trait::async_trait;
use practice_core::model::{
    AnswerRecord, AnsweredSet, DifficultyBand, Item, ItemId, LearnerId, MasteryKey, MasteryNode,
    SubjectId, Topic,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── ITEM QUERY ────────────────────────────────────────────────────────────────
//

/// Filter for item lookups. Answered items are always excluded.
#[derive(Debug, Clone, Copy)]
pub struct ItemQuery<'a> {
    pub topic: Option<&'a Topic>,
    pub subject: Option<SubjectId>,
    pub band: Option<DifficultyBand>,
    pub excluding: &'a AnsweredSet,
}

impl<'a> ItemQuery<'a> {
    #[must_use]
    pub fn new(excluding: &'a AnsweredSet) -> Self {
        Self {
            topic: None,
            subject: None,
            band: None,
            excluding,
        }
    }

    #[must_use]
    pub fn topic(mut self, topic: &'a Topic) -> Self {
        self.topic = Some(topic);
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: Option<SubjectId>) -> Self {
        self.subject = subject;
        self
    }

    #[must_use]
    pub fn band(mut self, band: DifficultyBand) -> Self {
        self.band = Some(band);
        self
    }

    /// In-process evaluation of the filter; SQL adapters translate it instead.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        if self.excluding.contains(item.id()) {
            return false;
        }
        if self.topic.is_some_and(|t| t != item.topic()) {
            return false;
        }
        if self.subject.is_some() && self.subject != item.subject() {
            return false;
        }
        if self.band.is_some_and(|b| !b.contains(item.difficulty())) {
            return false;
        }
        true
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read access to the item bank, plus upsert for importers.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Persist or replace an item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the item cannot be stored.
    async fn upsert_item(&self, item: &Item) -> Result<(), StorageError>;

    /// Fetch an item by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure; a missing item is `Ok(None)`.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StorageError>;

    /// All items matching the query, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn find_items(&self, query: &ItemQuery<'_>) -> Result<Vec<Item>, StorageError>;

    /// Sorted topics that still have at least one item outside `excluding`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn distinct_topics(
        &self,
        subject: Option<SubjectId>,
        excluding: &AnsweredSet,
    ) -> Result<Vec<Topic>, StorageError>;
}

/// Append-only log of answered items.
#[async_trait]
pub trait AnswerLogRepository: Send + Sync {
    /// Append a record and return its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn append_answer(&self, record: &AnswerRecord) -> Result<i64, StorageError>;

    /// IDs of every item the learner has answered.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn answered_item_ids(&self, learner_id: LearnerId) -> Result<AnsweredSet, StorageError>;

    /// The learner's records in answer order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn answers_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<AnswerRecord>, StorageError>;

    /// Remove the learner's log (bulk reset). Returns the number of removed records.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn delete_answers_for_learner(&self, learner_id: LearnerId)
    -> Result<u64, StorageError>;
}

/// Mastery graph storage, addressed by `(learner, topic, subject)`.
#[async_trait]
pub trait MasteryRepository: Send + Sync {
    /// Fetch one node.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure; a missing node is `Ok(None)`.
    async fn get_node(&self, key: &MasteryKey) -> Result<Option<MasteryNode>, StorageError>;

    /// Store a node whose revision is exactly one above the stored one
    /// (absent counts as revision 0).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if another writer got there first.
    async fn upsert_node(&self, node: &MasteryNode) -> Result<(), StorageError>;

    /// Every node of the learner, ordered by topic then subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn nodes_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<MasteryNode>, StorageError>;

    /// Remove every node of the learner (bulk reset). Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn delete_nodes_for_learner(&self, learner_id: LearnerId) -> Result<u64, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    items: Arc<Mutex<BTreeMap<ItemId, Item>>>,
    answers: Arc<Mutex<AnswerLog>>,
    mastery: Arc<Mutex<BTreeMap<MasteryKey, MasteryNode>>>,
}

/// Ids keep increasing across deletes, like an `AUTOINCREMENT` column.
#[derive(Default)]
struct AnswerLog {
    last_id: i64,
    records: Vec<AnswerRecord>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

#[async_trait]
impl ItemRepository for InMemoryRepository {
    async fn upsert_item(&self, item: &Item) -> Result<(), StorageError> {
        lock(&self.items)?.insert(item.id(), item.clone());
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StorageError> {
        Ok(lock(&self.items)?.get(&id).cloned())
    }

    async fn find_items(&self, query: &ItemQuery<'_>) -> Result<Vec<Item>, StorageError> {
        let guard = lock(&self.items)?;
        Ok(guard.values().filter(|i| query.matches(i)).cloned().collect())
    }

    async fn distinct_topics(
        &self,
        subject: Option<SubjectId>,
        excluding: &AnsweredSet,
    ) -> Result<Vec<Topic>, StorageError> {
        let query = ItemQuery::new(excluding).subject(subject);
        let guard = lock(&self.items)?;
        let topics: BTreeSet<Topic> = guard
            .values()
            .filter(|i| query.matches(i))
            .map(|i| i.topic().clone())
            .collect();
        Ok(topics.into_iter().collect())
    }
}

#[async_trait]
impl AnswerLogRepository for InMemoryRepository {
    async fn append_answer(&self, record: &AnswerRecord) -> Result<i64, StorageError> {
        let mut guard = lock(&self.answers)?;
        let id = guard
            .last_id
            .checked_add(1)
            .ok_or_else(|| StorageError::Serialization("answer id overflow".into()))?;
        let mut stored = record.clone();
        stored.id = Some(id);
        guard.last_id = id;
        guard.records.push(stored);
        Ok(id)
    }

    async fn answered_item_ids(&self, learner_id: LearnerId) -> Result<AnsweredSet, StorageError> {
        let guard = lock(&self.answers)?;
        Ok(guard
            .records
            .iter()
            .filter(|r| r.learner_id == learner_id)
            .map(|r| r.item_id)
            .collect())
    }

    async fn answers_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<AnswerRecord>, StorageError> {
        let guard = lock(&self.answers)?;
        Ok(guard
            .records
            .iter()
            .filter(|r| r.learner_id == learner_id)
            .cloned()
            .collect())
    }

    async fn delete_answers_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<u64, StorageError> {
        let mut guard = lock(&self.answers)?;
        let before = guard.records.len();
        guard.records.retain(|r| r.learner_id != learner_id);
        Ok((before - guard.records.len()) as u64)
    }
}

#[async_trait]
impl MasteryRepository for InMemoryRepository {
    async fn get_node(&self, key: &MasteryKey) -> Result<Option<MasteryNode>, StorageError> {
        Ok(lock(&self.mastery)?.get(key).cloned())
    }

    async fn upsert_node(&self, node: &MasteryNode) -> Result<(), StorageError> {
        let expected = node.revision().checked_sub(1).ok_or(StorageError::Conflict)?;
        let mut guard = lock(&self.mastery)?;
        let stored = guard.get(node.key()).map_or(0, MasteryNode::revision);
        if stored != expected {
            return Err(StorageError::Conflict);
        }
        guard.insert(node.key().clone(), node.clone());
        Ok(())
    }

    async fn nodes_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<MasteryNode>, StorageError> {
        let guard = lock(&self.mastery)?;
        Ok(guard
            .values()
            .filter(|n| n.learner_id() == learner_id)
            .cloned()
            .collect())
    }

    async fn delete_nodes_for_learner(&self, learner_id: LearnerId) -> Result<u64, StorageError> {
        let mut guard = lock(&self.mastery)?;
        let before = guard.len();
        guard.retain(|key, _| key.learner_id != learner_id);
        Ok((before - guard.len()) as u64)
    }
}

/// Aggregates the three stores behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub items: Arc<dyn ItemRepository>,
    pub answers: Arc<dyn AnswerLogRepository>,
    pub mastery: Arc<dyn MasteryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let items: Arc<dyn ItemRepository> = Arc::new(repo.clone());
        let answers: Arc<dyn AnswerLogRepository> = Arc::new(repo.clone());
        let mastery: Arc<dyn MasteryRepository> = Arc::new(repo);
        Self {
            items,
            answers,
            mastery,
        }
    }
}

//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::ConfigError;
use practice_core::model::{DifficultyError, ItemId, Topic};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `MasteryTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MasteryError {
    #[error(transparent)]
    Invalid(#[from] practice_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `RiskPredictor`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RiskError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuestionSelector`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SelectionError {
    /// A topic-locked session names a topic with no items in scope.
    #[error("topic {topic} has no items to select from")]
    UnresolvableTopic { topic: Topic },
    #[error(transparent)]
    Band(#[from] DifficultyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PracticeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("item {0} not found")]
    ItemNotFound(ItemId),
    #[error(transparent)]
    Invalid(#[from] practice_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mastery(#[from] MasteryError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Risk(#[from] RiskError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

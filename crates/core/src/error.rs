use thiserror::Error;

use crate::config::ConfigError;
use crate::model::{AnswerError, DifficultyError, ItemError, MasteryNodeError, TopicError};

/// Any validation failure raised by the core model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Difficulty(#[from] DifficultyError),
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    MasteryNode(#[from] MasteryNodeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

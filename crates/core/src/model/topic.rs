use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic cannot be empty")]
    Empty,

    #[error("topic too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// Name of a syllabus topic (e.g. "Kinematics").
///
/// Always trimmed and non-empty. Topics compare by exact text; no case folding
/// is applied, so "Algebra" and "algebra" are different mastery keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    pub const MAX_LEN: usize = 200;

    /// Validate and build a topic name.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::Empty` for blank input and `TopicError::TooLong`
    /// when the trimmed text exceeds `Topic::MAX_LEN` characters.
    pub fn new(name: impl AsRef<str>) -> Result<Self, TopicError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TopicError::Empty);
        }
        let len = trimmed.chars().count();
        if len > Self::MAX_LEN {
            return Err(TopicError::TooLong {
                len,
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

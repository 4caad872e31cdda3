use serde::{Deserialize, Serialize};

use crate::model::{ids::AttemptId, topic::Topic};

/// How the next item should be chosen for a request.
///
/// Passed explicitly by the caller with every selection request; it is never
/// derived from quiz titles or other display text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionMode {
    /// Blend weak-area remediation with exploration.
    #[default]
    Adaptive,
    /// Practice or mock restricted to one topic, at exam-level difficulty.
    TopicLocked { topic: Topic },
    /// Draw only from the learner's weak areas; adaptive when there are none.
    FinalMock,
}

impl SelectionMode {
    /// Mock-style modes use the exam target difficulty and the wider band.
    #[must_use]
    pub fn is_override(&self) -> bool {
        !matches!(self, SelectionMode::Adaptive)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Adaptive => "adaptive",
            SelectionMode::TopicLocked { .. } => "topic_locked",
            SelectionMode::FinalMock => "final_mock",
        }
    }
}

/// Per-request context supplied by the caller. Not persisted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(flatten)]
    pub mode: SelectionMode,
    #[serde(default)]
    pub attempt_id: Option<AttemptId>,
}

impl SessionContext {
    #[must_use]
    pub fn adaptive() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topic_locked(topic: Topic) -> Self {
        Self {
            mode: SelectionMode::TopicLocked { topic },
            attempt_id: None,
        }
    }

    #[must_use]
    pub fn final_mock() -> Self {
        Self {
            mode: SelectionMode::FinalMock,
            attempt_id: None,
        }
    }

    #[must_use]
    pub fn with_attempt(mut self, attempt_id: AttemptId) -> Self {
        self.attempt_id = Some(attempt_id);
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

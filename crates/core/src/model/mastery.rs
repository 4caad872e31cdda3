use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    ids::{LearnerId, SubjectId},
    topic::Topic,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum MasteryNodeError {
    #[error("persisted strength must be finite and in [0, 1], got {provided}")]
    InvalidStrength { provided: f64 },

    #[error("persisted volatility must be finite, got {provided}")]
    InvalidVolatility { provided: f64 },

    #[error("persisted node revision must be >= 1")]
    InvalidRevision,
}

//
// ─── STRENGTH ──────────────────────────────────────────────────────────────────
//

/// Mastery estimate in `[0, 1]`.
///
/// Computed values are clamped into range; only persisted values are checked
/// strictly (see `MasteryNode::from_persisted`).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "f64", from = "f64")]
pub struct Strength(f64);

impl Strength {
    pub const MIN: Self = Self(0.0);
    pub const MAX: Self = Self(1.0);

    /// Clamp a computed value into `[0, 1]`. NaN maps to `0.0`.
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 1.0))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Strength {
    fn from(value: f64) -> Self {
        Self::clamped(value)
    }
}

impl From<Strength> for f64 {
    fn from(s: Strength) -> Self {
        s.0
    }
}

//
// ─── KEY ───────────────────────────────────────────────────────────────────────
//

/// Composite key of a mastery node: at most one node exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MasteryKey {
    pub learner_id: LearnerId,
    pub topic: Topic,
    pub subject: Option<SubjectId>,
}

impl MasteryKey {
    #[must_use]
    pub fn new(learner_id: LearnerId, topic: Topic, subject: Option<SubjectId>) -> Self {
        Self {
            learner_id,
            topic,
            subject,
        }
    }
}

//
// ─── NODE ──────────────────────────────────────────────────────────────────────
//

/// Per-(learner, topic, subject) mastery record.
///
/// `revision` counts applied updates. Stores accept revision `r` only on top of
/// revision `r - 1`, which turns concurrent read-modify-write races into
/// explicit conflicts.
#[derive(Debug, Clone, PartialEq)]
pub struct MasteryNode {
    key: MasteryKey,
    strength: Strength,
    volatility: f64,
    last_updated: DateTime<Utc>,
    revision: u64,
}

impl MasteryNode {
    /// A node that has never been persisted (revision 0).
    #[must_use]
    pub fn fresh(
        key: MasteryKey,
        initial_strength: Strength,
        volatility: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            strength: initial_strength,
            volatility,
            last_updated: now,
            revision: 0,
        }
    }

    /// Rehydrate a node from storage.
    ///
    /// # Errors
    ///
    /// Returns `MasteryNodeError` if the stored strength is out of range, the
    /// volatility is not finite, or the revision is zero.
    pub fn from_persisted(
        key: MasteryKey,
        strength: f64,
        volatility: f64,
        last_updated: DateTime<Utc>,
        revision: u64,
    ) -> Result<Self, MasteryNodeError> {
        if !strength.is_finite() || !(0.0..=1.0).contains(&strength) {
            return Err(MasteryNodeError::InvalidStrength { provided: strength });
        }
        if !volatility.is_finite() {
            return Err(MasteryNodeError::InvalidVolatility {
                provided: volatility,
            });
        }
        if revision == 0 {
            return Err(MasteryNodeError::InvalidRevision);
        }
        Ok(Self {
            key,
            strength: Strength(strength),
            volatility,
            last_updated,
            revision,
        })
    }

    /// Record a new strength and bump the revision.
    pub fn apply_strength(&mut self, strength: Strength, now: DateTime<Utc>) {
        self.strength = strength;
        self.last_updated = now;
        self.revision = self.revision.saturating_add(1);
    }

    #[must_use]
    pub fn key(&self) -> &MasteryKey {
        &self.key
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.key.learner_id
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.key.topic
    }

    #[must_use]
    pub fn subject(&self) -> Option<SubjectId> {
        self.key.subject
    }

    #[must_use]
    pub fn strength(&self) -> Strength {
        self.strength
    }

    /// Reserved; the current update rule never reads it.
    #[must_use]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Read projection used by mastery graph listings.
    #[must_use]
    pub fn to_entry(&self) -> MasteryEntry {
        MasteryEntry {
            topic: self.key.topic.clone(),
            subject: self.key.subject,
            strength: self.strength.value(),
        }
    }
}

/// One row of a learner's mastery graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryEntry {
    pub topic: Topic,
    pub subject: Option<SubjectId>,
    pub strength: f64,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::{
    difficulty::Difficulty,
    ids::{AttemptId, ItemId, LearnerId},
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("time taken must be finite and >= 0 seconds, got {provided}")]
    InvalidTimeTaken { provided: f64 },
}

//
// ─── ANSWER RECORD ─────────────────────────────────────────────────────────────
//

/// One entry of the append-only answer log.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub id: Option<i64>,
    pub learner_id: LearnerId,
    pub item_id: ItemId,
    pub attempt_id: Option<AttemptId>,
    pub selected_answer: String,
    pub is_correct: bool,
    pub time_taken_secs: f64,
    pub difficulty_at_time: Difficulty,
    pub answered_at: DateTime<Utc>,
}

impl AnswerRecord {
    /// # Errors
    ///
    /// Returns `AnswerError::InvalidTimeTaken` for a negative or non-finite
    /// `time_taken_secs`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        learner_id: LearnerId,
        item_id: ItemId,
        attempt_id: Option<AttemptId>,
        selected_answer: impl Into<String>,
        is_correct: bool,
        time_taken_secs: f64,
        difficulty_at_time: Difficulty,
        answered_at: DateTime<Utc>,
    ) -> Result<Self, AnswerError> {
        if !time_taken_secs.is_finite() || time_taken_secs < 0.0 {
            return Err(AnswerError::InvalidTimeTaken {
                provided: time_taken_secs,
            });
        }
        Ok(Self {
            id: None,
            learner_id,
            item_id,
            attempt_id,
            selected_answer: selected_answer.into(),
            is_correct,
            time_taken_secs,
            difficulty_at_time,
            answered_at,
        })
    }
}

//
// ─── ANSWERED SET ──────────────────────────────────────────────────────────────
//

/// Items a learner has already answered; used purely as an exclusion filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnsweredSet(BTreeSet<ItemId>);

impl AnsweredSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.0.contains(&id)
    }

    /// Returns `true` if the id was not yet present.
    pub fn insert(&mut self, id: ItemId) -> bool {
        self.0.insert(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ItemId> for AnsweredSet {
    fn from_iter<T: IntoIterator<Item = ItemId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn answered_set_deduplicates() {
        let mut set: AnsweredSet = [ItemId::new(2), ItemId::new(1), ItemId::new(2)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(ItemId::new(1)));
        assert!(!set.insert(ItemId::new(1)));
        assert!(set.insert(ItemId::new(3)));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![ItemId::new(1), ItemId::new(2), ItemId::new(3)]
        );
    }

    #[test]
    fn record_rejects_bad_time_taken() {
        let d = Difficulty::new(0.5).unwrap();
        let make = |secs: f64| {
            AnswerRecord::new(
                LearnerId::new(1),
                ItemId::new(1),
                None,
                "4",
                true,
                secs,
                d,
                fixed_now(),
            )
        };

        assert!(matches!(
            make(-3.0),
            Err(AnswerError::InvalidTimeTaken { provided }) if provided == -3.0
        ));
        assert!(make(f64::NAN).is_err());
        assert!(make(f64::INFINITY).is_err());

        let rec = make(0.0).unwrap();
        assert_eq!(rec.time_taken_secs, 0.0);
        assert_eq!(rec.id, None);
    }
}

use serde::Serialize;

use practice_core::model::{AnswerRecord, MasteryNode, Topic};
use practice_core::numeric::{percentage, round_to};

/// Accuracy above which a learner counts as intermediate.
const INTERMEDIATE_ACCURACY_PCT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    Beginner,
    Intermediate,
}

/// Headline numbers for a learner's dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerStats {
    pub total_answers: usize,
    /// One decimal.
    pub accuracy_pct: f64,
    pub strongest_topic: Option<Topic>,
    pub weakest_topic: Option<Topic>,
    pub level: Level,
}

#[must_use]
pub fn learner_stats(answers: &[AnswerRecord], nodes: &[MasteryNode]) -> LearnerStats {
    let correct = answers.iter().filter(|a| a.is_correct).count();
    let accuracy_pct = round_to(percentage(correct, answers.len()), 1);

    // First node wins ties; nodes arrive ordered by topic.
    let strongest = nodes.iter().reduce(|best, n| {
        if n.strength().value() > best.strength().value() {
            n
        } else {
            best
        }
    });
    let weakest = nodes.iter().reduce(|worst, n| {
        if n.strength().value() < worst.strength().value() {
            n
        } else {
            worst
        }
    });

    LearnerStats {
        total_answers: answers.len(),
        accuracy_pct,
        strongest_topic: strongest.map(|n| n.topic().clone()),
        weakest_topic: weakest.map(|n| n.topic().clone()),
        level: if accuracy_pct > INTERMEDIATE_ACCURACY_PCT {
            Level::Intermediate
        } else {
            Level::Beginner
        },
    }
}

//! Asymmetric, gap-weighted mastery update.
//!
//! A correct answer moves strength up by `lr * (1 + gap)` where `gap` is how
//! much harder the item was than the current mastery. A wrong answer moves it
//! down by `lr * (1 + gap)` where `gap` is how much easier the item was.
//! Expected outcomes therefore move strength by exactly `lr`; surprising ones
//! move it further.

use crate::config::MasteryConfig;
use crate::model::{Difficulty, Strength};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryRule {
    learning_rate: f64,
}

impl MasteryRule {
    #[must_use]
    pub fn new(config: &MasteryConfig) -> Self {
        Self {
            learning_rate: config.learning_rate(),
        }
    }

    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Strength after one answer at the given item difficulty.
    #[must_use]
    pub fn next_strength(
        &self,
        current: Strength,
        is_correct: bool,
        difficulty: Difficulty,
    ) -> Strength {
        let s = current.value();
        let d = difficulty.value();
        if is_correct {
            let gap = (d - s).max(0.0);
            Strength::clamped((s + self.learning_rate * (1.0 + gap)).min(1.0))
        } else {
            let gap = (s - d).max(0.0);
            Strength::clamped((s - self.learning_rate * (1.0 + gap)).max(0.0))
        }
    }
}

impl Default for MasteryRule {
    fn default() -> Self {
        Self::new(&MasteryConfig::default())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::round_to;
    use proptest::prelude::*;

    fn d(v: f64) -> Difficulty {
        Difficulty::new(v).unwrap()
    }

    #[test]
    fn hard_item_solved_earns_gap_bonus() {
        let rule = MasteryRule::default();
        let next = rule.next_strength(Strength::clamped(0.5), true, d(0.8));
        assert_eq!(round_to(next.value(), 2), 0.63);
    }

    #[test]
    fn easy_item_missed_costs_gap_penalty() {
        let rule = MasteryRule::default();
        let next = rule.next_strength(Strength::clamped(0.5), false, d(0.2));
        assert_eq!(round_to(next.value(), 2), 0.37);
    }

    #[test]
    fn expected_outcomes_move_by_learning_rate() {
        let rule = MasteryRule::default();
        let up = rule.next_strength(Strength::clamped(0.5), true, d(0.3));
        assert!((up.value() - 0.6).abs() < 1e-12);
        let down = rule.next_strength(Strength::clamped(0.5), false, d(0.9));
        assert!((down.value() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn result_is_capped_at_both_ends() {
        let rule = MasteryRule::default();
        assert_eq!(rule.next_strength(Strength::MAX, true, d(1.0)), Strength::MAX);
        assert_eq!(rule.next_strength(Strength::MIN, false, d(0.0)), Strength::MIN);
        assert_eq!(
            rule.next_strength(Strength::clamped(0.95), true, d(1.0)),
            Strength::MAX
        );
    }

    #[test]
    fn repeated_success_converges_to_full_mastery() {
        let rule = MasteryRule::default();
        let mut s = Strength::clamped(0.1);
        for _ in 0..20 {
            let target = Difficulty::new(s.value()).unwrap();
            s = rule.next_strength(s, true, target);
        }
        assert_eq!(s, Strength::MAX);
    }

    #[test]
    fn repeated_failure_converges_to_zero() {
        let rule = MasteryRule::default();
        let mut s = Strength::clamped(0.9);
        for _ in 0..20 {
            let target = Difficulty::new(s.value()).unwrap();
            s = rule.next_strength(s, false, target);
        }
        assert_eq!(s, Strength::MIN);
    }

    proptest! {
        #[test]
        fn correct_at_or_above_mastery_gains_at_least_lr(
            current in 0.0f64..=1.0,
            above in 0.0f64..=1.0,
        ) {
            let rule = MasteryRule::default();
            let difficulty = current + (1.0 - current) * above;
            let next = rule
                .next_strength(Strength::clamped(current), true, d(difficulty.min(1.0)))
                .value();
            prop_assert!(next <= 1.0);
            prop_assert!(next + 1e-12 >= (current + 0.1).min(1.0));
            if current < 1.0 {
                prop_assert!(next > current);
            }
        }

        #[test]
        fn incorrect_below_mastery_loses_at_least_lr(
            current in 0.0f64..=1.0,
            below in 0.0f64..1.0,
        ) {
            let rule = MasteryRule::default();
            let difficulty = current * below;
            let next = rule
                .next_strength(Strength::clamped(current), false, d(difficulty))
                .value();
            prop_assert!(next >= 0.0);
            prop_assert!(next <= (current - 0.1).max(0.0) + 1e-12);
            if current > 0.0 {
                prop_assert!(next < current);
            }
        }

        #[test]
        fn result_always_in_unit_range(
            current in 0.0f64..=1.0,
            difficulty in 0.0f64..=1.0,
            correct in any::<bool>(),
        ) {
            let rule = MasteryRule::default();
            let next = rule
                .next_strength(Strength::clamped(current), correct, d(difficulty))
                .value();
            prop_assert!((0.0..=1.0).contains(&next));
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::model::{MasteryNode, SubjectId, Topic};
use crate::numeric::round_to;

/// Coarse risk label of a weak area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Critical,
    Moderate,
}

impl RiskLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::Moderate => "MODERATE",
        }
    }
}

/// A topic ranked by how likely the learner is to fail it next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakArea {
    pub topic: Topic,
    pub subject: Option<SubjectId>,
    /// Strength as a percentage, one decimal.
    pub mastery_pct: f64,
    pub risk_level: RiskLevel,
    /// Heuristic, two decimals, never above the configured cap.
    pub predicted_fail_probability: f64,
}

/// Rank nodes by ascending strength and keep the first `top_n`.
///
/// Ties are broken by topic then subject so that the ranking is stable across
/// storage backends.
#[must_use]
pub fn rank_weak_areas(nodes: &[MasteryNode], top_n: usize, config: &RiskConfig) -> Vec<WeakArea> {
    let mut ordered: Vec<&MasteryNode> = nodes.iter().collect();
    ordered.sort_by(|a, b| {
        a.strength()
            .value()
            .total_cmp(&b.strength().value())
            .then_with(|| a.topic().cmp(b.topic()))
            .then_with(|| a.subject().cmp(&b.subject()))
    });

    ordered
        .into_iter()
        .take(top_n)
        .map(|node| assess(node, config))
        .collect()
}

fn assess(node: &MasteryNode, config: &RiskConfig) -> WeakArea {
    let strength = node.strength().value();
    let risk_level = if strength < config.critical_threshold() {
        RiskLevel::Critical
    } else {
        RiskLevel::Moderate
    };
    WeakArea {
        topic: node.topic().clone(),
        subject: node.subject(),
        mastery_pct: round_to(strength * 100.0, 1),
        risk_level,
        predicted_fail_probability: round_to((1.0 - strength) * config.fail_probability_cap(), 2),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

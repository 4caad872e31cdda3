#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod model;
pub mod numeric;
pub mod risk;
pub mod rule;
pub mod time;

pub use config::{AdaptiveConfig, ConfigError, MasteryConfig, RiskConfig, SelectionConfig};
pub use error::Error;
pub use risk::{RiskLevel, WeakArea, rank_weak_areas};
pub use rule::MasteryRule;
pub use time::Clock;

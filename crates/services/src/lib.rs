#![forbid(unsafe_code)]

pub mod analytics;
pub mod error;
pub mod mastery_tracker;
pub mod practice_service;
pub mod question_selector;
pub mod random;
pub mod risk_predictor;

pub use practice_core::Clock;

pub use analytics::{LearnerStats, Level};
pub use error::{MasteryError, PracticeError, RiskError, SelectionError};
pub use mastery_tracker::MasteryTracker;
pub use practice_service::{AnswerFeedback, Dashboard, PracticeService, ResetSummary};
pub use question_selector::{QuestionSelector, SelectedItem, SelectionReason};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use risk_predictor::RiskPredictor;

mod answer;
mod difficulty;
mod ids;
mod item;
mod mastery;
mod session;
mod topic;

pub use ids::{AttemptId, ItemId, LearnerId, ParseIdError, SubjectId};

pub use answer::{AnswerError, AnswerRecord, AnsweredSet};
pub use difficulty::{Difficulty, DifficultyBand, DifficultyError};
pub use item::{Item, ItemDraft, ItemError};
pub use mastery::{MasteryEntry, MasteryKey, MasteryNode, MasteryNodeError, Strength};
pub use session::{SelectionMode, SessionContext};
pub use topic::{Topic, TopicError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    difficulty::{Difficulty, DifficultyError},
    ids::{ItemId, SubjectId},
    topic::{Topic, TopicError},
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ItemError {
    #[error("invalid topic: {0}")]
    Topic(#[source] TopicError),

    #[error("invalid difficulty: {0}")]
    Difficulty(#[source] DifficultyError),

    #[error("item content cannot be empty")]
    EmptyContent,

    #[error("an item needs at least two options, got {count}")]
    TooFewOptions { count: usize },

    #[error("correct answer is not one of the options")]
    AnswerNotInOptions,

    #[error("exam weight must be finite and > 0, got {provided}")]
    InvalidWeight { provided: f64 },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated item as produced by an importer or seeder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub topic: String,
    #[serde(default)]
    pub subject: Option<SubjectId>,
    #[serde(default)]
    pub subtopic: Option<String>,
    pub difficulty: f64,
    pub content: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub pyq_year: Option<u16>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl ItemDraft {
    /// Minimal draft with a topic, difficulty, prompt and options; the first
    /// option is the correct answer.
    #[must_use]
    pub fn multiple_choice(
        topic: impl Into<String>,
        difficulty: f64,
        content: impl Into<String>,
        options: &[&str],
    ) -> Self {
        let options: Vec<String> = options.iter().map(|o| (*o).to_owned()).collect();
        Self {
            topic: topic.into(),
            subject: None,
            subtopic: None,
            difficulty,
            content: content.into(),
            correct_answer: options.first().cloned().unwrap_or_default(),
            options,
            explanation: None,
            pyq_year: None,
            weight: default_weight(),
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: SubjectId) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Validate the draft and attach its identifier.
    ///
    /// # Errors
    ///
    /// Returns `ItemError` when the topic, difficulty, content, options or
    /// weight are invalid.
    pub fn validate(self, id: ItemId) -> Result<Item, ItemError> {
        let topic = Topic::new(&self.topic).map_err(ItemError::Topic)?;
        let difficulty = Difficulty::new(self.difficulty).map_err(ItemError::Difficulty)?;

        if self.content.trim().is_empty() {
            return Err(ItemError::EmptyContent);
        }
        if self.options.len() < 2 {
            return Err(ItemError::TooFewOptions {
                count: self.options.len(),
            });
        }
        if !self.options.iter().any(|o| o == &self.correct_answer) {
            return Err(ItemError::AnswerNotInOptions);
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(ItemError::InvalidWeight {
                provided: self.weight,
            });
        }

        let subtopic = self
            .subtopic
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty());

        Ok(Item {
            id,
            topic,
            subject: self.subject,
            subtopic,
            difficulty,
            content: self.content,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
            pyq_year: self.pyq_year,
            weight: self.weight,
        })
    }
}

//
// ─── ITEM ──────────────────────────────────────────────────────────────────────
//

/// A practice question. Read-only for the adaptive core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    id: ItemId,
    topic: Topic,
    subject: Option<SubjectId>,
    subtopic: Option<String>,
    difficulty: Difficulty,
    content: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: Option<String>,
    pyq_year: Option<u16>,
    weight: f64,
}

impl Item {
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn subject(&self) -> Option<SubjectId> {
        self.subject
    }

    #[must_use]
    pub fn subtopic(&self) -> Option<&str> {
        self.subtopic.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Previous-year-question tag. Metadata only.
    #[must_use]
    pub fn pyq_year(&self) -> Option<u16> {
        self.pyq_year
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Exact comparison against the stored answer.
    #[must_use]
    pub fn is_correct(&self, selected: &str) -> bool {
        self.correct_answer == selected
    }

    /// Convert back into a draft, e.g. for persistence adapters.
    #[must_use]
    pub fn to_draft(&self) -> ItemDraft {
        ItemDraft {
            topic: self.topic.as_str().to_owned(),
            subject: self.subject,
            subtopic: self.subtopic.clone(),
            difficulty: self.difficulty.value(),
            content: self.content.clone(),
            options: self.options.clone(),
            correct_answer: self.correct_answer.clone(),
            explanation: self.explanation.clone(),
            pyq_year: self.pyq_year,
            weight: self.weight,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

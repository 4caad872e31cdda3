use chrono::{DateTime, Utc};
use practice_core::model::{
    AnswerRecord, AttemptId, Difficulty, Item, ItemDraft, ItemId, LearnerId, MasteryKey,
    MasteryNode, SubjectId, Topic,
};
use sqlx::Row;

use crate::repository::StorageError;

/// Stored in place of a missing subject so `(learner, topic, subject)` stays a total key.
pub(crate) const NO_SUBJECT_KEY: i64 = -1;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn subject_key(subject: Option<SubjectId>) -> Result<i64, StorageError> {
    subject.map_or(Ok(NO_SUBJECT_KEY), |s| u64_to_i64("subject_id", s.value()))
}

fn subject_from_key(v: i64) -> Result<Option<SubjectId>, StorageError> {
    if v == NO_SUBJECT_KEY {
        return Ok(None);
    }
    Ok(Some(SubjectId::new(i64_to_u64("subject_id", v)?)))
}

pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn map_item_row(row: &sqlx::sqlite::SqliteRow) -> Result<Item, StorageError> {
    let id = ItemId::new(i64_to_u64("item_id", row.try_get("id").map_err(ser)?)?);
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<String> = serde_json::from_str(&options_json).map_err(ser)?;

    let pyq_year = row
        .try_get::<Option<i64>, _>("pyq_year")
        .map_err(ser)?
        .map(|y| {
            u16::try_from(y).map_err(|_| StorageError::Serialization(format!("invalid pyq_year: {y}")))
        })
        .transpose()?;

    let subject = row
        .try_get::<Option<i64>, _>("subject_id")
        .map_err(ser)?
        .map(|s| i64_to_u64("subject_id", s).map(SubjectId::new))
        .transpose()?;

    let draft = ItemDraft {
        topic: row.try_get("topic").map_err(ser)?,
        subject,
        subtopic: row.try_get("subtopic").map_err(ser)?,
        difficulty: row.try_get("difficulty").map_err(ser)?,
        content: row.try_get("content").map_err(ser)?,
        options,
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
        pyq_year,
        weight: row.try_get("weight").map_err(ser)?,
    };

    draft.validate(id).map_err(ser)
}

pub(crate) fn map_answer_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AnswerRecord, StorageError> {
    let answered_at: DateTime<Utc> = row.try_get("answered_at").map_err(ser)?;
    let difficulty =
        Difficulty::new(row.try_get("difficulty_at_time").map_err(ser)?).map_err(ser)?;
    let attempt_id = row
        .try_get::<Option<i64>, _>("attempt_id")
        .map_err(ser)?
        .map(|a| i64_to_u64("attempt_id", a).map(AttemptId::new))
        .transpose()?;

    let mut record = AnswerRecord::new(
        LearnerId::new(i64_to_u64("learner_id", row.try_get("learner_id").map_err(ser)?)?),
        ItemId::new(i64_to_u64("item_id", row.try_get("item_id").map_err(ser)?)?),
        attempt_id,
        row.try_get::<String, _>("selected_answer").map_err(ser)?,
        row.try_get::<bool, _>("is_correct").map_err(ser)?,
        row.try_get("time_taken_secs").map_err(ser)?,
        difficulty,
        answered_at,
    )
    .map_err(ser)?;
    record.id = Some(row.try_get("id").map_err(ser)?);
    Ok(record)
}

pub(crate) fn map_node_row(row: &sqlx::sqlite::SqliteRow) -> Result<MasteryNode, StorageError> {
    let topic = Topic::new(row.try_get::<String, _>("topic").map_err(ser)?).map_err(ser)?;
    let key = MasteryKey::new(
        LearnerId::new(i64_to_u64("learner_id", row.try_get("learner_id").map_err(ser)?)?),
        topic,
        subject_from_key(row.try_get("subject_key").map_err(ser)?)?,
    );
    let revision = i64_to_u64("revision", row.try_get("revision").map_err(ser)?)?;

    MasteryNode::from_persisted(
        key,
        row.try_get("strength").map_err(ser)?,
        row.try_get("volatility").map_err(ser)?,
        row.try_get("last_updated").map_err(ser)?,
        revision,
    )
    .map_err(ser)
}

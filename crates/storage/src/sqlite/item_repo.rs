use practice_core::model::{AnsweredSet, Item, ItemId, SubjectId, Topic};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{conn, map_item_row, options_to_json, ser, u64_to_i64},
};
use crate::repository::{ItemQuery, ItemRepository, StorageError};

const ITEM_COLUMNS: &str = r"
    id, topic, subject_id, subtopic, difficulty, content, options,
    correct_answer, explanation, pyq_year, weight
";

enum Param {
    Int(i64),
    Real(f64),
    Text(String),
}

/// Accumulates `WHERE` clauses with numbered placeholders.
#[derive(Default)]
struct Filter {
    clauses: Vec<String>,
    params: Vec<Param>,
}

impl Filter {
    fn placeholder(&mut self, param: Param) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    fn push(&mut self, column: &str, op: &str, param: Param) {
        let p = self.placeholder(param);
        self.clauses.push(format!("{column} {op} {p}"));
    }

    /// Binds the whole set as one JSON array so large histories stay under
    /// SQLite's bind-variable limit.
    fn exclude_ids(&mut self, excluding: &AnsweredSet) -> Result<(), StorageError> {
        if excluding.is_empty() {
            return Ok(());
        }
        let ids = excluding
            .iter()
            .map(|id| u64_to_i64("item_id", id.value()))
            .collect::<Result<Vec<_>, _>>()?;
        let json = serde_json::to_string(&ids).map_err(ser)?;
        let p = self.placeholder(Param::Text(json));
        self.clauses
            .push(format!("id NOT IN (SELECT value FROM json_each({p}))"));
        Ok(())
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn bind<'q>(
        &'q self,
        mut q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        for param in &self.params {
            q = match param {
                Param::Int(v) => q.bind(*v),
                Param::Real(v) => q.bind(*v),
                Param::Text(v) => q.bind(v.as_str()),
            };
        }
        q
    }
}

fn base_filter(
    subject: Option<SubjectId>,
    excluding: &AnsweredSet,
) -> Result<Filter, StorageError> {
    let mut filter = Filter::default();
    if let Some(subject) = subject {
        filter.push(
            "subject_id",
            "=",
            Param::Int(u64_to_i64("subject_id", subject.value())?),
        );
    }
    filter.exclude_ids(excluding)?;
    Ok(filter)
}

#[async_trait::async_trait]
impl ItemRepository for SqliteRepository {
    async fn upsert_item(&self, item: &Item) -> Result<(), StorageError> {
        let subject = item
            .subject()
            .map(|s| u64_to_i64("subject_id", s.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO items (
                id, topic, subject_id, subtopic, difficulty, content, options,
                correct_answer, explanation, pyq_year, weight
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                topic = excluded.topic,
                subject_id = excluded.subject_id,
                subtopic = excluded.subtopic,
                difficulty = excluded.difficulty,
                content = excluded.content,
                options = excluded.options,
                correct_answer = excluded.correct_answer,
                explanation = excluded.explanation,
                pyq_year = excluded.pyq_year,
                weight = excluded.weight
            ",
        )
        .bind(u64_to_i64("item_id", item.id().value())?)
        .bind(item.topic().as_str())
        .bind(subject)
        .bind(item.subtopic())
        .bind(item.difficulty().value())
        .bind(item.content())
        .bind(options_to_json(item.options())?)
        .bind(item.correct_answer())
        .bind(item.explanation())
        .bind(item.pyq_year().map(i64::from))
        .bind(item.weight())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StorageError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(u64_to_i64("item_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_item_row).transpose()
    }

    async fn find_items(&self, query: &ItemQuery<'_>) -> Result<Vec<Item>, StorageError> {
        let mut filter = base_filter(query.subject, query.excluding)?;
        if let Some(topic) = query.topic {
            filter.push("topic", "=", Param::Text(topic.as_str().to_owned()));
        }
        if let Some(band) = query.band {
            filter.push("difficulty", ">=", Param::Real(band.min()));
            filter.push("difficulty", "<=", Param::Real(band.max()));
        }

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items {} ORDER BY id ASC",
            filter.where_sql()
        );
        let rows = filter
            .bind(sqlx::query(&sql))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(map_item_row(&row)?);
        }
        tracing::debug!(count = items.len(), "items matched query");
        Ok(items)
    }

    async fn distinct_topics(
        &self,
        subject: Option<SubjectId>,
        excluding: &AnsweredSet,
    ) -> Result<Vec<Topic>, StorageError> {
        let filter = base_filter(subject, excluding)?;
        let sql = format!(
            "SELECT DISTINCT topic FROM items {} ORDER BY topic ASC",
            filter.where_sql()
        );
        let rows = filter
            .bind(sqlx::query(&sql))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("topic").map_err(ser)?;
            topics.push(Topic::new(name).map_err(ser)?);
        }
        Ok(topics)
    }
}

//! Article repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over `articles` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Article::validate()` before SQL mutations.
//! - Deleting an article removes its feedback in the same statement via the
//!   `ON DELETE CASCADE` foreign key.
//! - List order is `created_at DESC, uuid ASC`.

use crate::model::article::{Article, ArticleId, StructureType, Theme};
use crate::model::feedback::FeedbackId;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ARTICLE_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    content,
    original_memo,
    theme,
    experience_ratio,
    casualness_level,
    structure_type,
    created_at,
    updated_at
FROM articles";

/// Read model for article list/detail use-cases.
///
/// Carries store-managed timestamps and the owned feedback collection, which
/// the write model never sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub uuid: ArticleId,
    pub title: String,
    pub content: String,
    pub original_memo: String,
    pub theme: Theme,
    pub experience_ratio: f64,
    pub casualness_level: i64,
    pub structure_type: StructureType,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Update timestamp in epoch milliseconds.
    pub updated_at: i64,
    /// Feedback entries sorted by `created_at ASC, uuid ASC`.
    pub feedbacks: Vec<FeedbackRecord>,
}

/// Read model for one feedback entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub uuid: FeedbackId,
    pub article_uuid: ArticleId,
    pub rating: i64,
    pub comment: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Query options for listing articles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleListQuery {
    /// Optional exact theme filter.
    pub theme: Option<Theme>,
    /// Maximum rows to return; `None` returns everything.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Repository interface for article CRUD operations.
pub trait ArticleRepository {
    fn create_article(&self, article: &Article) -> RepoResult<ArticleId>;
    fn update_article(&self, article: &Article) -> RepoResult<()>;
    fn get_article(&self, id: ArticleId) -> RepoResult<Option<ArticleRecord>>;
    fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<Vec<ArticleRecord>>;
    /// Deletes the article and, through the cascade, all of its feedback.
    fn delete_article(&self, id: ArticleId) -> RepoResult<()>;
}

/// SQLite-backed article repository.
pub struct SqliteArticleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArticleRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ArticleRepository for SqliteArticleRepository<'_> {
    fn create_article(&self, article: &Article) -> RepoResult<ArticleId> {
        article.validate()?;

        self.conn.execute(
            "INSERT INTO articles (
                uuid,
                title,
                content,
                original_memo,
                theme,
                experience_ratio,
                casualness_level,
                structure_type
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                article.uuid.to_string(),
                article.title.as_str(),
                article.content.as_str(),
                article.original_memo.as_str(),
                theme_to_db(article.theme),
                article.experience_ratio,
                article.casualness_level,
                structure_type_to_db(article.structure_type),
            ],
        )?;

        Ok(article.uuid)
    }

    fn update_article(&self, article: &Article) -> RepoResult<()> {
        article.validate()?;

        let changed = self.conn.execute(
            "UPDATE articles
             SET
                title = ?1,
                content = ?2,
                original_memo = ?3,
                theme = ?4,
                experience_ratio = ?5,
                casualness_level = ?6,
                structure_type = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?8;",
            params![
                article.title.as_str(),
                article.content.as_str(),
                article.original_memo.as_str(),
                theme_to_db(article.theme),
                article.experience_ratio,
                article.casualness_level,
                structure_type_to_db(article.structure_type),
                article.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::ArticleNotFound(article.uuid));
        }

        Ok(())
    }

    fn get_article(&self, id: ArticleId) -> RepoResult<Option<ArticleRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_article_row(self.conn, row)?));
        }

        Ok(None)
    }

    fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<Vec<ArticleRecord>> {
        let mut sql = format!("{ARTICLE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(theme) = query.theme {
            sql.push_str(" AND theme = ?");
            bind_values.push(Value::Text(theme_to_db(theme).to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut articles = Vec::new();

        while let Some(row) = rows.next()? {
            articles.push(parse_article_row(self.conn, row)?);
        }

        Ok(articles)
    }

    fn delete_article(&self, id: ArticleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM articles WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::ArticleNotFound(id));
        }

        Ok(())
    }
}

pub(crate) fn parse_article_row(conn: &Connection, row: &Row<'_>) -> RepoResult<ArticleRecord> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "articles.uuid")?;

    let theme_text: String = row.get("theme")?;
    let theme = parse_theme(&theme_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid theme `{theme_text}` in articles.theme"))
    })?;

    let structure_text: String = row.get("structure_type")?;
    let structure_type = parse_structure_type(&structure_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid structure type `{structure_text}` in articles.structure_type"
        ))
    })?;

    let feedbacks = load_feedback_for_article(conn, &uuid_text)?;

    let record = ArticleRecord {
        uuid,
        title: row.get("title")?,
        content: row.get("content")?,
        original_memo: row.get("original_memo")?,
        theme,
        experience_ratio: row.get("experience_ratio")?,
        casualness_level: row.get("casualness_level")?,
        structure_type,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        feedbacks,
    };

    let article = Article {
        uuid: record.uuid,
        title: record.title.clone(),
        content: record.content.clone(),
        original_memo: record.original_memo.clone(),
        theme: record.theme,
        experience_ratio: record.experience_ratio,
        casualness_level: record.casualness_level,
        structure_type: record.structure_type,
    };
    article.validate()?;

    Ok(record)
}

pub(crate) fn load_feedback_for_article(
    conn: &Connection,
    article_uuid: &str,
) -> RepoResult<Vec<FeedbackRecord>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, article_uuid, rating, comment, created_at, updated_at
         FROM feedbacks
         WHERE article_uuid = ?1
         ORDER BY created_at ASC, uuid ASC;",
    )?;
    let mut rows = stmt.query([article_uuid])?;
    let mut feedbacks = Vec::new();
    while let Some(row) = rows.next()? {
        feedbacks.push(parse_feedback_row(row)?);
    }
    Ok(feedbacks)
}

pub(crate) fn parse_feedback_row(row: &Row<'_>) -> RepoResult<FeedbackRecord> {
    let uuid_text: String = row.get("uuid")?;
    let article_uuid_text: String = row.get("article_uuid")?;

    Ok(FeedbackRecord {
        uuid: parse_uuid(&uuid_text, "feedbacks.uuid")?,
        article_uuid: parse_uuid(&article_uuid_text, "feedbacks.article_uuid")?,
        rating: row.get("rating")?,
        comment: row.get("comment")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn parse_uuid(value: &str, source_column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{value}` in {source_column}"))
    })
}

pub(crate) fn theme_to_db(theme: Theme) -> &'static str {
    match theme {
        Theme::Coaching => "coaching",
        Theme::SelfCompassion => "self_compassion",
    }
}

pub(crate) fn parse_theme(value: &str) -> Option<Theme> {
    match value {
        "coaching" => Some(Theme::Coaching),
        "self_compassion" => Some(Theme::SelfCompassion),
        _ => None,
    }
}

pub(crate) fn structure_type_to_db(structure_type: StructureType) -> &'static str {
    match structure_type {
        StructureType::Kishotenketsu => "kishotenketsu",
        StructureType::Standard => "standard",
    }
}

pub(crate) fn parse_structure_type(value: &str) -> Option<StructureType> {
    match value {
        "kishotenketsu" => Some(StructureType::Kishotenketsu),
        "standard" => Some(StructureType::Standard),
        _ => None,
    }
}

//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must enforce model `validate()` before persistence.
//! - Repository APIs return semantic errors (`ArticleNotFound`,
//!   `FeedbackNotFound`) in addition to DB transport errors.
//! - Read paths must reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::article::{ArticleId, ArticleValidationError};
use crate::model::feedback::{FeedbackId, FeedbackValidationError};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod analytics_repo;
pub mod article_repo;
pub mod feedback_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for article/feedback persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    InvalidArticle(ArticleValidationError),
    InvalidFeedback(FeedbackValidationError),
    Db(DbError),
    ArticleNotFound(ArticleId),
    FeedbackNotFound(FeedbackId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArticle(err) => write!(f, "{err}"),
            Self::InvalidFeedback(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::ArticleNotFound(id) => write!(f, "article not found: {id}"),
            Self::FeedbackNotFound(id) => write!(f, "feedback not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is behind expected {expected_version}; run migrations first"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArticle(err) => Some(err),
            Self::InvalidFeedback(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ArticleValidationError> for RepoError {
    fn from(value: ArticleValidationError) -> Self {
        Self::InvalidArticle(value)
    }
}

impl From<FeedbackValidationError> for RepoError {
    fn from(value: FeedbackValidationError) -> Self {
        Self::InvalidFeedback(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "articles",
        &[
            "uuid",
            "title",
            "content",
            "original_memo",
            "theme",
            "experience_ratio",
            "casualness_level",
            "structure_type",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "feedbacks",
        &[
            "uuid",
            "article_uuid",
            "rating",
            "comment",
            "created_at",
            "updated_at",
        ],
    ),
];

/// Rejects connections that were not bootstrapped through `db::open_db`.
///
/// Repositories call this once at construction so later query failures are
/// semantic, not schema drift.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

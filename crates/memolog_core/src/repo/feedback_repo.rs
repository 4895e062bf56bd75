//! Feedback repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide feedback persistence APIs scoped to a parent article.
//!
//! # Invariants
//! - Creating feedback for a missing article fails with `ArticleNotFound`
//!   before the insert is attempted.
//! - Update/delete operations are scoped by `(article_uuid, uuid)` so a
//!   feedback entry cannot be reached through a foreign article.

use crate::model::article::ArticleId;
use crate::model::feedback::{Feedback, FeedbackId};
use crate::repo::article_repo::{parse_feedback_row, FeedbackRecord};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection};

/// Repository interface for feedback CRUD operations.
pub trait FeedbackRepository {
    fn create_feedback(&self, feedback: &Feedback) -> RepoResult<FeedbackId>;
    fn update_feedback(&self, feedback: &Feedback) -> RepoResult<()>;
    fn get_feedback(
        &self,
        article_uuid: ArticleId,
        id: FeedbackId,
    ) -> RepoResult<Option<FeedbackRecord>>;
    fn list_feedback_for_article(&self, article_uuid: ArticleId) -> RepoResult<Vec<FeedbackRecord>>;
    fn delete_feedback(&self, article_uuid: ArticleId, id: FeedbackId) -> RepoResult<()>;
}

/// SQLite-backed feedback repository.
pub struct SqliteFeedbackRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFeedbackRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn article_exists(&self, article_uuid: ArticleId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE uuid = ?1);",
            [article_uuid.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl FeedbackRepository for SqliteFeedbackRepository<'_> {
    fn create_feedback(&self, feedback: &Feedback) -> RepoResult<FeedbackId> {
        feedback.validate()?;

        if !self.article_exists(feedback.article_uuid)? {
            return Err(RepoError::ArticleNotFound(feedback.article_uuid));
        }

        self.conn.execute(
            "INSERT INTO feedbacks (uuid, article_uuid, rating, comment)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                feedback.uuid.to_string(),
                feedback.article_uuid.to_string(),
                feedback.rating,
                feedback.comment.as_str(),
            ],
        )?;

        Ok(feedback.uuid)
    }

    fn update_feedback(&self, feedback: &Feedback) -> RepoResult<()> {
        feedback.validate()?;

        let changed = self.conn.execute(
            "UPDATE feedbacks
             SET
                rating = ?1,
                comment = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?3
               AND article_uuid = ?4;",
            params![
                feedback.rating,
                feedback.comment.as_str(),
                feedback.uuid.to_string(),
                feedback.article_uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::FeedbackNotFound(feedback.uuid));
        }

        Ok(())
    }

    fn get_feedback(
        &self,
        article_uuid: ArticleId,
        id: FeedbackId,
    ) -> RepoResult<Option<FeedbackRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, article_uuid, rating, comment, created_at, updated_at
             FROM feedbacks
             WHERE uuid = ?1
               AND article_uuid = ?2;",
        )?;

        let mut rows = stmt.query(params![id.to_string(), article_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_feedback_row(row)?));
        }

        Ok(None)
    }

    fn list_feedback_for_article(
        &self,
        article_uuid: ArticleId,
    ) -> RepoResult<Vec<FeedbackRecord>> {
        crate::repo::article_repo::load_feedback_for_article(
            self.conn,
            &article_uuid.to_string(),
        )
    }

    fn delete_feedback(&self, article_uuid: ArticleId, id: FeedbackId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM feedbacks
             WHERE uuid = ?1
               AND article_uuid = ?2;",
            params![id.to_string(), article_uuid.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::FeedbackNotFound(id));
        }

        Ok(())
    }
}

//! Read-only aggregate queries for rating analysis.
//!
//! # Responsibility
//! - Provide the grouped averages and corpus counts the learning analyzer
//!   consumes, without exposing SQL to the service layer.
//!
//! # Invariants
//! - Grouping keys with no rows are absent from returned distributions,
//!   never present with a null average.
//! - Distributions are returned in ascending key order so downstream
//!   best-value reductions tie-break deterministically.
//! - This repository never mutates storage.

use crate::model::article::{StructureType, Theme};
use crate::repo::article_repo::{
    parse_article_row, parse_structure_type, theme_to_db, ArticleRecord,
};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::Connection;

/// Joined feedback statistics for one theme.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeFeedbackStats {
    /// Number of feedback entries across the theme's articles.
    pub feedback_count: u64,
    /// Average feedback rating, absent when the theme has no ratings.
    pub avg_rating: Option<f64>,
}

/// Repository interface for the analyzer's aggregate reads.
pub trait AnalyticsRepository {
    fn count_articles(&self) -> RepoResult<u64>;
    fn count_articles_by_theme(&self, theme: Theme) -> RepoResult<u64>;
    fn theme_feedback_stats(&self, theme: Theme) -> RepoResult<ThemeFeedbackStats>;
    /// Average rating grouped by `experience_ratio` rounded to one decimal,
    /// ascending by bin.
    fn avg_rating_by_ratio_bin(&self) -> RepoResult<Vec<(f64, f64)>>;
    /// Average rating grouped by casualness level, ascending by level.
    fn avg_rating_by_casualness(&self) -> RepoResult<Vec<(i64, f64)>>;
    /// Average rating grouped by structure type, ascending by type name.
    fn avg_rating_by_structure(&self) -> RepoResult<Vec<(StructureType, f64)>>;
    /// Distinct articles having at least one feedback with
    /// `rating >= min_rating`.
    fn high_rated_articles(&self, min_rating: i64) -> RepoResult<Vec<ArticleRecord>>;
    fn count_articles_without_feedback(&self) -> RepoResult<u64>;
}

/// SQLite-backed analytics repository.
pub struct SqliteAnalyticsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnalyticsRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AnalyticsRepository for SqliteAnalyticsRepository<'_> {
    fn count_articles(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles;", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_articles_by_theme(&self, theme: Theme) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE theme = ?1;",
            [theme_to_db(theme)],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn theme_feedback_stats(&self, theme: Theme) -> RepoResult<ThemeFeedbackStats> {
        self.conn
            .query_row(
                "SELECT COUNT(f.uuid), AVG(f.rating)
                 FROM articles a
                 INNER JOIN feedbacks f ON f.article_uuid = a.uuid
                 WHERE a.theme = ?1;",
                [theme_to_db(theme)],
                |row| {
                    Ok(ThemeFeedbackStats {
                        feedback_count: row.get::<_, i64>(0)? as u64,
                        avg_rating: row.get(1)?,
                    })
                },
            )
            .map_err(RepoError::from)
    }

    fn avg_rating_by_ratio_bin(&self) -> RepoResult<Vec<(f64, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT ROUND(a.experience_ratio, 1) AS bin, AVG(f.rating)
             FROM articles a
             INNER JOIN feedbacks f ON f.article_uuid = a.uuid
             GROUP BY bin
             ORDER BY bin ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut bins = Vec::new();
        while let Some(row) = rows.next()? {
            bins.push((row.get(0)?, row.get(1)?));
        }
        Ok(bins)
    }

    fn avg_rating_by_casualness(&self) -> RepoResult<Vec<(i64, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.casualness_level, AVG(f.rating)
             FROM articles a
             INNER JOIN feedbacks f ON f.article_uuid = a.uuid
             GROUP BY a.casualness_level
             ORDER BY a.casualness_level ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut levels = Vec::new();
        while let Some(row) = rows.next()? {
            levels.push((row.get(0)?, row.get(1)?));
        }
        Ok(levels)
    }

    fn avg_rating_by_structure(&self) -> RepoResult<Vec<(StructureType, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.structure_type, AVG(f.rating)
             FROM articles a
             INNER JOIN feedbacks f ON f.article_uuid = a.uuid
             GROUP BY a.structure_type
             ORDER BY a.structure_type ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut structures = Vec::new();
        while let Some(row) = rows.next()? {
            let structure_text: String = row.get(0)?;
            let structure_type = parse_structure_type(&structure_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid structure type `{structure_text}` in articles.structure_type"
                ))
            })?;
            structures.push((structure_type, row.get(1)?));
        }
        Ok(structures)
    }

    fn high_rated_articles(&self, min_rating: i64) -> RepoResult<Vec<ArticleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
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
             FROM articles a
             WHERE EXISTS (
                 SELECT 1
                 FROM feedbacks f
                 WHERE f.article_uuid = a.uuid
                   AND f.rating >= ?1
             )
             ORDER BY created_at ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([min_rating])?;
        let mut articles = Vec::new();
        while let Some(row) = rows.next()? {
            articles.push(parse_article_row(self.conn, row)?);
        }
        Ok(articles)
    }

    fn count_articles_without_feedback(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM articles a
             WHERE NOT EXISTS (
                 SELECT 1 FROM feedbacks f WHERE f.article_uuid = a.uuid
             );",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

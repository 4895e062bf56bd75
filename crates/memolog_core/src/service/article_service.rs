//! Article use-case service.
//!
//! # Responsibility
//! - Provide stable CRUD entry points for core callers.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::article::{Article, ArticleId};
use crate::repo::article_repo::{ArticleListQuery, ArticleRecord, ArticleRepository};
use crate::repo::RepoResult;

/// Use-case service wrapper for article CRUD operations.
pub struct ArticleService<R: ArticleRepository> {
    repo: R,
}

impl<R: ArticleRepository> ArticleService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a new article through repository persistence.
    pub fn create_article(&self, article: &Article) -> RepoResult<ArticleId> {
        self.repo.create_article(article)
    }

    /// Updates an existing article by stable ID.
    ///
    /// Returns repository-level not-found or validation errors unchanged.
    pub fn update_article(&self, article: &Article) -> RepoResult<()> {
        self.repo.update_article(article)
    }

    /// Gets one article with its feedback by stable ID.
    pub fn get_article(&self, id: ArticleId) -> RepoResult<Option<ArticleRecord>> {
        self.repo.get_article(id)
    }

    /// Lists articles newest-first using filter and pagination options.
    pub fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<Vec<ArticleRecord>> {
        self.repo.list_articles(query)
    }

    /// Deletes an article and, through the cascade, its feedback.
    pub fn delete_article(&self, id: ArticleId) -> RepoResult<()> {
        self.repo.delete_article(id)
    }
}

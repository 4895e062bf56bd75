//! Feedback use-case service.

use crate::model::article::ArticleId;
use crate::model::feedback::{Feedback, FeedbackId};
use crate::repo::article_repo::FeedbackRecord;
use crate::repo::feedback_repo::FeedbackRepository;
use crate::repo::RepoResult;

/// Use-case service wrapper for feedback CRUD operations.
pub struct FeedbackService<R: FeedbackRepository> {
    repo: R,
}

impl<R: FeedbackRepository> FeedbackService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Records one reader rating under an existing article.
    pub fn create_feedback(&self, feedback: &Feedback) -> RepoResult<FeedbackId> {
        self.repo.create_feedback(feedback)
    }

    /// Updates an existing feedback entry scoped to its article.
    pub fn update_feedback(&self, feedback: &Feedback) -> RepoResult<()> {
        self.repo.update_feedback(feedback)
    }

    /// Gets one feedback entry scoped to its article.
    pub fn get_feedback(
        &self,
        article_uuid: ArticleId,
        id: FeedbackId,
    ) -> RepoResult<Option<FeedbackRecord>> {
        self.repo.get_feedback(article_uuid, id)
    }

    /// Lists feedback for one article, oldest-first.
    pub fn list_feedback_for_article(
        &self,
        article_uuid: ArticleId,
    ) -> RepoResult<Vec<FeedbackRecord>> {
        self.repo.list_feedback_for_article(article_uuid)
    }

    /// Deletes one feedback entry scoped to its article.
    pub fn delete_feedback(&self, article_uuid: ArticleId, id: FeedbackId) -> RepoResult<()> {
        self.repo.delete_feedback(article_uuid, id)
    }
}

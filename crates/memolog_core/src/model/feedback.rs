//! Reader feedback domain model.
//!
//! # Invariants
//! - `rating` stays within `[1, 5]`.
//! - Feedback always belongs to exactly one article; it has no lifecycle
//!   outside its article's existence window.

use crate::model::article::ArticleId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a feedback entry.
pub type FeedbackId = Uuid;

pub const RATING_MIN: i64 = 1;
pub const RATING_MAX: i64 = 5;

/// Validation error for feedback fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackValidationError {
    RatingOutOfRange(i64),
    EmptyComment,
}

impl Display for FeedbackValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RatingOutOfRange(value) => write!(
                f,
                "rating must be within {RATING_MIN}..={RATING_MAX}, got {value}"
            ),
            Self::EmptyComment => write!(f, "feedback comment must not be blank"),
        }
    }
}

impl Error for FeedbackValidationError {}

/// Canonical write model for one reader rating with comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Stable global ID.
    pub uuid: FeedbackId,
    /// Owning article.
    pub article_uuid: ArticleId,
    /// Star rating, 1 to 5.
    pub rating: i64,
    pub comment: String,
}

impl Feedback {
    /// Creates a new feedback entry with a generated stable ID.
    pub fn new(article_uuid: ArticleId, rating: i64, comment: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            article_uuid,
            rating,
            comment: comment.into(),
        }
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), FeedbackValidationError> {
        if !(RATING_MIN..=RATING_MAX).contains(&self.rating) {
            return Err(FeedbackValidationError::RatingOutOfRange(self.rating));
        }
        if self.comment.trim().is_empty() {
            return Err(FeedbackValidationError::EmptyComment);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Feedback, FeedbackValidationError};
    use uuid::Uuid;

    #[test]
    fn rating_bounds_are_inclusive() {
        let article_uuid = Uuid::new_v4();
        assert!(Feedback::new(article_uuid, 1, "ok").validate().is_ok());
        assert!(Feedback::new(article_uuid, 5, "ok").validate().is_ok());
        assert_eq!(
            Feedback::new(article_uuid, 0, "ok").validate(),
            Err(FeedbackValidationError::RatingOutOfRange(0))
        );
        assert_eq!(
            Feedback::new(article_uuid, 6, "ok").validate(),
            Err(FeedbackValidationError::RatingOutOfRange(6))
        );
    }

    #[test]
    fn blank_comment_is_rejected() {
        let feedback = Feedback::new(Uuid::new_v4(), 4, "  \n ");
        assert_eq!(
            feedback.validate(),
            Err(FeedbackValidationError::EmptyComment)
        );
    }
}

//! Article domain model.
//!
//! # Responsibility
//! - Define the canonical article record and its generation parameters.
//! - Validate field ranges before any persistence or generation attempt.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another article.
//! - `experience_ratio` stays within `[0.0, 1.0]`.
//! - `casualness_level` stays within `[1, 5]`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for an article.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type ArticleId = Uuid;

pub const EXPERIENCE_RATIO_MIN: f64 = 0.0;
pub const EXPERIENCE_RATIO_MAX: f64 = 1.0;
pub const CASUALNESS_LEVEL_MIN: i64 = 1;
pub const CASUALNESS_LEVEL_MAX: i64 = 5;

/// Thematic lens the article is written through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Reader growth and goal support framing.
    Coaching,
    /// Self-acceptance and self-kindness framing.
    SelfCompassion,
}

impl Theme {
    /// All themes in fixed declaration order.
    ///
    /// Aggregations iterate this slice so per-theme output stays stable.
    pub const ALL: [Theme; 2] = [Theme::Coaching, Theme::SelfCompassion];
}

/// Narrative arc template used for the article body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    /// Four-part classical arc (introduction, development, twist, conclusion).
    Kishotenketsu,
    /// Problem, solution, example, summary arc.
    Standard,
}

impl StructureType {
    /// All structure types in fixed declaration order.
    pub const ALL: [StructureType; 2] = [StructureType::Kishotenketsu, StructureType::Standard];
}

/// Validation error for article fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleValidationError {
    EmptyTitle,
    EmptyContent,
    EmptyOriginalMemo,
    ExperienceRatioOutOfRange(f64),
    CasualnessLevelOutOfRange(i64),
}

impl Display for ArticleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "article title must not be blank"),
            Self::EmptyContent => write!(f, "article content must not be blank"),
            Self::EmptyOriginalMemo => write!(f, "article original memo must not be blank"),
            Self::ExperienceRatioOutOfRange(value) => write!(
                f,
                "experience_ratio must be within {EXPERIENCE_RATIO_MIN}..={EXPERIENCE_RATIO_MAX}, got {value}"
            ),
            Self::CasualnessLevelOutOfRange(value) => write!(
                f,
                "casualness_level must be within {CASUALNESS_LEVEL_MIN}..={CASUALNESS_LEVEL_MAX}, got {value}"
            ),
        }
    }
}

impl Error for ArticleValidationError {}

/// Canonical write model for an article.
///
/// Store-managed timestamps live on [`crate::repo::article_repo::ArticleRecord`];
/// this shape carries exactly the fields a caller may set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable global ID used for linking and feedback ownership.
    pub uuid: ArticleId,
    pub title: String,
    pub content: String,
    /// The user's raw insight memo the article was generated from.
    pub original_memo: String,
    pub theme: Theme,
    /// Fraction of the body weighted toward personal anecdote vs theory.
    pub experience_ratio: f64,
    /// 1 (formal) to 5 (very casual).
    pub casualness_level: i64,
    pub structure_type: StructureType,
}

impl Article {
    /// Creates a new article with a generated stable ID.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        original_memo: impl Into<String>,
        theme: Theme,
        experience_ratio: f64,
        casualness_level: i64,
        structure_type: StructureType,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            original_memo: original_memo.into(),
            theme,
            experience_ratio,
            casualness_level,
            structure_type,
        }
    }

    /// Checks field-level invariants.
    ///
    /// Repositories call this before every SQL mutation; persisted rows are
    /// therefore always valid per these rules.
    pub fn validate(&self) -> Result<(), ArticleValidationError> {
        if self.title.trim().is_empty() {
            return Err(ArticleValidationError::EmptyTitle);
        }
        if self.content.trim().is_empty() {
            return Err(ArticleValidationError::EmptyContent);
        }
        if self.original_memo.trim().is_empty() {
            return Err(ArticleValidationError::EmptyOriginalMemo);
        }
        if !(EXPERIENCE_RATIO_MIN..=EXPERIENCE_RATIO_MAX).contains(&self.experience_ratio) {
            return Err(ArticleValidationError::ExperienceRatioOutOfRange(
                self.experience_ratio,
            ));
        }
        if !(CASUALNESS_LEVEL_MIN..=CASUALNESS_LEVEL_MAX).contains(&self.casualness_level) {
            return Err(ArticleValidationError::CasualnessLevelOutOfRange(
                self.casualness_level,
            ));
        }
        Ok(())
    }
}

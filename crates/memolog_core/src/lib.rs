//! Core domain logic for memolog.
//! This crate is the single source of truth for business invariants.

pub mod backend;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use backend::{
    BackendError, BackendResult, GeminiBackend, GeminiConfig, GenerationBackend, GenerationRequest,
};
pub use logging::{default_log_level, init_logging};
pub use model::article::{Article, ArticleId, ArticleValidationError, StructureType, Theme};
pub use model::feedback::{Feedback, FeedbackId, FeedbackValidationError};
pub use repo::analytics_repo::{AnalyticsRepository, SqliteAnalyticsRepository};
pub use repo::article_repo::{
    ArticleListQuery, ArticleRecord, ArticleRepository, FeedbackRecord, SqliteArticleRepository,
};
pub use repo::feedback_repo::{FeedbackRepository, SqliteFeedbackRepository};
pub use repo::{RepoError, RepoResult};
pub use service::analyzer::{LearningAnalyzer, ParameterRecommendation, PatternReport};
pub use service::article_service::ArticleService;
pub use service::feedback_service::FeedbackService;
pub use service::generator::{
    ArticleGenerator, GeneratedArticle, GenerationParams, GeneratorError, ParamValidationError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

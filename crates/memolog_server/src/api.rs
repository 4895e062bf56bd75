//! HTTP API surface for articles, feedback, generation and analysis.
//!
//! # Responsibility
//! - Translate HTTP verbs into core service calls.
//! - Map core errors onto response statuses.
//!
//! # Invariants
//! - Handlers never panic the request-handling process; every failure maps
//!   to a JSON error payload.
//! - Generation failures of any kind surface as 422 with an error message;
//!   backend trouble is already recovered inside the generator.

use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::error;
use memolog_core::{
    Article, ArticleGenerator, ArticleListQuery, ArticleRecord, ArticleService, Feedback,
    FeedbackRecord, FeedbackService, GeminiBackend, GeneratedArticle, GenerationParams,
    LearningAnalyzer, ParameterRecommendation, PatternReport, RepoError,
    SqliteAnalyticsRepository, SqliteArticleRepository, SqliteFeedbackRepository, StructureType,
    Theme,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/articles",
            get(list_articles_handler).post(create_article_handler),
        )
        .route(
            "/api/articles/:id",
            get(get_article_handler)
                .put(update_article_handler)
                .delete(delete_article_handler),
        )
        .route("/api/articles/:id/feedbacks", post(create_feedback_handler))
        .route(
            "/api/articles/:id/feedbacks/:feedback_id",
            axum::routing::put(update_feedback_handler).delete(delete_feedback_handler),
        )
        .route("/api/generate", post(generate_handler))
        .route("/api/analysis", get(analysis_handler))
        .route("/api/analysis/recommendation", get(recommendation_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API error mapped onto a response status and JSON payload.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation(String),
    Unprocessable(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::NotFound(message)
            | Self::Validation(message)
            | Self::Unprocessable(message)
            | Self::Internal(message) => message,
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ArticleNotFound(id) => Self::NotFound(format!("article not found: {id}")),
            RepoError::FeedbackNotFound(id) => Self::NotFound(format!("feedback not found: {id}")),
            RepoError::InvalidArticle(err) => Self::Validation(err.to_string()),
            RepoError::InvalidFeedback(err) => Self::Validation(err.to_string()),
            other => {
                error!("event=api_storage module=server status=error error={other}");
                Self::Internal("storage failure".to_string())
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: memolog_core::core_version().to_string(),
    })
}

/// Request payload shared by article create/update.
#[derive(Debug, Deserialize)]
struct ArticlePayload {
    title: String,
    content: String,
    original_memo: String,
    theme: Theme,
    experience_ratio: f64,
    casualness_level: i64,
    structure_type: StructureType,
}

impl ArticlePayload {
    fn into_article(self, uuid: Uuid) -> Article {
        Article {
            uuid,
            title: self.title,
            content: self.content,
            original_memo: self.original_memo,
            theme: self.theme,
            experience_ratio: self.experience_ratio,
            casualness_level: self.casualness_level,
            structure_type: self.structure_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListArticlesParams {
    theme: Option<Theme>,
}

async fn list_articles_handler(
    State(state): State<AppState>,
    Query(params): Query<ListArticlesParams>,
) -> Result<Json<Vec<ArticleRecord>>, ApiError> {
    let conn = lock_db(&state)?;
    let service = ArticleService::new(SqliteArticleRepository::try_new(&conn)?);
    let records = service.list_articles(&ArticleListQuery {
        theme: params.theme,
        ..ArticleListQuery::default()
    })?;
    Ok(Json(records))
}

async fn create_article_handler(
    State(state): State<AppState>,
    Json(payload): Json<ArticlePayload>,
) -> Result<(StatusCode, Json<ArticleRecord>), ApiError> {
    let conn = lock_db(&state)?;
    let service = ArticleService::new(SqliteArticleRepository::try_new(&conn)?);

    let article = payload.into_article(Uuid::new_v4());
    let id = service.create_article(&article)?;
    let record = service
        .get_article(id)?
        .ok_or_else(|| ApiError::Internal("created article not found in read-back".to_string()))?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_article_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArticleRecord>, ApiError> {
    let conn = lock_db(&state)?;
    let service = ArticleService::new(SqliteArticleRepository::try_new(&conn)?);
    let record = service
        .get_article(id)?
        .ok_or_else(|| ApiError::NotFound(format!("article not found: {id}")))?;
    Ok(Json(record))
}

async fn update_article_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ArticlePayload>,
) -> Result<Json<ArticleRecord>, ApiError> {
    let conn = lock_db(&state)?;
    let service = ArticleService::new(SqliteArticleRepository::try_new(&conn)?);

    service.update_article(&payload.into_article(id))?;
    let record = service
        .get_article(id)?
        .ok_or_else(|| ApiError::Internal("updated article not found in read-back".to_string()))?;
    Ok(Json(record))
}

async fn delete_article_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let conn = lock_db(&state)?;
    let service = ArticleService::new(SqliteArticleRepository::try_new(&conn)?);
    service.delete_article(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request payload shared by feedback create/update.
#[derive(Debug, Deserialize)]
struct FeedbackPayload {
    rating: i64,
    comment: String,
}

async fn create_feedback_handler(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
    Json(payload): Json<FeedbackPayload>,
) -> Result<(StatusCode, Json<FeedbackRecord>), ApiError> {
    let conn = lock_db(&state)?;
    let service = FeedbackService::new(SqliteFeedbackRepository::try_new(&conn)?);

    let feedback = Feedback::new(article_id, payload.rating, payload.comment);
    let id = service.create_feedback(&feedback)?;
    let record = service
        .get_feedback(article_id, id)?
        .ok_or_else(|| ApiError::Internal("created feedback not found in read-back".to_string()))?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_feedback_handler(
    State(state): State<AppState>,
    Path((article_id, feedback_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<FeedbackPayload>,
) -> Result<Json<FeedbackRecord>, ApiError> {
    let conn = lock_db(&state)?;
    let service = FeedbackService::new(SqliteFeedbackRepository::try_new(&conn)?);

    let feedback = Feedback {
        uuid: feedback_id,
        article_uuid: article_id,
        rating: payload.rating,
        comment: payload.comment,
    };
    service.update_feedback(&feedback)?;
    let record = service
        .get_feedback(article_id, feedback_id)?
        .ok_or_else(|| ApiError::Internal("updated feedback not found in read-back".to_string()))?;
    Ok(Json(record))
}

async fn delete_feedback_handler(
    State(state): State<AppState>,
    Path((article_id, feedback_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let conn = lock_db(&state)?;
    let service = FeedbackService::new(SqliteFeedbackRepository::try_new(&conn)?);
    service.delete_feedback(article_id, feedback_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(params): Json<GenerationParams>,
) -> Result<Json<GeneratedArticle>, ApiError> {
    let gemini = state.gemini.clone();

    // The backend call is a blocking network round trip; keep it off the
    // async worker threads.
    let generated = tokio::task::spawn_blocking(move || {
        let generator = ArticleGenerator::new(GeminiBackend::from_config(gemini));
        generator.generate(&params)
    })
    .await
    .map_err(|err| {
        error!("event=generate module=server status=error error={err}");
        ApiError::Unprocessable("article generation failed".to_string())
    })?
    .map_err(|err| ApiError::Unprocessable(err.to_string()))?;

    Ok(Json(generated))
}

async fn analysis_handler(
    State(state): State<AppState>,
) -> Result<Json<Option<PatternReport>>, ApiError> {
    let conn = lock_db(&state)?;
    let analyzer = LearningAnalyzer::new(SqliteAnalyticsRepository::try_new(&conn)?);
    Ok(Json(analyzer.analyze_patterns()?))
}

async fn recommendation_handler(
    State(state): State<AppState>,
) -> Result<Json<ParameterRecommendation>, ApiError> {
    let conn = lock_db(&state)?;
    let analyzer = LearningAnalyzer::new(SqliteAnalyticsRepository::try_new(&conn)?);
    Ok(Json(analyzer.generate_improved_prompt_parameters()?))
}

fn lock_db(state: &AppState) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>, ApiError> {
    state
        .db
        .lock()
        .map_err(|_| ApiError::Internal("database mutex poisoned".to_string()))
}

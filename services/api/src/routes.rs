use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use intervu_core::evaluation::evaluate_interview;
use intervu_core::evaluator::Evaluator;
use intervu_core::interview::{InterviewRecord, NewInterview, RecordId, SessionConfig};
use intervu_core::question_source::QuestionSource;
use intervu_core::store::InterviewStore;
use intervu_core::{InterviewError, SessionContext};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

pub const USER_HEADER: &str = "x-user-id";

/// Most records returned by the history endpoint.
const HISTORY_LIMIT: usize = 100;

/// Entries of each list returned by the strengths endpoint.
const PROFILE_TOP: usize = 5;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InterviewStore>,
    pub questions: Arc<dyn QuestionSource>,
    pub evaluator: Arc<dyn Evaluator>,
}

/// The caller's identity, taken from the `X-User-Id` header.
///
/// Authentication is done upstream; this only turns the forwarded id into a
/// [`SessionContext`].
pub struct Caller(pub SessionContext);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Caller(SessionContext::new(v)))
            .ok_or(ApiError::Unauthorized)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/interview/questions", post(generate_questions))
        .route("/interview/save", post(save_interview))
        .route("/interview/history", get(history))
        .route("/interview/{id}", get(get_interview).delete(delete_interview))
        .route("/interview/{id}/evaluate", post(evaluate))
        .route("/profile/strengths", get(strengths))
        .with_state(state)
}

fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid interview ID".to_string()))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
struct QuestionsResponse {
    questions: Vec<String>,
}

async fn generate_questions(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    payload: Result<Json<SessionConfig>, JsonRejection>,
) -> Result<Json<QuestionsResponse>, ApiError> {
    let Json(config) = payload?;
    let config = config.validated()?;
    tracing::info!(
        "Generating {} questions for {} ({})",
        config.question_count,
        ctx.owner,
        config.role
    );
    let questions = state
        .questions
        .generate(&config)
        .await
        .map_err(|e| InterviewError::SourceUnavailable(format!("{e:#}")))?;
    if questions.is_empty() {
        return Err(InterviewError::SourceUnavailable(
            "the question source returned no questions".to_string(),
        )
        .into());
    }
    Ok(Json(QuestionsResponse { questions }))
}

async fn save_interview(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    payload: Result<Json<NewInterview>, JsonRejection>,
) -> Result<Json<InterviewRecord>, ApiError> {
    let Json(new) = payload?;
    let record = new.into_record(ctx.owner.clone(), Utc::now())?;
    let saved = state.store.save(&ctx, record).await?;
    tracing::info!("Saved interview {} for {}", saved.id, ctx.owner);
    Ok(Json(saved))
}

async fn history(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> Result<Json<Vec<InterviewRecord>>, ApiError> {
    let mut records = state.store.list(&ctx).await?;
    records.truncate(HISTORY_LIMIT);
    tracing::debug!("Returning {} interviews for {}", records.len(), ctx.owner);
    Ok(Json(records))
}

async fn get_interview(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<Json<InterviewRecord>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.fetch(&ctx, id).await?))
}

async fn delete_interview(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    state.store.delete(&ctx, id).await?;
    tracing::info!("Deleted interview {} for {}", id, ctx.owner);
    Ok(Json(json!({ "message": "Interview deleted successfully" })))
}

async fn evaluate(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<Json<InterviewRecord>, ApiError> {
    let id = parse_id(&id)?;
    tracing::info!("Evaluating interview {} for {}", id, ctx.owner);
    let updated =
        evaluate_interview(&ctx, id, state.store.as_ref(), state.evaluator.as_ref()).await?;
    Ok(Json(updated))
}

#[derive(Serialize)]
struct StrengthsResponse {
    strengths: Vec<String>,
    weaknesses: Vec<String>,
}

/// The caller's accumulated profile, earliest recorded entries first.
async fn strengths(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> Result<Json<StrengthsResponse>, ApiError> {
    let mut profile = state.store.load_profile(&ctx).await?;
    profile.strengths.truncate(PROFILE_TOP);
    profile.weaknesses.truncate(PROFILE_TOP);
    Ok(Json(StrengthsResponse {
        strengths: profile.strengths,
        weaknesses: profile.weaknesses,
    }))
}

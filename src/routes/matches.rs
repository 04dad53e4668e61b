use actix_web::{web, HttpResponse, Responder};
use crate::core::{EmbeddingError, MatchError};
use crate::models::{ErrorResponse, HealthResponse, MatchRequest, MatchResponse};
use crate::services::{MatchOutcome, MatchServiceError, MatchingService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matching: MatchingService,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/match", web::post().to(match_mentee));
}

fn error_response(status_code: u16, error: &str, message: String) -> HttpResponse {
    let status = actix_web::http::StatusCode::from_u16(status_code)
        .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = state.matching.repository().health_check().await.unwrap_or(false);

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        embedding_model: state.matching.matcher().model_name().to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Match a mentee with a mentor
///
/// POST /api/v1/match
///
/// Request body:
/// ```json
/// {
///   "menteeUserId": "string",
///   "menteeMentorshipId": "string",
///   "categoryId": "string",
///   "answers": ["string"]
/// }
/// ```
async fn match_mentee(
    state: web::Data<AppState>,
    req: web::Json<MatchRequest>,
) -> impl Responder {
    tracing::info!(
        "Match request: mentee {} (mentorship {}), category {}",
        req.mentee_user_id,
        req.mentee_mentorship_id,
        req.category_id
    );

    let outcome = match state.matching.match_mentee(&req).await {
        Ok(outcome) => outcome,
        Err(MatchServiceError::Validation(errors)) => {
            tracing::info!("Validation failed for match request: {:?}", errors);
            return error_response(400, "validation_failed", errors.to_string());
        }
        Err(MatchServiceError::Matching(MatchError::Embedding(e @ EmbeddingError::Timeout(_)))) => {
            tracing::error!("Matching timed out for {}: {}", req.mentee_user_id, e);
            return error_response(504, "embedding_timeout", e.to_string());
        }
        Err(MatchServiceError::Matching(e)) => {
            tracing::error!("Matching failed for {}: {}", req.mentee_user_id, e);
            return error_response(500, "matching_failed", e.to_string());
        }
        Err(MatchServiceError::Repository(e)) => {
            tracing::error!("Repository error while matching {}: {}", req.mentee_user_id, e);
            return error_response(500, "repository_error", e.to_string());
        }
    };

    match &outcome {
        MatchOutcome::Matched(decision) => HttpResponse::Ok().json(MatchResponse {
            status: outcome.as_str().to_string(),
            decision: Some(decision.clone()),
        }),
        MatchOutcome::NoMentorsAvailable | MatchOutcome::NoQualifiedMentor => {
            HttpResponse::Ok().json(MatchResponse {
                status: outcome.as_str().to_string(),
                decision: None,
            })
        }
        MatchOutcome::MenteeNotFound => error_response(
            404,
            outcome.as_str(),
            format!("Mentorship {} not found", req.mentee_mentorship_id),
        ),
        MatchOutcome::IdentityMismatch => error_response(
            403,
            outcome.as_str(),
            "Mentorship does not belong to the requesting user".to_string(),
        ),
        MatchOutcome::AlreadyMatched => error_response(
            409,
            outcome.as_str(),
            format!("Mentorship {} is already matched", req.mentee_mentorship_id),
        ),
        MatchOutcome::MatchConflict => error_response(
            409,
            outcome.as_str(),
            "The mentee or the selected mentor was matched by another request".to_string(),
        ),
        MatchOutcome::InvalidRecord => error_response(
            422,
            outcome.as_str(),
            format!(
                "Mentorship {} is not a mentee record in category {}",
                req.mentee_mentorship_id, req.category_id
            ),
        ),
    }
}

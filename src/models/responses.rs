use serde::{Deserialize, Serialize};
use crate::models::domain::MatchDecision;

/// Response for the match endpoint
///
/// `status` is one of `matched`, `no_mentors_available`, `no_qualified_mentor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub status: String,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub decision: Option<MatchDecision>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub embedding_model: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Mentorship, MentorshipStatus, Position, MatchDecision, MatchRecord};
pub use requests::MatchRequest;
pub use responses::{MatchResponse, HealthResponse, ErrorResponse};

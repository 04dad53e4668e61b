//! Mentor Match - semantic mentee/mentor matching service
//!
//! This library provides the matching decision engine: answer sets are
//! embedded with a sentence-transformer, compared by cosine similarity, and
//! the most similar eligible mentor above a configured threshold is selected.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{Matcher, MatchError, Embedder, EmbeddingError, combine_answers, cosine_similarity};
pub use crate::models::{Mentorship, MentorshipStatus, MatchDecision, MatchRequest};
pub use crate::services::{MatchingService, MatchOutcome, MentorshipRepository};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let answers = vec!["first".to_string(), "second".to_string()];
        assert_eq!(combine_answers(&answers), "first\nsecond");
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).is_ok());
    }
}

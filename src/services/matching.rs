use crate::core::{MatchError, Matcher};
use crate::models::{MatchDecision, MatchRecord, MatchRequest, MentorshipStatus, Position};
use crate::services::repository::{MentorshipRepository, RepositoryError};
use std::sync::Arc;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Infrastructure and input failures of a match request
///
/// Ordinary business outcomes are [`MatchOutcome`] values, never errors.
#[derive(Debug, Error)]
pub enum MatchServiceError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Matching failed: {0}")]
    Matching(#[from] MatchError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of a match request that completed without infrastructure failure
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Both records moved to `matched` and the match was recorded
    Matched(MatchDecision),
    /// The category has no eligible mentors
    NoMentorsAvailable,
    /// Mentors were scored but none reached the minimum score
    NoQualifiedMentor,
    /// The mentee's mentorship record does not exist
    MenteeNotFound,
    /// The mentee's record belongs to a different user
    IdentityMismatch,
    /// The mentee's record is no longer pending
    AlreadyMatched,
    /// The record is not a mentee record of the requested category
    InvalidRecord,
    /// Another request claimed the mentee or the selected mentor first
    MatchConflict,
}

impl MatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOutcome::Matched(_) => "matched",
            MatchOutcome::NoMentorsAvailable => "no_mentors_available",
            MatchOutcome::NoQualifiedMentor => "no_qualified_mentor",
            MatchOutcome::MenteeNotFound => "mentee_not_found",
            MatchOutcome::IdentityMismatch => "identity_mismatch",
            MatchOutcome::AlreadyMatched => "already_matched",
            MatchOutcome::InvalidRecord => "invalid_record",
            MatchOutcome::MatchConflict => "match_conflict",
        }
    }
}

/// Mentee-to-mentor matching over a repository
#[derive(Clone)]
pub struct MatchingService {
    repository: Arc<dyn MentorshipRepository>,
    matcher: Matcher,
    minimum_score: f32,
}

impl MatchingService {
    pub fn new(repository: Arc<dyn MentorshipRepository>, matcher: Matcher, minimum_score: f32) -> Self {
        Self {
            repository,
            matcher,
            minimum_score,
        }
    }

    pub fn repository(&self) -> &Arc<dyn MentorshipRepository> {
        &self.repository
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn minimum_score(&self) -> f32 {
        self.minimum_score
    }

    /// Match a mentee with the most similar pending mentor of a category
    ///
    /// Validation happens before any repository or model call. On success
    /// both mentorship records move to `matched` and a match record is stored.
    pub async fn match_mentee(&self, request: &MatchRequest) -> Result<MatchOutcome, MatchServiceError> {
        request.validate()?;

        let mentee = match self.repository.fetch_record_by_id(&request.mentee_mentorship_id).await? {
            Some(record) if !record.is_deleted => record,
            _ => {
                tracing::info!("Mentee mentorship {} not found", request.mentee_mentorship_id);
                return Ok(MatchOutcome::MenteeNotFound);
            }
        };

        if mentee.user_id != request.mentee_user_id {
            tracing::warn!(
                "Mentorship {} belongs to {}, not {}",
                mentee.id,
                mentee.user_id,
                request.mentee_user_id
            );
            return Ok(MatchOutcome::IdentityMismatch);
        }

        if mentee.position != Position::Mentee || mentee.category_id != request.category_id {
            tracing::warn!(
                "Mentorship {} is a {} record in category {}, not a mentee record in {}",
                mentee.id,
                mentee.position.as_str(),
                mentee.category_id,
                request.category_id
            );
            return Ok(MatchOutcome::InvalidRecord);
        }

        if mentee.status != MentorshipStatus::Pending {
            tracing::info!("Mentorship {} is already {}", mentee.id, mentee.status);
            return Ok(MatchOutcome::AlreadyMatched);
        }

        let candidates = self.repository.fetch_eligible_candidates(&request.category_id).await?;
        tracing::info!(
            "Matching mentee {} against {} mentors in category {}",
            request.mentee_user_id,
            candidates.len(),
            request.category_id
        );

        if candidates.is_empty() {
            return Ok(MatchOutcome::NoMentorsAvailable);
        }

        let decision = self
            .matcher
            .find_best_match(&request.answers, &candidates, &request.mentee_user_id, self.minimum_score)
            .await?;

        let Some(decision) = decision else {
            tracing::info!("No mentor reached {:.2} for mentee {}", self.minimum_score, request.mentee_user_id);
            return Ok(MatchOutcome::NoQualifiedMentor);
        };

        let record = MatchRecord::new(&mentee, &decision);
        match self.repository.complete_match(&record).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(reason)) => {
                tracing::warn!(
                    "Match {} -> {} lost to a concurrent request: {}",
                    record.mentee_id,
                    record.mentor_id,
                    reason
                );
                return Ok(MatchOutcome::MatchConflict);
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            "Matched mentee {} with mentor {} (score {:.4})",
            record.mentee_id,
            record.mentor_id,
            record.similarity_score
        );

        Ok(MatchOutcome::Matched(decision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HashingEmbedder;
    use crate::models::{Mentorship, MentorshipStatus, Position};
    use crate::services::memory::InMemoryRepository;

    fn mentee_record() -> Mentorship {
        Mentorship {
            id: "ms-mentee".to_string(),
            user_id: "mentee".to_string(),
            position: Position::Mentee,
            category_id: "it".to_string(),
            category_name: None,
            answers: vec!["I want to learn web development".to_string()],
            status: MentorshipStatus::Pending,
            is_deleted: false,
            created_at: None,
            updated_at: None,
        }
    }

    fn request(user_id: &str) -> MatchRequest {
        MatchRequest {
            mentee_user_id: user_id.to_string(),
            mentee_mentorship_id: "ms-mentee".to_string(),
            category_id: "it".to_string(),
            answers: vec!["I want to learn web development".to_string()],
        }
    }

    fn service(records: Vec<Mentorship>) -> MatchingService {
        let repository = Arc::new(InMemoryRepository::with_records(Some(MentorshipStatus::Pending), records));
        let matcher = Matcher::with_default_policy(Arc::new(HashingEmbedder::default()));
        MatchingService::new(repository, matcher, 0.7)
    }

    #[tokio::test]
    async fn test_validation_runs_first() {
        let svc = service(vec![]);
        let mut req = request("mentee");
        req.answers.clear();

        let err = svc.match_mentee(&req).await.unwrap_err();
        assert!(matches!(err, MatchServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_mentee_record() {
        let svc = service(vec![]);
        assert_eq!(svc.match_mentee(&request("mentee")).await.unwrap(), MatchOutcome::MenteeNotFound);
    }

    #[tokio::test]
    async fn test_identity_mismatch() {
        let svc = service(vec![mentee_record()]);
        assert_eq!(svc.match_mentee(&request("someone-else")).await.unwrap(), MatchOutcome::IdentityMismatch);
    }

    #[tokio::test]
    async fn test_no_mentors_available() {
        let svc = service(vec![mentee_record()]);
        assert_eq!(svc.match_mentee(&request("mentee")).await.unwrap(), MatchOutcome::NoMentorsAvailable);
    }

    fn mentor_record(user_id: &str) -> Mentorship {
        Mentorship {
            id: format!("ms-{}", user_id),
            user_id: user_id.to_string(),
            position: Position::Mentor,
            answers: vec!["I want to learn web development".to_string()],
            ..mentee_record()
        }
    }

    #[tokio::test]
    async fn test_matched_mentee_cannot_match_again() {
        let svc = service(vec![mentee_record(), mentor_record("m1"), mentor_record("m2")]);

        let first = svc.match_mentee(&request("mentee")).await.unwrap();
        assert!(matches!(first, MatchOutcome::Matched(_)));

        let second = svc.match_mentee(&request("mentee")).await.unwrap();
        assert_eq!(second, MatchOutcome::AlreadyMatched);

        let m2 = svc.repository().fetch_record_by_id("ms-m2").await.unwrap().unwrap();
        assert_eq!(m2.status, MentorshipStatus::Pending);
    }

    #[tokio::test]
    async fn test_record_must_be_mentee_of_requested_category() {
        let mut as_mentor = mentee_record();
        as_mentor.position = Position::Mentor;
        let svc = service(vec![as_mentor, mentor_record("m1")]);
        assert_eq!(svc.match_mentee(&request("mentee")).await.unwrap(), MatchOutcome::InvalidRecord);

        let svc = service(vec![mentee_record(), mentor_record("m1")]);
        let mut other_category = request("mentee");
        other_category.category_id = "design".to_string();
        assert_eq!(svc.match_mentee(&other_category).await.unwrap(), MatchOutcome::InvalidRecord);
    }

    #[tokio::test]
    async fn test_deleted_mentee_is_not_found() {
        let mut deleted = mentee_record();
        deleted.is_deleted = true;
        let svc = service(vec![deleted, mentor_record("m1")]);
        assert_eq!(svc.match_mentee(&request("mentee")).await.unwrap(), MatchOutcome::MenteeNotFound);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(MatchOutcome::NoQualifiedMentor.as_str(), "no_qualified_mentor");
        assert_eq!(MatchOutcome::IdentityMismatch.as_str(), "identity_mismatch");
        assert_eq!(MatchOutcome::MatchConflict.as_str(), "match_conflict");
    }
}

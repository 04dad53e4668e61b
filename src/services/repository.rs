use async_trait::async_trait;
use crate::models::{MatchRecord, Mentorship, MentorshipStatus};
use crate::services::appwrite::AppwriteError;
use thiserror::Error;

/// Errors reported by a mentorship repository backend
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Appwrite error: {0}")]
    AppwriteError(#[from] AppwriteError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Storage for mentorship records and completed matches
#[async_trait]
pub trait MentorshipRepository: Send + Sync {
    /// Mentor records of a category that are not deleted
    ///
    /// Backends built with a status filter also require that status. An
    /// empty category yields an empty vector, never an error.
    async fn fetch_eligible_candidates(&self, category_id: &str) -> Result<Vec<Mentorship>, RepositoryError>;

    /// A single record snapshot, or `None` when absent
    async fn fetch_record_by_id(&self, id: &str) -> Result<Option<Mentorship>, RepositoryError>;

    /// Move a record to a new status; `NotFound` when the record is absent
    async fn update_status(&self, id: &str, status: MentorshipStatus) -> Result<(), RepositoryError>;

    /// Persist a completed match
    async fn record_match(&self, record: &MatchRecord) -> Result<(), RepositoryError>;

    /// Move a record from `from` to `to` only if it still holds `from`
    ///
    /// `NotFound` when the record is absent, `Conflict` when another writer
    /// moved it first. The default reads then writes; backends that can
    /// make the write conditional override it.
    async fn transition_status(
        &self,
        id: &str,
        from: MentorshipStatus,
        to: MentorshipStatus,
    ) -> Result<(), RepositoryError> {
        let record = self
            .fetch_record_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Mentorship {}", id)))?;

        if record.status != from {
            return Err(RepositoryError::Conflict(format!("Mentorship {} is {}", id, record.status)));
        }

        self.update_status(id, to).await
    }

    /// Mark both pending sides matched and persist the match record
    ///
    /// The default runs the writes in sequence and puts the mentee back to
    /// `pending` when a later step fails. Backends with transactions
    /// override it.
    async fn complete_match(&self, record: &MatchRecord) -> Result<(), RepositoryError> {
        let mentee = record.mentee_mentorship_id.as_str();
        let mentor = record.mentor_mentorship_id.as_str();

        self.transition_status(mentee, MentorshipStatus::Pending, MentorshipStatus::Matched)
            .await?;

        let result = match self
            .transition_status(mentor, MentorshipStatus::Pending, MentorshipStatus::Matched)
            .await
        {
            Ok(()) => match self.record_match(record).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if let Err(revert) = self.update_status(mentor, MentorshipStatus::Pending).await {
                        tracing::error!("Failed to release mentor {}: {}", mentor, revert);
                    }
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };

        if let Err(revert) = self.update_status(mentee, MentorshipStatus::Pending).await {
            tracing::error!("Failed to release mentee {}: {}", mentee, revert);
        }
        result
    }

    async fn health_check(&self) -> Result<bool, RepositoryError>;
}

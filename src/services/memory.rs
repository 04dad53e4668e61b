use async_trait::async_trait;
use crate::models::{MatchRecord, Mentorship, MentorshipStatus, Position};
use crate::services::repository::{MentorshipRepository, RepositoryError};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process repository for local development and tests
///
/// Candidates come back in insertion order, matching the creation-time
/// ordering of the persistent backends.
#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
    status_filter: Option<MentorshipStatus>,
}

#[derive(Default)]
struct State {
    order: Vec<String>,
    records: HashMap<String, Mentorship>,
    matches: Vec<MatchRecord>,
}

impl InMemoryRepository {
    pub fn new(status_filter: Option<MentorshipStatus>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            status_filter,
        }
    }

    /// Build a repository pre-populated with records
    pub fn with_records(status_filter: Option<MentorshipStatus>, records: Vec<Mentorship>) -> Self {
        let mut state = State::default();
        for record in records {
            state.order.push(record.id.clone());
            state.records.insert(record.id.clone(), record);
        }
        Self {
            state: RwLock::new(state),
            status_filter,
        }
    }

    /// Insert or replace a record, keeping its original position
    pub async fn insert(&self, record: Mentorship) {
        let mut state = self.state.write().await;
        if !state.records.contains_key(&record.id) {
            state.order.push(record.id.clone());
        }
        state.records.insert(record.id.clone(), record);
    }

    /// Matches recorded so far
    pub async fn matches(&self) -> Vec<MatchRecord> {
        self.state.read().await.matches.clone()
    }
}

impl State {
    fn check_status(&self, id: &str, expected: MentorshipStatus) -> Result<(), RepositoryError> {
        let record = self
            .records
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Mentorship {}", id)))?;

        if record.status != expected {
            return Err(RepositoryError::Conflict(format!("Mentorship {} is {}", id, record.status)));
        }
        Ok(())
    }

    fn transition(&mut self, id: &str, from: MentorshipStatus, to: MentorshipStatus) -> Result<(), RepositoryError> {
        self.check_status(id, from)?;
        if let Some(record) = self.records.get_mut(id) {
            record.status = to;
            record.updated_at = Some(chrono::Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl MentorshipRepository for InMemoryRepository {
    async fn fetch_eligible_candidates(&self, category_id: &str) -> Result<Vec<Mentorship>, RepositoryError> {
        let state = self.state.read().await;

        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|m| m.category_id == category_id)
            .filter(|m| m.position == Position::Mentor && !m.is_deleted)
            .filter(|m| self.status_filter.map_or(true, |s| m.status == s))
            .cloned()
            .collect())
    }

    async fn fetch_record_by_id(&self, id: &str) -> Result<Option<Mentorship>, RepositoryError> {
        Ok(self.state.read().await.records.get(id).cloned())
    }

    async fn update_status(&self, id: &str, status: MentorshipStatus) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Mentorship {}", id)))?;

        record.status = status;
        record.updated_at = Some(chrono::Utc::now());
        Ok(())
    }

    async fn transition_status(
        &self,
        id: &str,
        from: MentorshipStatus,
        to: MentorshipStatus,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.transition(id, from, to)
    }

    async fn record_match(&self, record: &MatchRecord) -> Result<(), RepositoryError> {
        self.state.write().await.matches.push(record.clone());
        Ok(())
    }

    /// Checks and writes happen under one write lock
    async fn complete_match(&self, record: &MatchRecord) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;

        for id in [&record.mentee_mentorship_id, &record.mentor_mentorship_id] {
            state.check_status(id, MentorshipStatus::Pending)?;
        }
        for id in [&record.mentee_mentorship_id, &record.mentor_mentorship_id] {
            state.transition(id, MentorshipStatus::Pending, MentorshipStatus::Matched)?;
        }
        state.matches.push(record.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, RepositoryError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, position: Position, category: &str, status: MentorshipStatus, deleted: bool) -> Mentorship {
        Mentorship {
            id: id.to_string(),
            user_id: format!("user-{}", id),
            position,
            category_id: category.to_string(),
            category_name: None,
            answers: vec!["answer".to_string()],
            status,
            is_deleted: deleted,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_candidate_filters_and_order() {
        let repo = InMemoryRepository::with_records(
            Some(MentorshipStatus::Pending),
            vec![
                record("b", Position::Mentor, "it", MentorshipStatus::Pending, false),
                record("a", Position::Mentor, "it", MentorshipStatus::Pending, false),
                record("mentee", Position::Mentee, "it", MentorshipStatus::Pending, false),
                record("deleted", Position::Mentor, "it", MentorshipStatus::Pending, true),
                record("matched", Position::Mentor, "it", MentorshipStatus::Matched, false),
                record("other", Position::Mentor, "design", MentorshipStatus::Pending, false),
            ],
        );

        let ids: Vec<String> = repo
            .fetch_eligible_candidates("it")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);

        assert!(repo.fetch_eligible_candidates("music").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_without_status_filter_returns_matched_mentors() {
        let repo = InMemoryRepository::with_records(
            None,
            vec![record("matched", Position::Mentor, "it", MentorshipStatus::Matched, false)],
        );
        assert_eq!(repo.fetch_eligible_candidates("it").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_status() {
        let repo = InMemoryRepository::new(None);
        repo.insert(record("a", Position::Mentor, "it", MentorshipStatus::Pending, false)).await;

        repo.update_status("a", MentorshipStatus::Matched).await.unwrap();
        let updated = repo.fetch_record_by_id("a").await.unwrap().unwrap();
        assert_eq!(updated.status, MentorshipStatus::Matched);
        assert!(updated.updated_at.is_some());

        let err = repo.update_status("missing", MentorshipStatus::Matched).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    fn match_record(mentee: &str, mentor: &str) -> MatchRecord {
        MatchRecord {
            id: format!("{}-{}", mentee, mentor),
            mentee_id: format!("user-{}", mentee),
            mentor_id: format!("user-{}", mentor),
            mentee_mentorship_id: mentee.to_string(),
            mentor_mentorship_id: mentor.to_string(),
            category_id: "it".to_string(),
            similarity_score: 0.9,
            matched_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_complete_match_rejects_taken_mentor() {
        let repo = InMemoryRepository::with_records(
            Some(MentorshipStatus::Pending),
            vec![
                record("a", Position::Mentee, "it", MentorshipStatus::Pending, false),
                record("b", Position::Mentee, "it", MentorshipStatus::Pending, false),
                record("m", Position::Mentor, "it", MentorshipStatus::Pending, false),
            ],
        );

        repo.complete_match(&match_record("a", "m")).await.unwrap();

        let err = repo.complete_match(&match_record("b", "m")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // The losing mentee is untouched and only one match exists
        let b = repo.fetch_record_by_id("b").await.unwrap().unwrap();
        assert_eq!(b.status, MentorshipStatus::Pending);
        assert_eq!(repo.matches().await.len(), 1);
    }

    #[tokio::test]
    async fn test_transition_status_requires_expected_status() {
        let repo = InMemoryRepository::new(None);
        repo.insert(record("a", Position::Mentor, "it", MentorshipStatus::Matched, false)).await;

        let err = repo
            .transition_status("a", MentorshipStatus::Pending, MentorshipStatus::Matched)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        repo.transition_status("a", MentorshipStatus::Matched, MentorshipStatus::Pending)
            .await
            .unwrap();
        let a = repo.fetch_record_by_id("a").await.unwrap().unwrap();
        assert_eq!(a.status, MentorshipStatus::Pending);

        let err = repo
            .transition_status("missing", MentorshipStatus::Pending, MentorshipStatus::Matched)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}

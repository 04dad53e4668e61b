use async_trait::async_trait;
use crate::models::{MatchRecord, Mentorship, MentorshipStatus, Position};
use crate::services::repository::{MentorshipRepository, RepositoryError};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or project")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub mentorships: String,
    pub matches: String,
}

/// Mentorship repository over the Appwrite documents API
pub struct AppwriteRepository {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
    status_filter: Option<MentorshipStatus>,
    candidate_limit: usize,
}

impl AppwriteRepository {
    /// Create a new Appwrite repository
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        status_filter: Option<MentorshipStatus>,
        candidate_limit: usize,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            project_id,
            database_id,
            client,
            collections,
            status_filter,
            candidate_limit,
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url, self.database_id, collection
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
    }

    /// Build the `queries[]` parameters for one page of a candidate lookup
    ///
    /// `cursor` is the `$id` of the last document of the previous page.
    fn candidate_queries(&self, category_id: &str, cursor: Option<&str>) -> Vec<Value> {
        let mut queries = vec![
            json!({"method": "equal", "attribute": "categoryId", "values": [category_id]}),
            json!({"method": "equal", "attribute": "position", "values": [Position::Mentor.as_str()]}),
            json!({"method": "equal", "attribute": "isDeleted", "values": [false]}),
        ];

        if let Some(status) = self.status_filter {
            queries.push(json!({"method": "equal", "attribute": "status", "values": [status.as_str()]}));
        }

        queries.push(json!({"method": "orderAsc", "attribute": "$createdAt"}));
        queries.push(json!({"method": "limit", "values": [self.page_size()]}));

        if let Some(cursor) = cursor {
            queries.push(json!({"method": "cursorAfter", "values": [cursor]}));
        }
        queries
    }

    fn page_size(&self) -> usize {
        self.candidate_limit.max(1)
    }

    /// One page of candidate documents, in `$createdAt` order
    async fn fetch_candidate_page(
        &self,
        category_id: &str,
        cursor: Option<&str>,
    ) -> Result<Vec<Mentorship>, AppwriteError> {
        let query_string = self
            .candidate_queries(category_id, cursor)
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(&q.to_string())))
            .collect::<Vec<_>>()
            .join("&");

        let url = format!("{}?{}", self.documents_url(&self.collections.mentorships), query_string);

        let response = self.authorized(self.client.get(&url)).send().await?;
        check_status(response.status(), "Failed to query candidates")?;

        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        // A malformed mentor document is a data error, not a reason to shrink the pool
        documents.iter().map(parse_document).collect()
    }
}

fn check_status(status: StatusCode, context: &str) -> Result<(), AppwriteError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AppwriteError::Unauthorized);
    }
    if !status.is_success() {
        return Err(AppwriteError::ApiError(format!("{}: {}", context, status)));
    }
    Ok(())
}

fn parse_document(doc: &Value) -> Result<Mentorship, AppwriteError> {
    let data = doc.get("data").unwrap_or(doc);
    serde_json::from_value(data.clone())
        .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to parse mentorship: {}", e)))
}

#[async_trait]
impl MentorshipRepository for AppwriteRepository {
    async fn fetch_eligible_candidates(&self, category_id: &str) -> Result<Vec<Mentorship>, RepositoryError> {
        let page_size = self.page_size();
        let mut candidates: Vec<Mentorship> = Vec::new();
        let mut pages = 0usize;

        // A short page is the last one
        loop {
            let cursor = candidates.last().map(|c| c.id.as_str());
            let page = self.fetch_candidate_page(category_id, cursor).await?;
            let last_page = page.len() < page_size;
            pages += 1;
            candidates.extend(page);

            if last_page {
                break;
            }
        }

        tracing::debug!(
            "Queried {} candidates for category {} in {} page(s)",
            candidates.len(),
            category_id,
            pages
        );

        Ok(candidates)
    }

    async fn fetch_record_by_id(&self, id: &str) -> Result<Option<Mentorship>, RepositoryError> {
        let url = format!(
            "{}/{}",
            self.documents_url(&self.collections.mentorships),
            urlencoding::encode(id)
        );

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(AppwriteError::from)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(response.status(), "Failed to fetch mentorship")?;

        let json: Value = response.json().await.map_err(AppwriteError::from)?;
        Ok(Some(parse_document(&json)?))
    }

    async fn update_status(&self, id: &str, status: MentorshipStatus) -> Result<(), RepositoryError> {
        let url = format!(
            "{}/{}",
            self.documents_url(&self.collections.mentorships),
            urlencoding::encode(id)
        );

        let payload = json!({
            "data": {
                "status": status.as_str(),
                "updatedAt": chrono::Utc::now(),
            }
        });

        let response = self
            .authorized(self.client.patch(&url))
            .json(&payload)
            .send()
            .await
            .map_err(AppwriteError::from)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RepositoryError::NotFound(format!("Mentorship {}", id)));
        }
        check_status(response.status(), "Failed to update mentorship status")?;

        tracing::debug!("Mentorship {} -> {}", id, status);
        Ok(())
    }

    async fn record_match(&self, record: &MatchRecord) -> Result<(), RepositoryError> {
        let payload = json!({
            "documentId": record.id,
            "data": {
                "mentee_id": record.mentee_id,
                "mentor_id": record.mentor_id,
                "mentee_mentorship_id": record.mentee_mentorship_id,
                "mentor_mentorship_id": record.mentor_mentorship_id,
                "category_id": record.category_id,
                "similarity_score": record.similarity_score,
                "matched_at": record.matched_at,
            }
        });

        let response = self
            .authorized(self.client.post(self.documents_url(&self.collections.matches)))
            .json(&payload)
            .send()
            .await
            .map_err(AppwriteError::from)?;
        check_status(response.status(), "Failed to record match")?;

        tracing::debug!("Recorded match {}: {} -> {}", record.id, record.mentee_id, record.mentor_id);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, RepositoryError> {
        let url = format!("{}/databases/{}", self.base_url, self.database_id);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(AppwriteError::from)?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn repository(base_url: String) -> AppwriteRepository {
        repository_with_limit(base_url, 100)
    }

    fn repository_with_limit(base_url: String, candidate_limit: usize) -> AppwriteRepository {
        AppwriteRepository::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            AppwriteCollections {
                mentorships: "mentorships".to_string(),
                matches: "matches".to_string(),
            },
            Some(MentorshipStatus::Pending),
            candidate_limit,
        )
        .unwrap()
    }

    fn mentor_document(id: &str, user_id: &str) -> Value {
        json!({
            "$id": id,
            "$collectionId": "mentorships",
            "userId": user_id,
            "position": "mentor",
            "categoryId": "it",
            "categoryName": "IT",
            "answers": ["I teach web development"],
            "status": "pending",
            "isDeleted": false
        })
    }

    #[test]
    fn test_candidate_queries_include_filters() {
        let repo = repository("https://appwrite.test/v1/".to_string());
        assert_eq!(repo.base_url, "https://appwrite.test/v1");

        let queries = repo.candidate_queries("it", None);
        let attributes: Vec<&str> = queries
            .iter()
            .filter_map(|q| q.get("attribute").and_then(|a| a.as_str()))
            .collect();
        assert!(attributes.contains(&"categoryId"));
        assert!(attributes.contains(&"position"));
        assert!(attributes.contains(&"isDeleted"));
        assert!(attributes.contains(&"status"));

        let methods = |queries: &[Value]| -> Vec<String> {
            queries
                .iter()
                .filter_map(|q| q.get("method").and_then(|m| m.as_str()).map(str::to_string))
                .collect()
        };
        assert!(!methods(&queries).contains(&"cursorAfter".to_string()));

        let next = repo.candidate_queries("it", Some("d100"));
        assert!(methods(&next).contains(&"cursorAfter".to_string()));
        assert!(next.contains(&json!({"method": "cursorAfter", "values": ["d100"]})));
    }

    #[tokio::test]
    async fn test_fetch_eligible_candidates() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "total": 2,
            "documents": [mentor_document("d1", "m1"), mentor_document("d2", "m2")]
        });
        let mock = server
            .mock("GET", Matcher::Regex(r"^/databases/test_db/collections/mentorships/documents".to_string()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let repo = repository(server.url());
        let candidates = repo.fetch_eligible_candidates("it").await.unwrap();

        mock.assert_async().await;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "d1");
        assert_eq!(candidates[1].user_id, "m2");
    }

    #[tokio::test]
    async fn test_fetch_eligible_candidates_follows_cursor() {
        let mut server = mockito::Server::new_async().await;
        let path = Matcher::Regex(r"^/databases/test_db/collections/mentorships/documents$".to_string());

        // First page: no cursor yet, a full page of two
        let first_page = json!({
            "total": 3,
            "documents": [mentor_document("d1", "m1"), mentor_document("d2", "m2")]
        });
        let first = server
            .mock("GET", path.clone())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(first_page.to_string())
            .expect(1)
            .create_async()
            .await;

        // Second page: continues after d2 and comes back short
        let second_page = json!({
            "total": 3,
            "documents": [mentor_document("d3", "m3")]
        });
        let second = server
            .mock("GET", path)
            .match_query(Matcher::Regex("cursorAfter".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(second_page.to_string())
            .expect(1)
            .create_async()
            .await;

        let repo = repository_with_limit(server.url(), 2);
        let candidates = repo.fetch_eligible_candidates("it").await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2", "d3"]);
    }

    #[tokio::test]
    async fn test_complete_match_releases_mentee_when_mentor_taken() {
        let mut server = mockito::Server::new_async().await;
        let documents = "/databases/test_db/collections/mentorships/documents";

        let mut mentee = mentor_document("ms-a", "a");
        mentee["position"] = json!("mentee");
        let mut mentor = mentor_document("ms-m", "m");
        mentor["status"] = json!("matched");

        server
            .mock("GET", format!("{}/ms-a", documents).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(mentee.to_string())
            .create_async()
            .await;
        server
            .mock("GET", format!("{}/ms-m", documents).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(mentor.to_string())
            .create_async()
            .await;

        // Once to claim the mentee, once to put it back
        let mentee_patch = server
            .mock("PATCH", format!("{}/ms-a", documents).as_str())
            .with_status(200)
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;
        let mentor_patch = server
            .mock("PATCH", format!("{}/ms-m", documents).as_str())
            .expect(0)
            .create_async()
            .await;
        let match_post = server
            .mock("POST", "/databases/test_db/collections/matches/documents")
            .expect(0)
            .create_async()
            .await;

        let record = MatchRecord {
            id: "match-1".to_string(),
            mentee_id: "a".to_string(),
            mentor_id: "m".to_string(),
            mentee_mentorship_id: "ms-a".to_string(),
            mentor_mentorship_id: "ms-m".to_string(),
            category_id: "it".to_string(),
            similarity_score: 0.9,
            matched_at: chrono::Utc::now(),
        };

        let repo = repository(server.url());
        let err = repo.complete_match(&record).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
        mentee_patch.assert_async().await;
        mentor_patch.assert_async().await;
        match_post.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_missing_record_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/mentorships/documents/nope")
            .with_status(404)
            .with_body(r#"{"message":"Document not found"}"#)
            .create_async()
            .await;

        let repo = repository(server.url());
        assert!(repo.fetch_record_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/databases/test_db/collections/mentorships/documents/nope")
            .with_status(404)
            .create_async()
            .await;

        let repo = repository(server.url());
        let err = repo
            .update_status("nope", MentorshipStatus::Matched)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/mentorships/documents/d1")
            .with_status(401)
            .create_async()
            .await;

        let repo = repository(server.url());
        let err = repo.fetch_record_by_id("d1").await.unwrap_err();
        assert!(matches!(err, RepositoryError::AppwriteError(AppwriteError::Unauthorized)));
    }
}

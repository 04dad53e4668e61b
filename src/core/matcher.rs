use crate::core::{
    embedder::{Embedder, EmbeddingError},
    filters::{check_candidate, EligibilityPolicy},
    selection::{accept, fold_best, Best},
    similarity::{combine_answers, cosine_similarity, SimilarityError},
};
use crate::models::{MatchDecision, Mentorship};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Default bound on a single embedding call
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that abort a matching attempt
#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Degenerate input: {0}")]
    DegenerateInput(#[from] SimilarityError),
}

/// Semantic matching orchestrator
///
/// # Pipeline
/// 1. Combine answer sets into text blocks
/// 2. Eligibility filtering (self-match, status, empty answers)
/// 3. Embedding and cosine scoring, in pool order
/// 4. Best-candidate fold and threshold check
#[derive(Clone)]
pub struct Matcher {
    embedder: Arc<dyn Embedder>,
    policy: EligibilityPolicy,
    embed_timeout: Duration,
    inference_permits: Arc<Semaphore>,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("model", &self.embedder.model_name())
            .field("policy", &self.policy)
            .field("embed_timeout", &self.embed_timeout)
            .finish()
    }
}

impl Matcher {
    /// # Arguments
    /// * `embedder` - Shared, already loaded embedding model
    /// * `policy` - Which candidates may be scored
    /// * `embed_timeout` - Upper bound for one embedding call
    /// * `max_concurrent` - Inference calls allowed in flight across all requests
    pub fn new(
        embedder: Arc<dyn Embedder>,
        policy: EligibilityPolicy,
        embed_timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            embedder,
            policy,
            embed_timeout,
            inference_permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn with_default_policy(embedder: Arc<dyn Embedder>) -> Self {
        Self::new(embedder, EligibilityPolicy::default(), DEFAULT_EMBED_TIMEOUT, 4)
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    /// Embed one text block off the async runtime, bounded by the timeout
    ///
    /// The timeout covers waiting for an inference permit as well as the
    /// inference itself. The permit travels with the blocking task, so a call
    /// that timed out keeps its slot until the model actually returns.
    ///
    /// The output is checked against the model's declared dimension and for
    /// non-finite components before it is used.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let embedder = Arc::clone(&self.embedder);
        let permits = Arc::clone(&self.inference_permits);
        let text = text.to_owned();

        let inference = async move {
            let permit = permits.acquire_owned().await.map_err(EmbeddingError::inference)?;
            let vector = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                embedder.embed(&text)
            })
            .await
            .map_err(EmbeddingError::inference)??;
            Ok::<Vec<f32>, EmbeddingError>(vector)
        };

        let vector = tokio::time::timeout(self.embed_timeout, inference)
            .await
            .map_err(|_| EmbeddingError::Timeout(self.embed_timeout))??;

        let expected = self.embedder.dimension();
        if vector.len() != expected {
            return Err(EmbeddingError::Dimension {
                expected,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(EmbeddingError::NonFinite);
        }

        Ok(vector)
    }

    /// Cosine similarity between the embeddings of two texts
    pub async fn score_similarity(&self, text_a: &str, text_b: &str) -> Result<f32, MatchError> {
        let a = self.embed(text_a).await?;
        let b = self.embed(text_b).await?;
        Ok(cosine_similarity(&a, &b)?)
    }

    /// Find the most similar eligible candidate for a requester
    ///
    /// Candidates are visited in the order supplied. The requester's text is
    /// embedded once, at the first candidate that survives filtering, so an
    /// empty or fully filtered pool never touches the model.
    ///
    /// Any embedding or similarity failure aborts the whole call rather than
    /// skipping the candidate. Dropping the returned future stops the scan at
    /// the next candidate.
    ///
    /// # Returns
    /// `Ok(None)` when no candidate was scored or the best score is below
    /// `minimum_score`
    pub async fn find_best_match(
        &self,
        requester_answers: &[String],
        pool: &[Mentorship],
        requester_user_id: &str,
        minimum_score: f32,
    ) -> Result<Option<MatchDecision>, MatchError> {
        if pool.is_empty() {
            tracing::debug!("Empty candidate pool for {}", requester_user_id);
            return Ok(None);
        }

        let requester_text = combine_answers(requester_answers);
        let mut requester_vector: Option<Vec<f32>> = None;
        let mut best: Option<Best<'_>> = None;

        for (position, candidate) in pool.iter().enumerate() {
            if let Err(reason) = check_candidate(candidate, requester_user_id, &self.policy) {
                tracing::debug!("Skipping candidate #{} ({}): {:?}", position + 1, candidate.id, reason);
                continue;
            }

            let anchor = match requester_vector.take() {
                Some(vector) => vector,
                None => self.embed(&requester_text).await?,
            };

            let candidate_vector = self.embed(&combine_answers(&candidate.answers)).await?;
            let score = cosine_similarity(&anchor, &candidate_vector)?;
            requester_vector = Some(anchor);

            tracing::debug!("Candidate #{} ({}) similarity: {:.4}", position + 1, candidate.id, score);
            best = fold_best(best, candidate, score);
        }

        match &best {
            Some(b) => tracing::info!(
                "Best candidate for {}: {} (score {:.4}, minimum {:.2})",
                requester_user_id,
                b.candidate.user_id,
                b.score,
                minimum_score
            ),
            None => tracing::info!("No eligible candidates for {} among {}", requester_user_id, pool.len()),
        }

        Ok(accept(best, minimum_score))
    }
}

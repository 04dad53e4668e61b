// Core algorithm exports
pub mod embedder;
pub mod filters;
pub mod matcher;
pub mod selection;
pub mod similarity;

pub use embedder::{Embedder, EmbeddingError, HashingEmbedder, ModelSource, SentenceEmbedder};
pub use filters::{check_candidate, EligibilityPolicy, Exclusion};
pub use matcher::{Matcher, MatchError};
pub use selection::{accept, fold_best, select_best, Best};
pub use similarity::{combine_answers, cosine_similarity, SimilarityError};

use thiserror::Error;

/// Separator used when folding an answer set into one text block
pub const ANSWER_SEPARATOR: &str = "\n";

/// Errors raised when a similarity is undefined for the given vectors
#[derive(Debug, Error, PartialEq)]
pub enum SimilarityError {
    #[error("Cosine similarity undefined: vector has zero norm")]
    ZeroNorm,

    #[error("Vector dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("Cosine similarity is not a finite number")]
    NonFinite,
}

/// Combine an ordered answer set into a single text block
///
/// Answers are joined with a newline in their original order. Nothing is
/// trimmed or deduplicated, and an empty set yields an empty string.
#[inline]
pub fn combine_answers(answers: &[String]) -> String {
    answers.join(ANSWER_SEPARATOR)
}

/// Dot product of two equal-length vectors
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean (L2) norm of a vector
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Calculate the cosine similarity between two vectors
///
/// # Arguments
/// * `a` - First embedding
/// * `b` - Second embedding
///
/// # Returns
/// Similarity in [-1.0, 1.0], or an error when either vector has zero norm,
/// the dimensions disagree, or the arithmetic overflows
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SimilarityError::ZeroNorm);
    }

    // Divide in two steps so the norm product cannot overflow on its own
    let score = dot_product(a, b) / norm_a / norm_b;
    if !norm_a.is_finite() || !norm_b.is_finite() || !score.is_finite() {
        return Err(SimilarityError::NonFinite);
    }

    // Rounding can push parallel vectors a hair past 1.0
    Ok(score.clamp(-1.0, 1.0))
}

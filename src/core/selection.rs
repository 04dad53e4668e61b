use crate::models::{MatchDecision, Mentorship};

/// Best candidate seen so far during a scan
#[derive(Debug, Clone, Copy)]
pub struct Best<'a> {
    pub candidate: &'a Mentorship,
    pub score: f32,
}

/// Fold one scored candidate into the running best
///
/// Replacement needs a strictly greater score, so on a tie the candidate seen
/// first keeps its place.
#[inline]
pub fn fold_best<'a>(best: Option<Best<'a>>, candidate: &'a Mentorship, score: f32) -> Option<Best<'a>> {
    if score.is_nan() {
        return best;
    }

    match best {
        Some(current) if score > current.score => Some(Best { candidate, score }),
        Some(current) => Some(current),
        None => Some(Best { candidate, score }),
    }
}

/// Reduce scored candidates, in pool order, to the single best one
pub fn select_best<'a, I>(scored: I) -> Option<Best<'a>>
where
    I: IntoIterator<Item = (&'a Mentorship, f32)>,
{
    scored
        .into_iter()
        .fold(None, |best, (candidate, score)| fold_best(best, candidate, score))
}

/// Apply the acceptance threshold to the best candidate
///
/// A score exactly at `minimum_score` is accepted.
pub fn accept(best: Option<Best<'_>>, minimum_score: f32) -> Option<MatchDecision> {
    let best = best?;
    if best.score.is_nan() || best.score < minimum_score {
        return None;
    }

    Some(MatchDecision {
        mentorship_id: best.candidate.id.clone(),
        mentor_id: best.candidate.user_id.clone(),
        category_id: best.candidate.category_id.clone(),
        similarity_score: best.score,
    })
}

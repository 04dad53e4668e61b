use crate::models::{Mentorship, MentorshipStatus};

/// Predicates deciding which candidates the matcher will score
///
/// The eligible status and the empty-answer rule are configuration rather than
/// fixed rules, since deployments disagree on whether the repository already
/// filters by status.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityPolicy {
    /// Status a candidate must be in; `None` accepts any status
    pub eligible_status: Option<MentorshipStatus>,
    /// Skip candidates with no recorded answers
    pub require_answers: bool,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            eligible_status: Some(MentorshipStatus::Pending),
            require_answers: true,
        }
    }
}

/// Reason a candidate was left out of scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    SelfMatch,
    Status(MentorshipStatus),
    NoAnswers,
}

/// Check whether a candidate may be scored against the requester
///
/// Self-match exclusion comes first: a requester is never matched with a
/// record they own, however similar the text.
#[inline]
pub fn check_candidate(
    candidate: &Mentorship,
    requester_user_id: &str,
    policy: &EligibilityPolicy,
) -> Result<(), Exclusion> {
    if candidate.user_id == requester_user_id {
        return Err(Exclusion::SelfMatch);
    }

    if let Some(required) = policy.eligible_status {
        if candidate.status != required {
            return Err(Exclusion::Status(candidate.status));
        }
    }

    if policy.require_answers && !candidate.has_answers() {
        return Err(Exclusion::NoAnswers);
    }

    Ok(())
}

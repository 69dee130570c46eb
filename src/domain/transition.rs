//! Review state machine.
//!
//! The submission state is a deterministic function of the ordered review
//! ledger: folding [`next_state`] over the reviews from `Pending` must
//! always reproduce the stored state. [`replay`] implements that fold and
//! is used by tests as a consistency check.

use super::{Recommendation, Review, SubmissionState};
use crate::error::Error;

/// Compute the state a review recommendation moves a submission into.
///
/// Terminal states accept no further reviews. The first review always
/// moves a `Pending` submission out of `Pending`; nothing moves it back.
pub fn next_state(
    current: SubmissionState,
    recommendation: Recommendation,
) -> Result<SubmissionState, Error> {
    if current.is_terminal() {
        return Err(Error::InvalidState(current));
    }

    let next = match recommendation {
        Recommendation::Approve => SubmissionState::Approved,
        Recommendation::Reject => SubmissionState::Rejected,
        Recommendation::MinorRevision | Recommendation::MajorRevision => {
            SubmissionState::InReview
        }
    };

    Ok(next)
}

/// Enforce the comment requirement before any transition is computed, so
/// a violation leaves the submission untouched.
pub fn validate_comments(recommendation: Recommendation, comments: &str) -> Result<(), Error> {
    if recommendation.requires_comments() && comments.trim().is_empty() {
        return Err(Error::Validation(format!(
            "comments are required for a {} recommendation",
            recommendation.as_str()
        )));
    }
    Ok(())
}

/// Recompute the state implied by a review ledger, starting from `Pending`.
pub fn replay<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Result<SubmissionState, Error> {
    let mut state = SubmissionState::Pending;
    for review in reviews {
        state = next_state(state, review.recommendation)?;
    }
    Ok(state)
}

//! Access policy engine.
//!
//! Every capability check the surface needs, evaluated against a resolved
//! identity before any other component is touched. Submitters see only
//! their own records; the reviewer capability grants cross-submission
//! visibility and the state-changing actions.

use crate::domain::Submission;
use crate::error::{Error, Result};
use crate::identity::Identity;

/// Any authenticated identity may register a submission. Reviewers are
/// not blocked from submitting; the surface simply never offers it.
pub fn authorize_create(_identity: &Identity) -> Result<()> {
    Ok(())
}

pub fn authorize_list_all(identity: &Identity) -> Result<()> {
    if identity.is_reviewer {
        Ok(())
    } else {
        Err(Error::Forbidden("listing all submissions requires the reviewer capability"))
    }
}

pub fn authorize_review(identity: &Identity) -> Result<()> {
    if identity.is_reviewer {
        Ok(())
    } else {
        Err(Error::Forbidden("reviewing requires the reviewer capability"))
    }
}

pub fn authorize_delete(identity: &Identity) -> Result<()> {
    if identity.is_reviewer {
        Ok(())
    } else {
        Err(Error::Forbidden("deleting requires the reviewer capability"))
    }
}

/// Reading a single submission, or its stored document, is limited to
/// the owner and reviewers.
pub fn authorize_read(identity: &Identity, submission: &Submission) -> Result<()> {
    if identity.is_reviewer || submission.owner == identity.id {
        Ok(())
    } else {
        Err(Error::Forbidden("only the owner or a reviewer may read this submission"))
    }
}

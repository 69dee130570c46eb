//! Submission registry.
//!
//! Owns the collection of submission records and drives the review
//! workflow: every operation runs its policy check first, and the two
//! mutating operations (`apply_review`, `delete`) serialize per
//! submission so at most one state transition commits at a time.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{self, NewSubmission, Recommendation, Review, Submission, SubmissionState};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::policy;
use crate::store::SubmissionStore;

pub struct SubmissionRegistry {
    store: Arc<dyn SubmissionStore>,
    // Per-submission exclusive sections. An entry lives as long as the
    // submission does; `delete` drops it.
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SubmissionRegistry {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id).or_default().clone()
    }

    // Unknown ids must not leave entries behind, or the map would grow
    // with every misdirected request. Any task that already cloned the
    // same Arc keeps serializing on it; the map entry is just the
    // rendezvous point for future callers.
    async fn discard_lock(&self, id: Uuid) {
        self.locks.lock().await.remove(&id);
    }

    #[cfg(test)]
    async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn create(&self, identity: &Identity, new: NewSubmission) -> Result<Submission> {
        policy::authorize_create(identity)?;

        if new.title.trim().is_empty() {
            return Err(Error::Validation("title is required".into()));
        }
        if new.summary.trim().is_empty() {
            return Err(Error::Validation("summary is required".into()));
        }
        if new.attachment_ref.is_empty() {
            return Err(Error::Validation("a document attachment is required".into()));
        }

        let submission = Submission {
            id: Uuid::new_v4(),
            owner: identity.id,
            owner_username: identity.username.clone(),
            title: new.title.trim().to_string(),
            summary: new.summary.trim().to_string(),
            work_type: new.work_type,
            state: SubmissionState::Pending,
            attachment_ref: new.attachment_ref,
            filename: new.filename,
            created_at: Utc::now(),
            reviews: Vec::new(),
            version: 0,
        };

        self.store.insert(&submission).await?;
        tracing::info!(
            submission_id = %submission.id,
            owner = %submission.owner_username,
            work_type = submission.work_type.as_str(),
            "submission registered"
        );
        Ok(submission)
    }

    pub async fn list_own(&self, identity: &Identity) -> Result<Vec<Submission>> {
        self.store.list_by_owner(identity.id).await
    }

    pub async fn list_all(&self, identity: &Identity) -> Result<Vec<Submission>> {
        policy::authorize_list_all(identity)?;
        self.store.list_all().await
    }

    pub async fn get(&self, identity: &Identity, id: Uuid) -> Result<Submission> {
        let submission = self.store.get(id).await?.ok_or(Error::NotFound)?;
        policy::authorize_read(identity, &submission)?;
        Ok(submission)
    }

    /// Append a review and advance the state as one atomic step. Either
    /// both happen or neither does: validation runs before the
    /// transition is computed, and the store commit is guarded by the
    /// version read under the per-submission lock.
    pub async fn apply_review(
        &self,
        identity: &Identity,
        id: Uuid,
        recommendation: Recommendation,
        comments: &str,
    ) -> Result<Submission> {
        policy::authorize_review(identity)?;

        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let submission = match self.store.get(id).await? {
            Some(submission) => submission,
            None => {
                self.discard_lock(id).await;
                return Err(Error::NotFound);
            }
        };

        domain::validate_comments(recommendation, comments)?;
        let next = domain::next_state(submission.state, recommendation)?;

        let review = Review {
            id: Uuid::new_v4(),
            submission_id: id,
            reviewer: identity.id,
            reviewer_username: identity.username.clone(),
            recommendation,
            comments: comments.trim().to_string(),
            created_at: Utc::now(),
        };

        let expected_version = submission.version;
        let mut updated = submission;
        updated.state = next;
        updated.version += 1;
        updated.reviews.push(review.clone());

        self.store.commit_review(&updated, &review, expected_version).await?;
        tracing::info!(
            submission_id = %id,
            reviewer = %identity.username,
            recommendation = recommendation.as_str(),
            state = updated.state.as_str(),
            "review applied"
        );
        Ok(updated)
    }

    /// Remove a finalized submission. Shares the per-submission lock
    /// with `apply_review`, so a delete cannot interleave with an
    /// in-flight transition. Returns the deleted record so the caller
    /// can clean up the stored document.
    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<Submission> {
        policy::authorize_delete(identity)?;

        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let submission = match self.store.get(id).await? {
            Some(submission) => submission,
            None => {
                self.discard_lock(id).await;
                return Err(Error::NotFound);
            }
        };
        if !submission.state.is_terminal() {
            return Err(Error::InvalidState(submission.state));
        }

        self.store.delete(id).await?;
        self.discard_lock(id).await;
        tracing::info!(submission_id = %id, "submission deleted");
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WorkType;
    use crate::store::InMemoryStore;
    use assert_matches::assert_matches;

    fn registry() -> SubmissionRegistry {
        SubmissionRegistry::new(Arc::new(InMemoryStore::new()))
    }

    fn submitter(name: &str) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            username: name.into(),
            is_reviewer: false,
        }
    }

    fn reviewer(name: &str) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            username: name.into(),
            is_reviewer: true,
        }
    }

    fn new_submission(title: &str) -> NewSubmission {
        NewSubmission {
            title: title.into(),
            summary: "a study".into(),
            work_type: WorkType::Article,
            attachment_ref: "20260829_abcd1234_paper.pdf".into(),
            filename: "paper.pdf".into(),
        }
    }

    #[tokio::test]
    async fn create_starts_pending_with_empty_ledger() {
        let registry = registry();
        let owner = submitter("u1");

        let sub = registry.create(&owner, new_submission("T")).await.unwrap();
        assert_eq!(sub.state, SubmissionState::Pending);
        assert!(sub.reviews.is_empty());
        assert_eq!(sub.owner, owner.id);
    }

    #[tokio::test]
    async fn create_rejects_missing_fields() {
        let registry = registry();
        let owner = submitter("u1");

        assert_matches!(
            registry.create(&owner, new_submission("  ")).await,
            Err(Error::Validation(_))
        );

        let mut no_summary = new_submission("T");
        no_summary.summary = "".into();
        assert_matches!(
            registry.create(&owner, no_summary).await,
            Err(Error::Validation(_))
        );

        let mut no_attachment = new_submission("T");
        no_attachment.attachment_ref = "".into();
        assert_matches!(
            registry.create(&owner, no_attachment).await,
            Err(Error::Validation(_))
        );
    }

    #[tokio::test]
    async fn list_own_never_leaks_other_owners() {
        let registry = registry();
        let u1 = submitter("u1");
        let u2 = submitter("u2");

        registry.create(&u1, new_submission("mine")).await.unwrap();
        registry.create(&u2, new_submission("theirs")).await.unwrap();

        let listed = registry.list_own(&u1).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.iter().all(|s| s.owner == u1.id));
    }

    #[tokio::test]
    async fn list_all_requires_reviewer() {
        let registry = registry();
        let u1 = submitter("u1");
        registry.create(&u1, new_submission("T")).await.unwrap();

        assert_matches!(registry.list_all(&u1).await, Err(Error::Forbidden(_)));
        assert_eq!(registry.list_all(&reviewer("r1")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_requires_owner_or_reviewer() {
        let registry = registry();
        let u1 = submitter("u1");
        let sub = registry.create(&u1, new_submission("T")).await.unwrap();

        assert!(registry.get(&u1, sub.id).await.is_ok());
        assert!(registry.get(&reviewer("r1"), sub.id).await.is_ok());
        assert_matches!(
            registry.get(&submitter("u2"), sub.id).await,
            Err(Error::Forbidden(_))
        );
        assert_matches!(
            registry.get(&u1, Uuid::new_v4()).await,
            Err(Error::NotFound)
        );
    }

    #[tokio::test]
    async fn review_requires_reviewer_capability() {
        let registry = registry();
        let u1 = submitter("u1");
        let sub = registry.create(&u1, new_submission("T")).await.unwrap();

        assert_matches!(
            registry
                .apply_review(&u1, sub.id, Recommendation::Approve, "")
                .await,
            Err(Error::Forbidden(_))
        );
    }

    #[tokio::test]
    async fn reject_without_comments_leaves_no_trace() {
        let registry = registry();
        let u1 = submitter("u1");
        let r1 = reviewer("r1");
        let sub = registry.create(&u1, new_submission("T")).await.unwrap();

        assert_matches!(
            registry
                .apply_review(&r1, sub.id, Recommendation::Reject, "  ")
                .await,
            Err(Error::Validation(_))
        );

        let unchanged = registry.get(&r1, sub.id).await.unwrap();
        assert_eq!(unchanged.state, SubmissionState::Pending);
        assert!(unchanged.reviews.is_empty());
    }

    #[tokio::test]
    async fn review_appends_and_transitions_atomically() {
        let registry = registry();
        let u1 = submitter("u1");
        let r1 = reviewer("r1");
        let sub = registry.create(&u1, new_submission("T")).await.unwrap();

        let after = registry
            .apply_review(&r1, sub.id, Recommendation::MinorRevision, "fix intro")
            .await
            .unwrap();
        assert_eq!(after.state, SubmissionState::InReview);
        assert_eq!(after.reviews.len(), 1);
        assert_eq!(after.reviews[0].reviewer, r1.id);
        assert_eq!(after.reviews[0].comments, "fix intro");

        // State always matches the ledger replay.
        assert_eq!(domain::replay(&after.reviews).unwrap(), after.state);
    }

    #[tokio::test]
    async fn terminal_submissions_accept_no_more_reviews() {
        let registry = registry();
        let u1 = submitter("u1");
        let r1 = reviewer("r1");
        let sub = registry.create(&u1, new_submission("T")).await.unwrap();

        registry
            .apply_review(&r1, sub.id, Recommendation::Approve, "")
            .await
            .unwrap();

        assert_matches!(
            registry
                .apply_review(&r1, sub.id, Recommendation::MajorRevision, "late")
                .await,
            Err(Error::InvalidState(SubmissionState::Approved))
        );

        let stored = registry.get(&r1, sub.id).await.unwrap();
        assert_eq!(stored.reviews.len(), 1);
    }

    #[tokio::test]
    async fn delete_only_in_terminal_state() {
        let registry = registry();
        let u1 = submitter("u1");
        let r1 = reviewer("r1");
        let sub = registry.create(&u1, new_submission("T")).await.unwrap();

        assert_matches!(
            registry.delete(&r1, sub.id).await,
            Err(Error::InvalidState(SubmissionState::Pending))
        );
        assert_matches!(registry.delete(&u1, sub.id).await, Err(Error::Forbidden(_)));

        registry
            .apply_review(&r1, sub.id, Recommendation::Reject, "out of scope")
            .await
            .unwrap();
        registry.delete(&r1, sub.id).await.unwrap();
        assert_matches!(registry.get(&r1, sub.id).await, Err(Error::NotFound));
    }

    #[tokio::test]
    async fn unknown_ids_leave_no_lock_entries() {
        let registry = registry();
        let r1 = reviewer("r1");

        for _ in 0..3 {
            assert_matches!(
                registry
                    .apply_review(&r1, Uuid::new_v4(), Recommendation::Approve, "")
                    .await,
                Err(Error::NotFound)
            );
            assert_matches!(registry.delete(&r1, Uuid::new_v4()).await, Err(Error::NotFound));
        }

        assert_eq!(registry.lock_count().await, 0);
    }

    #[tokio::test]
    async fn deletion_drops_the_lock_entry() {
        let registry = registry();
        let u1 = submitter("u1");
        let r1 = reviewer("r1");
        let sub = registry.create(&u1, new_submission("T")).await.unwrap();

        registry
            .apply_review(&r1, sub.id, Recommendation::Approve, "")
            .await
            .unwrap();
        assert_eq!(registry.lock_count().await, 1);

        registry.delete(&r1, sub.id).await.unwrap();
        assert_eq!(registry.lock_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_first_reviews_serialize() {
        let registry = Arc::new(registry());
        let u1 = submitter("u1");
        let r1 = reviewer("r1");
        let r2 = reviewer("r2");
        let sub = registry.create(&u1, new_submission("T")).await.unwrap();

        let a = {
            let registry = registry.clone();
            let r1 = r1.clone();
            let id = sub.id;
            tokio::spawn(async move {
                registry.apply_review(&r1, id, Recommendation::Approve, "").await
            })
        };
        let b = {
            let registry = registry.clone();
            let r2 = r2.clone();
            let id = sub.id;
            tokio::spawn(async move {
                registry
                    .apply_review(&r2, id, Recommendation::Reject, "not sound")
                    .await
            })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let committed = results.iter().filter(|r| r.is_ok()).count();
        // Exactly one transition commits; the loser observes the
        // terminal state (or a lost version race) and fails cleanly.
        assert_eq!(committed, 1);
        for result in &results {
            if let Err(e) = result {
                assert_matches!(e, Error::InvalidState(_) | Error::Conflict);
            }
        }

        let stored = registry.get(&r1, sub.id).await.unwrap();
        assert!(stored.state.is_terminal());
        assert_eq!(stored.reviews.len(), 1);
        assert_eq!(domain::replay(&stored.reviews).unwrap(), stored.state);
    }
}

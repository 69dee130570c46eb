//! End-to-end review workflow, run against the in-memory store.

use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use registro::domain::{self, NewSubmission, Recommendation, SubmissionState, WorkType};
use registro::error::Error;
use registro::identity::Identity;
use registro::registry::SubmissionRegistry;
use registro::store::InMemoryStore;

fn identity(username: &str, is_reviewer: bool) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        username: username.into(),
        is_reviewer,
    }
}

fn article(title: &str) -> NewSubmission {
    NewSubmission {
        title: title.into(),
        summary: "an investigation".into(),
        work_type: WorkType::Article,
        attachment_ref: "20260829_0a1b2c3d_paper.pdf".into(),
        filename: "paper.pdf".into(),
    }
}

#[tokio::test]
async fn full_lifecycle_from_registration_to_deletion() {
    let registry = SubmissionRegistry::new(Arc::new(InMemoryStore::new()));
    let u1 = identity("u1", false);
    let r1 = identity("r1", true);
    let r2 = identity("r2", true);

    // Registration starts the lifecycle in Pending with an empty ledger.
    let sub = registry.create(&u1, article("T")).await.unwrap();
    assert_eq!(sub.state, SubmissionState::Pending);
    assert!(sub.reviews.is_empty());

    // First verdict moves the submission into review.
    let sub = registry
        .apply_review(&r1, sub.id, Recommendation::MinorRevision, "fix intro")
        .await
        .unwrap();
    assert_eq!(sub.state, SubmissionState::InReview);
    assert_eq!(sub.reviews.len(), 1);
    assert_eq!(sub.reviews[0].reviewer, r1.id);
    assert_eq!(sub.reviews[0].recommendation, Recommendation::MinorRevision);
    assert_eq!(sub.reviews[0].comments, "fix intro");

    // A second reviewer finalizes it.
    let sub = registry
        .apply_review(&r2, sub.id, Recommendation::Approve, "")
        .await
        .unwrap();
    assert_eq!(sub.state, SubmissionState::Approved);
    assert_eq!(sub.reviews.len(), 2);
    assert_eq!(domain::replay(&sub.reviews).unwrap(), sub.state);

    // Terminal means terminal.
    assert_matches!(
        registry
            .apply_review(&r1, sub.id, Recommendation::Reject, "too late")
            .await,
        Err(Error::InvalidState(SubmissionState::Approved))
    );

    // Finalized submissions can be removed, after which nobody sees them.
    registry.delete(&r1, sub.id).await.unwrap();
    assert!(registry.list_all(&r1).await.unwrap().is_empty());
    assert_matches!(registry.get(&u1, sub.id).await, Err(Error::NotFound));
}

#[tokio::test]
async fn visibility_is_scoped_by_role() {
    let registry = SubmissionRegistry::new(Arc::new(InMemoryStore::new()));
    let u1 = identity("u1", false);
    let u2 = identity("u2", false);
    let r1 = identity("r1", true);

    registry.create(&u1, article("first")).await.unwrap();
    registry.create(&u2, article("second")).await.unwrap();
    registry.create(&u1, article("third")).await.unwrap();

    let own = registry.list_own(&u1).await.unwrap();
    assert_eq!(own.len(), 2);
    assert!(own.iter().all(|s| s.owner == u1.id));

    assert_matches!(registry.list_all(&u2).await, Err(Error::Forbidden(_)));
    assert_eq!(registry.list_all(&r1).await.unwrap().len(), 3);
}

#[tokio::test]
async fn state_always_matches_ledger_replay() {
    let registry = SubmissionRegistry::new(Arc::new(InMemoryStore::new()));
    let u1 = identity("u1", false);
    let r1 = identity("r1", true);

    let sub = registry.create(&u1, article("T")).await.unwrap();
    let steps = [
        (Recommendation::MajorRevision, "restructure"),
        (Recommendation::MinorRevision, "tighten abstract"),
        (Recommendation::Reject, "out of scope after all"),
    ];

    for (recommendation, comments) in steps {
        let current = registry
            .apply_review(&r1, sub.id, recommendation, comments)
            .await
            .unwrap();
        assert_eq!(domain::replay(&current.reviews).unwrap(), current.state);
    }

    let stored = registry.get(&r1, sub.id).await.unwrap();
    assert_eq!(stored.state, SubmissionState::Rejected);
    assert_eq!(stored.reviews.len(), 3);
}

//! In-memory implementation of [`SubmissionStore`].
//!
//! Holds everything in a `HashMap` behind an `RwLock`; all records are
//! lost on restart. Used by the test suite and useful for local demos.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::SubmissionStore;
use crate::domain::{Review, Submission};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct InMemoryStore {
    submissions: RwLock<HashMap<Uuid, Submission>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn most_recent_first(mut subs: Vec<Submission>) -> Vec<Submission> {
    subs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    subs
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn insert(&self, submission: &Submission) -> Result<()> {
        let mut submissions = self.submissions.write().await;
        submissions.insert(submission.id, submission.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Submission>> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Submission>> {
        let submissions = self.submissions.read().await;
        Ok(most_recent_first(
            submissions
                .values()
                .filter(|s| s.owner == owner)
                .cloned()
                .collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<Submission>> {
        let submissions = self.submissions.read().await;
        Ok(most_recent_first(submissions.values().cloned().collect()))
    }

    async fn commit_review(
        &self,
        updated: &Submission,
        _review: &Review,
        expected_version: i64,
    ) -> Result<()> {
        let mut submissions = self.submissions.write().await;
        let current = submissions.get(&updated.id).ok_or(Error::NotFound)?;
        if current.version != expected_version {
            return Err(Error::Conflict);
        }
        submissions.insert(updated.id, updated.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut submissions = self.submissions.write().await;
        submissions.remove(&id).ok_or(Error::NotFound)?;
        Ok(())
    }
}

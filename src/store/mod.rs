//! Persistence for submission records.
//!
//! The registry talks to a [`SubmissionStore`] trait so the workflow
//! logic is independent of the backend: Postgres in production, an
//! in-memory map in tests.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, run_migrations, DbPool, PgStore};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Review, Submission};
use crate::error::Result;

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Persist a freshly created submission.
    async fn insert(&self, submission: &Submission) -> Result<()>;

    /// Fetch one submission with its full review ledger.
    async fn get(&self, id: Uuid) -> Result<Option<Submission>>;

    /// All submissions for one owner, most-recent-first.
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Submission>>;

    /// Every submission, most-recent-first.
    async fn list_all(&self) -> Result<Vec<Submission>>;

    /// Commit a state transition and its review append as one atomic
    /// step, guarded by the version counter: if the stored version no
    /// longer equals `expected_version` the commit fails with
    /// `Conflict` and nothing is written.
    async fn commit_review(
        &self,
        updated: &Submission,
        review: &Review,
        expected_version: i64,
    ) -> Result<()>;

    /// Remove a submission and its reviews. Fails with `NotFound` if
    /// the id is unknown.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

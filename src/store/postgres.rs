//! Postgres implementation of [`SubmissionStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::SubmissionStore;
use crate::domain::{Recommendation, Review, Submission, SubmissionState, WorkType};
use crate::error::{Error, Result};

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn reviews_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Review>>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, submission_id, reviewer_id, reviewer_username,
                   recommendation, comments, created_at
            FROM reviews
            WHERE submission_id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut by_submission: HashMap<Uuid, Vec<Review>> = HashMap::new();
        for row in rows {
            let review = row.into_domain()?;
            by_submission.entry(review.submission_id).or_default().push(review);
        }
        Ok(by_submission)
    }

    async fn assemble(&self, rows: Vec<SubmissionRow>) -> Result<Vec<Submission>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut reviews = self.reviews_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let ledger = reviews.remove(&row.id).unwrap_or_default();
                row.into_domain(ledger)
            })
            .collect()
    }
}

#[derive(FromRow)]
struct SubmissionRow {
    id: Uuid,
    owner_id: Uuid,
    owner_username: String,
    title: String,
    summary: String,
    work_type: String,
    state: String,
    attachment_ref: String,
    filename: String,
    version: i64,
    created_at: DateTime<Utc>,
}

impl SubmissionRow {
    fn into_domain(self, reviews: Vec<Review>) -> Result<Submission> {
        let work_type = WorkType::parse(&self.work_type)
            .ok_or_else(|| Error::Internal(format!("unknown work type '{}'", self.work_type)))?;
        let state = SubmissionState::parse(&self.state)
            .ok_or_else(|| Error::Internal(format!("unknown state '{}'", self.state)))?;

        Ok(Submission {
            id: self.id,
            owner: self.owner_id,
            owner_username: self.owner_username,
            title: self.title,
            summary: self.summary,
            work_type,
            state,
            attachment_ref: self.attachment_ref,
            filename: self.filename,
            created_at: self.created_at,
            reviews,
            version: self.version,
        })
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    submission_id: Uuid,
    reviewer_id: Uuid,
    reviewer_username: String,
    recommendation: String,
    comments: String,
    created_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_domain(self) -> Result<Review> {
        let recommendation = Recommendation::parse(&self.recommendation).ok_or_else(|| {
            Error::Internal(format!("unknown recommendation '{}'", self.recommendation))
        })?;

        Ok(Review {
            id: self.id,
            submission_id: self.submission_id,
            reviewer: self.reviewer_id,
            reviewer_username: self.reviewer_username,
            recommendation,
            comments: self.comments,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn insert(&self, submission: &Submission) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO submissions
                (id, owner_id, owner_username, title, summary, work_type,
                 state, attachment_ref, filename, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(submission.id)
        .bind(submission.owner)
        .bind(&submission.owner_username)
        .bind(&submission.title)
        .bind(&submission.summary)
        .bind(submission.work_type.as_str())
        .bind(submission.state.as_str())
        .bind(&submission.attachment_ref)
        .bind(&submission.filename)
        .bind(submission.version)
        .bind(submission.created_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Submission>> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            "SELECT * FROM submissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            "SELECT * FROM submissions WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(owner)
        .fetch_all(self.pool.as_ref())
        .await?;

        self.assemble(rows).await
    }

    async fn list_all(&self) -> Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            "SELECT * FROM submissions ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        self.assemble(rows).await
    }

    async fn commit_review(
        &self,
        updated: &Submission,
        review: &Review,
        expected_version: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET state = $1, version = $2
            WHERE id = $3 AND version = $4
            "#,
        )
        .bind(updated.state.as_str())
        .bind(updated.version)
        .bind(updated.id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a lost race from a deleted record.
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM submissions WHERE id = $1",
            )
            .bind(updated.id)
            .fetch_one(&mut *tx)
            .await?;
            return Err(if exists > 0 { Error::Conflict } else { Error::NotFound });
        }

        sqlx::query(
            r#"
            INSERT INTO reviews
                (id, submission_id, reviewer_id, reviewer_username,
                 recommendation, comments, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id)
        .bind(review.submission_id)
        .bind(review.reviewer)
        .bind(&review.reviewer_username)
        .bind(review.recommendation.as_str())
        .bind(&review.comments)
        .bind(review.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM submissions WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}

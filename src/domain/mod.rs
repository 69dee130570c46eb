mod transition;

pub use transition::{next_state, replay, validate_comments};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of document a submission registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Article,
    UndergraduateThesis,
    GraduateThesis,
}

impl WorkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::Article => "article",
            WorkType::UndergraduateThesis => "undergraduate_thesis",
            WorkType::GraduateThesis => "graduate_thesis",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "article" => Some(WorkType::Article),
            "undergraduate_thesis" => Some(WorkType::UndergraduateThesis),
            "graduate_thesis" => Some(WorkType::GraduateThesis),
            _ => None,
        }
    }
}

/// Lifecycle state of a submission. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl SubmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionState::Pending => "pending",
            SubmissionState::InReview => "in_review",
            SubmissionState::Approved => "approved",
            SubmissionState::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubmissionState::Pending),
            "in_review" => Some(SubmissionState::InReview),
            "approved" => Some(SubmissionState::Approved),
            "rejected" => Some(SubmissionState::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Approved | SubmissionState::Rejected)
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewer's verdict on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    Reject,
    MinorRevision,
    MajorRevision,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Approve => "approve",
            Recommendation::Reject => "reject",
            Recommendation::MinorRevision => "minor_revision",
            Recommendation::MajorRevision => "major_revision",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Recommendation::Approve),
            "reject" => Some(Recommendation::Reject),
            "minor_revision" => Some(Recommendation::MinorRevision),
            "major_revision" => Some(Recommendation::MajorRevision),
            _ => None,
        }
    }

    /// Every recommendation except a plain approval must be motivated.
    pub fn requires_comments(&self) -> bool {
        !matches!(self, Recommendation::Approve)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub reviewer: Uuid,
    pub reviewer_username: String,
    pub recommendation: Recommendation,
    pub comments: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub owner: Uuid,
    pub owner_username: String,
    pub title: String,
    pub summary: String,
    pub work_type: WorkType,
    pub state: SubmissionState,
    pub attachment_ref: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub reviews: Vec<Review>,
    /// Optimistic-concurrency counter, bumped on every committed transition.
    #[serde(skip)]
    pub version: i64,
}

/// Payload for registering a new submission. The attachment is stored
/// before the record is created, so only its reference travels here.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub title: String,
    pub summary: String,
    pub work_type: WorkType,
    pub attachment_ref: String,
    pub filename: String,
}

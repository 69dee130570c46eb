use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{NewSubmission, Recommendation, SubmissionState, WorkType};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::routes::AuthUser;
use crate::state::AppState;

pub async fn me(AuthUser(identity): AuthUser) -> Json<Identity> {
    Json(identity)
}

pub async fn create_submission(
    AuthUser(identity): AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut title = String::new();
    let mut summary = String::new();
    let mut work_type: Option<WorkType> = None;
    let mut document: Option<Vec<u8>> = None;
    let mut filename = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| Error::Validation(e.to_string()))?;
            }
            "summary" => {
                summary = field
                    .text()
                    .await
                    .map_err(|e| Error::Validation(e.to_string()))?;
            }
            "work_type" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| Error::Validation(e.to_string()))?;
                work_type = Some(WorkType::parse(raw.trim()).ok_or_else(|| {
                    Error::Validation(format!(
                        "unknown work type '{}'; expected article, undergraduate_thesis or graduate_thesis",
                        raw.trim()
                    ))
                })?);
            }
            "document" => {
                filename = field.file_name().unwrap_or("document").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::Validation(e.to_string()))?;
                document = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let work_type =
        work_type.ok_or_else(|| Error::Validation("work_type is required".into()))?;
    let document = match document {
        Some(d) if !d.is_empty() => d,
        _ => return Err(Error::Validation("a document attachment is required".into())),
    };

    let submission =
        store_and_register(&state, &identity, title, summary, work_type, filename, document)
            .await?;

    Ok((StatusCode::CREATED, Json(submission)))
}

/// Store the uploaded document, then register the submission. The record
/// carries the attachment reference, so the document must be stored
/// first; if registration is then rejected, the document is removed
/// again rather than left orphaned in the upload folder.
async fn store_and_register(
    state: &AppState,
    identity: &Identity,
    title: String,
    summary: String,
    work_type: WorkType,
    filename: String,
    document: Vec<u8>,
) -> Result<crate::domain::Submission> {
    let attachment_ref = state.documents.store(&filename, &document).await?;

    let new = NewSubmission {
        title,
        summary,
        work_type,
        attachment_ref: attachment_ref.clone(),
        filename,
    };

    match state.registry.create(identity, new).await {
        Ok(submission) => Ok(submission),
        Err(e) => {
            if let Err(cleanup) = state.documents.remove(&attachment_ref).await {
                tracing::warn!(
                    error = %cleanup,
                    "failed to remove stored document after rejected registration"
                );
            }
            Err(e)
        }
    }
}

pub async fn list_own(
    AuthUser(identity): AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse> {
    let submissions = state.registry.list_own(&identity).await?;
    Ok(Json(submissions))
}

pub async fn list_all(
    AuthUser(identity): AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse> {
    let submissions = state.registry.list_all(&identity).await?;
    Ok(Json(submissions))
}

pub async fn get_submission(
    AuthUser(identity): AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let submission = state.registry.get(&identity, id).await?;
    Ok(Json(submission))
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub recommendation: String,
    #[serde(default)]
    pub comments: String,
}

pub async fn add_review(
    AuthUser(identity): AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<impl IntoResponse> {
    let recommendation = Recommendation::parse(request.recommendation.trim()).ok_or_else(|| {
        Error::Validation(format!(
            "unknown recommendation '{}'; expected approve, reject, minor_revision or major_revision",
            request.recommendation.trim()
        ))
    })?;

    let submission = state
        .registry
        .apply_review(&identity, id, recommendation, &request.comments)
        .await?;

    Ok((StatusCode::CREATED, Json(submission)))
}

pub async fn delete_submission(
    AuthUser(identity): AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let deleted = state.registry.delete(&identity, id).await?;

    // The record is gone; a dangling file is only worth a warning.
    if let Err(e) = state.documents.remove(&deleted.attachment_ref).await {
        tracing::warn!(
            submission_id = %id,
            error = %e,
            "failed to remove stored document"
        );
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_document(
    AuthUser(identity): AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let submission = state.registry.get(&identity, id).await?;
    let bytes = state.documents.fetch(&submission.attachment_ref).await?;

    let mime = mime_guess::from_path(&submission.filename)
        .first_raw()
        .unwrap_or("application/octet-stream");

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", submission.filename),
            ),
        ],
        bytes,
    ))
}

pub async fn download_record(
    AuthUser(identity): AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let submission = state.registry.get(&identity, id).await?;

    // The record PDF exists once review has started.
    if submission.state == SubmissionState::Pending {
        return Err(Error::InvalidState(submission.state));
    }

    let bytes = crate::pdf::generate_record(&submission)?;
    let download_name = format!(
        "Submission_{}_{}.pdf",
        submission.id,
        submission.title.replace(' ', "_").chars().take(20).collect::<String>()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_name),
            ),
        ],
        bytes,
    ))
}

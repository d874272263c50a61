//! Axum route handlers for the Match API.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::ingest::{extract_pdf_text, validate_upload};
use crate::matching::pipeline::MatchReport;
use crate::state::AppState;

const MISSING_FIELDS: &str = "resume and job_description required";

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub resume_text: String,
    pub job_description: String,
}

/// POST /analyze
///
/// Multipart upload: `resume` (PDF file) and `job_description` (text).
/// Extracts the résumé text, then scores it against the job description.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MatchReport>, AppError> {
    let mut resume: Option<(String, Vec<u8>)> = None;
    let mut jd_text = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("resume") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                // browsers send an empty filename when no file was chosen
                if filename.is_empty() {
                    continue;
                }
                let bytes = field.bytes().await.map_err(multipart_error)?;
                resume = Some((filename, bytes.to_vec()));
            }
            Some("job_description") => {
                jd_text = field.text().await.map_err(multipart_error)?;
            }
            _ => {}
        }
    }

    let (filename, bytes) = match resume {
        Some(upload) if !jd_text.trim().is_empty() => upload,
        _ => return Err(AppError::Validation(MISSING_FIELDS.to_string())),
    };

    validate_upload(&filename, bytes.len(), state.config.max_upload_bytes())?;
    debug!(filename = %filename, bytes = bytes.len(), "Extracting résumé text");

    let resume_text = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
        .await
        .map_err(|e| AppError::Validation(format!("Failed to extract text from PDF: {e}")))??;

    let result = state.pipeline.analyze(&resume_text, &jd_text).await?;
    Ok(Json(MatchReport::from(&result)))
}

/// POST /api/v1/match
///
/// Scores already-extracted résumé text against a job description.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchReport>, AppError> {
    let result = state
        .pipeline
        .analyze(&request.resume_text, &request.job_description)
        .await?;
    Ok(Json(MatchReport::from(&result)))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(err.body_text())
    }
}

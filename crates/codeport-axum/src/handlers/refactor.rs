//! Refactor upload handler.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use codeport_transform::{FileFailure, FileTransformer, OUTPUT_ARCHIVE_NAME, TransformConfig};
use tracing::{info, warn};

use crate::error::HttpError;
use crate::state::AppState;

/// Header listing per-file failures of a partially successful job.
pub const FAILED_FILES_HEADER: &str = "x-codeport-failed-files";

/// Message returned when no file could be processed.
pub const ALL_FAILED_MESSAGE: &str =
    "All files failed to process. Is Ollama running and the model pulled?";

struct RefactorForm {
    archive: Bytes,
    instructions: String,
    agentic: Option<bool>,
}

async fn read_form(mut multipart: Multipart) -> Result<RefactorForm, HttpError> {
    let bad = |e: axum::extract::multipart::MultipartError| HttpError::BadRequest(e.body_text());

    let mut archive = None;
    let mut instructions = None;
    let mut agentic = None;
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => archive = Some(field.bytes().await.map_err(bad)?),
            Some("instructions") => instructions = Some(field.text().await.map_err(bad)?),
            Some("agentic") => {
                let value = field.text().await.map_err(bad)?;
                agentic = Some(parse_flag(&value)?);
            }
            _ => {}
        }
    }

    Ok(RefactorForm {
        archive: archive.ok_or_else(|| HttpError::BadRequest("Missing 'file' field".into()))?,
        instructions: instructions
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| HttpError::BadRequest("Missing 'instructions' field".into()))?,
        agentic,
    })
}

fn parse_flag(value: &str) -> Result<bool, HttpError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(HttpError::BadRequest(format!(
            "Invalid 'agentic' value: {other}"
        ))),
    }
}

/// Transform every file of an uploaded zip and return the result as a zip.
pub async fn refactor(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, HttpError> {
    let form = read_form(multipart).await?;
    let mut config = TransformConfig::from_settings(&state.settings, form.instructions);
    if let Some(agentic) = form.agentic {
        config = config.with_agentic(agentic);
    }
    info!(
        bytes = form.archive.len(),
        agentic = config.agentic,
        "Refactor request received"
    );

    let transformer = FileTransformer::new(Arc::clone(&state.generator), config)
        .with_tools(Arc::new(state.mcp.clone()));
    let outcome = transformer.transform_archive(form.archive.to_vec()).await?;

    let failures = outcome.report.failures();
    let Some(archive) = outcome.archive else {
        warn!(failed = failures.len(), "All files failed processing");
        return Err(HttpError::BatchFailed {
            message: ALL_FAILED_MESSAGE.to_string(),
            details: failures,
        });
    };

    let mut response = (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_str(&format!("attachment; filename=\"{OUTPUT_ARCHIVE_NAME}\""))
                    .map_err(|e| HttpError::Internal(e.to_string()))?,
            ),
        ],
        archive,
    )
        .into_response();

    if !failures.is_empty() {
        for failure in &failures {
            warn!(file = %failure.file, error = %failure.error, "File failed processing");
        }
        if let Some(value) = failed_files_header(&failures) {
            response.headers_mut().insert(FAILED_FILES_HEADER, value);
        }
    }
    Ok(response)
}

/// JSON array of failures, if it can be carried in a header.
fn failed_files_header(failures: &[FileFailure]) -> Option<HeaderValue> {
    let json = serde_json::to_string(failures).ok()?;
    match HeaderValue::from_str(&json) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Failure report not representable as a header, omitting it");
            None
        }
    }
}

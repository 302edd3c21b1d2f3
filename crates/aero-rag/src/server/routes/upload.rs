//! Manual upload endpoint

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::Path;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::UploadResponse;

use super::{rejected, with_timeout};

/// Multipart field carrying the document
const FILE_FIELD: &str = "file";

/// POST /upload - Parse, chunk, embed and store one document
///
/// Responds 200 when at least one chunk was stored (the report lists any that
/// failed) and 502 when none were.
pub async fn upload_document(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let pipeline = state.pipeline()?;
    let mut multipart = multipart.map_err(|e| rejected(e.status(), e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| field_error(e, "Failed to read multipart field"))?
    {
        let Some(filename) = field.file_name().map(basename) else {
            continue;
        };
        let is_file_field = field.name() == Some(FILE_FIELD);

        let data = field
            .bytes()
            .await
            .map_err(|e| field_error(e, &format!("Failed to read file {}", filename)))?;

        upload = Some((filename, data));
        if is_file_field {
            break;
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| Error::BadRequest("No file provided.".to_string()))?;

    let start = Instant::now();
    tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

    let report = with_timeout(
        state.config().server.request_timeout(),
        "Document ingestion",
        pipeline.ingest_bytes(&filename, data.to_vec()),
    )
    .await?;

    tracing::info!(
        "Upload {} finished in {}ms: {}/{} chunks stored",
        filename,
        start.elapsed().as_millis(),
        report.stored,
        report.attempted
    );

    if report.is_total_failure() {
        let reason = report
            .failed
            .first()
            .map(|f| f.reason.as_str())
            .unwrap_or("unknown error");
        let body = json!({
            "error": format!("No chunks were stored from {}: {}", filename, reason),
            "report": report,
        });
        return Ok((StatusCode::BAD_GATEWAY, Json(body)).into_response());
    }

    Ok(Json(UploadResponse {
        message: "Document processed and stored.".to_string(),
        report,
    })
    .into_response())
}

/// Body read failures keep their status (413 past the upload limit)
fn field_error(error: MultipartError, context: &str) -> Error {
    rejected(error.status(), format!("{}: {}", context, error.body_text()))
}

/// Strip any client-supplied directory components
fn basename(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

//! Question answering endpoint

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    Json,
};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{AnswerResponse, AskRequest};

use super::{rejected, with_timeout};

/// POST /ask - Answer a question from the stored manuals
///
/// A missing or malformed body is treated the same as a missing question; a
/// malformed `top_k` next to a valid question is rejected.
pub async fn ask_question(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<AnswerResponse>> {
    let pipeline = state.pipeline()?;

    let body = body.map_err(|e| rejected(e.status(), e.body_text()))?;
    let request = AskRequest::from_body(&body)?;
    let question = request.question()?;

    let start = Instant::now();
    tracing::info!("Ask: \"{}\"", question);

    let response = with_timeout(
        state.config().server.request_timeout(),
        "Question answering",
        pipeline.ask(question, request.top_k),
    )
    .await?;

    tracing::info!(
        "Answered in {}ms ({} chunks, success={})",
        start.elapsed().as_millis(),
        response.retrieved_chunks,
        response.success
    );

    Ok(Json(response))
}

//! Document artifact downloads
//!
//! The original artifact is the docx produced by OCR for a task. The
//! translated artifact is produced on demand by rewriting the original
//! with the stored memory for the requested language pair.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::collections::HashMap;

use crate::{artifacts, AppState};
use polydoc_common::errors::Result;
use polydoc_common::languages;
use polydoc_common::metrics;
use polydoc_docx::{rewrite_package, DocxPackage};

/// Download the recognized document as it came back from OCR
pub async fn download_original(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response> {
    artifacts::validate_task_id(&task_id)?;

    let path = artifacts::original_path(&state.config.artifacts.dir, &task_id);
    let bytes = artifacts::load(&path).await?;

    Ok(attachment_response(bytes, &format!("{}.docx", task_id)))
}

#[derive(Deserialize)]
pub struct TranslatedQuery {
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

/// Build and download the translated document for a task.
///
/// Every whole run whose text matches a stored source text for the
/// language pair is replaced with its stored translation. The result is
/// persisted as the task's translated artifact, replacing any earlier
/// one.
pub async fn download_translated(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(query): Query<TranslatedQuery>,
) -> Result<Response> {
    artifacts::validate_task_id(&task_id)?;

    let source_code = languages::code_for(
        query.source_language.as_deref().unwrap_or("French"),
        "fr",
    );
    let target_code = languages::code_for(
        query.target_language.as_deref().unwrap_or("English"),
        "en",
    );

    let original = artifacts::load(&artifacts::original_path(
        &state.config.artifacts.dir,
        &task_id,
    ))
    .await?;

    let substitutions: HashMap<String, String> = state
        .repository()
        .memories_for_pair(source_code, target_code)
        .await?
        .into_iter()
        .filter(|m| !m.target_text.is_empty())
        .map(|m| (m.source_text, m.target_text))
        .collect();

    let package = DocxPackage::read(&original)?;
    let outcome = rewrite_package(&package, &substitutions)?;

    let translated = artifacts::translated_path(&state.config.artifacts.dir, &task_id);
    artifacts::save(&translated, &outcome.bytes).await?;

    metrics::record_rewrite(outcome.substitutions);
    tracing::info!(
        task_id = %task_id,
        substitutions = outcome.substitutions,
        source = source_code,
        target = target_code,
        "Built translated document"
    );

    Ok(attachment_response(
        outcome.bytes,
        &format!("translated_{}.docx", task_id),
    ))
}

fn attachment_response(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, artifacts::DOCX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

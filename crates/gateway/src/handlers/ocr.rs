//! OCR task handlers
//!
//! Submission hands the uploaded scan to the cloud OCR service and
//! returns the task handle; clients poll the status endpoint. When a
//! task completes, the recognized docx is persisted as the task's
//! original artifact and the extracted units are returned with any
//! stored translations already filled in.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{artifacts, AppState};
use polydoc_common::errors::{AppError, Result};
use polydoc_common::languages;
use polydoc_common::metrics;
use polydoc_common::ocr::{FileKind, TaskStatus};
use polydoc_docx::{extract_units, segmenter_for, DocumentView, DocxPackage, Granularity};

#[derive(Serialize)]
pub struct SubmitResponse {
    pub task_id: String,
    pub estimated_processing_time: String,
}

/// Submit a scanned document (PDF or image) for recognition
pub async fn submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut source_language = "English".to_string();

    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        match field.name().unwrap_or_default() {
            "file" => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(multipart_err)?;
                file = Some((name, bytes.to_vec()));
            }
            "source_language" => {
                source_language = field.text().await.map_err(multipart_err)?;
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;
    if FileKind::detect(&file_name).is_none() {
        return Err(AppError::UnsupportedFile {
            name: file_name,
            allowed: "pdf, png, jpg, tiff, bmp".to_string(),
        });
    }

    let engine = state.ocr_engine().await?;
    let task = engine.submit(&file_name, bytes, &source_language).await?;

    tracing::info!(task_id = %task.task_id, file = %file_name, "OCR task submitted");

    Ok(Json(SubmitResponse {
        task_id: task.task_id,
        estimated_processing_time: task
            .estimated_processing_time
            .unwrap_or_else(|| "5000".to_string()),
    }))
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub task_id: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub granularity: Option<String>,
}

/// One extracted unit with its stored translation, if any
#[derive(Serialize)]
pub struct MatchedUnit {
    pub id: usize,
    #[serde(rename = "originalText")]
    pub original_text: String,
    #[serde(rename = "translatedText")]
    pub translated_text: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum StatusResponse {
    Completed {
        status: TaskStatus,
        data: Vec<MatchedUnit>,
    },
    Pending {
        task_id: String,
        status: TaskStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        estimated_processing_time: Option<String>,
    },
}

/// Poll an OCR task. On completion the result document is stored and
/// its extracted units are returned, matched against the memory for the
/// requested language pair.
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>> {
    let task_id = query.task_id.ok_or_else(|| AppError::MissingField {
        field: "task_id".to_string(),
    })?;
    artifacts::validate_task_id(&task_id)?;

    let started = std::time::Instant::now();
    let engine = state.ocr_engine().await?;
    let task = engine.task_status(&task_id).await?;

    match task.status {
        TaskStatus::Completed => {
            let result_url = task.result_url.ok_or_else(|| AppError::Ocr {
                message: "Completed task has no result URL".to_string(),
            })?;
            let bytes = engine.fetch_result(&result_url).await?;

            let path = artifacts::original_path(&state.config.artifacts.dir, &task_id);
            artifacts::save(&path, &bytes).await?;

            let source_code =
                languages::code_for(query.source_language.as_deref().unwrap_or(""), "en");
            let target_code =
                languages::code_for(query.target_language.as_deref().unwrap_or(""), "fr");

            let package = DocxPackage::read(&bytes)?;
            let view = DocumentView::from_package(&package)?;
            let granularity = match query.granularity.as_deref() {
                Some("sentence") => Granularity::Sentence,
                _ => Granularity::Block,
            };
            let splitter = segmenter_for(source_code);
            let units = extract_units(&view, granularity, splitter.as_ref());

            let stored: HashMap<String, String> = state
                .repository()
                .memories_for_pair(source_code, target_code)
                .await?
                .into_iter()
                .map(|m| (m.source_text, m.target_text))
                .collect();

            let data = units
                .into_iter()
                .map(|unit| MatchedUnit {
                    id: unit.ordinal,
                    translated_text: stored.get(&unit.text).cloned().unwrap_or_default(),
                    original_text: unit.text,
                })
                .collect();

            metrics::record_ocr_task(started.elapsed().as_secs_f64(), "Completed");

            Ok(Json(StatusResponse::Completed {
                status: TaskStatus::Completed,
                data,
            }))
        }
        TaskStatus::ProcessingFailed => {
            metrics::record_ocr_task(started.elapsed().as_secs_f64(), "ProcessingFailed");
            Err(AppError::OcrProcessingFailed { task_id })
        }
        status => Ok(Json(StatusResponse::Pending {
            task_id: task.task_id,
            status,
            estimated_processing_time: task.estimated_processing_time,
        })),
    }
}

fn multipart_err(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation {
        message: format!("Invalid multipart request: {}", e),
    }
}

//! Machine translation batches
//!
//! Translates a list of units through the chat model and, when an asset
//! id is given, merges the results into the memory store so the next
//! document for the same pair hits the memory instead of the model.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::AppState;
use polydoc_common::db::{MemoryInput, UpsertPolicy};
use polydoc_common::errors::{AppError, Result};
use polydoc_common::languages;
use polydoc_common::metrics;

#[derive(Deserialize)]
pub struct BatchRequest {
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    /// Batch name stored with merged memory rows
    pub name: Option<String>,
    /// When present, successful translations are merged into this asset
    pub memory_asset_id: Option<i64>,
    pub units: Vec<String>,
}

#[derive(Serialize)]
pub struct TranslatedUnit {
    pub id: usize,
    #[serde(rename = "originalText")]
    pub original_text: String,
    #[serde(rename = "translatedText")]
    pub translated_text: String,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub model: String,
    pub data: Vec<TranslatedUnit>,
    pub errors: Vec<BatchError>,
    pub saved: usize,
}

#[derive(Serialize)]
pub struct BatchError {
    pub id: usize,
    pub message: String,
}

pub async fn batch(
    State(state): State<AppState>,
    Json(body): Json<BatchRequest>,
) -> Result<Json<BatchResponse>> {
    if body.units.is_empty() {
        return Err(AppError::Validation {
            message: "units must not be empty".to_string(),
        });
    }

    let source_code = languages::code_for(body.source_language.as_deref().unwrap_or(""), "en");
    let target_code = languages::code_for(body.target_language.as_deref().unwrap_or(""), "fr");
    let batch_name = body.name.as_deref().unwrap_or("machine translation");

    let translator = state.translator().await?;
    let repo = state.repository();
    let model = translator.model_name().to_string();

    let mut response = BatchResponse {
        model: model.clone(),
        data: Vec::new(),
        errors: Vec::new(),
        saved: 0,
    };

    for (index, text) in body.units.iter().enumerate() {
        let id = index + 1;
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let translated = match translator.translate(text, source_code, target_code).await {
            Ok(t) => t,
            Err(e) => {
                metrics::record_translation(&model, false);
                response.errors.push(BatchError {
                    id,
                    message: e.to_string(),
                });
                continue;
            }
        };
        metrics::record_translation(&model, true);

        if let Some(asset_id) = body.memory_asset_id {
            let input = MemoryInput {
                name: batch_name.to_string(),
                source_language: source_code.to_string(),
                target_language: target_code.to_string(),
                source_text: text.to_string(),
                target_text: translated.clone(),
                memory_asset_id: asset_id,
            };
            match repo.upsert_memory(input, UpsertPolicy::Merge).await {
                Ok(true) => response.saved += 1,
                Ok(false) => {}
                Err(e) => response.errors.push(BatchError {
                    id,
                    message: e.to_string(),
                }),
            }
        }

        response.data.push(TranslatedUnit {
            id,
            original_text: text.to_string(),
            translated_text: translated,
        });
    }

    tracing::info!(
        units = body.units.len(),
        translated = response.data.len(),
        saved = response.saved,
        errors = response.errors.len(),
        "Machine translation batch complete"
    );

    Ok(Json(response))
}

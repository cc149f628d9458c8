//! Service credential settings
//!
//! A single settings row holds the OCR and translator credentials.
//! Values stored here take precedence over the configuration file, so
//! credentials can be rotated without a restart.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::AppState;
use polydoc_common::db::Settings;
use polydoc_common::errors::{AppError, Result};

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>> {
    let settings = state
        .repository()
        .get_settings()
        .await?
        .ok_or(AppError::SettingsNotFound)?;
    Ok(Json(settings))
}

#[derive(Deserialize)]
pub struct SettingsUpdate {
    pub chat_api_key: Option<String>,
    pub ocr_app_id: Option<String>,
    pub ocr_password: Option<String>,
}

/// Merge the given fields into the settings row, creating it on first
/// write. Omitted fields keep their stored values.
pub async fn put_settings(
    State(state): State<AppState>,
    Json(body): Json<SettingsUpdate>,
) -> Result<Json<Settings>> {
    let settings = state
        .repository()
        .put_settings(body.chat_api_key, body.ocr_app_id, body.ocr_password)
        .await?;
    tracing::info!("Settings updated");
    Ok(Json(settings))
}

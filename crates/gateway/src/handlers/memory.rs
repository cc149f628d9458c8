//! Translation memory handlers
//!
//! Uploads register a memory asset for the (source, targets) pair and,
//! when a file is attached, reconcile its rows against the store.
//! Editing endpoints accept whole batches and report per-row failures
//! instead of aborting on the first bad row.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AppState;
use polydoc_common::db::{AssetDeletion, MemoryRecord, UpsertPolicy};
use polydoc_common::errors::{AppError, Result};
use polydoc_common::languages;
use polydoc_common::metrics;
use polydoc_exchange::{export, reconcile, ExportFormat, ImportFormat};

#[derive(Serialize)]
pub struct AssetSummary {
    pub id: i64,
    pub name: String,
    pub source_language: String,
    pub target_languages: Vec<String>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    pub updated_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<polydoc_common::db::MemoryAsset> for AssetSummary {
    fn from(asset: polydoc_common::db::MemoryAsset) -> Self {
        Self {
            id: asset.id,
            name: asset.name,
            source_language: asset.source_language,
            target_languages: asset
                .target_languages
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}

/// Upload a memory batch.
///
/// Without a file this only registers (or renames) the asset for the
/// language pair and returns 200. With a TMX or XLSX file attached the
/// rows are reconciled under the requested policy and the outcome comes
/// back with 201.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response> {
    let mut name: Option<String> = None;
    let mut source_language: Option<String> = None;
    let mut target_languages: Option<String> = None;
    let mut policy = UpsertPolicy::Replace;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        match field.name().unwrap_or_default() {
            "name" => name = Some(field.text().await.map_err(multipart_err)?),
            "source_language" => {
                source_language = Some(field.text().await.map_err(multipart_err)?)
            }
            "target_languages" => {
                target_languages = Some(field.text().await.map_err(multipart_err)?)
            }
            "policy" => {
                let value = field.text().await.map_err(multipart_err)?;
                policy = UpsertPolicy::parse(&value).ok_or_else(|| AppError::Validation {
                    message: format!("Unknown upsert policy '{}'", value),
                })?;
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(multipart_err)?;
                file = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| missing("name"))?;
    let source_language = source_language.ok_or_else(|| missing("source_language"))?;
    let target_languages = target_languages.ok_or_else(|| missing("target_languages"))?;

    let source_code = languages::code_for(&source_language, "en").to_string();
    let target_codes: Vec<String> = target_languages
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|lang| languages::code_for(lang, lang).to_string())
        .collect();
    if target_codes.is_empty() {
        return Err(AppError::Validation {
            message: "target_languages must name at least one language".to_string(),
        });
    }

    let repo = state.repository();
    let (asset, created) = repo
        .get_or_create_asset(&name, &source_code, &target_codes)
        .await?;

    let Some((file_name, bytes)) = file else {
        tracing::info!(asset_id = asset.id, created, "Memory asset registered without file");
        return Ok(Json(json!({
            "asset": AssetSummary::from(asset),
            "created": created,
        }))
        .into_response());
    };

    let format = ImportFormat::from_file_name(&file_name).ok_or_else(|| {
        AppError::UnsupportedFile {
            name: file_name.clone(),
            allowed: "tmx, xlsx".to_string(),
        }
    })?;

    let outcome = reconcile(
        &bytes,
        format,
        &source_code,
        &target_codes,
        &name,
        asset.id,
        policy,
        &repo,
    )
    .await?;

    metrics::record_import(format.as_str(), outcome.saved, outcome.errors.len());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "asset": AssetSummary::from(asset),
            "created": created,
            "saved": outcome.saved,
            "errors": outcome.errors,
        })),
    )
        .into_response())
}

/// List all memory assets
pub async fn list_assets(State(state): State<AppState>) -> Result<Json<Vec<AssetSummary>>> {
    let assets = state.repository().list_assets().await?;
    Ok(Json(assets.into_iter().map(Into::into).collect()))
}

/// Full records owned by one asset
pub async fn list_asset_records(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MemoryRecord>>> {
    let repo = state.repository();
    repo.find_asset(id)
        .await?
        .ok_or_else(|| AppError::AssetNotFound { id: id.to_string() })?;
    Ok(Json(repo.list_memories_by_asset(id).await?))
}

#[derive(Serialize)]
pub struct MemoryPair {
    pub id: i64,
    pub source_language: String,
    pub target_language: String,
}

/// List every memory record as its (id, language pair) projection
pub async fn list_memories(State(state): State<AppState>) -> Result<Json<Vec<MemoryPair>>> {
    let records = state.repository().list_memories().await?;
    Ok(Json(
        records
            .into_iter()
            .map(|r| MemoryPair {
                id: r.id,
                source_language: r.source_language,
                target_language: r.target_language,
            })
            .collect(),
    ))
}

#[derive(Deserialize)]
pub struct RowUpdate {
    pub id: Option<i64>,
    #[serde(rename = "sourceText")]
    pub source_text: Option<String>,
    #[serde(rename = "targetText")]
    pub target_text: Option<String>,
}

#[derive(Serialize)]
pub struct BatchOutcome {
    pub updated: u64,
    pub errors: Vec<BatchRowError>,
}

#[derive(Serialize)]
pub struct BatchRowError {
    pub row: usize,
    pub message: String,
}

/// Update records by id. The whole batch is attempted; the response is
/// 200 when at least one row changed, 400 otherwise.
pub async fn update_rows(
    State(state): State<AppState>,
    Json(rows): Json<Vec<RowUpdate>>,
) -> Result<Response> {
    let repo = state.repository();
    let mut outcome = BatchOutcome {
        updated: 0,
        errors: Vec::new(),
    };

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;
        let Some(id) = row.id else {
            outcome.errors.push(BatchRowError {
                row: row_number,
                message: "Missing id".to_string(),
            });
            continue;
        };
        let (Some(source_text), Some(target_text)) = (&row.source_text, &row.target_text) else {
            outcome.errors.push(BatchRowError {
                row: row_number,
                message: "Missing sourceText or targetText".to_string(),
            });
            continue;
        };
        match repo.update_memory_by_id(id, source_text, target_text).await {
            Ok(0) => outcome.errors.push(BatchRowError {
                row: row_number,
                message: format!("No memory record with id {}", id),
            }),
            Ok(n) => outcome.updated += n,
            Err(e) => outcome.errors.push(BatchRowError {
                row: row_number,
                message: e.to_string(),
            }),
        }
    }

    Ok(batch_response(outcome))
}

#[derive(Deserialize)]
pub struct ByLanguageUpdate {
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub rows: Vec<TextRow>,
}

#[derive(Deserialize)]
pub struct TextRow {
    #[serde(rename = "originalText")]
    pub original_text: Option<String>,
    #[serde(rename = "translatedText")]
    pub translated_text: Option<String>,
}

/// Update target texts matched by the (source, target, source_text)
/// triple instead of by id
pub async fn update_rows_by_language(
    State(state): State<AppState>,
    Json(body): Json<ByLanguageUpdate>,
) -> Result<Response> {
    let source_code = languages::code_for(body.source_language.as_deref().unwrap_or(""), "en");
    let target_code = languages::code_for(body.target_language.as_deref().unwrap_or(""), "fr");

    let repo = state.repository();
    let mut outcome = BatchOutcome {
        updated: 0,
        errors: Vec::new(),
    };

    for (index, row) in body.rows.iter().enumerate() {
        let row_number = index + 1;
        let (Some(original), Some(translated)) = (&row.original_text, &row.translated_text)
        else {
            outcome.errors.push(BatchRowError {
                row: row_number,
                message: "Missing originalText or translatedText".to_string(),
            });
            continue;
        };
        match repo
            .update_memory_by_keys(source_code, target_code, original, translated)
            .await
        {
            Ok(0) => outcome.errors.push(BatchRowError {
                row: row_number,
                message: format!("No memory record matches '{}'", original),
            }),
            Ok(n) => outcome.updated += n,
            Err(e) => outcome.errors.push(BatchRowError {
                row: row_number,
                message: e.to_string(),
            }),
        }
    }

    Ok(batch_response(outcome))
}

/// Delete an asset and its records, reporting both counts
pub async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AssetDeletion>> {
    let deletion = state.repository().delete_asset(id).await?;
    tracing::info!(
        asset_id = id,
        memories = deletion.deleted_memories_count,
        "Deleted memory asset"
    );
    Ok(Json(deletion))
}

#[derive(Deserialize)]
pub struct BulkDelete {
    pub memory_ids: Vec<i64>,
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(body): Json<BulkDelete>,
) -> Result<Json<serde_json::Value>> {
    if body.memory_ids.is_empty() {
        return Err(AppError::Validation {
            message: "memory_ids must not be empty".to_string(),
        });
    }
    let deleted = state
        .repository()
        .bulk_delete_memories(&body.memory_ids)
        .await?;
    Ok(Json(json!({ "deleted": deleted })))
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// Export an asset's records as csv, xlsx or tmx
pub async fn export_asset(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let format = match query.format.as_deref() {
        None => ExportFormat::Csv,
        Some(value) => ExportFormat::parse(value).ok_or_else(|| AppError::Validation {
            message: format!("Unknown export format '{}'", value),
        })?,
    };

    let repo = state.repository();
    repo.find_asset(id)
        .await?
        .ok_or_else(|| AppError::AssetNotFound { id: id.to_string() })?;
    let records = repo.list_memories_by_asset(id).await?;

    let export = export(&records, format)?;
    Ok((
        [
            (header::CONTENT_TYPE, export.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.bytes,
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct DuplicateRequest {
    pub target_languages: Vec<String>,
}

/// Duplicate an asset into new target languages with empty target texts
pub async fn duplicate_asset(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<DuplicateRequest>,
) -> Result<Response> {
    if body.target_languages.is_empty() {
        return Err(AppError::Validation {
            message: "target_languages must name at least one language".to_string(),
        });
    }
    let target_codes: Vec<String> = body
        .target_languages
        .iter()
        .map(|lang| languages::code_for(lang.trim(), lang.trim()).to_string())
        .collect();

    let asset = state.repository().duplicate_asset(id, &target_codes).await?;
    Ok((StatusCode::CREATED, Json(AssetSummary::from(asset))).into_response())
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub source_text: Option<String>,
}

#[derive(Serialize)]
pub struct LookupResponse {
    pub found: bool,
    pub target_text: Option<String>,
}

/// Look up the stored translation for one exact source text
pub async fn lookup(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<LookupResponse>> {
    let source_text = query.source_text.ok_or_else(|| missing("source_text"))?;
    let source_code = languages::code_for(query.source_language.as_deref().unwrap_or(""), "en");
    let target_code = languages::code_for(query.target_language.as_deref().unwrap_or(""), "fr");

    let found = state
        .repository()
        .find_memory(source_code, target_code, &source_text)
        .await?;

    metrics::record_lookup(found.is_some());

    Ok(Json(LookupResponse {
        found: found.is_some(),
        target_text: found.map(|m| m.target_text),
    }))
}

fn batch_response(outcome: BatchOutcome) -> Response {
    let status = if outcome.updated > 0 {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(outcome)).into_response()
}

fn missing(field: &str) -> AppError {
    AppError::MissingField {
        field: field.to_string(),
    }
}

fn multipart_err(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation {
        message: format!("Invalid multipart request: {}", e),
    }
}

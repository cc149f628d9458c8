//! Import reconciliation
//!
//! Parses an uploaded TMX or XLSX batch and reconciles every
//! (source_text, target_language) pairing against the memory store under
//! an upsert policy. Structural problems (unreadable file, missing
//! worksheet column) abort before any row is written; row-level failures
//! are collected and reported without stopping the batch.

use polydoc_common::db::{MemoryInput, Repository, UpsertPolicy};
use polydoc_common::errors::{AppError, Result};
use serde::Serialize;

use crate::{tmx, xlsx};

/// Supported import file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Tmx,
    Xlsx,
}

impl ImportFormat {
    /// Detect the format from the uploaded file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        let extension = name.rsplit('.').next()?.to_ascii_lowercase();
        match extension.as_str() {
            "tmx" => Some(Self::Tmx),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tmx => "tmx",
            Self::Xlsx => "xlsx",
        }
    }
}

/// One rejected row of an import batch
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    /// 1-based position in the source file (tu for TMX, data row for XLSX)
    pub row: usize,
    pub target_language: Option<String>,
    pub message: String,
}

/// Result of a completed import batch
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub saved: usize,
    pub errors: Vec<RowError>,
}

/// Parse and reconcile one uploaded file against the store
#[allow(clippy::too_many_arguments)]
pub async fn reconcile(
    bytes: &[u8],
    format: ImportFormat,
    source_language: &str,
    target_languages: &[String],
    batch_name: &str,
    memory_asset_id: i64,
    policy: UpsertPolicy,
    repo: &Repository,
) -> Result<ImportOutcome> {
    let pairings = match format {
        ImportFormat::Tmx => tmx_pairings(bytes, source_language, target_languages)?,
        ImportFormat::Xlsx => xlsx_pairings(bytes, source_language, target_languages)?,
    };

    let mut outcome = ImportOutcome {
        saved: 0,
        errors: Vec::new(),
    };

    for pairing in pairings {
        let input = MemoryInput {
            name: batch_name.to_string(),
            source_language: source_language.to_string(),
            target_language: pairing.target_language.clone(),
            source_text: pairing.source_text,
            target_text: pairing.target_text,
            memory_asset_id,
        };
        match repo.upsert_memory(input, policy).await {
            Ok(true) => outcome.saved += 1,
            Ok(false) => {}
            Err(e) => outcome.errors.push(RowError {
                row: pairing.row,
                target_language: Some(pairing.target_language),
                message: e.to_string(),
            }),
        }
    }

    tracing::info!(
        format = format.as_str(),
        saved = outcome.saved,
        errors = outcome.errors.len(),
        "Import batch reconciled"
    );

    Ok(outcome)
}

#[derive(Debug)]
struct Pairing {
    row: usize,
    target_language: String,
    source_text: String,
    target_text: String,
}

fn tmx_pairings(
    bytes: &[u8],
    source_language: &str,
    target_languages: &[String],
) -> Result<Vec<Pairing>> {
    let units = tmx::parse_tmx(bytes)?;
    let mut pairings = Vec::new();

    for (tu_number, unit) in units.iter().enumerate() {
        let source_text = unit.text_for(source_language).filter(|t| !t.is_empty());
        for lang in target_languages {
            let target_text = unit.text_for(lang).filter(|t| !t.is_empty());
            match (source_text, target_text) {
                (Some(source), Some(target)) => pairings.push(Pairing {
                    row: tu_number + 1,
                    target_language: lang.clone(),
                    source_text: source.to_string(),
                    target_text: target.to_string(),
                }),
                _ => {
                    tracing::debug!(
                        tu = tu_number + 1,
                        target_language = %lang,
                        "Skipping TU: missing source or target text"
                    );
                }
            }
        }
    }

    Ok(pairings)
}

fn xlsx_pairings(
    bytes: &[u8],
    source_language: &str,
    target_languages: &[String],
) -> Result<Vec<Pairing>> {
    let rows = xlsx::read_rows(bytes)?;
    let Some((header, data)) = rows.split_first() else {
        return Ok(Vec::new());
    };

    let source_column = find_column(header, source_language)?;
    let mut target_columns = Vec::with_capacity(target_languages.len());
    for lang in target_languages {
        target_columns.push((lang.clone(), find_column(header, lang)?));
    }

    let mut pairings = Vec::new();
    for (index, row) in data.iter().enumerate() {
        let source_text = cell(row, source_column);
        if source_text.is_empty() {
            tracing::debug!(row = index + 1, "Skipping row: missing source text");
            continue;
        }
        for (lang, column) in &target_columns {
            let target_text = cell(row, *column);
            if target_text.is_empty() {
                tracing::debug!(
                    row = index + 1,
                    target_language = %lang,
                    "Skipping row: missing target text"
                );
                continue;
            }
            pairings.push(Pairing {
                row: index + 1,
                target_language: lang.clone(),
                source_text: source_text.to_string(),
                target_text: target_text.to_string(),
            });
        }
    }

    Ok(pairings)
}

fn find_column(header: &[String], language: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h.trim() == language)
        .ok_or_else(|| AppError::MissingColumn {
            column: language.to_string(),
        })
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(|c| c.trim()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(ImportFormat::from_file_name("memo.TMX"), Some(ImportFormat::Tmx));
        assert_eq!(
            ImportFormat::from_file_name("batch.xlsx"),
            Some(ImportFormat::Xlsx)
        );
        assert_eq!(ImportFormat::from_file_name("notes.csv"), None);
        assert_eq!(ImportFormat::from_file_name("noextension"), None);
    }

    #[test]
    fn tmx_pairs_each_target_language() {
        let tmx = br#"<tmx><body>
<tu><tuv xml:lang="fr"><seg>Bonjour</seg></tuv><tuv xml:lang="en"><seg>Hello</seg></tuv><tuv xml:lang="tr"><seg>Merhaba</seg></tuv></tu>
<tu><tuv xml:lang="fr"><seg>Merci</seg></tuv><tuv xml:lang="en"><seg>Thanks</seg></tuv></tu>
</body></tmx>"#;
        let pairings = tmx_pairings(tmx, "fr", &langs(&["en", "tr"])).unwrap();
        assert_eq!(pairings.len(), 3);
        assert_eq!(pairings[0].target_language, "en");
        assert_eq!(pairings[0].target_text, "Hello");
        assert_eq!(pairings[1].target_language, "tr");
        // The second tu has no Turkish variant, so only the English pairing
        assert_eq!(pairings[2].row, 2);
        assert_eq!(pairings[2].target_text, "Thanks");
    }

    #[test]
    fn tmx_without_source_variant_yields_nothing() {
        let tmx = br#"<tmx><body><tu><tuv xml:lang="en"><seg>Hello</seg></tuv></tu></body></tmx>"#;
        let pairings = tmx_pairings(tmx, "fr", &langs(&["en"])).unwrap();
        assert!(pairings.is_empty());
    }

    #[test]
    fn xlsx_missing_column_aborts() {
        let rows = vec![
            vec!["fr".to_string(), "en".to_string()],
            vec!["Bonjour".to_string(), "Hello".to_string()],
        ];
        let bytes = xlsx::write_rows(&rows).unwrap();
        let err = xlsx_pairings(&bytes, "fr", &langs(&["ar"])).unwrap_err();
        assert!(matches!(err, AppError::MissingColumn { column } if column == "ar"));
    }

    #[test]
    fn xlsx_blank_cells_skip_quietly() {
        let rows = vec![
            vec!["fr".to_string(), "en".to_string(), "tr".to_string()],
            vec!["Bonjour".to_string(), "Hello".to_string(), String::new()],
            vec![String::new(), "Orphan".to_string(), "Yetim".to_string()],
        ];
        let bytes = xlsx::write_rows(&rows).unwrap();
        let pairings = xlsx_pairings(&bytes, "fr", &langs(&["en", "tr"])).unwrap();
        assert_eq!(pairings.len(), 1);
        assert_eq!(pairings[0].source_text, "Bonjour");
        assert_eq!(pairings[0].target_language, "en");
    }

    #[test]
    fn xlsx_header_only_yields_nothing() {
        let rows = vec![vec!["fr".to_string(), "en".to_string()]];
        let bytes = xlsx::write_rows(&rows).unwrap();
        let pairings = xlsx_pairings(&bytes, "fr", &langs(&["en"])).unwrap();
        assert!(pairings.is_empty());
    }
}

//! Export formatting for stored memory records

use polydoc_common::db::MemoryRecord;
use polydoc_common::errors::{AppError, Result};
use serde::Deserialize;

use crate::{tmx, xlsx};

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Tmx,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            "tmx" => Some(Self::Tmx),
            _ => None,
        }
    }
}

/// A formatted export ready to be served as a download
pub struct Export {
    pub bytes: Vec<u8>,
    pub filename: &'static str,
    pub content_type: &'static str,
}

const CSV_HEADER: [&str; 6] = [
    "ID",
    "Name",
    "Source Language",
    "Target Language",
    "Source Text",
    "Target Text",
];

pub fn export(records: &[MemoryRecord], format: ExportFormat) -> Result<Export> {
    match format {
        ExportFormat::Csv => Ok(Export {
            bytes: to_csv(records)?,
            filename: "memory_export.csv",
            content_type: "text/csv",
        }),
        ExportFormat::Xlsx => Ok(Export {
            bytes: xlsx::write_rows(&to_grid(records))?,
            filename: "memory_export.xlsx",
            content_type:
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }),
        ExportFormat::Tmx => Ok(Export {
            bytes: tmx::write_tmx(records)?,
            filename: "memory_export.tmx",
            content_type: "application/x-tmx+xml",
        }),
    }
}

fn to_csv(records: &[MemoryRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for record in records {
        writer
            .write_record([
                record.id.to_string().as_str(),
                &record.name,
                &record.source_language,
                &record.target_language,
                &record.source_text,
                &record.target_text,
            ])
            .map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal {
            message: format!("CSV export failed: {}", e),
        })
}

fn to_grid(records: &[MemoryRecord]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(CSV_HEADER.iter().map(|h| h.to_string()).collect());
    for record in records {
        rows.push(vec![
            record.id.to_string(),
            record.name.clone(),
            record.source_language.clone(),
            record.target_language.clone(),
            record.source_text.clone(),
            record.target_text.clone(),
        ]);
    }
    rows
}

fn csv_err(e: csv::Error) -> AppError {
    AppError::Internal {
        message: format!("CSV export failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<MemoryRecord> {
        vec![
            MemoryRecord {
                id: 7,
                name: "batch".to_string(),
                source_language: "fr".to_string(),
                target_language: "en".to_string(),
                source_text: "Bonjour, le monde".to_string(),
                target_text: "Hello, world".to_string(),
            },
            MemoryRecord {
                id: 9,
                name: "batch".to_string(),
                source_language: "fr".to_string(),
                target_language: "tr".to_string(),
                source_text: "Merci".to_string(),
                target_text: "Tesekkurler".to_string(),
            },
        ]
    }

    #[test]
    fn csv_export_round_trips() {
        let export = export(&sample(), ExportFormat::Csv).unwrap();
        assert_eq!(export.filename, "memory_export.csv");
        assert_eq!(export.content_type, "text/csv");

        let mut reader = csv::Reader::from_reader(export.bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[4], "Source Text");
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "7");
        assert_eq!(&rows[0][4], "Bonjour, le monde");
        assert_eq!(&rows[1][3], "tr");
    }

    #[test]
    fn xlsx_export_has_header_and_rows() {
        let export = export(&sample(), ExportFormat::Xlsx).unwrap();
        assert_eq!(export.filename, "memory_export.xlsx");
        let rows = xlsx::read_rows(&export.bytes).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][1], "Name");
        assert_eq!(rows[2][5], "Tesekkurler");
    }

    #[test]
    fn tmx_export_uses_first_record_srclang() {
        let export = export(&sample(), ExportFormat::Tmx).unwrap();
        assert_eq!(export.content_type, "application/x-tmx+xml");
        let text = String::from_utf8(export.bytes).unwrap();
        assert!(text.contains(r#"srclang="fr""#));
    }

    #[test]
    fn format_parse_rejects_unknown() {
        assert_eq!(ExportFormat::parse("CSV"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("tmx"), Some(ExportFormat::Tmx));
        assert_eq!(ExportFormat::parse("pdf"), None);
    }
}

//! Polydoc Common Library
//!
//! Shared code for the Polydoc services including:
//! - Translation memory store (SeaORM entities + repository)
//! - OCR and AI-translation upstream clients
//! - Error types and handling
//! - Configuration management
//! - Language code table
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod languages;
pub mod metrics;
pub mod ocr;
pub mod translate;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{Repository, UpsertPolicy};
pub use errors::{AppError, Result};
pub use ocr::OcrEngine;
pub use translate::Translator;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

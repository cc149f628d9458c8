//! Translation memory interchange formats
//!
//! TMX and XLSX imports feed the memory store through the reconciler;
//! CSV, XLSX and TMX exports serve stored records back out.

pub mod export;
pub mod import;
pub mod tmx;
pub mod xlsx;

pub use export::{export, Export, ExportFormat};
pub use import::{reconcile, ImportFormat, ImportOutcome, RowError};

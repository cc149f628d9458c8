//! Lossless OOXML text extraction and rewriting
//!
//! A docx file is a zip of XML parts. This crate reads the package into an
//! event-level XML model, walks the parts that carry visible text (body,
//! tables, headers, footers, drawing shapes), and writes the package back
//! with only `w:t` and `a:t` payloads changed. Everything else survives
//! byte-for-byte so formatting, numbering and embedded objects are kept.

pub mod document;
pub mod extract;
pub mod package;
pub mod rewrite;
pub mod segment;
pub mod xml;

pub use document::{Block, CellText, DocumentView, ParagraphText};
pub use extract::{extract_units, ExtractedUnit, Granularity};
pub use package::DocxPackage;
pub use rewrite::{rewrite_package, RewriteOutcome};
pub use segment::{segmenter_for, SentenceSplitter};

//! API handlers module

pub mod documents;
pub mod health;
pub mod memory;
pub mod ocr;
pub mod settings;
pub mod translate;

//! Format sniffing and adapter selection.
//!
//! Thin glue in front of the engine: look at an input document or
//! directory, pick the matching dialect adapter, and run the
//! translation. No translation logic lives here.

use std::path::Path;

use crate::adapters::{AoeffAdapter, ArchiAdapter, FormatAdapter, GraficoAdapter};
use crate::engine::{TranslationEngine, TranslationOptions};
use crate::error::TranslationError;
use crate::model::Model;
use crate::xml::Document;

/// Select an adapter for raw document bytes by their root element.
pub fn detect_adapter(input: &[u8]) -> Result<Box<dyn FormatAdapter>, TranslationError> {
    let doc = Document::parse(input)?;
    let root = doc.root();
    if doc.tag(root) == "archimate:model" {
        return Ok(Box::new(ArchiAdapter::new(doc)));
    }
    if doc.local_tag(root) == "model" {
        return Ok(Box::new(AoeffAdapter::new(doc)));
    }
    Err(TranslationError::UnknownFormat(doc.tag(root).to_string()))
}

/// Select an adapter for a path: a directory is the folder-per-entity
/// dialect, a file is sniffed by content.
pub fn adapter_for_path(path: &Path) -> Result<Box<dyn FormatAdapter>, TranslationError> {
    if path.is_dir() {
        return Ok(Box::new(GraficoAdapter::open(path)));
    }
    let bytes = std::fs::read(path)?;
    detect_adapter(&bytes)
}

/// Sniff, construct and translate in one call.
pub fn translate_path(
    path: &Path,
    options: TranslationOptions,
) -> Result<Model, TranslationError> {
    let adapter = adapter_for_path(path)?;
    TranslationEngine::with_options(adapter.as_ref(), options).translate()
}

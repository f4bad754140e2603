//! # architrave
//!
//! Normalizes enterprise-architecture models from several authoring
//! tools' on-disk encodings into one format-agnostic aggregate model.
//! Each tool stores the same concepts — typed nodes, typed
//! relationships, diagrams of positioned shapes and connectors, and an
//! organizing folder tree — behind its own XML schema or directory
//! layout; a dialect adapter hides those differences and a single
//! translation engine rebuilds the uniform model from any of them.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! director  → format sniffing, adapter selection (glue)
//!   ↓
//! engine    → four-phase translation: gate, nodes, relationships, views
//!   ↓
//! adapters  → FormatAdapter trait + the three dialect implementations
//!   ↓
//! model     → aggregate output: buckets, views, landscape, statistics
//!   ↓
//! geometry  → bounds accumulation, bendpoint interpolation
//! xml       → arena element tree over quick-xml events
//! error     → TranslationError
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use architrave::{TranslationEngine, adapters::ArchiAdapter};
//!
//! let bytes = std::fs::read("model.archimate")?;
//! let adapter = ArchiAdapter::from_bytes(&bytes)?;
//! let model = TranslationEngine::new(&adapter).translate()?;
//! println!("{} nodes", model.statistics().total_nodes);
//! ```

pub mod adapters;
pub mod director;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod model;
pub mod xml;

pub use adapters::{AccessDirection, FormatAdapter, Handle};
pub use director::{adapter_for_path, detect_adapter, translate_path};
pub use engine::{TranslationEngine, TranslationOptions};
pub use error::{TranslationError, TranslationPhase};
pub use geometry::{Bounds, Point, Range};
pub use model::{
    LandscapeItem, Model, Node, Property, Relationship, Statistics, UNKNOWN_NAME, View, ViewNode,
    ViewRelationship,
};

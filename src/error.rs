//! Error types for model translation.

use thiserror::Error;

/// The translation phase in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationPhase {
    /// Semantic node iteration and bucketing.
    Nodes,
    /// Relationship iteration, direction resolution and bucketing.
    Relationships,
    /// View payload translation and folder-tree reconstruction.
    Views,
}

impl std::fmt::Display for TranslationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Nodes => "node",
            Self::Relationships => "relationship",
            Self::Views => "view",
        };
        write!(f, "{label}")
    }
}

/// Errors that can occur while translating a model.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// XML parsing error in an underlying document.
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error while reading a document or directory tree.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document failed the adapter's structural validation gate.
    #[error("model not validated: {0}")]
    NotValidated(String),

    /// No adapter recognizes the input.
    #[error("unknown model format: {0}")]
    UnknownFormat(String),

    /// Missing required element or attribute.
    #[error("Missing required {kind}: {name}")]
    Missing { kind: &'static str, name: String },

    /// A phase failed; the whole translation is aborted.
    #[error("{phase} translation failed: {source}")]
    Phase {
        phase: TranslationPhase,
        #[source]
        source: Box<TranslationError>,
    },
}

impl TranslationError {
    /// Create an XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    /// Create a validation-gate error.
    pub fn not_validated(message: impl Into<String>) -> Self {
        Self::NotValidated(message.into())
    }

    /// Create a missing element error.
    pub fn missing_element(name: impl Into<String>) -> Self {
        Self::Missing {
            kind: "element",
            name: name.into(),
        }
    }

    /// Create a missing attribute error.
    pub fn missing_attribute(name: impl Into<String>) -> Self {
        Self::Missing {
            kind: "attribute",
            name: name.into(),
        }
    }

    /// Wrap an error with the phase it occurred in.
    pub fn in_phase(self, phase: TranslationPhase) -> Self {
        Self::Phase {
            phase,
            source: Box::new(self),
        }
    }
}

//! Dialect adapters: one uniform capability set over format-specific documents.
//!
//! Each authoring tool encodes the same conceptual model differently — a
//! deeply nested XML tree, a flat exchange file with separate relationship
//! and diagram lists, or a directory tree with one file per entity. An
//! adapter hides those differences behind [`FormatAdapter`], which the
//! translation engine drives without knowing which dialect it is reading.
//!
//! Adapters own their parsed documents and hand out [`Handle`] values —
//! small `Copy` indexes into adapter-internal storage. All accessors return
//! owned data, which keeps the trait object-safe and lets the
//! folder-per-entity dialect parse files lazily during iteration.
//!
//! The three implementations are deliberately independent: the dialects
//! diverge too much structurally to share a base safely. Only the pure
//! tree-search helpers (`find_view_element`, `find_view_element_parent`,
//! `nested_position_of`) are shared, as default methods.

mod aoeff;
mod archi;
mod grafico;

pub use aoeff::AoeffAdapter;
pub use archi::ArchiAdapter;
pub use grafico::GraficoAdapter;

use crate::error::TranslationError;
use crate::geometry::Point;
use crate::xml::ElementRef;

/// Handle to a format-specific raw entity (folder, view, shape, connector,
/// property, bendpoint) inside an adapter's parsed documents.
///
/// `doc` indexes the owning document within the adapter (always 0 for
/// single-document dialects); `element` addresses the element inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub(crate) doc: u32,
    pub(crate) element: ElementRef,
}

impl Handle {
    pub(crate) fn new(doc: u32, element: ElementRef) -> Self {
        Self { doc, element }
    }
}

/// Which endpoints an access relationship flows toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDirection {
    pub source: bool,
    pub target: bool,
}

/// Uniform capability set over one underlying model document or tree.
///
/// Traversal operations return `Result` because the folder-per-entity
/// dialect performs blocking reads during iteration; plain accessors are
/// infallible and fall back to empty/None sentinels on dangling
/// references — callers treat a missed lookup as "skip silently".
pub trait FormatAdapter {
    // ── Identity & structure ────────────────────────────────────────

    /// The model's own identifier.
    fn model_id(&self) -> String;

    /// True when diagrams live inside the organization tree itself and
    /// must be translated while walking it; false when the dialect keeps
    /// a flat diagram list elsewhere and the organization tree only
    /// carries id references to it.
    fn is_nested_diagram_structure(&self) -> bool;

    /// True when view connectors are attached as children of their
    /// source shape; false when each view exposes a flat connector list.
    fn has_view_element_child_relationships(&self) -> bool;

    /// Whether the underlying document satisfies the minimal structural
    /// shape this dialect expects. A false here is fatal to the whole
    /// translation.
    fn validate(&self) -> bool;

    // ── Node iteration ──────────────────────────────────────────────

    /// Visit every semantic model element exactly once, in document order.
    fn for_each_node(
        &self,
        visit: &mut dyn FnMut(Handle),
    ) -> Result<(), TranslationError>;

    fn node_id(&self, node: Handle) -> String;
    fn is_junction(&self, node: Handle) -> bool;
    /// The junction's routing type (and/or). Only meaningful when
    /// [`Self::is_junction`] is true.
    fn junction_type(&self, node: Handle) -> String;
    fn node_type(&self, node: Handle) -> String;
    fn node_name(&self, node: Handle) -> Option<String>;
    fn documentation(&self, node: Handle) -> Option<String>;
    /// Raw, format-specific property entries of a node.
    fn properties(&self, node: Handle) -> Vec<Handle>;
    /// Decode one raw property to a key/value pair; None when malformed.
    fn property_entry(&self, property: Handle) -> Option<(String, String)>;

    // ── Relationship iteration ──────────────────────────────────────

    fn for_each_relationship(
        &self,
        visit: &mut dyn FnMut(Handle),
    ) -> Result<(), TranslationError>;

    fn relationship_id(&self, relationship: Handle) -> String;
    fn relationship_type(&self, relationship: Handle) -> String;
    fn relationship_source_id(&self, relationship: Handle) -> String;
    fn relationship_target_id(&self, relationship: Handle) -> String;
    fn is_association(&self, relationship: Handle) -> bool;
    fn association_is_directed(&self, relationship: Handle) -> bool;
    fn is_access(&self, relationship: Handle) -> bool;
    fn access_direction(&self, relationship: Handle) -> AccessDirection;

    // ── Folder traversal ────────────────────────────────────────────

    fn organization_roots(&self) -> Result<Vec<Handle>, TranslationError>;
    fn folder_name(&self, folder: Handle) -> String;
    fn sub_folders(&self, folder: Handle) -> Result<Vec<Handle>, TranslationError>;
    /// Views contained in a folder. For nested-diagram dialects these are
    /// full diagram payloads; for flat dialects they are id references
    /// resolvable through [`Self::view_id`].
    fn folder_views(&self, folder: Handle) -> Result<Vec<Handle>, TranslationError>;

    /// The dialect's flat diagram list. Only consulted when
    /// [`Self::is_nested_diagram_structure`] is false.
    fn diagrams(&self) -> Result<Vec<Handle>, TranslationError> {
        Ok(Vec::new())
    }

    // ── View shape traversal ────────────────────────────────────────

    fn view_id(&self, view: Handle) -> String;
    fn view_name(&self, view: Handle) -> String;
    fn view_elements(&self, view: Handle) -> Vec<Handle>;
    fn view_element_id(&self, element: Handle) -> String;
    /// The semantic element a shape is bound to, if any.
    fn model_id_of(&self, element: Handle) -> Option<String>;
    /// Position relative to the immediate container (or the view origin
    /// when `parent` is None), per the dialect's storage convention.
    fn position_x(&self, element: Handle, parent: Option<Handle>) -> i32;
    fn position_y(&self, element: Handle, parent: Option<Handle>) -> i32;
    fn width(&self, element: Handle) -> i32;
    fn height(&self, element: Handle) -> i32;
    fn nested_elements(&self, element: Handle) -> Vec<Handle>;
    fn is_object(&self, element: Handle) -> bool;
    fn is_note(&self, element: Handle) -> bool;
    fn is_group(&self, element: Handle) -> bool;
    fn note_content(&self, element: Handle) -> String;
    fn group_name(&self, element: Handle) -> String;

    // ── View connector traversal ────────────────────────────────────

    /// Connectors attached to `element` as their source shape. Dialects
    /// with a flat per-view list return nothing here.
    fn source_relationships_of(&self, element: Handle) -> Vec<Handle> {
        let _ = element;
        Vec::new()
    }

    /// The flat per-view connector list. Dialects attaching connectors
    /// to source shapes return nothing here.
    fn view_relationships(&self, view: Handle) -> Vec<Handle> {
        let _ = view;
        Vec::new()
    }

    fn bendpoints_of(&self, connector: Handle) -> Vec<Handle>;
    /// Resolve one bendpoint to view coordinates. Offset-based dialects
    /// interpolate between the endpoint shape centers; absolute dialects
    /// return the stored point unchanged.
    fn bendpoint(
        &self,
        point: Handle,
        index: usize,
        total: usize,
        source: Handle,
        target: Handle,
        top_level: &[Handle],
    ) -> Point;
    fn relationship_id_of(&self, connector: Handle) -> String;
    fn model_relationship_id_of(&self, connector: Handle) -> Option<String>;
    fn source_element_id_of(&self, connector: Handle) -> String;
    fn target_element_id_of(&self, connector: Handle) -> String;

    // ── Shared tree-search helpers ──────────────────────────────────

    /// Depth-first search through nested shapes; first match or None.
    fn find_view_element(&self, shapes: &[Handle], id: &str) -> Option<Handle> {
        for &shape in shapes {
            if self.view_element_id(shape) == id {
                return Some(shape);
            }
            let nested = self.nested_elements(shape);
            if let Some(found) = self.find_view_element(&nested, id) {
                return Some(found);
            }
        }
        None
    }

    /// Depth-first search returning the shape *enclosing* `id`, or None
    /// when the id is top-level or absent.
    fn find_view_element_parent(&self, shapes: &[Handle], id: &str) -> Option<Handle> {
        for &shape in shapes {
            let nested = self.nested_elements(shape);
            if nested.iter().any(|&c| self.view_element_id(c) == id) {
                return Some(shape);
            }
            if let Some(found) = self.find_view_element_parent(&nested, id) {
                return Some(found);
            }
        }
        None
    }

    /// Depth-first search accumulating ancestor offsets, recovering a
    /// shape's position relative to the view origin for dialects that
    /// only store parent-relative offsets.
    fn nested_position_of(&self, shapes: &[Handle], id: &str) -> Option<(i32, i32)> {
        for &shape in shapes {
            let x = self.position_x(shape, None);
            let y = self.position_y(shape, None);
            if self.view_element_id(shape) == id {
                return Some((x, y));
            }
            let nested = self.nested_elements(shape);
            if let Some((cx, cy)) = self.nested_position_of(&nested, id) {
                return Some((x + cx, y + cy));
            }
        }
        None
    }
}

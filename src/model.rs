//! Aggregate model: the format-agnostic output of a translation.
//!
//! The model accumulates categorized nodes and relationships (bucketed by
//! lowercased type), an ordered view list, the landscape folder tree, and
//! running statistics. It is mutated only by the translation engine and
//! read by downstream consumers.
//!
//! ```text
//! Model
//! ├── nodes: IndexMap<type, Vec<Node>>           (bucket key = lowercase type)
//! ├── relationships: IndexMap<type, Vec<Relationship>>
//! ├── views: Vec<View>                           (flat, ordered)
//! ├── landscape: Vec<LandscapeItem>              (folder tree, leaves reference views)
//! └── statistics: Statistics
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Bounds, Point};

/// Display name used when a source element has no usable name.
pub const UNKNOWN_NAME: &str = "Unknown Name";

// ============================================================================
// RECORDS
// ============================================================================

/// A key/value property attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

/// A semantic model element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub identifier: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl Node {
    pub fn new(
        identifier: impl Into<String>,
        name: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            node_type: node_type.into(),
            properties: None,
            documentation: None,
        }
    }

    pub fn with_properties(mut self, properties: Vec<Property>) -> Self {
        self.properties = if properties.is_empty() {
            None
        } else {
            Some(properties)
        };
        self
    }

    pub fn with_documentation(mut self, documentation: Option<String>) -> Self {
        self.documentation = documentation;
        self
    }
}

/// A semantic relationship between two nodes.
///
/// `is_bidirectional` is serialized only when present; the engine never
/// writes an explicit `false` — absence and false are equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub identifier: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_bidirectional: Option<bool>,
}

/// A shape placed on a view.
///
/// `x`/`y` are relative to the immediate containing shape, or to the view
/// origin when top-level. `model_node_id` is None for purely visual shapes
/// (notes, groups).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_node_id: Option<String>,
    pub view_node_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// A connector drawn on a view.
///
/// `model_relationship_id` is None for view-only connectors with no
/// semantic counterpart (their type is the generic `"connection"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRelationship {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_relationship_id: Option<String>,
    pub source_id: String,
    pub target_id: String,
    pub view_relationship_id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_bidirectional: Option<bool>,
    pub bendpoints: Vec<Point>,
}

/// A diagram: bounds plus ordered shapes and connectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: String,
    pub name: String,
    pub bounds: Bounds,
    pub view_nodes: Vec<ViewNode>,
    pub view_relationships: Vec<ViewRelationship>,
}

/// An entry in the landscape folder tree.
///
/// Directories carry `children`; leaves are `{id, text}` references to a
/// view in the flat view list — the view payload is never duplicated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandscapeItem {
    pub id: String,
    pub text: String,
    pub is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<LandscapeItem>>,
}

impl LandscapeItem {
    /// A leaf reference pointing at a view by id.
    pub fn view_ref(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_directory: false,
            children: None,
        }
    }

    /// Attach a child entry; promotes a leaf to a directory if needed.
    pub fn push_child(&mut self, child: LandscapeItem) {
        self.children.get_or_insert_with(Vec::new).push(child);
    }
}

/// Running totals, recomputed on every bulk commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_nodes: usize,
    pub total_relationships: usize,
    pub total_views: usize,
    pub nodes_per_type: IndexMap<String, usize>,
    pub relationships_per_type: IndexMap<String, usize>,
}

// ============================================================================
// MODEL
// ============================================================================

/// The aggregate output model of one translation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub model_id: String,
    nodes: IndexMap<String, Vec<Node>>,
    relationships: IndexMap<String, Vec<Relationship>>,
    views: Vec<View>,
    landscape: Vec<LandscapeItem>,
    statistics: Statistics,
}

impl Model {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Self::default()
        }
    }

    // ── Bulk commits ────────────────────────────────────────────────

    /// Replace the node buckets with `nodes`, keyed by lowercased type,
    /// and recompute per-type counts and the node total.
    ///
    /// This is a replacement, not a merge: committing twice with the same
    /// list yields the same buckets as committing once.
    pub fn set_many_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes.clear();
        for node in nodes {
            let key = node.node_type.to_lowercase();
            self.nodes.entry(key).or_default().push(node);
        }
        self.statistics.nodes_per_type = self
            .nodes
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect();
        self.statistics.total_nodes = self.nodes.values().map(Vec::len).sum();
    }

    /// Replace the relationship buckets, keyed by lowercased type, and
    /// recompute per-type counts and the relationship total.
    pub fn set_many_relationships(&mut self, relationships: Vec<Relationship>) {
        self.relationships.clear();
        for rel in relationships {
            let key = rel.rel_type.to_lowercase();
            self.relationships.entry(key).or_default().push(rel);
        }
        self.statistics.relationships_per_type = self
            .relationships
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect();
        self.statistics.total_relationships =
            self.relationships.values().map(Vec::len).sum();
    }

    /// Append a translated view and bump the view counter.
    pub fn add_view(&mut self, view: View) {
        self.views.push(view);
        self.statistics.total_views += 1;
    }

    // ── Landscape ───────────────────────────────────────────────────

    /// Allocate a fresh directory entry with a generated unique id.
    pub fn create_folder(&self, text: impl Into<String>) -> LandscapeItem {
        LandscapeItem {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            is_directory: true,
            children: Some(Vec::new()),
        }
    }

    /// Attach a completed folder at the top level of the landscape.
    pub fn add_folder(&mut self, folder: LandscapeItem) {
        self.landscape.push(folder);
    }

    /// Attach a view reference leaf under `folder`.
    pub fn add_folder_view(folder: &mut LandscapeItem, id: &str, text: &str) {
        folder.push_child(LandscapeItem::view_ref(id, text));
    }

    // ── Read accessors ──────────────────────────────────────────────

    /// Flatten the node buckets into one ordered list, re-attaching the
    /// bucket key as each record's type (output types are always
    /// lowercase, whatever the input casing was).
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes
            .iter()
            .flat_map(|(key, bucket)| {
                bucket.iter().map(|n| Node {
                    node_type: key.clone(),
                    ..n.clone()
                })
            })
            .collect()
    }

    /// Flatten the relationship buckets, re-attaching the bucket key.
    pub fn relationships(&self) -> Vec<Relationship> {
        self.relationships
            .iter()
            .flat_map(|(key, bucket)| {
                bucket.iter().map(|r| Relationship {
                    rel_type: key.clone(),
                    ..r.clone()
                })
            })
            .collect()
    }

    /// Nodes of one (lowercase) type.
    pub fn nodes_of_type(&self, node_type: &str) -> &[Node] {
        self.nodes.get(node_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Relationships of one (lowercase) type.
    pub fn relationships_of_type(&self, rel_type: &str) -> &[Relationship] {
        self.relationships
            .get(rel_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Find a translated view by id.
    pub fn view_by_id(&self, id: &str) -> Option<&View> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn landscape(&self) -> &[LandscapeItem] {
        &self.landscape
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str, ty: &str) -> Node {
        Node::new(id, name, ty)
    }

    #[test]
    fn test_nodes_bucket_by_lowercase_type() {
        let mut model = Model::new("m1");
        model.set_many_nodes(vec![
            node("n1", "A", "BusinessActor"),
            node("n2", "B", "businessactor"),
            node("n3", "C", "ApplicationComponent"),
        ]);

        assert_eq!(model.nodes_of_type("businessactor").len(), 2);
        assert_eq!(model.nodes_of_type("applicationcomponent").len(), 1);
        assert_eq!(model.statistics().total_nodes, 3);
        assert_eq!(
            model.statistics().nodes_per_type.get("businessactor"),
            Some(&2)
        );
    }

    #[test]
    fn test_total_nodes_equals_sum_of_buckets() {
        let mut model = Model::new("m1");
        model.set_many_nodes(vec![
            node("n1", "A", "Resource"),
            node("n2", "B", "Resource"),
            node("n3", "C", "Capability"),
        ]);
        let sum: usize = model.statistics().nodes_per_type.values().sum();
        assert_eq!(model.statistics().total_nodes, sum);
    }

    #[test]
    fn test_set_many_nodes_is_idempotent() {
        let nodes = vec![node("n1", "A", "Resource"), node("n2", "B", "Capability")];

        let mut once = Model::new("m1");
        once.set_many_nodes(nodes.clone());

        let mut twice = Model::new("m1");
        twice.set_many_nodes(nodes.clone());
        twice.set_many_nodes(nodes);

        assert_eq!(once.nodes(), twice.nodes());
        assert_eq!(once.statistics(), twice.statistics());
    }

    #[test]
    fn test_flatten_reattaches_bucket_key_as_type() {
        let mut model = Model::new("m1");
        model.set_many_nodes(vec![node("n1", "A", "BusinessActor")]);
        let flat = model.nodes();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].node_type, "businessactor");
    }

    #[test]
    fn test_relationship_buckets_and_flatten() {
        let mut model = Model::new("m1");
        model.set_many_relationships(vec![
            Relationship {
                identifier: "r1".into(),
                source_id: "a".into(),
                target_id: "b".into(),
                rel_type: "Assignment".into(),
                is_bidirectional: None,
            },
            Relationship {
                identifier: "r2".into(),
                source_id: "b".into(),
                target_id: "c".into(),
                rel_type: "assignment".into(),
                is_bidirectional: Some(true),
            },
        ]);
        assert_eq!(model.relationships_of_type("assignment").len(), 2);
        assert_eq!(model.statistics().total_relationships, 2);
        assert!(model.relationships().iter().all(|r| r.rel_type == "assignment"));
    }

    #[test]
    fn test_create_folder_generates_unique_ids() {
        let model = Model::new("m1");
        let a = model.create_folder("Views");
        let b = model.create_folder("Views");
        assert_ne!(a.id, b.id);
        assert!(a.is_directory);
        assert_eq!(a.children.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_add_folder_view_attaches_leaf() {
        let model = Model::new("m1");
        let mut folder = model.create_folder("Views");
        Model::add_folder_view(&mut folder, "v1", "Overview");

        let children = folder.children.as_ref().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "v1");
        assert_eq!(children[0].text, "Overview");
        assert!(!children[0].is_directory);
        assert!(children[0].children.is_none());
    }

    #[test]
    fn test_add_view_counts() {
        let mut model = Model::new("m1");
        model.add_view(View {
            id: "v1".into(),
            name: "Overview".into(),
            bounds: crate::geometry::BoundsAccumulator::new().finish(),
            view_nodes: Vec::new(),
            view_relationships: Vec::new(),
        });
        assert_eq!(model.views().len(), 1);
        assert_eq!(model.statistics().total_views, 1);
        assert!(model.view_by_id("v1").is_some());
    }

    #[test]
    fn test_bidirectional_flag_serialization() {
        let rel = Relationship {
            identifier: "r1".into(),
            source_id: "a".into(),
            target_id: "b".into(),
            rel_type: "association".into(),
            is_bidirectional: None,
        };
        let json = serde_json::to_value(&rel).unwrap();
        assert!(json.get("isBidirectional").is_none());
        assert_eq!(json["sourceId"], "a");
        assert_eq!(json["type"], "association");
    }
}

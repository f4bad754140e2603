//! Adapter for the nested-XML-tree dialect (`.archimate` files).
//!
//! One document holds everything: an `<archimate:model>` root whose
//! `<folder>` tree contains semantic elements, relationships and full
//! diagram payloads side by side. Shape coordinates are stored relative
//! to the immediate container, and connectors hang off their source
//! shape with bendpoints encoded as offsets from the endpoint centers.
//!
//! ```xml
//! <archimate:model xmlns:archimate="http://www.archimatetool.com/archimate"
//!                  id="m1" name="Demo">
//!   <folder name="Business" id="f1" type="business">
//!     <element xsi:type="archimate:BusinessActor" id="e1" name="Clerk">
//!       <documentation>Front office</documentation>
//!       <property key="owner" value="ops"/>
//!     </element>
//!   </folder>
//!   <folder name="Relations" id="f2" type="relations">
//!     <element xsi:type="archimate:AccessRelationship" id="r1"
//!              source="e1" target="e2" accessType="1"/>
//!   </folder>
//!   <folder name="Views" id="f3" type="diagrams">
//!     <element xsi:type="archimate:ArchimateDiagramModel" id="v1" name="Overview">
//!       <child xsi:type="archimate:DiagramModelArchimateObject" id="s1"
//!              archimateElement="e1">
//!         <bounds x="10" y="20" width="120" height="55"/>
//!         <sourceConnection xsi:type="archimate:DiagramModelArchimateConnection"
//!                           id="c1" source="s1" target="s2"
//!                           archimateRelationship="r1">
//!           <bendpoint startX="5" startY="0" endX="-5" endY="0"/>
//!         </sourceConnection>
//!       </child>
//!     </element>
//!   </folder>
//! </archimate:model>
//! ```

use crate::adapters::{AccessDirection, FormatAdapter, Handle};
use crate::error::TranslationError;
use crate::geometry::{Point, shape_center, weighted_bendpoint};
use crate::xml::{Document, ElementRef};

const DIAGRAM_TYPE: &str = "ArchimateDiagramModel";
const OBJECT_TYPES: [&str; 2] = ["DiagramModelArchimateObject", "DiagramModelReference"];
const NOTE_TYPE: &str = "DiagramModelNote";
const GROUP_TYPE: &str = "DiagramModelGroup";

/// Adapter over a parsed `.archimate` document.
pub struct ArchiAdapter {
    doc: Document,
}

impl ArchiAdapter {
    pub fn new(doc: Document) -> Self {
        Self { doc }
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, TranslationError> {
        Ok(Self::new(Document::parse(input)?))
    }

    fn h(&self, element: ElementRef) -> Handle {
        Handle::new(0, element)
    }

    /// `xsi:type` with the tool's namespace prefix stripped.
    fn xsi_type(&self, el: ElementRef) -> &str {
        let ty = self.doc.attribute(el, "xsi:type").unwrap_or("");
        ty.rsplit(':').next().unwrap_or(ty)
    }

    fn is_relationship_element(&self, el: ElementRef) -> bool {
        self.xsi_type(el).ends_with("Relationship")
    }

    fn is_diagram_element(&self, el: ElementRef) -> bool {
        self.xsi_type(el) == DIAGRAM_TYPE
    }

    /// Visit `<element>` entries of the folder tree in document order.
    fn walk_elements(&self, folder: ElementRef, visit: &mut dyn FnMut(ElementRef)) {
        for &child in self.doc.children(folder) {
            match self.doc.local_tag(child) {
                "folder" => self.walk_elements(child, visit),
                "element" => visit(child),
                _ => {}
            }
        }
    }

    fn bounds_of(&self, el: ElementRef) -> Option<ElementRef> {
        self.doc.first_child_named(el, "bounds")
    }
}

impl FormatAdapter for ArchiAdapter {
    fn model_id(&self) -> String {
        self.doc
            .attribute(self.doc.root(), "id")
            .unwrap_or_default()
            .to_string()
    }

    fn is_nested_diagram_structure(&self) -> bool {
        true
    }

    fn has_view_element_child_relationships(&self) -> bool {
        true
    }

    fn validate(&self) -> bool {
        let root = self.doc.root();
        self.doc.tag(root) == "archimate:model" && self.doc.attribute(root, "id").is_some()
    }

    // ── Nodes ───────────────────────────────────────────────────────

    fn for_each_node(
        &self,
        visit: &mut dyn FnMut(Handle),
    ) -> Result<(), TranslationError> {
        for &folder in &self.doc.children_named(self.doc.root(), "folder") {
            self.walk_elements(folder, &mut |el| {
                if !self.is_relationship_element(el) && !self.is_diagram_element(el) {
                    visit(self.h(el));
                }
            });
        }
        Ok(())
    }

    fn node_id(&self, node: Handle) -> String {
        self.doc
            .attribute(node.element, "id")
            .unwrap_or_default()
            .to_string()
    }

    fn is_junction(&self, node: Handle) -> bool {
        matches!(
            self.xsi_type(node.element),
            "Junction" | "AndJunction" | "OrJunction"
        )
    }

    fn junction_type(&self, node: Handle) -> String {
        match self.xsi_type(node.element) {
            "OrJunction" => "orjunction".to_string(),
            "AndJunction" => "andjunction".to_string(),
            // Plain junctions carry their routing kind in a `type` attr.
            _ => {
                if self.doc.attribute(node.element, "type") == Some("or") {
                    "orjunction".to_string()
                } else {
                    "andjunction".to_string()
                }
            }
        }
    }

    fn node_type(&self, node: Handle) -> String {
        self.xsi_type(node.element).to_string()
    }

    fn node_name(&self, node: Handle) -> Option<String> {
        self.doc
            .attribute(node.element, "name")
            .map(|n| n.to_string())
    }

    fn documentation(&self, node: Handle) -> Option<String> {
        self.doc
            .child_text(node.element, "documentation")
            .filter(|d| !d.is_empty())
            .map(|d| d.to_string())
    }

    fn properties(&self, node: Handle) -> Vec<Handle> {
        self.doc
            .children_named(node.element, "property")
            .into_iter()
            .map(|el| self.h(el))
            .collect()
    }

    fn property_entry(&self, property: Handle) -> Option<(String, String)> {
        let key = self.doc.attribute(property.element, "key")?;
        if key.is_empty() {
            return None;
        }
        let value = self
            .doc
            .attribute(property.element, "value")
            .unwrap_or_default();
        Some((key.to_string(), value.to_string()))
    }

    // ── Relationships ───────────────────────────────────────────────

    fn for_each_relationship(
        &self,
        visit: &mut dyn FnMut(Handle),
    ) -> Result<(), TranslationError> {
        for &folder in &self.doc.children_named(self.doc.root(), "folder") {
            self.walk_elements(folder, &mut |el| {
                if self.is_relationship_element(el) {
                    visit(self.h(el));
                }
            });
        }
        Ok(())
    }

    fn relationship_id(&self, relationship: Handle) -> String {
        self.node_id(relationship)
    }

    fn relationship_type(&self, relationship: Handle) -> String {
        self.xsi_type(relationship.element).to_string()
    }

    fn relationship_source_id(&self, relationship: Handle) -> String {
        self.doc
            .attribute(relationship.element, "source")
            .unwrap_or_default()
            .to_string()
    }

    fn relationship_target_id(&self, relationship: Handle) -> String {
        self.doc
            .attribute(relationship.element, "target")
            .unwrap_or_default()
            .to_string()
    }

    fn is_association(&self, relationship: Handle) -> bool {
        self.xsi_type(relationship.element) == "AssociationRelationship"
    }

    fn association_is_directed(&self, relationship: Handle) -> bool {
        self.doc.attribute(relationship.element, "directed") == Some("true")
    }

    fn is_access(&self, relationship: Handle) -> bool {
        self.xsi_type(relationship.element) == "AccessRelationship"
    }

    fn access_direction(&self, relationship: Handle) -> AccessDirection {
        // accessType: absent/0 write, 1 read, 2 undirected, 3 read-write.
        match self.doc.attribute(relationship.element, "accessType") {
            Some("1") => AccessDirection {
                source: true,
                target: false,
            },
            Some("2") => AccessDirection {
                source: false,
                target: false,
            },
            Some("3") => AccessDirection {
                source: true,
                target: true,
            },
            _ => AccessDirection {
                source: false,
                target: true,
            },
        }
    }

    // ── Folders ─────────────────────────────────────────────────────

    fn organization_roots(&self) -> Result<Vec<Handle>, TranslationError> {
        Ok(self
            .doc
            .children_named(self.doc.root(), "folder")
            .into_iter()
            .filter(|&f| self.doc.attribute(f, "type") == Some("diagrams"))
            .map(|f| self.h(f))
            .collect())
    }

    fn folder_name(&self, folder: Handle) -> String {
        self.doc
            .attribute(folder.element, "name")
            .unwrap_or_default()
            .to_string()
    }

    fn sub_folders(&self, folder: Handle) -> Result<Vec<Handle>, TranslationError> {
        Ok(self
            .doc
            .children_named(folder.element, "folder")
            .into_iter()
            .map(|f| self.h(f))
            .collect())
    }

    fn folder_views(&self, folder: Handle) -> Result<Vec<Handle>, TranslationError> {
        Ok(self
            .doc
            .children_named(folder.element, "element")
            .into_iter()
            .filter(|&el| self.is_diagram_element(el))
            .map(|el| self.h(el))
            .collect())
    }

    // ── View shapes ─────────────────────────────────────────────────

    fn view_id(&self, view: Handle) -> String {
        self.node_id(view)
    }

    fn view_name(&self, view: Handle) -> String {
        self.doc
            .attribute(view.element, "name")
            .unwrap_or_default()
            .to_string()
    }

    fn view_elements(&self, view: Handle) -> Vec<Handle> {
        self.doc
            .children_named(view.element, "child")
            .into_iter()
            .map(|el| self.h(el))
            .collect()
    }

    fn view_element_id(&self, element: Handle) -> String {
        self.node_id(element)
    }

    fn model_id_of(&self, element: Handle) -> Option<String> {
        self.doc
            .attribute(element.element, "archimateElement")
            .map(|id| id.to_string())
    }

    fn position_x(&self, element: Handle, _parent: Option<Handle>) -> i32 {
        // Coordinates are already container-relative.
        self.bounds_of(element.element)
            .map(|b| self.doc.int_attribute(b, "x"))
            .unwrap_or(0)
    }

    fn position_y(&self, element: Handle, _parent: Option<Handle>) -> i32 {
        self.bounds_of(element.element)
            .map(|b| self.doc.int_attribute(b, "y"))
            .unwrap_or(0)
    }

    fn width(&self, element: Handle) -> i32 {
        self.bounds_of(element.element)
            .map(|b| self.doc.int_attribute(b, "width"))
            .unwrap_or(0)
    }

    fn height(&self, element: Handle) -> i32 {
        self.bounds_of(element.element)
            .map(|b| self.doc.int_attribute(b, "height"))
            .unwrap_or(0)
    }

    fn nested_elements(&self, element: Handle) -> Vec<Handle> {
        self.doc
            .children_named(element.element, "child")
            .into_iter()
            .map(|el| self.h(el))
            .collect()
    }

    fn is_object(&self, element: Handle) -> bool {
        OBJECT_TYPES.contains(&self.xsi_type(element.element))
    }

    fn is_note(&self, element: Handle) -> bool {
        self.xsi_type(element.element) == NOTE_TYPE
    }

    fn is_group(&self, element: Handle) -> bool {
        self.xsi_type(element.element) == GROUP_TYPE
    }

    fn note_content(&self, element: Handle) -> String {
        self.doc
            .child_text(element.element, "content")
            .unwrap_or_default()
            .to_string()
    }

    fn group_name(&self, element: Handle) -> String {
        self.doc
            .attribute(element.element, "name")
            .unwrap_or_default()
            .to_string()
    }

    // ── View connectors ─────────────────────────────────────────────

    fn source_relationships_of(&self, element: Handle) -> Vec<Handle> {
        self.doc
            .children_named(element.element, "sourceConnection")
            .into_iter()
            .map(|el| self.h(el))
            .collect()
    }

    fn bendpoints_of(&self, connector: Handle) -> Vec<Handle> {
        self.doc
            .children_named(connector.element, "bendpoint")
            .into_iter()
            .map(|el| self.h(el))
            .collect()
    }

    fn bendpoint(
        &self,
        point: Handle,
        index: usize,
        total: usize,
        source: Handle,
        target: Handle,
        top_level: &[Handle],
    ) -> Point {
        // Bendpoints are stored as offsets from the endpoint shape
        // centers; recover view-origin centers through the nesting chain
        // and blend by position along the connector.
        let source_center = self.view_origin_center(source, top_level);
        let target_center = self.view_origin_center(target, top_level);
        let source_delta = (
            self.doc.int_attribute(point.element, "startX"),
            self.doc.int_attribute(point.element, "startY"),
        );
        let target_delta = (
            self.doc.int_attribute(point.element, "endX"),
            self.doc.int_attribute(point.element, "endY"),
        );
        weighted_bendpoint(
            index,
            total,
            source_center,
            target_center,
            source_delta,
            target_delta,
        )
    }

    fn relationship_id_of(&self, connector: Handle) -> String {
        self.node_id(connector)
    }

    fn model_relationship_id_of(&self, connector: Handle) -> Option<String> {
        self.doc
            .attribute(connector.element, "archimateRelationship")
            .map(|id| id.to_string())
    }

    fn source_element_id_of(&self, connector: Handle) -> String {
        self.doc
            .attribute(connector.element, "source")
            .unwrap_or_default()
            .to_string()
    }

    fn target_element_id_of(&self, connector: Handle) -> String {
        self.doc
            .attribute(connector.element, "target")
            .unwrap_or_default()
            .to_string()
    }
}

impl ArchiAdapter {
    fn view_origin_center(&self, shape: Handle, top_level: &[Handle]) -> (f64, f64) {
        let id = self.view_element_id(shape);
        let (x, y) = self
            .nested_position_of(top_level, &id)
            .unwrap_or_else(|| (self.position_x(shape, None), self.position_y(shape, None)));
        shape_center(x, y, self.width(shape), self.height(shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<archimate:model xmlns:archimate="http://www.archimatetool.com/archimate" id="m1" name="Demo">
  <folder name="Business" id="f1" type="business">
    <element xsi:type="archimate:BusinessActor" id="e1" name="Clerk">
      <documentation>Front office</documentation>
      <property key="owner" value="ops"/>
      <property value="orphan"/>
    </element>
    <folder name="Inner" id="f1a">
      <element xsi:type="archimate:BusinessRole" id="e2"/>
    </folder>
  </folder>
  <folder name="Other" id="f2" type="other">
    <element xsi:type="archimate:Junction" id="j1" type="or"/>
  </folder>
  <folder name="Relations" id="f3" type="relations">
    <element xsi:type="archimate:AccessRelationship" id="r1" source="e1" target="e2" accessType="1"/>
    <element xsi:type="archimate:AssociationRelationship" id="r2" source="e1" target="e2"/>
  </folder>
  <folder name="Views" id="f4" type="diagrams">
    <folder name="Deep" id="f4a">
      <element xsi:type="archimate:ArchimateDiagramModel" id="v2" name="Inner view"/>
    </folder>
    <element xsi:type="archimate:ArchimateDiagramModel" id="v1" name="Overview">
      <child xsi:type="archimate:DiagramModelGroup" id="s1" name="Zone">
        <bounds x="100" y="100" width="400" height="300"/>
        <child xsi:type="archimate:DiagramModelArchimateObject" id="s2" archimateElement="e1">
          <bounds x="20" y="30" width="120" height="55"/>
        </child>
      </child>
      <child xsi:type="archimate:DiagramModelNote" id="s3">
        <bounds x="600" y="10" width="100" height="60"/>
        <content>remember</content>
      </child>
    </element>
  </folder>
</archimate:model>"#;

    fn adapter() -> ArchiAdapter {
        ArchiAdapter::from_bytes(MODEL.as_bytes()).unwrap()
    }

    fn collect_nodes(adapter: &ArchiAdapter) -> Vec<Handle> {
        let mut out = Vec::new();
        adapter.for_each_node(&mut |h| out.push(h)).unwrap();
        out
    }

    #[test]
    fn test_validate_and_model_id() {
        let a = adapter();
        assert!(a.validate());
        assert_eq!(a.model_id(), "m1");

        let other = ArchiAdapter::from_bytes(b"<model id=\"x\"/>").unwrap();
        assert!(!other.validate());
    }

    #[test]
    fn test_node_iteration_in_document_order() {
        let a = adapter();
        let nodes = collect_nodes(&a);
        let ids: Vec<_> = nodes.iter().map(|&h| a.node_id(h)).collect();
        assert_eq!(ids, ["e1", "e2", "j1"]);
    }

    #[test]
    fn test_node_facts() {
        let a = adapter();
        let nodes = collect_nodes(&a);
        assert_eq!(a.node_type(nodes[0]), "BusinessActor");
        assert_eq!(a.node_name(nodes[0]).as_deref(), Some("Clerk"));
        assert_eq!(a.documentation(nodes[0]).as_deref(), Some("Front office"));
        assert_eq!(a.node_name(nodes[1]), None);
    }

    #[test]
    fn test_property_entries_drop_malformed() {
        let a = adapter();
        let nodes = collect_nodes(&a);
        let props = a.properties(nodes[0]);
        assert_eq!(props.len(), 2);
        assert_eq!(
            a.property_entry(props[0]),
            Some(("owner".to_string(), "ops".to_string()))
        );
        assert_eq!(a.property_entry(props[1]), None);
    }

    #[test]
    fn test_junction_typing() {
        let a = adapter();
        let nodes = collect_nodes(&a);
        assert!(a.is_junction(nodes[2]));
        assert_eq!(a.junction_type(nodes[2]), "orjunction");
    }

    #[test]
    fn test_relationship_facts() {
        let a = adapter();
        let mut rels = Vec::new();
        a.for_each_relationship(&mut |h| rels.push(h)).unwrap();
        assert_eq!(rels.len(), 2);

        assert!(a.is_access(rels[0]));
        assert_eq!(
            a.access_direction(rels[0]),
            AccessDirection {
                source: true,
                target: false
            }
        );
        assert!(a.is_association(rels[1]));
        assert!(!a.association_is_directed(rels[1]));
        assert_eq!(a.relationship_source_id(rels[0]), "e1");
        assert_eq!(a.relationship_target_id(rels[0]), "e2");
    }

    #[test]
    fn test_organization_roots_are_diagram_folders() {
        let a = adapter();
        let roots = a.organization_roots().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(a.folder_name(roots[0]), "Views");

        let subs = a.sub_folders(roots[0]).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(a.folder_name(subs[0]), "Deep");

        let views = a.folder_views(roots[0]).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(a.view_id(views[0]), "v1");
        assert_eq!(a.view_name(views[0]), "Overview");
    }

    #[test]
    fn test_shape_classification_and_geometry() {
        let a = adapter();
        let roots = a.organization_roots().unwrap();
        let view = a.folder_views(roots[0]).unwrap()[0];
        let top = a.view_elements(view);
        assert_eq!(top.len(), 2);

        assert!(a.is_group(top[0]));
        assert_eq!(a.group_name(top[0]), "Zone");
        assert!(a.is_note(top[1]));
        assert_eq!(a.note_content(top[1]), "remember");

        let nested = a.nested_elements(top[0]);
        assert_eq!(nested.len(), 1);
        assert!(a.is_object(nested[0]));
        assert_eq!(a.model_id_of(nested[0]).as_deref(), Some("e1"));
        assert_eq!(a.position_x(nested[0], Some(top[0])), 20);
        assert_eq!(a.width(nested[0]), 120);
    }

    #[test]
    fn test_tree_search_helpers() {
        let a = adapter();
        let roots = a.organization_roots().unwrap();
        let view = a.folder_views(roots[0]).unwrap()[0];
        let top = a.view_elements(view);

        let found = a.find_view_element(&top, "s2").unwrap();
        assert_eq!(a.view_element_id(found), "s2");
        assert!(a.find_view_element(&top, "nope").is_none());

        let parent = a.find_view_element_parent(&top, "s2").unwrap();
        assert_eq!(a.view_element_id(parent), "s1");
        assert!(a.find_view_element_parent(&top, "s1").is_none());

        // s2 sits at (20,30) inside s1 at (100,100).
        assert_eq!(a.nested_position_of(&top, "s2"), Some((120, 130)));
    }
}

//! Adapter for the flat exchange-format dialect (Open Exchange XML).
//!
//! The document keeps separate top-level sections for elements,
//! relationships, property definitions, diagrams and organizations. Shape
//! coordinates are absolute view coordinates, connectors form a flat
//! per-view list, and the organization tree never embeds diagram payloads
//! — its leaf items only carry `identifierRef` pointers into the flat
//! diagram list, so views must be translated before the folder walk.
//!
//! ```xml
//! <model xmlns="http://www.opengroup.org/xsd/archimate/3.0/" identifier="id-m1">
//!   <name xml:lang="en">Demo</name>
//!   <elements>
//!     <element identifier="e1" xsi:type="BusinessActor">
//!       <name>Clerk</name>
//!       <properties>
//!         <property propertyDefinitionRef="p1"><value>ops</value></property>
//!       </properties>
//!     </element>
//!   </elements>
//!   <relationships>
//!     <relationship identifier="r1" source="e1" target="e2"
//!                   xsi:type="Access" accessType="Read"/>
//!   </relationships>
//!   <propertyDefinitions>
//!     <propertyDefinition identifier="p1" type="string"><name>owner</name></propertyDefinition>
//!   </propertyDefinitions>
//!   <views>
//!     <diagrams>
//!       <view identifier="v1" xsi:type="Diagram">
//!         <name>Overview</name>
//!         <node identifier="s1" elementRef="e1" xsi:type="Element"
//!               x="10" y="20" w="120" h="55"/>
//!         <connection identifier="c1" relationshipRef="r1" xsi:type="Relationship"
//!                     source="s1" target="s2">
//!           <bendpoint x="150" y="40"/>
//!         </connection>
//!       </view>
//!     </diagrams>
//!   </views>
//!   <organizations>
//!     <item>
//!       <label>Views</label>
//!       <item identifierRef="v1"/>
//!     </item>
//!   </organizations>
//! </model>
//! ```

use rustc_hash::{FxHashMap, FxHashSet};

use crate::adapters::{AccessDirection, FormatAdapter, Handle};
use crate::error::TranslationError;
use crate::geometry::Point;
use crate::xml::{Document, ElementRef};

/// Adapter over a parsed exchange-format document.
pub struct AoeffAdapter {
    doc: Document,
    /// Property definition id → display key, resolved once up front.
    property_definitions: FxHashMap<String, String>,
    /// Identifiers of the flat diagram list, for filtering organization
    /// items down to view references.
    view_ids: FxHashSet<String>,
}

impl AoeffAdapter {
    pub fn new(doc: Document) -> Self {
        let mut property_definitions = FxHashMap::default();
        let mut view_ids = FxHashSet::default();

        let root = doc.root();
        if let Some(defs) = doc.first_child_named(root, "propertyDefinitions") {
            for def in doc.children_named(defs, "propertyDefinition") {
                if let (Some(id), Some(name)) =
                    (doc.attribute(def, "identifier"), doc.child_text(def, "name"))
                {
                    property_definitions.insert(id.to_string(), name.to_string());
                }
            }
        }
        if let Some(views) = doc.first_child_named(root, "views") {
            for diagrams in doc.children_named(views, "diagrams") {
                for view in doc.children_named(diagrams, "view") {
                    if let Some(id) = doc.attribute(view, "identifier") {
                        view_ids.insert(id.to_string());
                    }
                }
            }
        }

        Self {
            doc,
            property_definitions,
            view_ids,
        }
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, TranslationError> {
        Ok(Self::new(Document::parse(input)?))
    }

    fn h(&self, element: ElementRef) -> Handle {
        Handle::new(0, element)
    }

    fn xsi_type(&self, el: ElementRef) -> &str {
        self.doc.attribute(el, "xsi:type").unwrap_or("")
    }

    fn section(&self, name: &str) -> Option<ElementRef> {
        self.doc.first_child_named(self.doc.root(), name)
    }

    /// True for organization items that are folders (labelled, no ref).
    fn is_folder_item(&self, el: ElementRef) -> bool {
        self.doc.attribute(el, "identifierRef").is_none()
            && self.doc.first_child_named(el, "label").is_some()
    }
}

impl FormatAdapter for AoeffAdapter {
    fn model_id(&self) -> String {
        self.doc
            .attribute(self.doc.root(), "identifier")
            .unwrap_or_default()
            .to_string()
    }

    fn is_nested_diagram_structure(&self) -> bool {
        false
    }

    fn has_view_element_child_relationships(&self) -> bool {
        false
    }

    fn validate(&self) -> bool {
        self.doc.local_tag(self.doc.root()) == "model" && self.section("elements").is_some()
    }

    // ── Nodes ───────────────────────────────────────────────────────

    fn for_each_node(
        &self,
        visit: &mut dyn FnMut(Handle),
    ) -> Result<(), TranslationError> {
        if let Some(elements) = self.section("elements") {
            for el in self.doc.children_named(elements, "element") {
                visit(self.h(el));
            }
        }
        Ok(())
    }

    fn node_id(&self, node: Handle) -> String {
        self.doc
            .attribute(node.element, "identifier")
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
            _ => "andjunction".to_string(),
        }
    }

    fn node_type(&self, node: Handle) -> String {
        self.xsi_type(node.element).to_string()
    }

    fn node_name(&self, node: Handle) -> Option<String> {
        self.doc
            .child_text(node.element, "name")
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
            .first_child_named(node.element, "properties")
            .map(|props| {
                self.doc
                    .children_named(props, "property")
                    .into_iter()
                    .map(|el| self.h(el))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn property_entry(&self, property: Handle) -> Option<(String, String)> {
        let def_ref = self.doc.attribute(property.element, "propertyDefinitionRef")?;
        let key = self.property_definitions.get(def_ref)?;
        let value = self
            .doc
            .child_text(property.element, "value")
            .unwrap_or_default();
        Some((key.clone(), value.to_string()))
    }

    // ── Relationships ───────────────────────────────────────────────

    fn for_each_relationship(
        &self,
        visit: &mut dyn FnMut(Handle),
    ) -> Result<(), TranslationError> {
        if let Some(relationships) = self.section("relationships") {
            for el in self.doc.children_named(relationships, "relationship") {
                visit(self.h(el));
            }
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
        self.xsi_type(relationship.element) == "Association"
    }

    fn association_is_directed(&self, relationship: Handle) -> bool {
        self.doc.attribute(relationship.element, "isDirected") == Some("true")
    }

    fn is_access(&self, relationship: Handle) -> bool {
        self.xsi_type(relationship.element) == "Access"
    }

    fn access_direction(&self, relationship: Handle) -> AccessDirection {
        match self.doc.attribute(relationship.element, "accessType") {
            Some("Read") => AccessDirection {
                source: true,
                target: false,
            },
            Some("Access") => AccessDirection {
                source: false,
                target: false,
            },
            Some("ReadWrite") => AccessDirection {
                source: true,
                target: true,
            },
            // Write is the default when the attribute is absent.
            _ => AccessDirection {
                source: false,
                target: true,
            },
        }
    }

    // ── Folders ─────────────────────────────────────────────────────

    fn organization_roots(&self) -> Result<Vec<Handle>, TranslationError> {
        Ok(self
            .section("organizations")
            .map(|orgs| {
                self.doc
                    .children_named(orgs, "item")
                    .into_iter()
                    .filter(|&item| self.is_folder_item(item))
                    .map(|item| self.h(item))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn folder_name(&self, folder: Handle) -> String {
        self.doc
            .child_text(folder.element, "label")
            .unwrap_or_default()
            .to_string()
    }

    fn sub_folders(&self, folder: Handle) -> Result<Vec<Handle>, TranslationError> {
        Ok(self
            .doc
            .children_named(folder.element, "item")
            .into_iter()
            .filter(|&item| self.is_folder_item(item))
            .map(|item| self.h(item))
            .collect())
    }

    fn folder_views(&self, folder: Handle) -> Result<Vec<Handle>, TranslationError> {
        // Organization items may reference any identifier; keep only the
        // ones that point into the flat diagram list.
        Ok(self
            .doc
            .children_named(folder.element, "item")
            .into_iter()
            .filter(|&item| {
                self.doc
                    .attribute(item, "identifierRef")
                    .is_some_and(|id| self.view_ids.contains(id))
            })
            .map(|item| self.h(item))
            .collect())
    }

    fn diagrams(&self) -> Result<Vec<Handle>, TranslationError> {
        let mut out = Vec::new();
        if let Some(views) = self.section("views") {
            for diagrams in self.doc.children_named(views, "diagrams") {
                for view in self.doc.children_named(diagrams, "view") {
                    out.push(self.h(view));
                }
            }
        }
        Ok(out)
    }

    // ── View shapes ─────────────────────────────────────────────────

    fn view_id(&self, view: Handle) -> String {
        // Organization reference items carry identifierRef; real views
        // carry identifier.
        self.doc
            .attribute(view.element, "identifierRef")
            .or_else(|| self.doc.attribute(view.element, "identifier"))
            .unwrap_or_default()
            .to_string()
    }

    fn view_name(&self, view: Handle) -> String {
        self.doc
            .child_text(view.element, "name")
            .unwrap_or_default()
            .to_string()
    }

    fn view_elements(&self, view: Handle) -> Vec<Handle> {
        self.doc
            .children_named(view.element, "node")
            .into_iter()
            .map(|el| self.h(el))
            .collect()
    }

    fn view_element_id(&self, element: Handle) -> String {
        self.node_id(element)
    }

    fn model_id_of(&self, element: Handle) -> Option<String> {
        self.doc
            .attribute(element.element, "elementRef")
            .map(|id| id.to_string())
    }

    fn position_x(&self, element: Handle, parent: Option<Handle>) -> i32 {
        // Stored coordinates are absolute; re-express against the
        // immediate container when one is given.
        let x = self.doc.int_attribute(element.element, "x");
        match parent {
            Some(p) => x - self.doc.int_attribute(p.element, "x"),
            None => x,
        }
    }

    fn position_y(&self, element: Handle, parent: Option<Handle>) -> i32 {
        let y = self.doc.int_attribute(element.element, "y");
        match parent {
            Some(p) => y - self.doc.int_attribute(p.element, "y"),
            None => y,
        }
    }

    fn width(&self, element: Handle) -> i32 {
        self.doc.int_attribute(element.element, "w")
    }

    fn height(&self, element: Handle) -> i32 {
        self.doc.int_attribute(element.element, "h")
    }

    fn nested_elements(&self, element: Handle) -> Vec<Handle> {
        self.doc
            .children_named(element.element, "node")
            .into_iter()
            .map(|el| self.h(el))
            .collect()
    }

    fn is_object(&self, element: Handle) -> bool {
        self.xsi_type(element.element) == "Element"
    }

    fn is_note(&self, element: Handle) -> bool {
        self.xsi_type(element.element) == "Label"
    }

    fn is_group(&self, element: Handle) -> bool {
        self.xsi_type(element.element) == "Container"
    }

    fn note_content(&self, element: Handle) -> String {
        self.doc
            .child_text(element.element, "label")
            .unwrap_or_default()
            .to_string()
    }

    fn group_name(&self, element: Handle) -> String {
        self.doc
            .child_text(element.element, "label")
            .unwrap_or_default()
            .to_string()
    }

    // ── View connectors ─────────────────────────────────────────────

    fn view_relationships(&self, view: Handle) -> Vec<Handle> {
        self.doc
            .children_named(view.element, "connection")
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
        _index: usize,
        _total: usize,
        _source: Handle,
        _target: Handle,
        _top_level: &[Handle],
    ) -> Point {
        // Already absolute view coordinates.
        Point {
            x: self.doc.int_attribute(point.element, "x"),
            y: self.doc.int_attribute(point.element, "y"),
        }
    }

    fn relationship_id_of(&self, connector: Handle) -> String {
        self.node_id(connector)
    }

    fn model_relationship_id_of(&self, connector: Handle) -> Option<String> {
        self.doc
            .attribute(connector.element, "relationshipRef")
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

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://www.opengroup.org/xsd/archimate/3.0/" identifier="id-m1">
  <name xml:lang="en">Demo</name>
  <elements>
    <element identifier="e1" xsi:type="BusinessActor">
      <name>Clerk</name>
      <documentation>Front office</documentation>
      <properties>
        <property propertyDefinitionRef="p1"><value>ops</value></property>
        <property propertyDefinitionRef="missing"><value>x</value></property>
      </properties>
    </element>
    <element identifier="e2" xsi:type="ApplicationComponent">
      <name>Ledger</name>
    </element>
    <element identifier="j1" xsi:type="OrJunction"/>
  </elements>
  <relationships>
    <relationship identifier="r1" source="e1" target="e2" xsi:type="Access" accessType="ReadWrite"/>
    <relationship identifier="r2" source="e1" target="e2" xsi:type="Association"/>
  </relationships>
  <propertyDefinitions>
    <propertyDefinition identifier="p1" type="string"><name>owner</name></propertyDefinition>
  </propertyDefinitions>
  <views>
    <diagrams>
      <view identifier="v1" xsi:type="Diagram">
        <name>Overview</name>
        <node identifier="s1" elementRef="e1" xsi:type="Element" x="10" y="20" w="120" h="55">
          <node identifier="s2" elementRef="e2" xsi:type="Element" x="40" y="50" w="60" h="30"/>
        </node>
        <node identifier="s3" xsi:type="Label" x="300" y="10" w="90" h="40">
          <label>remember</label>
        </node>
        <connection identifier="c1" relationshipRef="r1" xsi:type="Relationship" source="s1" target="s2">
          <bendpoint x="150" y="40"/>
        </connection>
      </view>
    </diagrams>
  </views>
  <organizations>
    <item>
      <label>Views</label>
      <item identifierRef="v1"/>
      <item identifierRef="e1"/>
      <item>
        <label>Empty</label>
      </item>
    </item>
  </organizations>
</model>"#;

    fn adapter() -> AoeffAdapter {
        AoeffAdapter::from_bytes(MODEL.as_bytes()).unwrap()
    }

    #[test]
    fn test_validate_and_identity() {
        let a = adapter();
        assert!(a.validate());
        assert_eq!(a.model_id(), "id-m1");
        assert!(!a.is_nested_diagram_structure());
        assert!(!a.has_view_element_child_relationships());
    }

    #[test]
    fn test_property_definition_indirection() {
        let a = adapter();
        let mut nodes = Vec::new();
        a.for_each_node(&mut |h| nodes.push(h)).unwrap();
        assert_eq!(nodes.len(), 3);

        let props = a.properties(nodes[0]);
        assert_eq!(props.len(), 2);
        assert_eq!(
            a.property_entry(props[0]),
            Some(("owner".to_string(), "ops".to_string()))
        );
        // Unknown definition reference decodes as malformed.
        assert_eq!(a.property_entry(props[1]), None);
    }

    #[test]
    fn test_junction_and_names() {
        let a = adapter();
        let mut nodes = Vec::new();
        a.for_each_node(&mut |h| nodes.push(h)).unwrap();
        assert!(a.is_junction(nodes[2]));
        assert_eq!(a.junction_type(nodes[2]), "orjunction");
        assert_eq!(a.node_name(nodes[0]).as_deref(), Some("Clerk"));
    }

    #[test]
    fn test_access_and_association_facts() {
        let a = adapter();
        let mut rels = Vec::new();
        a.for_each_relationship(&mut |h| rels.push(h)).unwrap();

        assert!(a.is_access(rels[0]));
        assert_eq!(
            a.access_direction(rels[0]),
            AccessDirection {
                source: true,
                target: true
            }
        );
        assert!(a.is_association(rels[1]));
        assert!(!a.association_is_directed(rels[1]));
    }

    #[test]
    fn test_flat_diagram_list() {
        let a = adapter();
        let diagrams = a.diagrams().unwrap();
        assert_eq!(diagrams.len(), 1);
        assert_eq!(a.view_id(diagrams[0]), "v1");
        assert_eq!(a.view_name(diagrams[0]), "Overview");
    }

    #[test]
    fn test_absolute_positions_become_container_relative() {
        let a = adapter();
        let view = a.diagrams().unwrap()[0];
        let top = a.view_elements(view);
        assert_eq!(top.len(), 2);

        let nested = a.nested_elements(top[0]);
        assert_eq!(a.position_x(nested[0], None), 40);
        assert_eq!(a.position_x(nested[0], Some(top[0])), 30);
        assert_eq!(a.position_y(nested[0], Some(top[0])), 30);
    }

    #[test]
    fn test_note_shape() {
        let a = adapter();
        let view = a.diagrams().unwrap()[0];
        let top = a.view_elements(view);
        assert!(a.is_note(top[1]));
        assert_eq!(a.note_content(top[1]), "remember");
    }

    #[test]
    fn test_flat_connector_list_and_absolute_bendpoints() {
        let a = adapter();
        let view = a.diagrams().unwrap()[0];
        let conns = a.view_relationships(view);
        assert_eq!(conns.len(), 1);
        assert_eq!(a.model_relationship_id_of(conns[0]).as_deref(), Some("r1"));
        assert_eq!(a.source_element_id_of(conns[0]), "s1");

        let points = a.bendpoints_of(conns[0]);
        let top = a.view_elements(view);
        let p = a.bendpoint(points[0], 0, 1, top[0], top[0], &top);
        assert_eq!(p, Point { x: 150, y: 40 });
    }

    #[test]
    fn test_organization_items_filter_to_views() {
        let a = adapter();
        let roots = a.organization_roots().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(a.folder_name(roots[0]), "Views");

        // The element reference is not a folder and not a view reference.
        let subs = a.sub_folders(roots[0]).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(a.folder_name(subs[0]), "Empty");

        let views = a.folder_views(roots[0]).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(a.view_id(views[0]), "v1");
    }
}

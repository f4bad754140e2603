//! Adapter for the folder-per-entity dialect.
//!
//! The model is a directory tree mirroring the organization tree: every
//! directory carries a `folder.xml` describing itself, and every other
//! `*.xml` file holds exactly one entity — a semantic element, a
//! relationship, or a full diagram payload in the nested dialect's
//! vocabulary (parent-relative `<bounds>`, source-attached
//! `<sourceConnection>`, offset `<bendpoint>`).
//!
//! ```text
//! root/
//! ├── folder.xml                    <folder id="m1" name="Model" type="model"/>
//! ├── business/
//! │   ├── folder.xml
//! │   └── e1.xml                    <element xsi:type="archimate:BusinessActor" .../>
//! ├── relations/
//! │   ├── folder.xml
//! │   └── r1.xml
//! └── diagrams/
//!     ├── folder.xml                type="diagrams"
//!     └── v1.xml                    <element xsi:type="archimate:ArchimateDiagramModel" ...>
//! ```
//!
//! Files are read and parsed during iteration, one blocking read per
//! callback, never up front; parsed documents stay cached so previously
//! issued handles remain valid for the adapter's lifetime. Document order
//! is the name-sorted recursive walk, which keeps iteration stable across
//! filesystems.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use crate::adapters::{AccessDirection, FormatAdapter, Handle};
use crate::error::TranslationError;
use crate::geometry::{Point, shape_center, weighted_bendpoint};
use crate::xml::Document;

const FOLDER_FILE: &str = "folder.xml";
const DIAGRAM_TYPE: &str = "ArchimateDiagramModel";
const OBJECT_TYPES: [&str; 2] = ["DiagramModelArchimateObject", "DiagramModelReference"];
const NOTE_TYPE: &str = "DiagramModelNote";
const GROUP_TYPE: &str = "DiagramModelGroup";

#[derive(Default)]
struct DocumentCache {
    docs: Vec<Document>,
    paths: Vec<PathBuf>,
    by_path: FxHashMap<PathBuf, u32>,
}

/// Adapter over a folder-per-entity directory tree.
pub struct GraficoAdapter {
    root: PathBuf,
    cache: RefCell<DocumentCache>,
}

impl GraficoAdapter {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RefCell::new(DocumentCache::default()),
        }
    }

    /// Parse a file (or return its cached document) and hand out a handle
    /// to its root element.
    fn load(&self, path: &Path) -> Result<Handle, TranslationError> {
        if let Some(&idx) = self.cache.borrow().by_path.get(path) {
            let element = self.cache.borrow().docs[idx as usize].root();
            return Ok(Handle::new(idx, element));
        }
        let bytes = std::fs::read(path)?;
        let doc = Document::parse(&bytes)?;
        let element = doc.root();
        let mut cache = self.cache.borrow_mut();
        let idx = cache.docs.len() as u32;
        cache.docs.push(doc);
        cache.paths.push(path.to_path_buf());
        cache.by_path.insert(path.to_path_buf(), idx);
        Ok(Handle::new(idx, element))
    }

    fn with_doc<R>(&self, h: Handle, f: impl FnOnce(&Document) -> R) -> R {
        let cache = self.cache.borrow();
        f(&cache.docs[h.doc as usize])
    }

    /// Directory a folder handle's `folder.xml` lives in.
    fn dir_of(&self, h: Handle) -> PathBuf {
        let cache = self.cache.borrow();
        let path = &cache.paths[h.doc as usize];
        path.parent().unwrap_or(path).to_path_buf()
    }

    fn xsi_type_of(&self, h: Handle) -> String {
        self.with_doc(h, |d| {
            let ty = d.attribute(h.element, "xsi:type").unwrap_or("");
            ty.rsplit(':').next().unwrap_or(ty).to_string()
        })
    }

    fn attr(&self, h: Handle, name: &str) -> Option<String> {
        self.with_doc(h, |d| d.attribute(h.element, name).map(|v| v.to_string()))
    }

    fn attr_or_default(&self, h: Handle, name: &str) -> String {
        self.attr(h, name).unwrap_or_default()
    }

    fn children_named(&self, h: Handle, tag: &str) -> Vec<Handle> {
        self.with_doc(h, |d| {
            d.children_named(h.element, tag)
                .into_iter()
                .map(|el| Handle::new(h.doc, el))
                .collect()
        })
    }

    fn bounds_attr(&self, h: Handle, name: &str) -> i32 {
        self.with_doc(h, |d| {
            d.first_child_named(h.element, "bounds")
                .map(|b| d.int_attribute(b, name))
                .unwrap_or(0)
        })
    }

    fn is_relationship_type(ty: &str) -> bool {
        ty.ends_with("Relationship")
    }

    /// Visit every entity file under the root, name-sorted, parsing each
    /// as it is reached.
    fn for_each_entity(
        &self,
        keep: &dyn Fn(&str) -> bool,
        visit: &mut dyn FnMut(Handle),
    ) -> Result<(), TranslationError> {
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| TranslationError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("xml")
                || path.file_name().and_then(|n| n.to_str()) == Some(FOLDER_FILE)
            {
                continue;
            }
            let handle = self.load(path)?;
            if keep(&self.xsi_type_of(handle)) {
                visit(handle);
            }
        }
        Ok(())
    }

    /// Sorted subdirectories of a directory.
    fn sub_dirs(&self, dir: &Path) -> Result<Vec<PathBuf>, TranslationError> {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }

    /// Sorted entity files directly inside a directory.
    fn entity_files(&self, dir: &Path) -> Result<Vec<PathBuf>, TranslationError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension().and_then(|e| e.to_str()) == Some("xml")
                    && p.file_name().and_then(|n| n.to_str()) != Some(FOLDER_FILE)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn view_origin_center(&self, shape: Handle, top_level: &[Handle]) -> (f64, f64) {
        let id = self.view_element_id(shape);
        let (x, y) = self
            .nested_position_of(top_level, &id)
            .unwrap_or_else(|| (self.position_x(shape, None), self.position_y(shape, None)));
        shape_center(x, y, self.width(shape), self.height(shape))
    }
}

impl FormatAdapter for GraficoAdapter {
    fn model_id(&self) -> String {
        self.load(&self.root.join(FOLDER_FILE))
            .ok()
            .and_then(|h| self.attr(h, "id"))
            .unwrap_or_default()
    }

    fn is_nested_diagram_structure(&self) -> bool {
        true
    }

    fn has_view_element_child_relationships(&self) -> bool {
        true
    }

    fn validate(&self) -> bool {
        let Ok(handle) = self.load(&self.root.join(FOLDER_FILE)) else {
            return false;
        };
        self.with_doc(handle, |d| d.local_tag(handle.element) == "folder")
            && self.attr(handle, "id").is_some()
    }

    // ── Nodes ───────────────────────────────────────────────────────

    fn for_each_node(
        &self,
        visit: &mut dyn FnMut(Handle),
    ) -> Result<(), TranslationError> {
        self.for_each_entity(
            &|ty| !Self::is_relationship_type(ty) && ty != DIAGRAM_TYPE,
            visit,
        )
    }

    fn node_id(&self, node: Handle) -> String {
        self.attr_or_default(node, "id")
    }

    fn is_junction(&self, node: Handle) -> bool {
        matches!(
            self.xsi_type_of(node).as_str(),
            "Junction" | "AndJunction" | "OrJunction"
        )
    }

    fn junction_type(&self, node: Handle) -> String {
        match self.xsi_type_of(node).as_str() {
            "OrJunction" => "orjunction".to_string(),
            "AndJunction" => "andjunction".to_string(),
            _ => {
                if self.attr(node, "type").as_deref() == Some("or") {
                    "orjunction".to_string()
                } else {
                    "andjunction".to_string()
                }
            }
        }
    }

    fn node_type(&self, node: Handle) -> String {
        self.xsi_type_of(node)
    }

    fn node_name(&self, node: Handle) -> Option<String> {
        self.attr(node, "name")
    }

    fn documentation(&self, node: Handle) -> Option<String> {
        self.with_doc(node, |d| {
            d.child_text(node.element, "documentation")
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
        })
    }

    fn properties(&self, node: Handle) -> Vec<Handle> {
        self.children_named(node, "property")
    }

    fn property_entry(&self, property: Handle) -> Option<(String, String)> {
        let key = self.attr(property, "key").filter(|k| !k.is_empty())?;
        Some((key, self.attr_or_default(property, "value")))
    }

    // ── Relationships ───────────────────────────────────────────────

    fn for_each_relationship(
        &self,
        visit: &mut dyn FnMut(Handle),
    ) -> Result<(), TranslationError> {
        self.for_each_entity(&|ty| Self::is_relationship_type(ty), visit)
    }

    fn relationship_id(&self, relationship: Handle) -> String {
        self.attr_or_default(relationship, "id")
    }

    fn relationship_type(&self, relationship: Handle) -> String {
        self.xsi_type_of(relationship)
    }

    fn relationship_source_id(&self, relationship: Handle) -> String {
        self.attr_or_default(relationship, "source")
    }

    fn relationship_target_id(&self, relationship: Handle) -> String {
        self.attr_or_default(relationship, "target")
    }

    fn is_association(&self, relationship: Handle) -> bool {
        self.xsi_type_of(relationship) == "AssociationRelationship"
    }

    fn association_is_directed(&self, relationship: Handle) -> bool {
        self.attr(relationship, "directed").as_deref() == Some("true")
    }

    fn is_access(&self, relationship: Handle) -> bool {
        self.xsi_type_of(relationship) == "AccessRelationship"
    }

    fn access_direction(&self, relationship: Handle) -> AccessDirection {
        match self.attr(relationship, "accessType").as_deref() {
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
        let mut roots = Vec::new();
        for dir in self.sub_dirs(&self.root)? {
            let marker = dir.join(FOLDER_FILE);
            if !marker.is_file() {
                continue;
            }
            let handle = self.load(&marker)?;
            if self.attr(handle, "type").as_deref() == Some("diagrams") {
                roots.push(handle);
            }
        }
        Ok(roots)
    }

    fn folder_name(&self, folder: Handle) -> String {
        self.attr_or_default(folder, "name")
    }

    fn sub_folders(&self, folder: Handle) -> Result<Vec<Handle>, TranslationError> {
        let mut out = Vec::new();
        for dir in self.sub_dirs(&self.dir_of(folder))? {
            let marker = dir.join(FOLDER_FILE);
            if marker.is_file() {
                out.push(self.load(&marker)?);
            }
        }
        Ok(out)
    }

    fn folder_views(&self, folder: Handle) -> Result<Vec<Handle>, TranslationError> {
        let mut out = Vec::new();
        for file in self.entity_files(&self.dir_of(folder))? {
            let handle = self.load(&file)?;
            if self.xsi_type_of(handle) == DIAGRAM_TYPE {
                out.push(handle);
            }
        }
        Ok(out)
    }

    // ── View shapes ─────────────────────────────────────────────────

    fn view_id(&self, view: Handle) -> String {
        self.attr_or_default(view, "id")
    }

    fn view_name(&self, view: Handle) -> String {
        self.attr_or_default(view, "name")
    }

    fn view_elements(&self, view: Handle) -> Vec<Handle> {
        self.children_named(view, "child")
    }

    fn view_element_id(&self, element: Handle) -> String {
        self.attr_or_default(element, "id")
    }

    fn model_id_of(&self, element: Handle) -> Option<String> {
        self.attr(element, "archimateElement")
    }

    fn position_x(&self, element: Handle, _parent: Option<Handle>) -> i32 {
        // Coordinates are already container-relative.
        self.bounds_attr(element, "x")
    }

    fn position_y(&self, element: Handle, _parent: Option<Handle>) -> i32 {
        self.bounds_attr(element, "y")
    }

    fn width(&self, element: Handle) -> i32 {
        self.bounds_attr(element, "width")
    }

    fn height(&self, element: Handle) -> i32 {
        self.bounds_attr(element, "height")
    }

    fn nested_elements(&self, element: Handle) -> Vec<Handle> {
        self.children_named(element, "child")
    }

    fn is_object(&self, element: Handle) -> bool {
        OBJECT_TYPES.contains(&self.xsi_type_of(element).as_str())
    }

    fn is_note(&self, element: Handle) -> bool {
        self.xsi_type_of(element) == NOTE_TYPE
    }

    fn is_group(&self, element: Handle) -> bool {
        self.xsi_type_of(element) == GROUP_TYPE
    }

    fn note_content(&self, element: Handle) -> String {
        self.with_doc(element, |d| {
            d.child_text(element.element, "content")
                .unwrap_or_default()
                .to_string()
        })
    }

    fn group_name(&self, element: Handle) -> String {
        self.attr_or_default(element, "name")
    }

    // ── View connectors ─────────────────────────────────────────────

    fn source_relationships_of(&self, element: Handle) -> Vec<Handle> {
        self.children_named(element, "sourceConnection")
    }

    fn bendpoints_of(&self, connector: Handle) -> Vec<Handle> {
        self.children_named(connector, "bendpoint")
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
        let source_center = self.view_origin_center(source, top_level);
        let target_center = self.view_origin_center(target, top_level);
        let (sx, sy, ex, ey) = self.with_doc(point, |d| {
            (
                d.int_attribute(point.element, "startX"),
                d.int_attribute(point.element, "startY"),
                d.int_attribute(point.element, "endX"),
                d.int_attribute(point.element, "endY"),
            )
        });
        weighted_bendpoint(index, total, source_center, target_center, (sx, sy), (ex, ey))
    }

    fn relationship_id_of(&self, connector: Handle) -> String {
        self.attr_or_default(connector, "id")
    }

    fn model_relationship_id_of(&self, connector: Handle) -> Option<String> {
        self.attr(connector, "archimateRelationship")
    }

    fn source_element_id_of(&self, connector: Handle) -> String {
        self.attr_or_default(connector, "source")
    }

    fn target_element_id_of(&self, connector: Handle) -> String {
        self.attr_or_default(connector, "target")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "folder.xml", r#"<folder id="m1" name="Model" type="model"/>"#);
        write(
            root,
            "business/folder.xml",
            r#"<folder id="fb" name="Business" type="business"/>"#,
        );
        write(
            root,
            "business/e1.xml",
            r#"<element xsi:type="archimate:BusinessActor" id="e1" name="Clerk">
  <documentation>Front office</documentation>
  <property key="owner" value="ops"/>
</element>"#,
        );
        write(
            root,
            "business/e2.xml",
            r#"<element xsi:type="archimate:BusinessRole" id="e2"/>"#,
        );
        write(
            root,
            "relations/folder.xml",
            r#"<folder id="fr" name="Relations" type="relations"/>"#,
        );
        write(
            root,
            "relations/r1.xml",
            r#"<element xsi:type="archimate:AccessRelationship" id="r1" source="e1" target="e2" accessType="3"/>"#,
        );
        write(
            root,
            "diagrams/folder.xml",
            r#"<folder id="fd" name="Views" type="diagrams"/>"#,
        );
        write(
            root,
            "diagrams/v1.xml",
            r#"<element xsi:type="archimate:ArchimateDiagramModel" id="v1" name="Overview">
  <child xsi:type="archimate:DiagramModelArchimateObject" id="s1" archimateElement="e1">
    <bounds x="0" y="0" width="100" height="50"/>
    <sourceConnection xsi:type="archimate:DiagramModelArchimateConnection" id="c1" source="s1" target="s2" archimateRelationship="r1">
      <bendpoint/>
    </sourceConnection>
  </child>
  <child xsi:type="archimate:DiagramModelArchimateObject" id="s2" archimateElement="e2">
    <bounds x="200" y="0" width="100" height="50"/>
  </child>
</element>"#,
        );
        write(
            root,
            "diagrams/deep/folder.xml",
            r#"<folder id="fdd" name="Deep"/>"#,
        );
        write(
            root,
            "diagrams/deep/v2.xml",
            r#"<element xsi:type="archimate:ArchimateDiagramModel" id="v2" name="Inner"/>"#,
        );
        tmp
    }

    #[test]
    fn test_validate_and_model_id() {
        let tmp = fixture();
        let a = GraficoAdapter::open(tmp.path());
        assert!(a.validate());
        assert_eq!(a.model_id(), "m1");

        let empty = tempfile::tempdir().unwrap();
        assert!(!GraficoAdapter::open(empty.path()).validate());
    }

    #[test]
    fn test_nodes_parse_lazily_in_sorted_order() {
        let tmp = fixture();
        let a = GraficoAdapter::open(tmp.path());
        let mut ids = Vec::new();
        a.for_each_node(&mut |h| ids.push(a.node_id(h))).unwrap();
        assert_eq!(ids, ["e1", "e2"]);
    }

    #[test]
    fn test_node_facts_and_properties() {
        let tmp = fixture();
        let a = GraficoAdapter::open(tmp.path());
        let mut nodes = Vec::new();
        a.for_each_node(&mut |h| nodes.push(h)).unwrap();

        assert_eq!(a.node_type(nodes[0]), "BusinessActor");
        assert_eq!(a.documentation(nodes[0]).as_deref(), Some("Front office"));
        let props = a.properties(nodes[0]);
        assert_eq!(
            a.property_entry(props[0]),
            Some(("owner".to_string(), "ops".to_string()))
        );
        assert_eq!(a.node_name(nodes[1]), None);
    }

    #[test]
    fn test_relationship_iteration() {
        let tmp = fixture();
        let a = GraficoAdapter::open(tmp.path());
        let mut rels = Vec::new();
        a.for_each_relationship(&mut |h| rels.push(h)).unwrap();
        assert_eq!(rels.len(), 1);
        assert!(a.is_access(rels[0]));
        assert_eq!(
            a.access_direction(rels[0]),
            AccessDirection {
                source: true,
                target: true
            }
        );
    }

    #[test]
    fn test_folder_tree_mirrors_directories() {
        let tmp = fixture();
        let a = GraficoAdapter::open(tmp.path());
        let roots = a.organization_roots().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(a.folder_name(roots[0]), "Views");

        let subs = a.sub_folders(roots[0]).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(a.folder_name(subs[0]), "Deep");

        let views = a.folder_views(roots[0]).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(a.view_id(views[0]), "v1");

        let deep_views = a.folder_views(subs[0]).unwrap();
        assert_eq!(deep_views.len(), 1);
        assert_eq!(a.view_name(deep_views[0]), "Inner");
    }

    #[test]
    fn test_view_payload_and_bendpoint_interpolation() {
        let tmp = fixture();
        let a = GraficoAdapter::open(tmp.path());
        let roots = a.organization_roots().unwrap();
        let view = a.folder_views(roots[0]).unwrap()[0];
        let top = a.view_elements(view);
        assert_eq!(top.len(), 2);
        assert!(a.is_object(top[0]));

        let conns = a.source_relationships_of(top[0]);
        assert_eq!(conns.len(), 1);
        let points = a.bendpoints_of(conns[0]);
        assert_eq!(points.len(), 1);

        // Zero-offset bendpoint between (0,0,100,50) and (200,0,100,50)
        // lands on the straight-line midpoint.
        let p = a.bendpoint(points[0], 0, 1, top[0], top[1], &top);
        assert_eq!(p, Point { x: 150, y: 25 });
    }

    #[test]
    fn test_documents_are_cached_per_path() {
        let tmp = fixture();
        let a = GraficoAdapter::open(tmp.path());
        let first = a.load(&tmp.path().join("business/e1.xml")).unwrap();
        let second = a.load(&tmp.path().join("business/e1.xml")).unwrap();
        assert_eq!(first, second);
    }
}

//! Four-phase translation engine.
//!
//! Drives a [`FormatAdapter`] and writes into an aggregate [`Model`]:
//!
//! ```text
//! validate gate → nodes → relationships → views & folders
//! ```
//!
//! Phases never interleave and never partially commit: a failure anywhere
//! aborts the whole translation, re-raised with the phase it occurred in.
//! Unresolvable cross-references inside a phase (orphan connectors,
//! dangling view references, malformed properties) are dropped silently —
//! the source dialects are known to export self-inconsistent data — with
//! a `debug!` trace as the only evidence.
//!
//! The engine's id→record indexes live only for the duration of one
//! [`TranslationEngine::translate`] call; concurrent translations are
//! safe as long as each uses its own engine and model.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::adapters::{FormatAdapter, Handle};
use crate::error::{TranslationError, TranslationPhase};
use crate::geometry::BoundsAccumulator;
use crate::model::{
    LandscapeItem, Model, Node, Property, Relationship, UNKNOWN_NAME, View, ViewNode,
    ViewRelationship,
};

/// Configuration for one translation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationOptions {
    /// Skip the view/folder phase entirely, leaving an empty view list
    /// and landscape.
    pub skip_views: bool,
}

/// One-shot translator from a dialect adapter into an aggregate model.
pub struct TranslationEngine<'a> {
    adapter: &'a dyn FormatAdapter,
    options: TranslationOptions,
    /// Node id → record, for resolving view shapes to semantic elements.
    node_index: FxHashMap<String, Node>,
    /// Relationship id → record, for resolving view connectors.
    relationship_index: FxHashMap<String, Relationship>,
}

impl<'a> TranslationEngine<'a> {
    pub fn new(adapter: &'a dyn FormatAdapter) -> Self {
        Self::with_options(adapter, TranslationOptions::default())
    }

    pub fn with_options(adapter: &'a dyn FormatAdapter, options: TranslationOptions) -> Self {
        Self {
            adapter,
            options,
            node_index: FxHashMap::default(),
            relationship_index: FxHashMap::default(),
        }
    }

    /// Run all phases and return the populated model.
    ///
    /// On error nothing about the returned model is guaranteed; callers
    /// get either a fully populated model or the first failure.
    pub fn translate(mut self) -> Result<Model, TranslationError> {
        if !self.adapter.validate() {
            return Err(TranslationError::not_validated(self.adapter.model_id()));
        }

        let mut model = Model::new(self.adapter.model_id());
        debug!(model = %model.model_id, "starting translation");

        self.translate_nodes(&mut model)
            .map_err(|e| e.in_phase(TranslationPhase::Nodes))?;
        self.translate_relationships(&mut model)
            .map_err(|e| e.in_phase(TranslationPhase::Relationships))?;
        if self.options.skip_views {
            return Ok(model);
        }
        self.translate_views(&mut model)
            .map_err(|e| e.in_phase(TranslationPhase::Views))?;
        Ok(model)
    }

    // ── Phase: nodes ────────────────────────────────────────────────

    fn translate_nodes(&mut self, model: &mut Model) -> Result<(), TranslationError> {
        let adapter = self.adapter;
        let node_index = &mut self.node_index;
        let mut nodes = Vec::new();

        adapter.for_each_node(&mut |handle| {
            let id = adapter.node_id(handle);
            let node = if adapter.is_junction(handle) {
                // Junctions are unlabeled in every dialect; the id doubles
                // as the display name.
                Node::new(id.clone(), id.clone(), adapter.junction_type(handle))
            } else {
                let name = adapter
                    .node_name(handle)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string());
                let properties = decode_properties(adapter, handle);
                Node::new(id.clone(), name, adapter.node_type(handle))
                    .with_properties(properties)
                    .with_documentation(adapter.documentation(handle))
            };
            node_index.insert(id, node.clone());
            nodes.push(node);
        })?;

        debug!(count = nodes.len(), "nodes translated");
        model.set_many_nodes(nodes);
        Ok(())
    }

    // ── Phase: relationships ────────────────────────────────────────

    fn translate_relationships(&mut self, model: &mut Model) -> Result<(), TranslationError> {
        let adapter = self.adapter;
        let relationship_index = &mut self.relationship_index;
        let mut relationships = Vec::new();

        adapter.for_each_relationship(&mut |handle| {
            let mut source_id = adapter.relationship_source_id(handle);
            let mut target_id = adapter.relationship_target_id(handle);
            let mut is_bidirectional = None;

            if adapter.is_association(handle) {
                if !adapter.association_is_directed(handle) {
                    is_bidirectional = Some(true);
                }
            } else if adapter.is_access(handle) {
                let direction = adapter.access_direction(handle);
                if direction.source == direction.target {
                    is_bidirectional = Some(true);
                } else if direction.source {
                    // Only-source access means "read": reverse the arrow so
                    // access always points target-to-accessor downstream.
                    std::mem::swap(&mut source_id, &mut target_id);
                }
            }

            let relationship = Relationship {
                identifier: adapter.relationship_id(handle),
                source_id,
                target_id,
                rel_type: adapter.relationship_type(handle),
                is_bidirectional,
            };
            relationship_index.insert(relationship.identifier.clone(), relationship.clone());
            relationships.push(relationship);
        })?;

        debug!(count = relationships.len(), "relationships translated");
        model.set_many_relationships(relationships);
        Ok(())
    }

    // ── Phase: views & folders ──────────────────────────────────────

    fn translate_views(&self, model: &mut Model) -> Result<(), TranslationError> {
        let adapter = self.adapter;

        // Dialects with a flat diagram list keep only id references in
        // their organization tree, so every view must exist before the
        // folder walk can attach them.
        if !adapter.is_nested_diagram_structure() {
            for diagram in adapter.diagrams()? {
                let view = self.translate_view(diagram);
                model.add_view(view);
            }
        }

        for root in adapter.organization_roots()? {
            let folder = self.translate_folder(root, model)?;
            model.add_folder(folder);
        }
        Ok(())
    }

    fn translate_folder(
        &self,
        folder: Handle,
        model: &mut Model,
    ) -> Result<LandscapeItem, TranslationError> {
        let adapter = self.adapter;
        let mut record = model.create_folder(adapter.folder_name(folder));

        for sub in adapter.sub_folders(folder)? {
            let child = self.translate_folder(sub, model)?;
            record.push_child(child);
        }

        for view in adapter.folder_views(folder)? {
            if adapter.is_nested_diagram_structure() {
                let translated = self.translate_view(view);
                Model::add_folder_view(&mut record, &translated.id, &translated.name);
                model.add_view(translated);
            } else {
                let id = adapter.view_id(view);
                match model.view_by_id(&id) {
                    Some(existing) => {
                        let text = existing.name.clone();
                        Model::add_folder_view(&mut record, &id, &text);
                    }
                    None => {
                        debug!(view = %id, "dropping reference to unknown view");
                    }
                }
            }
        }
        Ok(record)
    }

    fn translate_view(&self, view: Handle) -> View {
        let adapter = self.adapter;
        let mut bounds = BoundsAccumulator::new();
        let mut view_nodes = Vec::new();
        let mut view_relationships = Vec::new();

        let top_level = adapter.view_elements(view);
        for &shape in &top_level {
            self.walk_shape(
                shape,
                None,
                &top_level,
                &mut bounds,
                &mut view_nodes,
                &mut view_relationships,
            );
        }

        if !adapter.has_view_element_child_relationships() {
            for connector in adapter.view_relationships(view) {
                if let Some(resolved) = self.resolve_connector(connector, &top_level) {
                    view_relationships.push(resolved);
                }
            }
        }

        View {
            id: adapter.view_id(view),
            name: adapter.view_name(view),
            bounds: bounds.finish(),
            view_nodes,
            view_relationships,
        }
    }

    fn walk_shape(
        &self,
        shape: Handle,
        parent: Option<Handle>,
        top_level: &[Handle],
        bounds: &mut BoundsAccumulator,
        view_nodes: &mut Vec<ViewNode>,
        view_relationships: &mut Vec<ViewRelationship>,
    ) {
        let adapter = self.adapter;
        let x = adapter.position_x(shape, parent);
        let y = adapter.position_y(shape, parent);
        let width = adapter.width(shape);
        let height = adapter.height(shape);
        bounds.expand(x, y, width, height);

        let view_node_id = adapter.view_element_id(shape);
        let parent_id = parent.map(|p| adapter.view_element_id(p));

        let (model_node_id, name, node_type) = if adapter.is_object(shape) {
            match adapter
                .model_id_of(shape)
                .and_then(|id| self.node_index.get(&id).map(|node| (id, node)))
            {
                Some((id, node)) => {
                    (Some(id), node.name.clone(), node.node_type.to_lowercase())
                }
                None => {
                    // A container shape with no semantic backing; some
                    // dialects intermix these with real objects.
                    debug!(shape = %view_node_id, "object shape without model element, emitting group");
                    (None, adapter.group_name(shape), "group".to_string())
                }
            }
        } else if adapter.is_note(shape) {
            (None, adapter.note_content(shape), "note".to_string())
        } else {
            (None, adapter.group_name(shape), "group".to_string())
        };

        view_nodes.push(ViewNode {
            model_node_id,
            view_node_id,
            name,
            node_type,
            x,
            y,
            width,
            height,
            parent: parent_id,
        });

        if adapter.has_view_element_child_relationships() {
            for connector in adapter.source_relationships_of(shape) {
                if let Some(resolved) = self.resolve_connector(connector, top_level) {
                    view_relationships.push(resolved);
                }
            }
        }

        for child in adapter.nested_elements(shape) {
            self.walk_shape(
                child,
                Some(shape),
                top_level,
                bounds,
                view_nodes,
                view_relationships,
            );
        }
    }

    fn resolve_connector(
        &self,
        connector: Handle,
        top_level: &[Handle],
    ) -> Option<ViewRelationship> {
        let adapter = self.adapter;
        let source_id = adapter.source_element_id_of(connector);
        let target_id = adapter.target_element_id_of(connector);

        let Some(source) = adapter.find_view_element(top_level, &source_id) else {
            debug!(connector = %adapter.relationship_id_of(connector), shape = %source_id,
                "dropping connector with unresolved source");
            return None;
        };
        let Some(target) = adapter.find_view_element(top_level, &target_id) else {
            debug!(connector = %adapter.relationship_id_of(connector), shape = %target_id,
                "dropping connector with unresolved target");
            return None;
        };

        let raw_points = adapter.bendpoints_of(connector);
        let total = raw_points.len();
        let bendpoints = raw_points
            .iter()
            .enumerate()
            .map(|(index, &point)| {
                adapter.bendpoint(point, index, total, source, target, top_level)
            })
            .collect();

        let (rel_type, model_relationship_id, is_bidirectional) = match adapter
            .model_relationship_id_of(connector)
            .and_then(|id| self.relationship_index.get(&id).map(|rel| (id, rel)))
        {
            Some((id, relationship)) => {
                let rel_type = connector_type(&relationship.rel_type);
                // Only directable types carry the flag onto the view.
                let is_bidirectional = match rel_type.as_str() {
                    "association" | "access" => relationship.is_bidirectional,
                    _ => None,
                };
                (rel_type, Some(id), is_bidirectional)
            }
            // A connector with no semantic counterpart, e.g. a line to a note.
            None => ("connection".to_string(), None, None),
        };

        Some(ViewRelationship {
            model_relationship_id,
            source_id,
            target_id,
            view_relationship_id: adapter.relationship_id_of(connector),
            rel_type,
            is_bidirectional,
            bendpoints,
        })
    }
}

fn decode_properties(adapter: &dyn FormatAdapter, node: Handle) -> Vec<Property> {
    adapter
        .properties(node)
        .into_iter()
        .filter_map(|raw| match adapter.property_entry(raw) {
            Some((key, value)) => Some(Property { key, value }),
            None => {
                debug!("dropping malformed property entry");
                None
            }
        })
        .collect()
}

/// View-connector type of a semantic relationship: lowercased, with the
/// redundant `relationship` suffix some dialects append stripped.
fn connector_type(rel_type: &str) -> String {
    let lowered = rel_type.to_lowercase();
    lowered
        .strip_suffix("relationship")
        .filter(|s| !s.is_empty())
        .unwrap_or(&lowered)
        .to_string()
}

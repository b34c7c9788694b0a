//! LayoutHost: a privileged-context handler that owns real geometry.
//!
//! Nodes are keyed by the same string ids the application uses for its
//! rendered elements. Layout is computed with taffy against a fixed viewport
//! and reported as absolute [`BoundingRect`]s through the `measure` action.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use taffy::prelude::*;
use tracing::trace;

use crate::geometry::{BoundingRect, Offset};

use super::host::ActionHandler;

/// Action name answered with a [`BoundingRect`].
pub const MEASURE_ACTION: &str = "measure";

/// Failures when editing or querying the layout tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout node `{0}` already exists")]
    DuplicateNode(String),

    #[error("unknown layout node `{0}`")]
    UnknownNode(String),

    #[error("layout engine failure: {0}")]
    Engine(String),
}

fn engine_err(err: taffy::TaffyError) -> LayoutError {
    LayoutError::Engine(err.to_string())
}

/// Keeps a taffy tree of named nodes and answers `measure` requests.
pub struct LayoutHost {
    tree: TaffyTree<()>,
    /// Element id -> taffy node, in insertion order.
    nodes: IndexMap<String, NodeId>,
    parents: HashMap<String, String>,
    viewport: (f32, f32),
    dirty: bool,
}

impl LayoutHost {
    /// Create an empty layout with a `width` x `height` viewport.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            tree: TaffyTree::new(),
            nodes: IndexMap::new(),
            parents: HashMap::new(),
            viewport: (width, height),
            dirty: true,
        }
    }

    /// Add a node under `parent` (or as a root).
    pub fn insert(&mut self, id: &str, parent: Option<&str>, style: Style) -> Result<(), LayoutError> {
        if self.nodes.contains_key(id) {
            return Err(LayoutError::DuplicateNode(id.to_owned()));
        }
        let parent_node = match parent {
            Some(p) => Some(
                *self
                    .nodes
                    .get(p)
                    .ok_or_else(|| LayoutError::UnknownNode(p.to_owned()))?,
            ),
            None => None,
        };

        let node = self.tree.new_leaf(style).map_err(engine_err)?;
        if let Some(parent_node) = parent_node {
            self.tree.add_child(parent_node, node).map_err(engine_err)?;
        }
        self.nodes.insert(id.to_owned(), node);
        if let Some(p) = parent {
            self.parents.insert(id.to_owned(), p.to_owned());
        }
        self.dirty = true;
        Ok(())
    }

    /// Remove a node and everything below it.
    pub fn remove(&mut self, id: &str) -> Result<(), LayoutError> {
        if !self.nodes.contains_key(id) {
            return Err(LayoutError::UnknownNode(id.to_owned()));
        }
        let doomed: Vec<String> = self
            .nodes
            .keys()
            .filter(|key| self.is_within(key, id))
            .cloned()
            .collect();
        for key in doomed.iter().rev() {
            if let Some(node) = self.nodes.shift_remove(key) {
                self.tree.remove(node).map_err(engine_err)?;
            }
            self.parents.remove(key);
        }
        self.dirty = true;
        Ok(())
    }

    /// Replace the style of node `id`.
    pub fn set_style(&mut self, id: &str, style: Style) -> Result<(), LayoutError> {
        let node = self.node(id)?;
        self.tree.set_style(node, style).map_err(engine_err)?;
        self.dirty = true;
        Ok(())
    }

    /// Resize the viewport. Layout is recomputed on the next query.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
        self.dirty = true;
    }

    /// Whether a node named `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Recompute every root against the viewport.
    pub fn compute(&mut self) -> Result<(), LayoutError> {
        let (width, height) = self.viewport;
        let roots: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(key, _)| !self.parents.contains_key(*key))
            .map(|(_, node)| *node)
            .collect();
        for root in roots {
            self.tree
                .compute_layout(
                    root,
                    Size {
                        width: AvailableSpace::Definite(width),
                        height: AvailableSpace::Definite(height),
                    },
                )
                .map_err(engine_err)?;
        }
        self.dirty = false;
        Ok(())
    }

    /// Absolute box of `id`, recomputing first if the tree changed.
    pub fn bounding_rect(&mut self, id: &str) -> Result<BoundingRect, LayoutError> {
        if self.dirty {
            self.compute()?;
        }

        let mut origin = Offset::default();
        let mut cursor = Some(id);
        while let Some(key) = cursor {
            let layout = self.tree.layout(self.node(key)?).map_err(engine_err)?;
            origin = origin + Offset::new(f64::from(layout.location.x), f64::from(layout.location.y));
            cursor = self.parents.get(key).map(String::as_str);
        }

        let size = self.tree.layout(self.node(id)?).map_err(engine_err)?.size;
        Ok(BoundingRect::new(
            origin.x,
            origin.y,
            f64::from(size.width),
            f64::from(size.height),
        ))
    }

    fn node(&self, id: &str) -> Result<NodeId, LayoutError> {
        self.nodes
            .get(id)
            .copied()
            .ok_or_else(|| LayoutError::UnknownNode(id.to_owned()))
    }

    fn is_within(&self, key: &str, ancestor: &str) -> bool {
        let mut cursor = Some(key);
        while let Some(k) = cursor {
            if k == ancestor {
                return true;
            }
            cursor = self.parents.get(k).map(String::as_str);
        }
        false
    }
}

impl ActionHandler for LayoutHost {
    fn handle(&mut self, action: &str, payload: &JsonValue) -> Result<JsonValue, String> {
        if action != MEASURE_ACTION {
            return Err(format!("unsupported action `{action}`"));
        }
        let target = payload
            .get("targetId")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| "measure needs a string `targetId`".to_owned())?;
        let rect = self.bounding_rect(target).map_err(|e| e.to_string())?;
        trace!(target, ?rect, "measured");
        serde_json::to_value(rect).map_err(|e| e.to_string())
    }
}

impl std::fmt::Debug for LayoutHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutHost")
            .field("nodes", &self.nodes.len())
            .field("viewport", &self.viewport)
            .finish()
    }
}

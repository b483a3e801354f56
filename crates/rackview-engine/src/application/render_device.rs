//! DeviceRenderer: one device's layout with shapes tied to devices.
//!
//! # How a device is drawn (for beginners)
//!
//! 1. **Pick a layout.**  A device whose model carries a layout document is
//!    drawn from that document, custom shapes expanded.  Otherwise a device of
//!    one of the generic container classes gets the procedural default layout.
//!    Anything else is drawn as a bare shell.
//! 2. **Correlate.**  A named shape stands for a device when its name, read as
//!    a regular expression, matches the *whole* name of a device in the
//!    rendered subtree.  Candidates are tried in tree insertion order and only
//!    the first one counts.  A device claims at most one shape in the whole
//!    render, slot contents included; the rendered device itself is claimed
//!    up front because the whole layout already represents it.  Everything else is decoration.
//! 3. **Recurse into slots.**  A slot rectangle that matched a device draws
//!    that device's children inside the rectangle.
//!
//! ```text
//!   layout shape "slot-[12]"  ──regex──►  device "slot-1"  ──children──►  board layout
//! ```
//!
//! Rack-unit geometry is not this module's business; see
//! [`crate::application::render_rack`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rackview_core::{
    Bounds, DeviceId, DeviceNode, LayoutDocument, Point, RenderFrame, Rgb, Shape,
};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::application::build_hierarchy::{
    default_layout, has_default_layout, DeviceHierarchy, ResolvedShape,
};
use crate::application::metadata::MetadataService;
use crate::application::resolve_shapes::ShapeResolver;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("device {0} is not part of the hierarchy")]
    UnknownDevice(DeviceId),
}

/// Where the shapes of a [`DeviceRender`] came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutSource {
    /// The layout document of the device's model.
    Custom { model_id: String },
    /// The procedural default layout.
    Default,
    /// No layout: the painter draws an empty box.
    ShellOnly,
}

/// The drawable result of rendering one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRender {
    pub device: DeviceId,
    pub name: String,
    pub class_name: String,
    /// Scene rectangle the device was drawn into.
    pub bounds: Bounds,
    pub source: LayoutSource,
    /// Class color for shapes that do not carry their own.
    pub color: Option<Rgb>,
    pub shapes: Vec<ResolvedShape>,
    /// Devices drawn inside matched slot rectangles.
    pub slots: Vec<DeviceRender>,
}

impl DeviceRender {
    /// Ids of the devices matched by a shape, slots included.
    pub fn matched_devices(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.shapes.iter().filter_map(|s| s.device.as_deref()).collect();
        for slot in &self.slots {
            out.extend(slot.matched_devices());
        }
        out
    }
}

/// Renders devices of one [`DeviceHierarchy`].
///
/// Owns the per-render caches: resolved custom shapes and compiled shape-name
/// patterns.  Create one per render and drop it afterwards.
pub struct DeviceRenderer<'h> {
    service: Arc<dyn MetadataService>,
    hierarchy: &'h DeviceHierarchy,
    resolver: ShapeResolver,
    /// `None` marks a shape name that is not a valid pattern.
    patterns: HashMap<String, Option<Regex>>,
    /// Devices on the current slot recursion path.
    rendering: HashSet<DeviceId>,
    /// Devices already tied to a shape in the current `render_device` call,
    /// slots included.
    claimed: HashSet<DeviceId>,
    original_size: bool,
}

impl<'h> DeviceRenderer<'h> {
    pub fn new(service: Arc<dyn MetadataService>, hierarchy: &'h DeviceHierarchy) -> Self {
        let resolver = ShapeResolver::new(Arc::clone(&service), hierarchy.documents.clone());
        Self {
            service,
            hierarchy,
            resolver,
            patterns: HashMap::new(),
            rendering: HashSet::new(),
            claimed: HashSet::new(),
            original_size: false,
        }
    }

    /// Draws layout documents at their declared size instead of fitting them.
    pub fn with_original_size(mut self, original_size: bool) -> Self {
        self.original_size = original_size;
        self
    }

    /// Renders `device` with its top-left corner at `origin`, scaled to the
    /// size of `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownDevice`] when `device` is not in the
    /// hierarchy.
    pub fn render_device(
        &mut self,
        device: &str,
        origin: Point,
        bounds: Bounds,
    ) -> Result<DeviceRender, RenderError> {
        let hierarchy = self.hierarchy;
        let node = hierarchy
            .tree
            .get(device)
            .ok_or_else(|| RenderError::UnknownDevice(device.to_string()))?;

        self.claimed.clear();
        self.rendering.insert(node.id.clone());
        let render = self.render_node(node, origin, bounds);
        self.rendering.remove(&node.id);

        tracing::debug!(
            device = %node.id,
            shapes = render.shapes.len(),
            slots = render.slots.len(),
            "device rendered"
        );
        Ok(render)
    }

    fn render_node(&mut self, node: &'h DeviceNode, origin: Point, bounds: Bounds) -> DeviceRender {
        let frame = RenderFrame {
            origin,
            target: bounds,
            original_size: self.original_size,
        };
        let area = Bounds::new(origin.x, origin.y, bounds.width, bounds.height);
        // The whole layout already represents the device it draws.
        self.claimed.insert(node.id.clone());

        let (source, shapes) = if let Some((model_id, document)) = self.document_of(node) {
            let mut path = vec![model_id.clone()];
            let placed = self.resolver.expand(document.place(&frame), &mut path);
            (LayoutSource::Custom { model_id }, self.correlate(node, placed))
        } else if has_default_layout(self.service.as_ref(), &node.class_name) {
            let shapes = default_layout(self.hierarchy, self.service.as_ref(), &node.id, area);
            (LayoutSource::Default, self.claim_defaults(node, shapes))
        } else {
            tracing::debug!(
                device = %node.id,
                class = %node.class_name,
                "no layout, drawing shell"
            );
            (LayoutSource::ShellOnly, Vec::new())
        };

        let slots = self.render_slots(&shapes);

        DeviceRender {
            device: node.id.clone(),
            name: node.name.clone(),
            class_name: node.class_name.clone(),
            bounds: area,
            source,
            color: self.service.class_color(&node.class_name),
            shapes,
            slots,
        }
    }

    fn document_of(&self, node: &DeviceNode) -> Option<(String, Arc<LayoutDocument>)> {
        let model = self.hierarchy.model_of(&node.id)?;
        let document = self.hierarchy.document_of(&node.id)?;
        Some((model.model_id.clone(), document))
    }

    // ── Correlation ───────────────────────────────────────────────────────────

    fn correlate(&mut self, device: &'h DeviceNode, shapes: Vec<Shape>) -> Vec<ResolvedShape> {
        let hierarchy = self.hierarchy;
        let candidates = hierarchy.tree.subtree(&device.id);

        let mut out = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let matched = if shape.is_decorative() {
                None
            } else {
                self.first_match(&shape.name, &candidates)
            };
            let device = match matched {
                Some(node) if self.claimed.insert(node.id.clone()) => Some(node.id.clone()),
                Some(node) => {
                    tracing::debug!(
                        shape = %shape.name,
                        device = %node.id,
                        "device already claimed, shape is decoration"
                    );
                    None
                }
                None => None,
            };
            out.push(ResolvedShape { shape, device });
        }
        out
    }

    /// Default layouts tie shapes to devices directly; a device already tied
    /// to a shape elsewhere in this render keeps that shape.
    fn claim_defaults(
        &mut self,
        device: &DeviceNode,
        shapes: Vec<ResolvedShape>,
    ) -> Vec<ResolvedShape> {
        let mut out = Vec::with_capacity(shapes.len());
        for mut resolved in shapes {
            if let Some(id) = resolved.device.as_deref() {
                if id != device.id && !self.claimed.insert(id.to_string()) {
                    tracing::debug!(device = id, "device already claimed, cell is decoration");
                    resolved.device = None;
                }
            }
            out.push(resolved);
        }
        out
    }

    /// The first candidate whose whole name is the first match of `pattern`.
    fn first_match(
        &mut self,
        pattern: &str,
        candidates: &[&'h DeviceNode],
    ) -> Option<&'h DeviceNode> {
        let regex = self.pattern(pattern)?;
        candidates
            .iter()
            .copied()
            .find(|node| regex.find(&node.name).is_some_and(|m| m.as_str() == node.name))
    }

    fn pattern(&mut self, name: &str) -> Option<&Regex> {
        if !self.patterns.contains_key(name) {
            let compiled = match Regex::new(name) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!(
                        shape = name,
                        "shape name is not a valid pattern, treating as decoration: {e}"
                    );
                    None
                }
            };
            self.patterns.insert(name.to_string(), compiled);
        }
        self.patterns.get(name).and_then(Option::as_ref)
    }

    // ── Slots ─────────────────────────────────────────────────────────────────

    fn render_slots(&mut self, shapes: &[ResolvedShape]) -> Vec<DeviceRender> {
        let hierarchy = self.hierarchy;
        let mut slots = Vec::new();
        for resolved in shapes {
            let Some(slot) = resolved.device.as_deref().filter(|_| resolved.shape.is_slot()) else {
                continue;
            };
            let area = resolved.shape.bounds();
            for child in hierarchy.tree.children(slot) {
                if !self.rendering.insert(child.id.clone()) {
                    tracing::warn!(device = %child.id, "device contains itself, not drawn again");
                    continue;
                }
                slots.push(self.render_node(child, area.origin(), area));
                self.rendering.remove(&child.id);
            }
        }
        slots
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

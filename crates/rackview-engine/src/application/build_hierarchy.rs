//! HierarchyBuilder: the containment tree of one rendered device.
//!
//! # What is fetched (for beginners)
//!
//! A single call to
//! [`MetadataService::fetch_device_layout_structure`] returns everything the
//! render needs about the devices below the rendered one: each descendant's
//! id, class, name and parent, plus the layout document of every model used
//! in the tree (base64 inside the document).  The builder turns that into a
//! [`DeviceHierarchy`]:
//!
//! ```text
//!   device-structure XML ──► Vec<DeviceRecord> ──► DeviceTree
//!                                              └─► models    (device → model)
//!                                              └─► documents (model  → LayoutDocument)
//! ```
//!
//! # Default layout
//!
//! Devices of the generic container classes have no authored layout.  For
//! them [`default_layout`] draws a box with a header, a grid of port cells and
//! the remaining children stacked below.  Every shape it emits already knows
//! the device it represents; there is no name matching involved.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rackview_core::{
    decode_device_structure, Bounds, DeviceId, DeviceNode, DeviceTree, LayoutDocument,
    ModelReference, ParseError, Rgb, Shape, ShapeKind,
};
use serde::Serialize;
use thiserror::Error;

use crate::application::metadata::{
    is_subclass_of_any, FetchError, MetadataService, CLASSES_WITH_DEFAULT_LAYOUT,
    INVISIBLE_CLASSES, PORT_CLASSES,
};

/// Height of the header row of a default-layout box.
pub const DEFAULT_LAYOUT_HEADER: i32 = 20;

/// Inset of the content area of a default-layout box.
pub const DEFAULT_LAYOUT_PADDING: i32 = 5;

const PORT_MARGIN: i32 = 4;
const PORT_GAP: i32 = 8;
const MAX_PORT_SIDE: i32 = 25;
/// More ports than this are split over two rows.
const PORTS_PER_ROW: usize = 6;

const HEADER_TEXT_COLOR: Rgb = Rgb::new(255, 255, 255);

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// The inventory could not provide the device-structure document.
    #[error("could not fetch {attribute} of device {device_id}: {source}")]
    Fetch {
        device_id: DeviceId,
        attribute: &'static str,
        #[source]
        source: FetchError,
    },

    /// The device-structure document does not decode.
    #[error("device structure of {device_id} is corrupted: {source}")]
    Corrupted {
        device_id: DeviceId,
        #[source]
        source: ParseError,
    },
}

// ── Hierarchy ─────────────────────────────────────────────────────────────────

/// The devices below one rendered device and the layouts of their models.
#[derive(Debug, Clone)]
pub struct DeviceHierarchy {
    /// Id of the rendered device, the first node of `tree`.
    pub root: DeviceId,
    pub tree: DeviceTree,
    /// Model attached to each device that has one.
    pub models: HashMap<DeviceId, ModelReference>,
    /// Decoded layout documents keyed by model id.
    pub documents: HashMap<String, Arc<LayoutDocument>>,
}

impl DeviceHierarchy {
    /// A hierarchy that knows nothing but the rendered device.
    pub fn root_only(root: &DeviceNode) -> Self {
        let mut node = root.clone();
        node.parent_id = None;
        Self {
            root: root.id.clone(),
            tree: DeviceTree::build([node]),
            models: HashMap::new(),
            documents: HashMap::new(),
        }
    }

    pub fn model_of(&self, device: &str) -> Option<&ModelReference> {
        self.models.get(device)
    }

    /// The layout document of `device`'s model, when it has one.
    pub fn document_of(&self, device: &str) -> Option<Arc<LayoutDocument>> {
        let model = self.models.get(device)?;
        self.documents.get(&model.model_id).cloned()
    }
}

/// Builds a [`DeviceHierarchy`] from the inventory.
pub struct HierarchyBuilder {
    service: Arc<dyn MetadataService>,
}

impl HierarchyBuilder {
    pub fn new(service: Arc<dyn MetadataService>) -> Self {
        Self { service }
    }

    /// Fetches and decodes the device-structure document of `root`.
    ///
    /// The root comes first in the tree whatever the document says about it.
    /// An embedded layout that does not decode only loses that model's
    /// document; the device then falls back to the default layout.
    ///
    /// # Errors
    ///
    /// - [`HierarchyError::Fetch`] when the inventory fails.
    /// - [`HierarchyError::Corrupted`] when the document is not valid XML.
    pub fn build(&self, root: &DeviceNode) -> Result<DeviceHierarchy, HierarchyError> {
        let bytes = self
            .service
            .fetch_device_layout_structure(&root.id, &root.class_name)
            .map_err(|source| HierarchyError::Fetch {
                device_id: root.id.clone(),
                attribute: "deviceLayoutStructure",
                source,
            })?;
        let Some(bytes) = bytes else {
            tracing::debug!(device = %root.id, "no device structure, rendering the device alone");
            return Ok(DeviceHierarchy::root_only(root));
        };

        let records = decode_device_structure(&bytes).map_err(|source| HierarchyError::Corrupted {
            device_id: root.id.clone(),
            source,
        })?;

        let mut hierarchy = DeviceHierarchy::root_only(root);
        let mut nodes = vec![root.clone()];
        nodes[0].parent_id = None;

        for record in &records {
            if record.id != root.id {
                nodes.push(record.node());
            }
            let Some(model) = &record.model else {
                continue;
            };
            hierarchy
                .models
                .entry(record.id.clone())
                .or_insert_with(|| model.reference());
            if hierarchy.documents.contains_key(&model.id) {
                continue;
            }
            let Some(structure) = &model.structure else {
                continue;
            };
            match LayoutDocument::parse(structure) {
                Ok(document) => {
                    hierarchy.documents.insert(model.id.clone(), Arc::new(document));
                }
                Err(e) => {
                    tracing::warn!(
                        model = %model.id,
                        device = %record.id,
                        "skipping embedded layout: {e}"
                    );
                }
            }
        }

        hierarchy.tree = DeviceTree::build(nodes);
        tracing::debug!(
            device = %root.id,
            devices = hierarchy.tree.len(),
            layouts = hierarchy.documents.len(),
            "device hierarchy built"
        );
        Ok(hierarchy)
    }
}

// ── Default layout ────────────────────────────────────────────────────────────

/// A placed shape and, when known, the device it stands for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedShape {
    #[serde(flatten)]
    pub shape: Shape,
    pub device: Option<DeviceId>,
}

impl ResolvedShape {
    pub fn decoration(shape: Shape) -> Self {
        Self { shape, device: None }
    }
}

/// `true` when `class_name` is drawn with the procedural default layout.
pub fn has_default_layout(service: &dyn MetadataService, class_name: &str) -> bool {
    is_subclass_of_any(service, class_name, &CLASSES_WITH_DEFAULT_LAYOUT)
}

fn is_invisible(service: &dyn MetadataService, class_name: &str) -> bool {
    is_subclass_of_any(service, class_name, &INVISIBLE_CLASSES)
}

fn is_port(service: &dyn MetadataService, class_name: &str) -> bool {
    is_subclass_of_any(service, class_name, &PORT_CLASSES)
}

/// Draws `device` and its descendants procedurally into `bounds`.
///
/// Returns an empty list for a device the hierarchy does not know.
pub fn default_layout(
    hierarchy: &DeviceHierarchy,
    service: &dyn MetadataService,
    device: &str,
    bounds: Bounds,
) -> Vec<ResolvedShape> {
    let mut out = Vec::new();
    if let Some(node) = hierarchy.tree.get(device) {
        let mut visited = HashSet::new();
        lay_out(hierarchy, service, node, bounds, &mut out, &mut visited);
    }
    out
}

fn lay_out<'a>(
    hierarchy: &'a DeviceHierarchy,
    service: &dyn MetadataService,
    device: &'a DeviceNode,
    bounds: Bounds,
    out: &mut Vec<ResolvedShape>,
    visited: &mut HashSet<&'a str>,
) {
    if !visited.insert(device.id.as_str()) {
        return;
    }

    let content = if is_invisible(service, &device.class_name) {
        bounds
    } else {
        out.extend(device_box(device, bounds));
        content_area(bounds)
    };

    let (ports, others): (Vec<&DeviceNode>, Vec<&DeviceNode>) = hierarchy
        .tree
        .children(&device.id)
        .partition(|child| is_port(service, &child.class_name));

    let grid_height = lay_out_ports(&ports, content, out);

    let stacked: Vec<&DeviceNode> = others
        .into_iter()
        .filter(|child| {
            let eligible = has_default_layout(service, &child.class_name)
                || is_invisible(service, &child.class_name);
            if !eligible {
                tracing::debug!(
                    device = %child.id,
                    class = %child.class_name,
                    "no default layout for child"
                );
            }
            eligible
        })
        .collect();
    if stacked.is_empty() {
        return;
    }

    let top = if grid_height > 0 {
        content.y + grid_height + DEFAULT_LAYOUT_PADDING
    } else {
        content.y
    };
    let count = stacked.len() as i32;
    let available = content.bottom() - top - DEFAULT_LAYOUT_PADDING * (count - 1);
    let height = (available / count).max(0);
    for (k, child) in stacked.into_iter().enumerate() {
        let y = top + (height + DEFAULT_LAYOUT_PADDING) * k as i32;
        let child_bounds = Bounds::new(content.x, y, content.width, height);
        lay_out(hierarchy, service, child, child_bounds, out, visited);
    }
}

/// The box and header of a visible device.
fn device_box(device: &DeviceNode, bounds: Bounds) -> [ResolvedShape; 2] {
    let mut frame = Shape::new(ShapeKind::Rectangle { is_slot: false });
    frame.x = bounds.x;
    frame.y = bounds.y;
    frame.width = bounds.width;
    frame.height = bounds.height;
    frame.name = device.name.clone();
    frame.opaque = true;

    let mut header = Shape::new(ShapeKind::Label {
        text: device.name.clone(),
        text_color: Some(HEADER_TEXT_COLOR),
        font_size: rackview_core::DEFAULT_FONT_SIZE,
    });
    header.x = bounds.x;
    header.y = bounds.y;
    header.width = bounds.width;
    header.height = DEFAULT_LAYOUT_HEADER.min(bounds.height);
    header.opaque = true;

    [
        ResolvedShape {
            shape: frame,
            device: Some(device.id.clone()),
        },
        ResolvedShape::decoration(header),
    ]
}

fn content_area(bounds: Bounds) -> Bounds {
    Bounds::new(
        bounds.x + DEFAULT_LAYOUT_PADDING,
        bounds.y + DEFAULT_LAYOUT_HEADER + DEFAULT_LAYOUT_PADDING,
        (bounds.width - 2 * DEFAULT_LAYOUT_PADDING).max(0),
        (bounds.height - DEFAULT_LAYOUT_HEADER - 2 * DEFAULT_LAYOUT_PADDING).max(0),
    )
}

/// Lays the ports out as a grid of square cells and returns the grid height.
fn lay_out_ports(ports: &[&DeviceNode], content: Bounds, out: &mut Vec<ResolvedShape>) -> i32 {
    let n = ports.len();
    if n == 0 {
        return 0;
    }
    let rows = if n > PORTS_PER_ROW { 2 } else { 1 };
    let cols = if rows == 2 { n - n / 2 } else { n };
    let side = (content.width / cols as i32 - PORT_GAP)
        .min(content.height / rows as i32 - PORT_GAP)
        .clamp(0, MAX_PORT_SIDE);

    for (k, port) in ports.iter().enumerate() {
        let (i, j) = ((k / cols) as i32, (k % cols) as i32);
        let mut cell = Shape::new(ShapeKind::Rectangle { is_slot: false });
        cell.x = content.x + PORT_MARGIN + (side + PORT_GAP) * j;
        cell.y = content.y + PORT_MARGIN + (side + PORT_GAP) * i;
        cell.width = side;
        cell.height = side;
        cell.name = port.name.clone();
        out.push(ResolvedShape {
            shape: cell,
            device: Some(port.id.clone()),
        });
    }
    PORT_MARGIN + (side + PORT_GAP) * rows as i32
}

// ── Tests ─────────────────────────────────────────────────────────────────────

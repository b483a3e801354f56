//! RackRenderer: places the equipment of a rack and draws every placed device.
//!
//! A rack render runs in three steps:
//!
//! 1. Read `rackUnits` and `rackUnitsNumberingDescending` from the rack object
//!    and build an empty [`RackAllocator`].
//! 2. Fetch every direct child of the rack and try to add it.  Each child ends
//!    up in exactly one bucket: placed, unplaced (position 0) or rejected (with
//!    the reason).
//! 3. Render the layout of each placed device into the rectangle its units
//!    cover, shifted by [`DEVICE_LAYOUT_RESIZE_BORDER_SIZE`].
//!
//! Problems that do not stop the render (a hierarchy that could not be built,
//! a device that vanished) are collected in [`RackRender::issues`].

use std::sync::Arc;

use rackview_core::{
    Bounds, DeviceId, DeviceNode, EquipmentPlacement, ModelObject, Point, RackAllocator,
    RackError, RackGeometry, RackSnapshot, UnitRow, RACK_UNITS_ATTRIBUTE,
};
use serde::Serialize;
use thiserror::Error;

use crate::application::build_hierarchy::{DeviceHierarchy, HierarchyBuilder, HierarchyError};
use crate::application::metadata::{FetchError, MetadataService};
use crate::application::render_device::{DeviceRender, DeviceRenderer};

/// Gap between the rack frame and the equipment drawn inside it.
pub const DEVICE_LAYOUT_RESIZE_BORDER_SIZE: i32 = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RackRenderError {
    #[error("rack {0} not found")]
    NotFound(DeviceId),

    #[error("could not fetch {attribute} of rack {rack}: {source}")]
    Fetch {
        rack: DeviceId,
        attribute: &'static str,
        #[source]
        source: FetchError,
    },

    #[error("rack {rack} cannot be drawn: {source}")]
    Invalid {
        rack: DeviceId,
        #[source]
        source: RackError,
    },

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

// ── Render output ─────────────────────────────────────────────────────────────

/// A placed piece of equipment and its drawn layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipmentRender {
    pub placement: EquipmentPlacement,
    pub layout: DeviceRender,
}

/// A rack child that does not occupy any unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnplacedEquipment {
    pub device: DeviceId,
    pub name: String,
}

/// A rack child that could not be added, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEquipment {
    pub device: DeviceId,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RackRender {
    pub rack: DeviceId,
    pub name: String,
    pub snapshot: RackSnapshot,
    pub unit_rows: Vec<UnitRow>,
    pub equipment: Vec<EquipmentRender>,
    pub unplaced: Vec<UnplacedEquipment>,
    pub rejected: Vec<RejectedEquipment>,
    pub issues: Vec<String>,
}

// ── Renderer ──────────────────────────────────────────────────────────────────

pub struct RackRenderer {
    service: Arc<dyn MetadataService>,
    geometry: RackGeometry,
    resize_border: i32,
    original_size: bool,
}

impl RackRenderer {
    pub fn new(service: Arc<dyn MetadataService>) -> Self {
        Self {
            service,
            geometry: RackGeometry::default(),
            resize_border: DEVICE_LAYOUT_RESIZE_BORDER_SIZE,
            original_size: false,
        }
    }

    pub fn with_geometry(mut self, geometry: RackGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_resize_border(mut self, resize_border: i32) -> Self {
        self.resize_border = resize_border;
        self
    }

    pub fn with_original_size(mut self, original_size: bool) -> Self {
        self.original_size = original_size;
        self
    }

    /// Renders `rack` and everything placed in it.
    ///
    /// # Errors
    ///
    /// Fails only when the rack itself cannot be read: it is missing, the
    /// inventory fails, or its `rackUnits` attribute is missing or invalid.
    pub fn render_rack(&self, rack: &DeviceNode) -> Result<RackRender, RackRenderError> {
        let mut allocator = self.allocator_for(rack)?;
        let mut issues = Vec::new();

        let hierarchy = match HierarchyBuilder::new(Arc::clone(&self.service)).build(rack) {
            Ok(hierarchy) => hierarchy,
            Err(e) => {
                tracing::warn!(rack = %rack.id, "rendering rack without its devices: {e}");
                issues.push(e.to_string());
                DeviceHierarchy::root_only(rack)
            }
        };

        let mut placed = Vec::new();
        let mut unplaced = Vec::new();
        let mut rejected = Vec::new();
        for child in hierarchy.tree.children(&rack.id) {
            let object = match self.fetch_equipment(child) {
                Ok(object) => object,
                Err(reason) => {
                    rejected.push(rejection(child, reason));
                    continue;
                }
            };
            match allocator.add_equipment(&object) {
                Ok(Some(placement)) => placed.push(placement),
                Ok(None) => unplaced.push(UnplacedEquipment {
                    device: child.id.clone(),
                    name: child.name.clone(),
                }),
                Err(e) => {
                    tracing::debug!(rack = %rack.id, device = %child.id, "equipment rejected: {e}");
                    rejected.push(rejection(child, e.to_string()));
                }
            }
        }

        let mut renderer = DeviceRenderer::new(Arc::clone(&self.service), &hierarchy)
            .with_original_size(self.original_size);
        let mut equipment = Vec::with_capacity(placed.len());
        for placement in placed {
            let origin = Point::new(self.resize_border, placement.y + self.resize_border);
            let bounds = Bounds::new(0, 0, placement.width, placement.height);
            match renderer.render_device(&placement.device, origin, bounds) {
                Ok(layout) => equipment.push(EquipmentRender { placement, layout }),
                Err(e) => issues.push(e.to_string()),
            }
        }

        tracing::info!(
            rack = %rack.id,
            placed = equipment.len(),
            unplaced = unplaced.len(),
            rejected = rejected.len(),
            usage = allocator.usage_percent(),
            "rack rendered"
        );

        Ok(RackRender {
            rack: rack.id.clone(),
            name: rack.name.clone(),
            snapshot: allocator.snapshot(),
            unit_rows: allocator.unit_rows(),
            equipment,
            unplaced,
            rejected,
            issues,
        })
    }

    /// Lists every placement problem of the equipment in `rack` instead of
    /// stopping at the first one.
    ///
    /// # Errors
    ///
    /// Fails when the rack itself or its device hierarchy cannot be read.
    pub fn audit_rack(&self, rack: &DeviceNode) -> Result<Vec<String>, RackRenderError> {
        let allocator = self.allocator_for(rack)?;
        let hierarchy = HierarchyBuilder::new(Arc::clone(&self.service)).build(rack)?;

        let mut issues = Vec::new();
        let mut objects = Vec::new();
        for child in hierarchy.tree.children(&rack.id) {
            match self.fetch_equipment(child) {
                Ok(object) => objects.push(object),
                Err(reason) => issues.push(format!("{child}: {reason}")),
            }
        }
        issues.extend(allocator.audit(&objects).iter().map(ToString::to_string));
        Ok(issues)
    }

    fn allocator_for(&self, rack: &DeviceNode) -> Result<RackAllocator, RackRenderError> {
        let object = self
            .service
            .fetch_object(&rack.class_name, &rack.id)
            .map_err(|source| RackRenderError::Fetch {
                rack: rack.id.clone(),
                attribute: RACK_UNITS_ATTRIBUTE,
                source,
            })?
            .ok_or_else(|| RackRenderError::NotFound(rack.id.clone()))?;
        RackAllocator::from_rack(&object, self.geometry).map_err(|source| RackRenderError::Invalid {
            rack: rack.id.clone(),
            source,
        })
    }

    fn fetch_equipment(&self, device: &DeviceNode) -> Result<ModelObject, String> {
        match self.service.fetch_object(&device.class_name, &device.id) {
            Ok(Some(object)) => Ok(object),
            Ok(None) => Err("not found in the inventory".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}

fn rejection(device: &DeviceNode, reason: String) -> RejectedEquipment {
    RejectedEquipment {
        device: device.id.clone(),
        name: device.name.clone(),
        reason,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! # rackview-core
//!
//! Shared library for Rackview containing the shape model, the layout document
//! codec, the device containment tree and the rack-unit allocator.
//!
//! This crate performs no I/O.  Everything that needs metadata from the
//! inventory (device trees, nested layouts, class hierarchy) lives in
//! `rackview-engine`, which feeds raw bytes and attribute maps into the types
//! defined here.
//!
//! # Architecture overview (for beginners)
//!
//! Rackview draws physical network equipment: racks full of routers and
//! switches, boards plugged into slots, ports on boards.  Each piece of
//! equipment may have an authored *layout document* (an XML list of shapes)
//! describing what it looks like.  This crate defines:
//!
//! - **`domain`** – Pure business types.  [`Shape`] is the atomic geometric
//!   record, [`DeviceTree`] the containment hierarchy, and [`RackAllocator`]
//!   the rack-unit occupancy table that decides whether a device fits.
//!
//! - **`structure`** – Codecs for the two XML documents the inventory hands
//!   us: the layout document (`<layout>` + `<shape>` elements) and the device
//!   structure document (`<deviceLayoutStructure>` + `<device>` elements with
//!   base64-embedded layouts).

pub mod domain;
pub mod structure;

// Re-export the most-used types at the crate root so callers can write
// `rackview_core::Shape` instead of `rackview_core::domain::shape::Shape`.
pub use domain::device::{
    AttributeValue, DeviceId, DeviceNode, DeviceTree, ModelObject, ModelReference,
};
pub use domain::rack::{
    AttributeError, EquipmentPlacement, Fit, RackAllocator, RackError, RackGeometry, RackSnapshot,
    RackUnit, UnitRow, ValidationError, DESCENDING_ATTRIBUTE, MAX_RACK_UNITS, POSITION_ATTRIBUTE,
    RACK_UNITS_ATTRIBUTE,
};
pub use domain::shape::{
    Bounds, Point, Rgb, Shape, ShapeKind, ShapeType, DEFAULT_BORDER_SIZE, DEFAULT_FONT_SIZE,
};
pub use structure::device::{
    decode_device_structure, encode_device_structure, DeviceRecord, ModelRecord,
};
pub use structure::layout::{parse_layout, round_half_up, LayoutDocument, ParseError, RenderFrame};

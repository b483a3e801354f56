//! Inventory infrastructure: where devices, attributes and layouts come from.
//!
//! # Sub-modules
//!
//! - **`catalog`** – A TOML file describing classes, objects, equipment models
//!   and custom shapes, with layout documents stored next to it.  Implements
//!   [`crate::application::metadata::MetadataService`], so the CLI and the
//!   integration tests can render racks without a live inventory server.

pub mod catalog;

pub use catalog::{InventoryCatalog, InventoryError};

//! Domain entities for Rackview.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain** (or "entities" layer).  Domain code:
//!
//! - Contains the core business rules of the application.
//! - Has **no** imports from network libraries, databases or UI toolkits.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! Here the rules are geometric: how a shape is scaled into a target
//! rectangle, how a device hierarchy is linked, and which rack units a piece
//! of equipment may occupy.

/// Geometric shape records produced by the layout parser.
pub mod shape;

/// Device containment hierarchy and inventory objects.
pub mod device;

/// Rack-unit occupancy and equipment placement.
///
/// See [`rack::RackAllocator`] for the main type.
pub mod rack;

//! Application layer use cases for the layout engine.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules, here `rackview-core`) and the infrastructure
//! (files, network, inventory backends).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "draw every
//!   piece of equipment of this rack at its rack-unit position").
//! - **Depend on abstractions** ([`metadata::MetadataService`]) rather than a
//!   concrete inventory, so the backend can be swapped without touching this
//!   code.
//! - **Contain no file system access and no network I/O**.
//!
//! # Sub-modules
//!
//! - **`metadata`**        – The collaborator trait through which every
//!   inventory fetch goes.
//!
//! - **`build_hierarchy`** – Fetches the containment tree of a device and the
//!   layout documents of its models; also computes the procedural default
//!   layout for devices without one.
//!
//! - **`resolve_shapes`**  – Expands `custom` shapes recursively into their
//!   nested layouts, with a per-render cache and cycle protection.
//!
//! - **`render_device`**   – Correlates resolved shapes with devices by name
//!   and recurses into slots.
//!
//! - **`render_rack`**     – Places the equipment of a rack on its units and
//!   renders every placed device.

pub mod build_hierarchy;
pub mod metadata;
pub mod render_device;
pub mod render_rack;
pub mod resolve_shapes;

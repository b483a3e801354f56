//! Infrastructure layer for the layout engine.
//!
//! Contains the adapters that touch the outside world: the TOML
//! configuration file and the file-backed inventory catalog.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `rackview_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod inventory;
pub mod storage;

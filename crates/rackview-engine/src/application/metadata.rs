//! The inventory collaborator.
//!
//! Every piece of information the engine does not compute itself (device
//! trees, object attributes, nested layouts, class hierarchy and colors)
//! comes through [`MetadataService`].  Implementations may block; a render
//! calls them synchronously and never retries.

use rackview_core::{ModelObject, Rgb};
use thiserror::Error;

/// Classes whose instances are drawn with the procedural default layout when
/// they have no layout document of their own.
pub const CLASSES_WITH_DEFAULT_LAYOUT: [&str; 5] = [
    "GenericDistributionFrame",
    "GenericBoard",
    "GenericCommunicationsElement",
    "Slot",
    "CableManager",
];

/// Port classes shown as cells of the default layout port grid.
pub const PORT_CLASSES: [&str; 2] = ["ElectricalPort", "OpticalPort"];

/// Classes that never get a box of their own in the default layout.
pub const INVISIBLE_CLASSES: [&str; 5] = [
    "PowerBoard",
    "VirtualPort",
    "ServiceInstance",
    "PowerPort",
    "Transceiver",
];

/// A fetch from the inventory failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The service could not be reached or did not answer.
    #[error("metadata service unreachable: {0}")]
    Unreachable(String),

    /// The service answered with an error.
    #[error("metadata service rejected the request: {0}")]
    Rejected(String),
}

/// Read-only access to the inventory.
///
/// `Ok(None)` means "the inventory has no such thing", which is never an
/// error for the engine; `Err` means the inventory could not answer.
#[cfg_attr(test, mockall::automock)]
pub trait MetadataService: Send + Sync {
    /// Returns the device-structure document of `device_id`: its containment
    /// tree with the embedded layouts of the models it uses.
    fn fetch_device_layout_structure(
        &self,
        device_id: &str,
        class_name: &str,
    ) -> Result<Option<Vec<u8>>, FetchError>;

    /// Returns the custom-shape object with id `id`, including its layout.
    fn fetch_custom_shape_object(&self, id: &str) -> Result<Option<ModelObject>, FetchError>;

    /// Returns the object `id` of class `class_name` with its attributes.
    fn fetch_object(&self, class_name: &str, id: &str) -> Result<Option<ModelObject>, FetchError>;

    /// `true` when `class_name` is `ancestor` or inherits from it.
    fn is_subclass_of(&self, class_name: &str, ancestor: &str) -> bool;

    /// Display color of a class, used by the painter for shapes without one.
    fn class_color(&self, class_name: &str) -> Option<Rgb>;
}

/// `true` when `class_name` inherits from any of `ancestors`.
pub fn is_subclass_of_any(
    service: &dyn MetadataService,
    class_name: &str,
    ancestors: &[&str],
) -> bool {
    ancestors
        .iter()
        .any(|ancestor| service.is_subclass_of(class_name, ancestor))
}

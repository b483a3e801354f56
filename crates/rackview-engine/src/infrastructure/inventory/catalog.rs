//! File-backed inventory catalog.
//!
//! ```toml
//! [[classes]]
//! name = "Router"
//! parent = "GenericCommunicationsElement"
//! color = "#3366cc"
//!
//! [[objects]]
//! id = "rack-1"
//! class_name = "Rack"
//! name = "Rack 1"
//! attributes = { rackUnits = 42, rackUnitsNumberingDescending = false }
//!
//! [[objects]]
//! id = "r1"
//! class_name = "Router"
//! name = "R1"
//! parent = "rack-1"
//! model = "x100"
//! attributes = { position = 10, rackUnits = 2 }
//!
//! [[models]]
//! id = "x100"
//! class_name = "EquipmentModel"
//! name = "X-100"
//! layout = "layouts/x100.xml"
//!
//! [[custom_shapes]]
//! id = "fan-tray"
//! name = "Fan tray"
//! layout_xml = "<layout width='10' height='10'/>"
//! ```
//!
//! Layout paths are relative to the catalog file.  Layouts are read once at
//! load time; the catalog is immutable afterwards and therefore safe to share
//! between render threads.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use rackview_core::{
    encode_device_structure, AttributeValue, DeviceNode, DeviceRecord, ModelObject, ModelRecord,
    Rgb,
};
use serde::Deserialize;
use thiserror::Error;

use crate::application::metadata::{FetchError, MetadataService};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse inventory TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("object {0} is defined more than once")]
    DuplicateObject(String),

    #[error("{kind} {id} declares both `layout` and `layout_xml`")]
    AmbiguousLayout { kind: &'static str, id: String },
}

// ── File schema ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    classes: Vec<ClassEntry>,
    #[serde(default)]
    objects: Vec<ObjectEntry>,
    #[serde(default)]
    models: Vec<LayoutEntry>,
    #[serde(default)]
    custom_shapes: Vec<LayoutEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClassEntry {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ObjectEntry {
    id: String,
    class_name: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
}

#[derive(Debug, Clone, Deserialize)]
struct LayoutEntry {
    id: String,
    #[serde(default = "default_model_class")]
    class_name: String,
    #[serde(default)]
    name: String,
    /// Path of a layout document, relative to the catalog.
    #[serde(default)]
    layout: Option<PathBuf>,
    /// Inline layout document.
    #[serde(default)]
    layout_xml: Option<String>,
}

fn default_model_class() -> String {
    "CustomShape".to_string()
}

/// A model or custom shape with its layout bytes loaded.
#[derive(Debug, Clone)]
struct LoadedLayout {
    class_name: String,
    name: String,
    structure: Option<Vec<u8>>,
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// An in-memory inventory loaded from a TOML catalog.
#[derive(Debug, Clone, Default)]
pub struct InventoryCatalog {
    classes: HashMap<String, ClassEntry>,
    /// Objects in file order.
    objects: Vec<ObjectEntry>,
    index: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
    models: HashMap<String, LoadedLayout>,
    custom_shapes: HashMap<String, LoadedLayout>,
}

impl InventoryCatalog {
    /// Loads the catalog at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError`] when the file or a layout it names cannot be
    /// read, or when the TOML is invalid.
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let catalog = Self::from_toml_str(&text, base_dir)?;
        tracing::info!(
            path = %path.display(),
            objects = catalog.objects.len(),
            models = catalog.models.len(),
            "inventory loaded"
        );
        Ok(catalog)
    }

    /// Parses a catalog; layout paths are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, InventoryError> {
        let file: CatalogFile = toml::from_str(text)?;

        let mut catalog = InventoryCatalog::default();
        for class in file.classes {
            catalog.classes.insert(class.name.clone(), class);
        }
        for model in file.models {
            let loaded = load_layout("model", &model, base_dir)?;
            catalog.models.insert(model.id, loaded);
        }
        for shape in file.custom_shapes {
            let loaded = load_layout("custom shape", &shape, base_dir)?;
            catalog.custom_shapes.insert(shape.id, loaded);
        }
        for object in file.objects {
            if catalog.index.contains_key(&object.id) {
                return Err(InventoryError::DuplicateObject(object.id));
            }
            if let Some(model) = &object.model {
                if !catalog.models.contains_key(model) {
                    tracing::warn!(
                        object = %object.id,
                        model = %model,
                        "object refers to an unknown model"
                    );
                }
            }
            let idx = catalog.objects.len();
            catalog.index.insert(object.id.clone(), idx);
            if let Some(parent) = &object.parent {
                catalog.children.entry(parent.clone()).or_default().push(idx);
            }
            catalog.objects.push(object);
        }
        Ok(catalog)
    }

    /// The containment node of object `id`.
    pub fn device_node(&self, id: &str) -> Option<DeviceNode> {
        self.object(id).map(node_of)
    }

    /// Every object of class `class_name` or one of its subclasses.
    pub fn objects_of_class(&self, class_name: &str) -> Vec<DeviceNode> {
        self.objects
            .iter()
            .filter(|o| self.is_subclass_of(&o.class_name, class_name))
            .map(node_of)
            .collect()
    }

    fn object(&self, id: &str) -> Option<&ObjectEntry> {
        self.index.get(id).map(|&i| &self.objects[i])
    }

    /// `id` and its descendants, breadth first in file order.
    fn descendants(&self, id: &str) -> Vec<&ObjectEntry> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(idx) = queue.pop_front() {
            let object = &self.objects[idx];
            out.push(object);
            for &child in self.children.get(&object.id).into_iter().flatten() {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        out
    }

    fn record_of(&self, object: &ObjectEntry) -> DeviceRecord {
        let model = object.model.as_ref().and_then(|id| {
            self.models.get(id).map(|m| ModelRecord {
                id: id.clone(),
                class_name: m.class_name.clone(),
                name: m.name.clone(),
                structure: m.structure.clone(),
            })
        });
        DeviceRecord {
            id: object.id.clone(),
            class_name: object.class_name.clone(),
            name: object.name.clone(),
            parent_id: object.parent.clone(),
            model,
        }
    }
}

fn node_of(object: &ObjectEntry) -> DeviceNode {
    DeviceNode {
        id: object.id.clone(),
        class_name: object.class_name.clone(),
        name: object.name.clone(),
        parent_id: object.parent.clone(),
    }
}

fn load_layout(
    kind: &'static str,
    entry: &LayoutEntry,
    base_dir: &Path,
) -> Result<LoadedLayout, InventoryError> {
    let structure = match (&entry.layout, &entry.layout_xml) {
        (Some(_), Some(_)) => {
            return Err(InventoryError::AmbiguousLayout {
                kind,
                id: entry.id.clone(),
            })
        }
        (Some(file), None) => {
            let path = base_dir.join(file);
            Some(std::fs::read(&path).map_err(|source| InventoryError::Io { path, source })?)
        }
        (None, Some(xml)) => Some(xml.clone().into_bytes()),
        (None, None) => None,
    };
    Ok(LoadedLayout {
        class_name: entry.class_name.clone(),
        name: entry.name.clone(),
        structure,
    })
}

// ── MetadataService ───────────────────────────────────────────────────────────

impl MetadataService for InventoryCatalog {
    fn fetch_device_layout_structure(
        &self,
        device_id: &str,
        class_name: &str,
    ) -> Result<Option<Vec<u8>>, FetchError> {
        let Some(root) = self.object(device_id) else {
            return Ok(None);
        };
        if !self.is_subclass_of(&root.class_name, class_name) {
            return Err(FetchError::Rejected(format!(
                "object {device_id} is a {} not a {class_name}",
                root.class_name
            )));
        }
        let records: Vec<DeviceRecord> = self
            .descendants(device_id)
            .into_iter()
            .map(|object| self.record_of(object))
            .collect();
        Ok(Some(encode_device_structure(&records)))
    }

    fn fetch_custom_shape_object(&self, id: &str) -> Result<Option<ModelObject>, FetchError> {
        let Some(layout) = self.custom_shapes.get(id).or_else(|| self.models.get(id)) else {
            return Ok(None);
        };
        let mut object = ModelObject::new(id, layout.class_name.clone(), layout.name.clone());
        object.layout_structure = layout.structure.clone();
        Ok(Some(object))
    }

    fn fetch_object(&self, class_name: &str, id: &str) -> Result<Option<ModelObject>, FetchError> {
        let Some(entry) = self.object(id) else {
            return Ok(None);
        };
        if !self.is_subclass_of(&entry.class_name, class_name) {
            tracing::debug!(
                object = id,
                expected = class_name,
                actual = %entry.class_name,
                "class mismatch"
            );
            return Ok(None);
        }
        Ok(Some(ModelObject {
            id: entry.id.clone(),
            class_name: entry.class_name.clone(),
            name: entry.name.clone(),
            attributes: entry.attributes.clone(),
            layout_structure: None,
        }))
    }

    fn is_subclass_of(&self, class_name: &str, ancestor: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(class_name);
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            if !seen.insert(name) {
                return false;
            }
            current = self.classes.get(name).and_then(|c| c.parent.as_deref());
        }
        false
    }

    fn class_color(&self, class_name: &str) -> Option<Rgb> {
        let mut seen = HashSet::new();
        let mut current = self.classes.get(class_name);
        while let Some(class) = current {
            if !seen.insert(class.name.as_str()) {
                return None;
            }
            if let Some(color) = class.color.as_deref().and_then(Rgb::from_hex) {
                return Some(color);
            }
            current = class.parent.as_deref().and_then(|p| self.classes.get(p));
        }
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

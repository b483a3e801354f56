//! Device-structure document codec.
//!
//! The inventory describes the full containment tree of a device in a single
//! document.  The first `<device>` is the device itself; every other one names
//! its parent.  Devices whose class has a `model` attribute embed that model
//! together with its layout document, base64 encoded:
//!
//! ```xml
//! <deviceLayoutStructure>
//!   <device id="rack-1" className="Rack"/>
//!   <device id="r1" name="R1" className="Router" parentId="rack-1">
//!     <model id="m1" className="EquipmentModel" name="X-100">
//!       <view className="DeviceLayoutView"><structure>PGxheW91dC8+</structure></view>
//!     </model>
//!   </device>
//! </deviceLayoutStructure>
//! ```

use base64::Engine as _;
use roxmltree::Node;

use super::layout::ParseError;
use super::push_attr;
use crate::domain::device::{DeviceNode, ModelReference};

/// One `<device>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub id: String,
    pub class_name: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub model: Option<ModelRecord>,
}

/// The `<model>` embedded in a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    pub id: String,
    pub class_name: String,
    pub name: String,
    /// Decoded layout document bytes; `None` when the model has no view or the
    /// embedded payload is not valid base64.
    pub structure: Option<Vec<u8>>,
}

impl DeviceRecord {
    pub fn node(&self) -> DeviceNode {
        DeviceNode {
            id: self.id.clone(),
            class_name: self.class_name.clone(),
            name: self.name.clone(),
            parent_id: self.parent_id.clone(),
        }
    }
}

impl ModelRecord {
    pub fn reference(&self) -> ModelReference {
        ModelReference {
            model_id: self.id.clone(),
            class_name: self.class_name.clone(),
            name: self.name.clone(),
        }
    }
}

/// Decodes a device-structure document into its records, in document order.
///
/// `<device>` elements without an `id` are skipped.
///
/// # Errors
///
/// Returns [`ParseError::Corrupted`] when the bytes are not UTF-8 or not
/// well-formed XML.
pub fn decode_device_structure(bytes: &[u8]) -> Result<Vec<DeviceRecord>, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::Corrupted(e.to_string()))?;
    let xml = roxmltree::Document::parse(text).map_err(|e| ParseError::Corrupted(e.to_string()))?;

    let records = xml
        .descendants()
        .filter(|n| n.has_tag_name("device"))
        .filter_map(|node| {
            let Some(id) = node.attribute("id") else {
                tracing::debug!("skipping device element without id");
                return None;
            };
            Some(DeviceRecord {
                id: id.to_string(),
                class_name: node.attribute("className").unwrap_or_default().to_string(),
                name: node.attribute("name").unwrap_or_default().to_string(),
                parent_id: node.attribute("parentId").map(str::to_string),
                model: child(&node, "model").map(|m| decode_model(&m, id)),
            })
        })
        .collect();
    Ok(records)
}

fn decode_model(node: &Node<'_, '_>, device_id: &str) -> ModelRecord {
    let payload = child(node, "view")
        .and_then(|view| child(&view, "structure"))
        .and_then(|s| s.text())
        .map(|t| t.chars().filter(|c| !c.is_ascii_whitespace()).collect::<String>())
        .filter(|t| !t.is_empty());

    let structure = payload.and_then(|encoded| {
        match base64::engine::general_purpose::STANDARD.decode(encoded.as_bytes()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(
                    device = device_id,
                    error = %e,
                    "embedded layout is not valid base64, skipping model layout"
                );
                None
            }
        }
    });

    ModelRecord {
        id: node.attribute("id").unwrap_or_default().to_string(),
        class_name: node.attribute("className").unwrap_or_default().to_string(),
        name: node.attribute("name").unwrap_or_default().to_string(),
        structure,
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(tag))
}

/// Encodes records into a device-structure document.
///
/// The counterpart of [`decode_device_structure`], used by inventory backends
/// that assemble the document from their own object store.
pub fn encode_device_structure(records: &[DeviceRecord]) -> Vec<u8> {
    let mut out = String::from("<deviceLayoutStructure>");
    for record in records {
        out.push_str("<device");
        push_attr(&mut out, "id", &record.id);
        if !record.name.is_empty() {
            push_attr(&mut out, "name", &record.name);
        }
        push_attr(&mut out, "className", &record.class_name);
        if let Some(parent) = &record.parent_id {
            push_attr(&mut out, "parentId", parent);
        }
        match &record.model {
            None => out.push_str("/>"),
            Some(model) => {
                out.push_str("><model");
                push_attr(&mut out, "id", &model.id);
                push_attr(&mut out, "className", &model.class_name);
                push_attr(&mut out, "name", &model.name);
                out.push('>');
                if let Some(structure) = &model.structure {
                    out.push_str(r#"<view className="DeviceLayoutView"><structure>"#);
                    out.push_str(&base64::engine::general_purpose::STANDARD.encode(structure));
                    out.push_str("</structure></view>");
                }
                out.push_str("</model></device>");
            }
        }
    }
    out.push_str("</deviceLayoutStructure>");
    out.into_bytes()
}

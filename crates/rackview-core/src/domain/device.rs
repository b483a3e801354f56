//! Device containment hierarchy.
//!
//! The inventory hands us a flat list of `{id, className, name, parentId}`
//! records.  [`DeviceTree::build`] turns it into an id-keyed arena: nodes are
//! stored once, in the order they were discovered, and parent/child links are
//! indices into that arena.  Lookups never depend on object identity.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Inventory object identifier (the inventory uses opaque strings).
pub type DeviceId = String;

/// One node of the physical containment hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceNode {
    pub id: DeviceId,
    pub class_name: String,
    pub name: String,
    /// `None` marks the device being rendered.
    pub parent_id: Option<DeviceId>,
}

impl DeviceNode {
    pub fn new(
        id: impl Into<String>,
        class_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            class_name: class_name.into(),
            name: name.into(),
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

impl fmt::Display for DeviceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.class_name)
    }
}

/// The value of a device's `model` attribute: which equipment model (and so
/// which layout document) the device uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ModelReference {
    pub model_id: String,
    pub class_name: String,
    pub name: String,
}

/// A typed attribute value as reported by the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl AttributeValue {
    /// Name of the attribute type, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "Integer",
            Self::Boolean(_) => "Boolean",
            Self::Text(_) => "String",
        }
    }
}

/// An inventory object together with its attributes.
///
/// Returned by the metadata collaborator for equipment, racks and custom
/// shapes.  `layout_structure` holds the raw layout document of objects that
/// have one (custom shapes and equipment models).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelObject {
    pub id: DeviceId,
    pub class_name: String,
    pub name: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub layout_structure: Option<Vec<u8>>,
}

impl ModelObject {
    pub fn new(
        id: impl Into<String>,
        class_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            class_name: class_name.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_layout_structure(mut self, structure: Vec<u8>) -> Self {
        self.layout_structure = Some(structure);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Returns the attribute as an integer, or `None` when absent or not an integer.
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.attributes.get(name) {
            Some(AttributeValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the attribute as a boolean, or `None` when absent or not a boolean.
    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.attributes.get(name) {
            Some(AttributeValue::Boolean(v)) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ModelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.class_name)
    }
}

/// The device containment hierarchy of one render.
#[derive(Debug, Clone, Default)]
pub struct DeviceTree {
    nodes: Vec<DeviceNode>,
    index: HashMap<DeviceId, usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl DeviceTree {
    /// Builds the tree in two passes.
    ///
    /// The first pass inserts every node with an empty child list (duplicate
    /// ids keep the first occurrence).  The second pass appends each node to
    /// the child list of the node whose id equals its `parent_id`.  Nodes whose
    /// parent never appears, or that name themselves as parent, stay as
    /// orphan roots.
    pub fn build(nodes: impl IntoIterator<Item = DeviceNode>) -> Self {
        let mut tree = DeviceTree::default();

        for node in nodes {
            if tree.index.contains_key(&node.id) {
                tracing::warn!(
                    device = %node.id,
                    "duplicate device in hierarchy, keeping the first"
                );
                continue;
            }
            tree.index.insert(node.id.clone(), tree.nodes.len());
            tree.nodes.push(node);
            tree.parent.push(None);
            tree.children.push(Vec::new());
        }

        for idx in 0..tree.nodes.len() {
            let Some(parent_id) = tree.nodes[idx].parent_id.as_deref() else {
                continue;
            };
            match tree.index.get(parent_id).copied() {
                Some(p) if p != idx => {
                    tree.parent[idx] = Some(p);
                    tree.children[p].push(idx);
                }
                _ => {
                    tracing::debug!(
                        device = %tree.nodes[idx].id,
                        parent = parent_id,
                        "orphaned device kept as root"
                    );
                }
            }
        }

        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&DeviceNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Direct children of `id` in insertion order; empty for unknown ids.
    pub fn children(&self, id: &str) -> impl Iterator<Item = &DeviceNode> + '_ {
        let kids: &[usize] = match self.index.get(id) {
            Some(&i) => &self.children[i],
            None => &[],
        };
        kids.iter().map(move |&c| &self.nodes[c])
    }

    pub fn parent(&self, id: &str) -> Option<&DeviceNode> {
        let idx = *self.index.get(id)?;
        self.parent[idx].map(|p| &self.nodes[p])
    }

    /// Nodes without a linked parent: the rendered device plus any orphans.
    pub fn roots(&self) -> impl Iterator<Item = &DeviceNode> {
        self.nodes
            .iter()
            .zip(&self.parent)
            .filter(|(_, p)| p.is_none())
            .map(|(n, _)| n)
    }

    /// `id` and all of its descendants, in insertion order.
    ///
    /// Terminates on cyclic parent links.
    pub fn subtree(&self, id: &str) -> Vec<&DeviceNode> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            for &child in &self.children[idx] {
                if seen.insert(child) {
                    stack.push(child);
                }
            }
        }
        let mut members: Vec<usize> = seen.into_iter().collect();
        members.sort_unstable();
        members.into_iter().map(|i| &self.nodes[i]).collect()
    }
}

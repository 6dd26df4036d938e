use crate::error::SchemaLoadError;
use crate::menu::ActionSet;
use crate::node::{Node, NodeConfig};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One entry of a tree schema: where a node type sits in the hierarchy, how
/// its children resolve and which menu it shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<IndexMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_level: Option<String>,

    #[serde(default)]
    pub actions: ActionSet,
}

/// How the children of a descriptor's nodes come into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStrategy<'a> {
    /// Static fan-out: alias -> target descriptor key.
    Aliases(&'a IndexMap<String, String>),
    /// Backend fetch shaped by the named descriptor.
    NextLevel(&'a str),
    Leaf,
}

impl Descriptor {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    pub fn strategy(&self) -> ChildStrategy<'_> {
        match (&self.children, &self.next_level) {
            (Some(children), _) => ChildStrategy::Aliases(children),
            (None, Some(next)) => ChildStrategy::NextLevel(next),
            (None, None) => ChildStrategy::Leaf,
        }
    }

    pub fn declares_menu(&self) -> bool {
        !self.actions.menu.is_empty()
    }

    /// The config block stamped onto nodes synthesized from this descriptor.
    pub fn node_config(&self) -> NodeConfig {
        NodeConfig {
            node_type: Some(self.node_type.clone()),
            key: Some(self.key.clone()),
            icon: self.icon.clone(),
            actions: self.actions.clone(),
            next_level: self.next_level.clone(),
            children: self.children.clone(),
            allow_drop: false,
        }
    }
}

/// Declarative tree layout for one database kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSchema {
    #[serde(default)]
    pub tree: Vec<Descriptor>,
}

impl TreeSchema {
    /// Parses and validates a YAML schema document.
    pub fn parse(db_type: &str, text: &str) -> Result<Self, SchemaLoadError> {
        let schema: TreeSchema =
            serde_yaml::from_str(text).map_err(|e| SchemaLoadError::Malformed {
                db_type: db_type.to_string(),
                reason: e.to_string(),
            })?;

        schema
            .validate()
            .map_err(|reason| SchemaLoadError::Malformed {
                db_type: db_type.to_string(),
                reason,
            })?;

        Ok(schema)
    }

    fn validate(&self) -> Result<(), String> {
        let mut keys = HashSet::new();
        for descriptor in &self.tree {
            if !keys.insert(descriptor.key.as_str()) {
                return Err(format!("duplicate descriptor key '{}'", descriptor.key));
            }
        }

        let check = |owner: &str, field: &str, target: &str| {
            if keys.contains(target) {
                Ok(())
            } else {
                Err(format!(
                    "descriptor '{}' {} refers to unknown key '{}'",
                    owner, field, target
                ))
            }
        };

        for descriptor in &self.tree {
            if descriptor.children.is_some() && descriptor.next_level.is_some() {
                return Err(format!(
                    "descriptor '{}' declares both children and nextLevel",
                    descriptor.key
                ));
            }
            if let Some(parent) = &descriptor.parent {
                check(&descriptor.key, "parent", parent)?;
            }
            if let Some(next) = &descriptor.next_level {
                check(&descriptor.key, "nextLevel", next)?;
            }
            for target in descriptor.children.iter().flat_map(|c| c.values()) {
                check(&descriptor.key, "children", target)?;
            }
        }

        Ok(())
    }

    pub fn descriptor(&self, key: &str) -> Option<&Descriptor> {
        self.tree.iter().find(|d| d.key == key)
    }

    /// First descriptor declaring the given node type.
    pub fn descriptor_for_type(&self, node_type: &str) -> Option<&Descriptor> {
        self.tree.iter().find(|d| d.node_type == node_type)
    }

    /// The descriptor a node was built from: by recorded key, else by type.
    pub fn descriptor_for_node(&self, node: &Node) -> Option<&Descriptor> {
        node.descriptor_key()
            .and_then(|key| self.descriptor(key))
            .or_else(|| self.descriptor_for_type(node.effective_type()))
    }

    /// Parentless descriptors ordered by `position`, then declaration order.
    pub fn top_level(&self) -> Vec<&Descriptor> {
        let mut roots: Vec<&Descriptor> =
            self.tree.iter().filter(|d| d.parent.is_none()).collect();
        roots.sort_by_key(|d| d.position.unwrap_or(i64::MAX));
        roots
    }
}

/// Schema documents compiled into the binary, by schema key.
pub fn bundled_document(schema_key: &str) -> Option<&'static str> {
    match schema_key {
        "postgresql" => Some(include_str!("../schemas/tree-postgresql.yml")),
        "mysql" => Some(include_str!("../schemas/tree-mysql.yml")),
        _ => None,
    }
}

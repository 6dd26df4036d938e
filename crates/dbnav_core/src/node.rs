use crate::menu::ActionSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What a tree node represents.
///
/// The fixed variants cover folders, connections and the database objects the
/// client knows about. Types introduced by a tree schema (aggregates such as
/// `databases` or `roles`) are carried as `Declared`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Folder,
    Connection,
    Database,
    Schema,
    Table,
    View,
    Function,
    Declared(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Folder => "folder",
            Self::Connection => "connection",
            Self::Database => "database",
            Self::Schema => "schema",
            Self::Table => "table",
            Self::View => "view",
            Self::Function => "function",
            Self::Declared(name) => name,
        }
    }

    /// Database objects live below a connection and are never relocatable.
    pub fn is_database_object(&self) -> bool {
        matches!(
            self,
            Self::Database | Self::Schema | Self::Table | Self::View | Self::Function
        )
    }
}

impl From<&str> for NodeType {
    fn from(value: &str) -> Self {
        match value {
            "folder" => Self::Folder,
            "connection" => Self::Connection,
            "database" => Self::Database,
            "schema" => Self::Schema,
            "table" => Self::Table,
            "view" => Self::View,
            "function" => Self::Function,
            other => Self::Declared(other.to_string()),
        }
    }
}

impl From<String> for NodeType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database kind of a connection, inherited by every node below it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DbType {
    Postgresql,
    Mysql,
    Oracle,
    Sqlserver,
    Mongodb,
    Redis,
    Other(String),
}

impl DbType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Postgresql => "POSTGRESQL",
            Self::Mysql => "MYSQL",
            Self::Oracle => "ORACLE",
            Self::Sqlserver => "SQLSERVER",
            Self::Mongodb => "MONGODB",
            Self::Redis => "REDIS",
            Self::Other(name) => name,
        }
    }

    /// Key used to locate the tree schema document (`tree-<key>.yml`).
    pub fn schema_key(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl From<String> for DbType {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "POSTGRESQL" => Self::Postgresql,
            "MYSQL" => Self::Mysql,
            "ORACLE" => Self::Oracle,
            "SQLSERVER" => Self::Sqlserver,
            "MONGODB" => Self::Mongodb,
            "REDIS" => Self::Redis,
            _ => Self::Other(value),
        }
    }
}

impl From<DbType> for String {
    fn from(value: DbType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-node declaration of its action menu and how its children resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Semantic type, which may differ from the node's literal `type` tag.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    /// Key of the schema descriptor this node was synthesized from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default)]
    pub actions: ActionSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_level: Option<String>,

    /// Static fan-out: display alias -> descriptor key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<IndexMap<String, String>>,

    #[serde(default)]
    pub allow_drop: bool,
}

/// A node of the navigation tree.
///
/// `children == None` means "not loaded yet"; `Some(vec![])` means loaded and
/// empty. Children are shared `Arc`s so a cache update only rebuilds the path
/// from the root to the changed node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    pub name: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Arc<Node>>>,

    #[serde(default)]
    pub connected: bool,

    #[serde(default)]
    pub expanded: bool,

    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<NodeConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_type: Option<DbType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            name: name.into(),
            node_type,
            children: None,
            connected: false,
            expanded: false,
            is_virtual: false,
            config: None,
            db_type: None,
            icon: None,
            db_name: None,
            schema_name: None,
        }
    }

    /// Creates a folder node. Folders always carry a (possibly empty) child list.
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut node = Self::new(id, name, NodeType::Folder);
        node.children = Some(Vec::new());
        node
    }

    pub fn connection(id: impl Into<String>, name: impl Into<String>, db_type: DbType) -> Self {
        let mut node = Self::new(id, name, NodeType::Connection);
        node.db_type = Some(db_type);
        node
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = Some(children.into_iter().map(Arc::new).collect());
        self
    }

    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }

    pub fn is_connection(&self) -> bool {
        self.node_type == NodeType::Connection
    }

    /// Whether child resolution has run (or children were attached statically).
    pub fn is_loaded(&self) -> bool {
        self.children.is_some()
    }

    pub fn child_nodes(&self) -> &[Arc<Node>] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// The configured semantic type if present, else the literal type tag.
    pub fn effective_type(&self) -> &str {
        self.config
            .as_ref()
            .and_then(|c| c.node_type.as_deref())
            .unwrap_or_else(|| self.node_type.as_str())
    }

    pub fn descriptor_key(&self) -> Option<&str> {
        self.config.as_ref().and_then(|c| c.key.as_deref())
    }

    pub fn allows_drop(&self) -> bool {
        self.is_folder() || self.config.as_ref().is_some_and(|c| c.allow_drop)
    }

    /// Whether the node could show children, loaded or not.
    pub fn is_expandable(&self) -> bool {
        if !self.child_nodes().is_empty() || self.is_virtual || self.is_connection() {
            return true;
        }

        self.config
            .as_ref()
            .is_some_and(|c| c.children.is_some() || c.next_level.is_some())
    }

    /// Depth-first search of this node's subtree (excluding the node itself).
    pub fn find_descendant(&self, id: &str) -> Option<&Arc<Node>> {
        for child in self.child_nodes() {
            if child.id == id {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(id) {
                return Some(found);
            }
        }
        None
    }
}

/// Turns a descriptor alias such as `Materialized_Views` into a display label.
pub fn humanize_alias(alias: &str) -> String {
    alias.replace('_', " ")
}

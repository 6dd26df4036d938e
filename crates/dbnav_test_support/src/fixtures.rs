use async_trait::async_trait;
use dbnav_core::{
    BundledSchemaSource, ConnectionDraft, DbType, Navigator, Node, NodeConfig, NodeType,
    SchemaLoadError, SchemaRegistry, SchemaSource,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::FakeGateway;

/// A PostgreSQL layout where two aliases of `catalog` share the `tables`
/// descriptor.
pub const ALIAS_SCHEMA: &str = r#"
tree:
  - key: databases
    label: Databases
    type: databases
    virtual: true
    position: 1
    nextLevel: database
    actions:
      menu:
        - label: Refresh
          handler: refreshNode

  - key: catalog
    label: Catalog
    type: catalog
    virtual: true
    position: 2
    children:
      Hot_Tables: tables
      Cold_Tables: tables

  - key: database
    label: Database
    type: database
    parent: databases
    nextLevel: table

  - key: tables
    label: Tables
    type: tables
    virtual: true
    parent: catalog
    nextLevel: table
    actions:
      menu:
        - label: Refresh
          handler: refreshNode
        - label: New Table
          handler: createNewTable

  - key: table
    label: Table
    type: table
    parent: tables
    actions:
      menu:
        - label: Preview Data
          handler: previewTable
          primary: true
        - type: separator
        - label: Delete Table
          handler: deleteTable
          variant: danger
"#;

/// Documents held in memory, by schema key.
#[derive(Default)]
pub struct StaticSchemaSource {
    documents: HashMap<String, String>,
}

impl StaticSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, schema_key: &str, text: &str) -> Self {
        self.documents
            .insert(schema_key.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn load(&self, schema_key: &str) -> Result<Option<String>, SchemaLoadError> {
        Ok(self.documents.get(schema_key).cloned())
    }
}

pub fn alias_schema_registry() -> Arc<SchemaRegistry> {
    let source = StaticSchemaSource::new().with_document("postgresql", ALIAS_SCHEMA);
    Arc::new(SchemaRegistry::new(vec![Arc::new(source)]))
}

pub fn bundled_schema_registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::new(vec![Arc::new(BundledSchemaSource)]))
}

/// A navigator over `gateway` with the forest already in its cache.
pub fn navigator(
    gateway: &FakeGateway,
    schemas: Arc<SchemaRegistry>,
    forest: Vec<Node>,
) -> Navigator {
    let navigator = Navigator::new(gateway.clone().as_gateway_arc(), schemas);
    navigator.cache.replace_forest(forest);
    navigator
}

pub fn postgres_connection(id: &str) -> Node {
    Node::connection(id, format!("{} (pg)", id), DbType::Postgresql)
}

pub fn connected(mut node: Node) -> Node {
    node.connected = true;
    node
}

/// A record as the children endpoint returns it: bare id, no config.
pub fn record(id: &str, node_type: NodeType) -> Node {
    Node::new(id, id, node_type)
}

/// A table already resolved below `c1`, as the cache would hold it.
pub fn table_node(connection_id: &str, name: &str) -> Node {
    let parent_id = format!("{}::catalog::Hot_Tables", connection_id);
    let mut node = Node::new(format!("{}::{}", parent_id, name), name, NodeType::Table)
        .with_parent(parent_id);
    node.db_type = Some(DbType::Postgresql);
    node.connected = true;
    node.db_name = Some("app".to_string());
    node.schema_name = Some("public".to_string());
    node.config = Some(NodeConfig {
        node_type: Some("table".to_string()),
        key: Some("table".to_string()),
        ..NodeConfig::default()
    });
    node
}

/// `Work/[c1]`, `Archive/[]` and a root-level `c2`.
pub fn sample_forest() -> Vec<Node> {
    let work = Node::folder("f-work", "Work")
        .with_children(vec![postgres_connection("c1").with_parent("f-work")]);
    let archive = Node::folder("f-archive", "Archive");
    vec![work, archive, postgres_connection("c2")]
}

pub fn connection_draft(name: &str, db_type: DbType, parent_id: Option<&str>) -> ConnectionDraft {
    ConnectionDraft {
        name: name.to_string(),
        db_type,
        host: "localhost".to_string(),
        port: Some(5432),
        database: Some("app".to_string()),
        username: Some("app".to_string()),
        password: None,
        parent_id: parent_id.map(str::to_string),
    }
}

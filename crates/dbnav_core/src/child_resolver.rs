use crate::error::ResolutionError;
use crate::gateway::MetadataGateway;
use crate::node::{DbType, Node, NodeConfig, NodeType, humanize_alias};
use crate::node_path::{NodePath, PATH_SEPARATOR, child_id, is_descendant_id};
use crate::schema_registry::SchemaRegistry;
use crate::tree_schema::{ChildStrategy, Descriptor, TreeSchema};
use indexmap::IndexMap;
use log::debug;
use std::sync::Arc;

/// Produces the next generation of nodes below a node.
///
/// Children come from one of three places: the static attachments of a
/// folder, the tree schema (top-level groupings and alias fan-outs), or a
/// backend fetch. The resolver keeps no results of its own; whatever it
/// returns is committed to the tree cache by the caller.
pub struct ChildResolver {
    schemas: Arc<SchemaRegistry>,
    gateway: Arc<dyn MetadataGateway>,
}

impl ChildResolver {
    pub fn new(schemas: Arc<SchemaRegistry>, gateway: Arc<dyn MetadataGateway>) -> Self {
        Self { schemas, gateway }
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    pub async fn resolve_children(&self, node: &Node) -> Result<Vec<Node>, ResolutionError> {
        if node.is_folder() {
            return Ok(node.child_nodes().iter().map(|c| (**c).clone()).collect());
        }

        if !node.connected {
            return Err(ResolutionError::NotConnected(node.id.clone()));
        }

        if node.is_connection() {
            let schema = self.schema_for(node).await?;
            let children = schema
                .top_level()
                .into_iter()
                .map(|descriptor| {
                    synthesize(node, descriptor, &descriptor.key, descriptor.display_label())
                })
                .collect();
            return Ok(children);
        }

        if node.is_virtual {
            return self.resolve_virtual(node).await;
        }

        if let Some(aliases) = node.config.as_ref().and_then(|c| c.children.as_ref()) {
            let schema = self.schema_for(node).await?;
            return fan_out(node, &schema, aliases);
        }

        if let Some(next) = node.config.as_ref().and_then(|c| c.next_level.as_deref()) {
            let schema = self.schema_for(node).await?;
            let shape = descriptor(node, &schema, next)?;
            return self.fetch(node, Some(shape)).await;
        }

        // Built from a descriptor: its strategy decides, a leaf never fetches.
        if let Some(key) = node.descriptor_key() {
            let schema = self.schema_for(node).await?;
            let current = descriptor(node, &schema, key)?;
            return match current.strategy() {
                ChildStrategy::Aliases(aliases) => fan_out(node, &schema, aliases),
                ChildStrategy::NextLevel(next) => {
                    let shape = descriptor(node, &schema, next)?;
                    self.fetch(node, Some(shape)).await
                }
                ChildStrategy::Leaf => {
                    debug!("{} is a leaf ({})", node.id, key);
                    Ok(Vec::new())
                }
            };
        }

        self.fetch(node, None).await
    }

    async fn resolve_virtual(&self, node: &Node) -> Result<Vec<Node>, ResolutionError> {
        let schema = self.schema_for(node).await?;

        let key = match node.descriptor_key() {
            Some(key) => key.to_string(),
            None => trailing_segment(&node.id).to_string(),
        };
        let current = descriptor(node, &schema, &key)?;

        match current.strategy() {
            ChildStrategy::Aliases(aliases) => fan_out(node, &schema, aliases),
            ChildStrategy::NextLevel(next) => {
                let shape = descriptor(node, &schema, next)?;
                self.fetch(node, Some(shape)).await
            }
            ChildStrategy::Leaf => Ok(Vec::new()),
        }
    }

    async fn schema_for(&self, node: &Node) -> Result<Arc<TreeSchema>, ResolutionError> {
        let db_type = node
            .db_type
            .as_ref()
            .ok_or_else(|| ResolutionError::MissingDbType(node.id.clone()))?;
        Ok(self.schemas.get_schema(db_type).await?)
    }

    /// Backend fetch for the node's own path; records are shaped by `shape`
    /// when they carry no config of their own.
    async fn fetch(
        &self,
        parent: &Node,
        shape: Option<&Descriptor>,
    ) -> Result<Vec<Node>, ResolutionError> {
        let path: NodePath = parent
            .id
            .parse()
            .map_err(|_| ResolutionError::InvalidId(parent.id.clone()))?;

        debug!("Fetching children of {}", path);
        let records = self.gateway.fetch_children(&path).await?;

        Ok(records
            .into_iter()
            .map(|record| adopt(parent, record, shape))
            .collect())
    }
}

fn descriptor<'a>(
    node: &Node,
    schema: &'a TreeSchema,
    key: &str,
) -> Result<&'a Descriptor, ResolutionError> {
    schema
        .descriptor(key)
        .ok_or_else(|| ResolutionError::UnknownDescriptor {
            db_type: node
                .db_type
                .as_ref()
                .map(DbType::to_string)
                .unwrap_or_default(),
            key: key.to_string(),
        })
}

fn trailing_segment(id: &str) -> &str {
    id.rsplit(PATH_SEPARATOR).next().unwrap_or(id)
}

/// Object context (`dbName`, `schemaName`) handed from a node to its children.
fn child_context(parent: &Node) -> (Option<String>, Option<String>) {
    let db_name = match parent.effective_type() {
        "database" => Some(parent.name.clone()),
        _ => parent.db_name.clone(),
    };
    let schema_name = match parent.effective_type() {
        "schema" => Some(parent.name.clone()),
        _ => parent.schema_name.clone(),
    };
    (db_name, schema_name)
}

/// A node built purely from a descriptor, with id `<parent>::<segment>`.
fn synthesize(parent: &Node, descriptor: &Descriptor, segment: &str, name: &str) -> Node {
    let (db_name, schema_name) = child_context(parent);

    let mut child = Node::new(
        child_id(&parent.id, segment),
        name,
        NodeType::from(descriptor.node_type.as_str()),
    );
    child.parent_id = Some(parent.id.clone());
    child.connected = true;
    child.is_virtual = descriptor.is_virtual;
    child.config = Some(descriptor.node_config());
    child.db_type = parent.db_type.clone();
    child.icon = descriptor.icon.clone();
    child.db_name = db_name;
    child.schema_name = schema_name;
    child
}

/// One virtual child per alias; aliases sharing a target stay distinct by id
/// and name but carry the same descriptor.
fn fan_out(
    parent: &Node,
    schema: &TreeSchema,
    aliases: &IndexMap<String, String>,
) -> Result<Vec<Node>, ResolutionError> {
    aliases
        .iter()
        .map(|(alias, target)| -> Result<Node, ResolutionError> {
            let target = descriptor(parent, schema, target)?;
            let mut child = synthesize(parent, target, alias, &humanize_alias(alias));
            child.is_virtual = true;
            Ok(child)
        })
        .collect()
}

/// Folds a backend record into the tree below `parent`.
fn adopt(parent: &Node, mut record: Node, shape: Option<&Descriptor>) -> Node {
    if !is_descendant_id(&parent.id, &record.id) {
        let segment = match trailing_segment(&record.id) {
            "" => record.name.clone(),
            segment => segment.to_string(),
        };
        record.id = child_id(&parent.id, &segment);
    }

    let (db_name, schema_name) = child_context(parent);

    record.parent_id = Some(parent.id.clone());
    record.connected = parent.connected;
    record.expanded = false;
    if parent.db_type.is_some() {
        record.db_type = parent.db_type.clone();
    }
    record.db_name = record.db_name.or(db_name);
    record.schema_name = record.schema_name.or(schema_name);

    if record.config.is_none() {
        record.config = Some(match shape {
            Some(descriptor) => descriptor.node_config(),
            None => NodeConfig {
                node_type: Some(record.node_type.to_string()),
                icon: record.icon.clone(),
                ..NodeConfig::default()
            },
        });
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> Node {
        let mut node = Node::new("c1::databases::app", "app", NodeType::Database);
        node.db_type = Some(DbType::Postgresql);
        node.connected = true;
        node
    }

    #[test]
    fn test_adopt_reroots_foreign_ids() {
        let record = Node::new("users", "users", NodeType::Table);
        let adopted = adopt(&database(), record, None);

        assert_eq!(adopted.id, "c1::databases::app::users");
        assert_eq!(adopted.parent_id.as_deref(), Some("c1::databases::app"));
        assert_eq!(adopted.db_type, Some(DbType::Postgresql));
        assert!(adopted.connected);
        assert_eq!(adopted.db_name.as_deref(), Some("app"));
        assert_eq!(adopted.effective_type(), "table");
    }

    #[test]
    fn test_adopt_keeps_prefixed_ids_and_record_config() {
        let mut record = Node::new("c1::databases::app::public", "public", NodeType::Schema);
        record.config = Some(NodeConfig {
            node_type: Some("schema".into()),
            next_level: Some("table".into()),
            ..NodeConfig::default()
        });

        let adopted = adopt(&database(), record, None);
        assert_eq!(adopted.id, "c1::databases::app::public");
        assert_eq!(
            adopted.config.unwrap().next_level.as_deref(),
            Some("table")
        );
    }

    #[test]
    fn test_adopt_uses_empty_id_name() {
        let record = Node::new("", "orders", NodeType::Table);
        assert_eq!(adopt(&database(), record, None).id, "c1::databases::app::orders");
    }

    #[test]
    fn test_schema_context_flows_down() {
        let mut schema = Node::new("c1::databases::app::Schemas::sales", "sales", NodeType::Schema);
        schema.db_name = Some("app".into());
        schema.connected = true;

        let adopted = adopt(&schema, Node::new("orders", "orders", NodeType::Table), None);
        assert_eq!(adopted.db_name.as_deref(), Some("app"));
        assert_eq!(adopted.schema_name.as_deref(), Some("sales"));
    }

    #[test]
    fn test_trailing_segment() {
        assert_eq!(trailing_segment("c1::databases"), "databases");
        assert_eq!(trailing_segment("c1"), "c1");
    }
}

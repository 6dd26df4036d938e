use crate::error::{ActionError, GatewayError};
use crate::gateway::{ConnectionDraft, FolderDraft, MetadataGateway};
use crate::node::Node;
use crate::tree_cache::TreeCache;
use log::{info, warn};
use std::sync::Arc;

/// Prepares nodes from `GET /api/config/tree` for the cache: connections
/// start disconnected and unloaded, folders always carry a child list.
pub fn normalize_forest(nodes: Vec<Node>) -> Vec<Node> {
    nodes.into_iter().map(|node| normalize(node, None)).collect()
}

fn normalize(mut node: Node, parent_id: Option<&str>) -> Node {
    if node.parent_id.is_none() {
        node.parent_id = parent_id.map(str::to_string);
    }

    if node.is_connection() {
        node.connected = false;
        node.expanded = false;
        node.children = None;
    } else if node.is_folder() {
        let children: Vec<Node> = node
            .children
            .take()
            .unwrap_or_default()
            .into_iter()
            .map(|child| normalize(Arc::unwrap_or_clone(child), Some(&node.id)))
            .collect();
        node = node.with_children(children);
    }

    node
}

fn validated_name(name: &str, what: &str) -> Result<String, ActionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ActionError::Invalid(format!("{} name cannot be empty", what)));
    }
    Ok(name.to_string())
}

/// What the creation, rename and edit dialogs submit to.
pub struct ConfigActions {
    cache: Arc<TreeCache>,
    gateway: Arc<dyn MetadataGateway>,
}

impl ConfigActions {
    pub fn new(cache: Arc<TreeCache>, gateway: Arc<dyn MetadataGateway>) -> Self {
        Self { cache, gateway }
    }

    /// Fetches the folder/connection forest and replaces the cache with it.
    pub async fn load_forest(&self) -> Result<usize, GatewayError> {
        let nodes = normalize_forest(self.gateway.fetch_tree().await?);
        let count = nodes.len();
        self.cache.replace_forest(nodes);
        info!("Loaded tree with {} root nodes", count);
        Ok(count)
    }

    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<String>,
    ) -> Result<(), ActionError> {
        let draft = FolderDraft {
            name: validated_name(name, "Folder")?,
            parent_id,
        };

        self.gateway.create_folder(&draft).await?;
        info!("Created folder {}", draft.name);
        self.load_forest().await?;
        Ok(())
    }

    pub async fn create_connection(&self, draft: ConnectionDraft) -> Result<(), ActionError> {
        let draft = ConnectionDraft {
            name: validated_name(&draft.name, "Connection")?,
            ..draft
        };

        self.gateway.create_connection(&draft).await?;
        info!("Created connection {}", draft.name);
        self.load_forest().await?;
        Ok(())
    }

    /// Renames on the backend, then in place in the cache.
    pub async fn rename_folder(&self, folder_id: &str, new_name: &str) -> Result<(), ActionError> {
        let name = validated_name(new_name, "Folder")?;

        self.gateway.rename_folder(folder_id, &name).await?;

        if !self.cache.update_node_path(folder_id, |node| Node {
            name: name.clone(),
            ..node.clone()
        }) {
            warn!("Renamed folder {} is no longer in the tree", folder_id);
        }
        Ok(())
    }

    /// Replaces the connection with the server's copy, disconnected and
    /// unloaded, since its settings may no longer match the open session.
    pub async fn update_connection(
        &self,
        connection_id: &str,
        draft: ConnectionDraft,
    ) -> Result<(), ActionError> {
        let draft = ConnectionDraft {
            name: validated_name(&draft.name, "Connection")?,
            ..draft
        };

        let stored = self.gateway.update_connection(connection_id, &draft).await?;

        self.cache.update_node_path(connection_id, |current| Node {
            id: current.id.clone(),
            parent_id: stored.parent_id.clone().or_else(|| current.parent_id.clone()),
            connected: false,
            expanded: false,
            children: None,
            ..stored
        });
        info!("Updated connection {}", connection_id);
        Ok(())
    }
}

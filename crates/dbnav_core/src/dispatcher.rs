use crate::child_resolver::ChildResolver;
use crate::config_actions::normalize_forest;
use crate::error::ActionError;
use crate::expansion::ExpansionController;
use crate::gateway::{MetadataGateway, ObjectDeletion};
use crate::handlers::{Action, DeletionKind, HandlerRegistry, ModalKind};
use crate::interaction::{ConfirmRequest, Interaction, ModalRequest, Notice};
use crate::menu::{ActionItem, ActionSet, NodeMenu, builtin_actions};
use crate::node::Node;
use crate::node_path::connection_id_of;
use crate::tree_cache::TreeCache;
use log::{debug, error, info, warn};
use std::sync::Arc;

const DEFAULT_DB_NAME: &str = "default";
const DEFAULT_SCHEMA_NAME: &str = "public";

/// UI hooks available to a handler while it runs.
#[derive(Clone, Copy)]
pub struct DispatchContext<'a> {
    pub ui: &'a dyn Interaction,
    pub on_expanded: Option<&'a (dyn Fn(&str, bool) + Send + Sync)>,
}

impl<'a> DispatchContext<'a> {
    pub fn new(ui: &'a dyn Interaction) -> Self {
        Self {
            ui,
            on_expanded: None,
        }
    }

    pub fn with_expansion_setter(mut self, setter: &'a (dyn Fn(&str, bool) + Send + Sync)) -> Self {
        self.on_expanded = Some(setter);
        self
    }

    fn set_expanded(&self, id: &str, expanded: bool) {
        if let Some(setter) = self.on_expanded {
            setter(id, expanded);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    /// The user declined a confirmation; nothing happened.
    Cancelled,
    /// No module knows the handler id; a notice was shown.
    Unimplemented(String),
    /// The handler failed; cache state is unchanged and a notice was shown.
    Failed(ActionError),
}

/// Computes node menus and runs handlers against the tree cache.
pub struct Dispatcher {
    cache: Arc<TreeCache>,
    resolver: Arc<ChildResolver>,
    expansion: Arc<ExpansionController>,
    gateway: Arc<dyn MetadataGateway>,
    handlers: HandlerRegistry,
}

impl Dispatcher {
    pub fn new(
        cache: Arc<TreeCache>,
        resolver: Arc<ChildResolver>,
        expansion: Arc<ExpansionController>,
        gateway: Arc<dyn MetadataGateway>,
    ) -> Self {
        Self {
            cache,
            resolver,
            expansion,
            gateway,
            handlers: HandlerRegistry::new(),
        }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// The node's visible menu: the schema's declared menu for its type,
    /// else the node's own declared menu, else the built-in one.
    pub async fn list_actions(&self, node: &Node) -> NodeMenu {
        let actions = match self.schema_menu(node).await {
            Some(actions) => actions,
            None => declared_menu(node).unwrap_or_else(|| builtin_actions(&node.node_type)),
        };
        NodeMenu::for_node(&actions, node)
    }

    pub async fn primary_action(&self, node: &Node) -> Option<ActionItem> {
        self.list_actions(node).await.primary().cloned()
    }

    async fn schema_menu(&self, node: &Node) -> Option<ActionSet> {
        if node.is_folder() {
            return None;
        }
        let db_type = node.db_type.as_ref()?;

        match self.resolver.schemas().get_schema(db_type).await {
            Ok(schema) => schema
                .descriptor_for_node(node)
                .filter(|descriptor| descriptor.declares_menu())
                .map(|descriptor| descriptor.actions.clone()),
            Err(e) => {
                debug!("Using built-in menu for {}: {}", node.id, e);
                None
            }
        }
    }

    /// Runs `handler_id` on `node`. Errors never escape: they become notices
    /// and a `Failed` outcome.
    pub async fn dispatch(
        &self,
        handler_id: &str,
        node: &Node,
        ctx: &DispatchContext<'_>,
    ) -> DispatchOutcome {
        let Some(resolved) = self.handlers.resolve(node, handler_id) else {
            warn!("No handler {} for {} node {}", handler_id, node.node_type, node.id);
            ctx.ui.notify(Notice::info(format!(
                "\"{}\" is not implemented for {}",
                handler_id, node.node_type
            )));
            return DispatchOutcome::Unimplemented(handler_id.to_string());
        };

        info!(
            "Dispatching {} on {} via {:?}",
            handler_id, node.id, resolved.module
        );

        if resolved.action.is_destructive()
            && !ctx.ui.confirm(confirmation(resolved.action, node)).await
        {
            debug!("{} on {} declined", handler_id, node.id);
            return DispatchOutcome::Cancelled;
        }

        match self.run(resolved.action, node, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Handler {} failed on {}: {}", handler_id, node.id, e);
                ctx.ui.notify(Notice::error(e.to_string()));
                DispatchOutcome::Failed(e)
            }
        }
    }

    async fn run(
        &self,
        action: Action,
        node: &Node,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchOutcome, ActionError> {
        match action {
            Action::Connect => self.connect_and_expand(node, ctx).await,
            Action::Disconnect => self.disconnect(node, ctx),
            Action::Refresh => self.refresh(node, ctx).await,
            Action::RefreshFolder => self.refresh_folder(node, ctx).await,
            Action::Modal(kind) => {
                ctx.ui.open_modal(modal_request(kind, node));
                Ok(DispatchOutcome::Completed)
            }
            Action::View(intent) => {
                ctx.ui.open_view(intent, node);
                Ok(DispatchOutcome::Completed)
            }
            Action::Delete(kind) => self.delete(kind, node, ctx).await,
            Action::DefaultAction => {
                if node.is_connection() {
                    return self.connect_and_expand(node, ctx).await;
                }
                ctx.ui.notify(Notice::info(format!(
                    "No default action for {}",
                    node.node_type
                )));
                Ok(DispatchOutcome::Unimplemented("defaultAction".to_string()))
            }
        }
    }

    /// The cache's current version of `node`, or `node` itself if it is not
    /// (or no longer) in the cache.
    fn live(&self, node: &Node) -> Node {
        self.cache
            .find_node(&node.id)
            .map(|live| (*live).clone())
            .unwrap_or_else(|| node.clone())
    }

    async fn connect_and_expand(
        &self,
        node: &Node,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchOutcome, ActionError> {
        if self.live(node).connected {
            ctx.ui
                .notify(Notice::info(format!("Already connected to {}", node.name)));
            return Ok(DispatchOutcome::Completed);
        }

        self.gateway.test_connection(&node.id).await?;
        info!("Connection {} is reachable", node.id);

        let mut connected = self.live(node);
        connected.connected = true;

        match self.resolver.resolve_children(&connected).await {
            Ok(children) => {
                self.cache.update_node_path(&node.id, |n| {
                    Node {
                        connected: true,
                        expanded: true,
                        ..n.clone()
                    }
                    .with_children(children)
                });
                ctx.set_expanded(&node.id, true);
                ctx.ui.notify(Notice::success(format!("Connected to {}", node.name)));
                Ok(DispatchOutcome::Completed)
            }
            Err(e) => {
                // Connected but not browsable; leave it collapsed.
                self.cache.update_node_path(&node.id, |n| Node {
                    connected: true,
                    expanded: false,
                    ..n.clone()
                });
                ctx.set_expanded(&node.id, false);
                Err(e.into())
            }
        }
    }

    fn disconnect(
        &self,
        node: &Node,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchOutcome, ActionError> {
        self.cache.update_node_path(&node.id, |n| Node {
            connected: false,
            expanded: false,
            children: None,
            ..n.clone()
        });
        ctx.set_expanded(&node.id, false);
        ctx.ui.notify(Notice::info(format!("Disconnected from {}", node.name)));
        Ok(DispatchOutcome::Completed)
    }

    async fn refresh(
        &self,
        node: &Node,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchOutcome, ActionError> {
        let live = self.live(node);
        self.expansion.reload(&live).await?;
        ctx.set_expanded(&node.id, true);
        ctx.ui.notify(Notice::success(format!("Refreshed {}", node.name)));
        Ok(DispatchOutcome::Completed)
    }

    /// Folders have no lazy children; re-read the whole tree and take this
    /// folder's subtree from it.
    async fn refresh_folder(
        &self,
        node: &Node,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchOutcome, ActionError> {
        let fresh = normalize_forest(self.gateway.fetch_tree().await?);
        let folder = fresh
            .iter()
            .find_map(|root| {
                if root.id == node.id {
                    Some(root.clone())
                } else {
                    root.find_descendant(&node.id).map(|found| (**found).clone())
                }
            })
            .ok_or_else(|| ActionError::NodeGone(node.id.clone()))?;

        self.cache.update_node_path(&node.id, |n| Node {
            children: folder.children,
            expanded: true,
            ..n.clone()
        });
        ctx.set_expanded(&node.id, true);
        Ok(DispatchOutcome::Completed)
    }

    /// Confirm, call the backend, and only then drop the node from the cache.
    async fn delete(
        &self,
        kind: DeletionKind,
        node: &Node,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchOutcome, ActionError> {
        let (_, what) = deletion_labels(kind, node);

        match kind {
            DeletionKind::Folder => self.gateway.delete_folder(&node.id).await?,
            DeletionKind::Connection => self.gateway.delete_connection(&node.id).await?,
            _ => {
                let deletion = object_deletion(kind, node)
                    .ok_or_else(|| ActionError::Invalid(format!("Cannot delete {}", node.id)))?;
                self.gateway.delete_object(&deletion).await?;
            }
        }

        self.cache.delete_node(&node.id);
        info!("Deleted {} {}", what, node.id);
        ctx.ui
            .notify(Notice::success(format!("Deleted {} \"{}\"", what, node.name)));
        Ok(DispatchOutcome::Completed)
    }
}

/// The prompt shown before a destructive action runs.
fn confirmation(action: Action, node: &Node) -> ConfirmRequest {
    let request = match action {
        Action::Delete(kind) => {
            let (title, what) = deletion_labels(kind, node);
            ConfirmRequest::new(
                title,
                format!(
                    "Delete {} \"{}\"? This cannot be undone.",
                    what, node.name
                ),
            )
        }
        other => ConfirmRequest::new(
            "Confirm",
            format!("Run {:?} on \"{}\"?", other, node.name),
        ),
    };
    request.danger()
}

/// The node's own non-empty `config.actions`, if it carries one.
fn declared_menu(node: &Node) -> Option<ActionSet> {
    node.config
        .as_ref()
        .map(|config| &config.actions)
        .filter(|actions| !actions.menu.is_empty())
        .cloned()
}

fn modal_request(kind: ModalKind, node: &Node) -> ModalRequest {
    match kind {
        ModalKind::NewConnection => ModalRequest::NewConnection {
            parent_id: Some(node.id.clone()),
        },
        ModalKind::NewFolder => ModalRequest::NewFolder {
            parent_id: Some(node.id.clone()),
        },
        ModalKind::RenameFolder => ModalRequest::RenameFolder {
            folder_id: node.id.clone(),
            current_name: node.name.clone(),
        },
        ModalKind::EditConnection => ModalRequest::EditConnection {
            connection_id: node.id.clone(),
        },
    }
}

fn deletion_labels(kind: DeletionKind, node: &Node) -> (&'static str, String) {
    match kind {
        DeletionKind::Folder => ("Delete Folder", "folder".to_string()),
        DeletionKind::Connection => ("Delete Connection", "connection".to_string()),
        DeletionKind::Database => ("Delete Database", "database".to_string()),
        DeletionKind::Schema => ("Delete Schema", "schema".to_string()),
        DeletionKind::Object => ("Delete Object", node.effective_type().to_string()),
        DeletionKind::Role => ("Delete Role", "role".to_string()),
        DeletionKind::Publication => ("Delete Publication", "publication".to_string()),
    }
}

/// Request for the scoped deletion endpoints. Missing context falls back to
/// the `default` database and the `public` schema.
pub fn object_deletion(kind: DeletionKind, node: &Node) -> Option<ObjectDeletion> {
    let connection_id = connection_id_of(&node.id).to_string();
    let db_name = || {
        node.db_name
            .clone()
            .unwrap_or_else(|| DEFAULT_DB_NAME.to_string())
    };
    let schema_name = || {
        node.schema_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SCHEMA_NAME.to_string())
    };

    let deletion = match kind {
        DeletionKind::Folder | DeletionKind::Connection => return None,
        DeletionKind::Database => ObjectDeletion::Database {
            connection_id,
            db_name: node.name.clone(),
        },
        DeletionKind::Schema => ObjectDeletion::Schema {
            connection_id,
            db_name: db_name(),
            schema_name: node.name.clone(),
        },
        DeletionKind::Object => ObjectDeletion::Object {
            connection_id,
            db_name: db_name(),
            schema_name: schema_name(),
            object_name: node.name.clone(),
            object_type: node.effective_type().to_string(),
        },
        DeletionKind::Role => ObjectDeletion::Role {
            connection_id,
            role_name: node.name.clone(),
        },
        DeletionKind::Publication => ObjectDeletion::Publication {
            connection_id,
            db_name: db_name(),
            publication_name: node.name.clone(),
        },
    };

    Some(deletion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{DbType, NodeType};

    #[test]
    fn test_object_deletion_defaults() {
        let mut table = Node::new("c1::databases::app::Tables::users", "users", NodeType::Table);
        table.db_type = Some(DbType::Postgresql);

        let deletion = object_deletion(DeletionKind::Object, &table).unwrap();
        assert_eq!(
            deletion,
            ObjectDeletion::Object {
                connection_id: "c1".into(),
                db_name: "default".into(),
                schema_name: "public".into(),
                object_name: "users".into(),
                object_type: "table".into(),
            }
        );
    }

    #[test]
    fn test_schema_deletion_uses_node_context() {
        let mut schema = Node::new("c1::databases::app::Schemas::sales", "sales", NodeType::Schema);
        schema.db_name = Some("app".into());

        let deletion = object_deletion(DeletionKind::Schema, &schema).unwrap();
        assert_eq!(
            deletion,
            ObjectDeletion::Schema {
                connection_id: "c1".into(),
                db_name: "app".into(),
                schema_name: "sales".into(),
            }
        );
    }

    #[test]
    fn test_folder_deletion_has_no_object_payload() {
        let folder = Node::folder("f1", "Work");
        assert!(object_deletion(DeletionKind::Folder, &folder).is_none());
    }

    #[test]
    fn test_declared_menu_ignores_empty_actions() {
        let node = Node::connection("c1", "pg", DbType::Postgresql);
        assert!(declared_menu(&node).is_none());
    }
}

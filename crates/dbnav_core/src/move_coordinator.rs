use crate::error::MoveError;
use crate::gateway::{MetadataGateway, MoveRequest};
use crate::interaction::{ConfirmRequest, Interaction, Notice};
use crate::node::NodeType;
use crate::tree_cache::TreeCache;
use log::{error, info, warn};
use std::sync::Arc;

/// Type sent to the backend when neither the node nor the caller names one.
const UNKNOWN_TYPE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveTarget {
    Root,
    Parent(String),
}

impl MoveTarget {
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Parent(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    Cancelled,
    /// Rejected or failed; nothing was applied and a notice was shown.
    Failed(MoveError),
}

/// Relocates folders and connections, backend first, cache second.
pub struct MoveCoordinator {
    cache: Arc<TreeCache>,
    gateway: Arc<dyn MetadataGateway>,
}

impl MoveCoordinator {
    pub fn new(cache: Arc<TreeCache>, gateway: Arc<dyn MetadataGateway>) -> Self {
        Self { cache, gateway }
    }

    /// `type_hint` is the caller's idea of the node type, used when the node's
    /// config does not declare one. Targets must be folders or declare
    /// `allowDrop`.
    pub async fn move_node(
        &self,
        source_id: &str,
        target: MoveTarget,
        type_hint: Option<&str>,
        ui: &dyn Interaction,
    ) -> MoveOutcome {
        match self.try_move(source_id, &target, type_hint, ui).await {
            Ok(true) => MoveOutcome::Moved,
            Ok(false) => MoveOutcome::Cancelled,
            Err(e) => {
                error!("Move of {} failed: {}", source_id, e);
                ui.notify(Notice::error(e.to_string()));
                MoveOutcome::Failed(e)
            }
        }
    }

    async fn try_move(
        &self,
        source_id: &str,
        target: &MoveTarget,
        type_hint: Option<&str>,
        ui: &dyn Interaction,
    ) -> Result<bool, MoveError> {
        let target_id = target.parent_id();
        if target_id == Some(source_id) {
            return Err(MoveError::SelfMove);
        }

        let source = self
            .cache
            .find_node(source_id)
            .ok_or_else(|| MoveError::NotFound(source_id.to_string()))?;

        let node_type = source
            .config
            .as_ref()
            .and_then(|c| c.node_type.clone())
            .or_else(|| type_hint.map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string());

        if source.node_type.is_database_object()
            || NodeType::from(node_type.as_str()).is_database_object()
        {
            return Err(MoveError::NotRelocatable(source_id.to_string()));
        }

        let target_name = match target_id {
            None => "the top level".to_string(),
            Some(id) => {
                if source.find_descendant(id).is_some() {
                    return Err(MoveError::IntoDescendant {
                        source_id: source_id.to_string(),
                        target_id: id.to_string(),
                    });
                }
                let parent = self
                    .cache
                    .find_node(id)
                    .ok_or_else(|| MoveError::NotFound(id.to_string()))?;
                if !parent.allows_drop() {
                    return Err(MoveError::NotDropTarget(id.to_string()));
                }
                format!("\"{}\"", parent.name)
            }
        };

        let request = ConfirmRequest::new(
            "Move Node",
            format!("Move \"{}\" to {}?", source.name, target_name),
        );
        if !ui.confirm(request).await {
            return Ok(false);
        }

        self.gateway
            .move_node(&MoveRequest {
                source_id: source_id.to_string(),
                target_parent_id: target_id.map(str::to_string),
                node_type,
            })
            .await?;

        if self.cache.relocate(source_id, target_id) {
            info!("Moved {} to {:?}", source_id, target_id);
        } else {
            warn!(
                "Moved {} on the backend but the tree changed underneath; reload to resync",
                source_id
            );
        }

        ui.notify(Notice::success(format!(
            "Moved \"{}\" to {}",
            source.name, target_name
        )));
        Ok(true)
    }
}

use crate::child_resolver::ChildResolver;
use crate::error::ResolutionError;
use crate::interaction::{Interaction, Notice};
use crate::node::Node;
use crate::sync::mutex_lock;
use crate::tree_cache::TreeCache;
use log::{debug, error};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
    Collapsed,
    Loading,
    Expanded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandOutcome {
    Expanded,
    Collapsed,
    /// The node is not connected; the user has to connect first.
    NeedsConnection,
    NotFound,
    Failed(ResolutionError),
}

/// Drives the per-node expansion state machine:
/// `collapsed -> loading -> expanded`, `loading -> collapsed` on failure,
/// `expanded -> collapsed` keeping children, and `refresh` forcing a fresh
/// resolution.
pub struct ExpansionController {
    cache: Arc<TreeCache>,
    resolver: Arc<ChildResolver>,
    loading: Mutex<HashMap<String, usize>>,
}

impl ExpansionController {
    pub fn new(cache: Arc<TreeCache>, resolver: Arc<ChildResolver>) -> Self {
        Self {
            cache,
            resolver,
            loading: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self, id: &str) -> ExpansionState {
        if mutex_lock(&self.loading).contains_key(id) {
            return ExpansionState::Loading;
        }

        match self.cache.find_node(id) {
            Some(node) if node.expanded => ExpansionState::Expanded,
            _ => ExpansionState::Collapsed,
        }
    }

    /// Expands a node, resolving its children only if they were never loaded.
    pub async fn expand(&self, id: &str, ui: &dyn Interaction) -> ExpandOutcome {
        let Some(node) = self.cache.find_node(id) else {
            return ExpandOutcome::NotFound;
        };

        if node.expanded {
            return ExpandOutcome::Expanded;
        }

        if node.is_loaded() {
            self.cache.update_node_path(id, |n| Node {
                expanded: true,
                ..n.clone()
            });
            return ExpandOutcome::Expanded;
        }

        if !node.is_expandable() {
            debug!("{} has nothing to expand", id);
            return ExpandOutcome::Collapsed;
        }

        if !node.connected && !node.is_folder() {
            ui.notify(Notice::info(format!("Connect to {} first", node.name)));
            return ExpandOutcome::NeedsConnection;
        }

        self.load(&node, ui).await
    }

    /// Collapses without discarding children, so a later expand is free.
    pub fn collapse(&self, id: &str) -> ExpandOutcome {
        if self.cache.update_node_path(id, |n| Node {
            expanded: false,
            ..n.clone()
        }) {
            ExpandOutcome::Collapsed
        } else {
            ExpandOutcome::NotFound
        }
    }

    pub async fn toggle(&self, id: &str, ui: &dyn Interaction) -> ExpandOutcome {
        match self.state(id) {
            ExpansionState::Expanded => self.collapse(id),
            ExpansionState::Collapsed => self.expand(id, ui).await,
            ExpansionState::Loading => ExpandOutcome::Collapsed,
        }
    }

    /// Re-resolves the node even if children are loaded, replacing its subtree.
    pub async fn refresh(&self, id: &str, ui: &dyn Interaction) -> ExpandOutcome {
        let Some(node) = self.cache.find_node(id) else {
            return ExpandOutcome::NotFound;
        };

        if !node.connected && !node.is_folder() {
            ui.notify(Notice::info(format!("Connect to {} first", node.name)));
            return ExpandOutcome::NeedsConnection;
        }

        self.load(&node, ui).await
    }

    async fn load(&self, node: &Node, ui: &dyn Interaction) -> ExpandOutcome {
        match self.reload(node).await {
            Ok(()) => ExpandOutcome::Expanded,
            Err(e) => {
                error!("Failed to resolve children of {}: {}", node.id, e);
                ui.notify(Notice::error(format!("Failed to load {}: {}", node.name, e)));
                self.cache.update_node_path(&node.id, |n| Node {
                    expanded: false,
                    ..n.clone()
                });
                ExpandOutcome::Failed(e)
            }
        }
    }

    /// Resolves and commits `children` + `expanded`, without user feedback.
    ///
    /// Two overlapping reloads of one node both commit; the later commit wins.
    pub(crate) async fn reload(&self, node: &Node) -> Result<(), ResolutionError> {
        let _loading = LoadingGuard::enter(&self.loading, &node.id);

        let children = self.resolver.resolve_children(node).await?;
        debug!("Resolved {} children for {}", children.len(), node.id);

        self.cache.update_node_path(&node.id, |n| Node {
            expanded: true,
            ..n.clone()
        }
        .with_children(children));
        Ok(())
    }
}

/// Counts an in-flight resolution of `id` for as long as it lives.
struct LoadingGuard<'a> {
    loading: &'a Mutex<HashMap<String, usize>>,
    id: String,
}

impl<'a> LoadingGuard<'a> {
    fn enter(loading: &'a Mutex<HashMap<String, usize>>, id: &str) -> Self {
        *mutex_lock(loading).entry(id.to_string()).or_insert(0) += 1;
        Self {
            loading,
            id: id.to_string(),
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut loading = mutex_lock(self.loading);
        if let Some(count) = loading.get_mut(&self.id) {
            *count -= 1;
            if *count == 0 {
                loading.remove(&self.id);
            }
        }
    }
}

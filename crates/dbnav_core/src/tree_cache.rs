use crate::node::Node;
use crate::sync::{rwlock_read, rwlock_write};
use log::debug;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tokio::sync::broadcast;

/// An immutable snapshot of the whole node forest.
pub type Forest = Arc<Vec<Arc<Node>>>;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    Replaced,
    Updated(String),
    Deleted(String),
    Relocated {
        id: String,
        parent_id: Option<String>,
    },
}

/// Emitted synchronously after every committed mutation.
#[derive(Debug, Clone)]
pub struct TreeEvent {
    pub change: TreeChange,
    pub forest: Forest,
}

/// The single source of truth for the node forest.
///
/// Every mutation is one synchronous copy-on-write step: the path from the
/// root to the changed node is rebuilt, sibling subtrees keep their `Arc`s,
/// and snapshots handed out earlier are never touched. Mutations addressed to
/// an id that is not in the forest are no-ops.
pub struct TreeCache {
    forest: RwLock<Forest>,
    events: broadcast::Sender<TreeEvent>,
}

impl TreeCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            forest: RwLock::new(Arc::new(Vec::new())),
            events,
        }
    }

    pub fn with_forest(nodes: Vec<Node>) -> Self {
        let cache = Self::new();
        *rwlock_write(&cache.forest) = Arc::new(nodes.into_iter().map(Arc::new).collect());
        cache
    }

    /// Receives one event per committed mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Forest {
        rwlock_read(&self.forest).clone()
    }

    /// Depth-first search over the forest.
    pub fn find_node(&self, id: &str) -> Option<Arc<Node>> {
        let forest = self.snapshot();
        locate(&forest, id).and_then(|path| node_at(&forest, &path).cloned())
    }

    /// Replaces the node `id` with `updater(node)`.
    ///
    /// Returns `false` (and changes nothing) if the node is absent, which
    /// happens when a node is deleted while an update for it is in flight.
    pub fn update_node_path<F>(&self, id: &str, updater: F) -> bool
    where
        F: FnOnce(&Node) -> Node,
    {
        let mut guard = rwlock_write(&self.forest);
        let Some(path) = locate(&guard, id) else {
            debug!("Ignoring update for absent node {}", id);
            return false;
        };

        let rebuilt = rebuild(&guard, &path, |node| Some(updater(node)));
        self.commit(&mut guard, rebuilt, TreeChange::Updated(id.to_string()));
        true
    }

    /// Removes the node and its subtree. Absent ids are a no-op.
    pub fn delete_node(&self, id: &str) -> bool {
        let mut guard = rwlock_write(&self.forest);
        let Some(path) = locate(&guard, id) else {
            debug!("Ignoring delete for absent node {}", id);
            return false;
        };

        let rebuilt = rebuild(&guard, &path, |_| None);
        self.commit(&mut guard, rebuilt, TreeChange::Deleted(id.to_string()));
        true
    }

    /// Wholesale replacement, used by the initial fetch and full reloads.
    pub fn replace_forest(&self, nodes: Vec<Node>) {
        let mut guard = rwlock_write(&self.forest);
        let nodes = nodes.into_iter().map(Arc::new).collect();
        self.commit(&mut guard, nodes, TreeChange::Replaced);
    }

    /// Detaches `id` from wherever it currently lives and appends it to
    /// `parent_id` (or the root), as one mutation.
    ///
    /// Returns `false` without changes if either node is missing or the target
    /// lies inside the moved subtree.
    pub fn relocate(&self, id: &str, parent_id: Option<&str>) -> bool {
        let mut guard = rwlock_write(&self.forest);
        let Some(source_path) = locate(&guard, id) else {
            debug!("Ignoring relocation of absent node {}", id);
            return false;
        };

        let Some(source) = node_at(&guard, &source_path).cloned() else {
            return false;
        };
        if let Some(target) = parent_id
            && (target == id || source.find_descendant(target).is_some())
        {
            return false;
        }

        let detached = rebuild(&guard, &source_path, |_| None);

        let mut moved = (*source).clone();
        moved.parent_id = parent_id.map(str::to_string);
        let moved = Arc::new(moved);

        let rebuilt = match parent_id {
            None => {
                let mut roots = detached;
                roots.push(moved);
                roots
            }
            Some(target) => {
                let Some(target_path) = locate(&detached, target) else {
                    debug!("Relocation target {} is absent", target);
                    return false;
                };
                rebuild(&detached, &target_path, |parent| {
                    let mut parent = parent.clone();
                    parent.children.get_or_insert_with(Vec::new).push(moved);
                    Some(parent)
                })
            }
        };

        let change = TreeChange::Relocated {
            id: id.to_string(),
            parent_id: parent_id.map(str::to_string),
        };
        self.commit(&mut guard, rebuilt, change);
        true
    }

    /// Installs `nodes` and publishes the event before the write guard is
    /// released, so events arrive in commit order.
    fn commit(
        &self,
        guard: &mut RwLockWriteGuard<'_, Forest>,
        nodes: Vec<Arc<Node>>,
        change: TreeChange,
    ) {
        let forest: Forest = Arc::new(nodes);
        **guard = forest.clone();
        // No receivers is fine: nothing is rendering.
        let _ = self.events.send(TreeEvent { change, forest });
    }
}

impl Default for TreeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Index path from the forest root to `id`, depth-first.
fn locate(nodes: &[Arc<Node>], id: &str) -> Option<Vec<usize>> {
    for (index, node) in nodes.iter().enumerate() {
        if node.id == id {
            return Some(vec![index]);
        }
        if let Some(mut path) = locate(node.child_nodes(), id) {
            path.insert(0, index);
            return Some(path);
        }
    }
    None
}

fn node_at<'a>(nodes: &'a [Arc<Node>], path: &[usize]) -> Option<&'a Arc<Node>> {
    let (first, rest) = path.split_first()?;
    let node = nodes.get(*first)?;
    if rest.is_empty() {
        Some(node)
    } else {
        node_at(node.child_nodes(), rest)
    }
}

/// Rebuilds the ancestor chain along `path`, applying `edit` at its end.
/// `edit` returning `None` removes the node.
fn rebuild<F>(nodes: &[Arc<Node>], path: &[usize], edit: F) -> Vec<Arc<Node>>
where
    F: FnOnce(&Node) -> Option<Node>,
{
    let Some((first, rest)) = path.split_first() else {
        return nodes.to_vec();
    };

    let mut out = nodes.to_vec();
    let current = &nodes[*first];

    if rest.is_empty() {
        match edit(current) {
            Some(replacement) => out[*first] = Arc::new(replacement),
            None => {
                out.remove(*first);
            }
        }
    } else {
        let mut parent = (**current).clone();
        parent.children = Some(rebuild(current.child_nodes(), rest, edit));
        out[*first] = Arc::new(parent);
    }

    out
}

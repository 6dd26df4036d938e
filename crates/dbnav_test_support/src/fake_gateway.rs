use async_trait::async_trait;
use dbnav_core::{
    ConnectionDraft, DbOptions, DbOptionsRequest, FolderDraft, GatewayError, MetadataGateway,
    MoveRequest, Node, NodePath, ObjectDeletion,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// One scripted answer of the children endpoint.
#[derive(Debug, Clone)]
pub enum FakeChildren {
    Nodes(Vec<Node>),
    Error(GatewayError),
}

impl FakeChildren {
    fn into_result(self) -> Result<Vec<Node>, GatewayError> {
        match self {
            Self::Nodes(nodes) => Ok(nodes),
            Self::Error(error) => Err(error),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeGatewayStats {
    pub tree_fetches: usize,
    /// Composite ids of every children request, in call order.
    pub children_requests: Vec<String>,
    pub connection_tests: Vec<String>,
    pub created_folders: Vec<FolderDraft>,
    pub renamed_folders: Vec<(String, String)>,
    pub deleted_folders: Vec<String>,
    pub created_connections: Vec<ConnectionDraft>,
    pub updated_connections: Vec<(String, ConnectionDraft)>,
    pub deleted_connections: Vec<String>,
    pub moves: Vec<MoveRequest>,
    pub object_deletions: Vec<ObjectDeletion>,
    pub option_requests: Vec<(String, DbOptionsRequest)>,
}

impl FakeGatewayStats {
    /// Calls that reached the backend, of any kind.
    pub fn total_calls(&self) -> usize {
        self.tree_fetches
            + self.children_requests.len()
            + self.connection_tests.len()
            + self.created_folders.len()
            + self.renamed_folders.len()
            + self.deleted_folders.len()
            + self.created_connections.len()
            + self.updated_connections.len()
            + self.deleted_connections.len()
            + self.moves.len()
            + self.object_deletions.len()
            + self.option_requests.len()
    }

    pub fn mutating_calls(&self) -> usize {
        self.total_calls()
            - self.tree_fetches
            - self.children_requests.len()
            - self.connection_tests.len()
            - self.option_requests.len()
    }
}

#[derive(Default)]
struct FakeGatewayState {
    tree: RwLock<Vec<Node>>,
    children: RwLock<HashMap<String, Vec<Node>>>,
    queued_children: Mutex<HashMap<String, VecDeque<(FakeChildren, Duration)>>>,
    connection_errors: RwLock<HashMap<String, GatewayError>>,
    failing_writes: RwLock<Option<GatewayError>>,
    db_options: RwLock<DbOptions>,
    stats: Mutex<FakeGatewayStats>,
    children_in_flight: AtomicUsize,
}

/// In-memory `MetadataGateway` that records every call.
///
/// Children are answered from queued responses first (one per call, in order),
/// then from the fixed table; unknown paths answer an empty list.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<FakeGatewayState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree(self, nodes: Vec<Node>) -> Self {
        *rwlock_write(&self.state.tree) = nodes;
        self
    }

    pub fn with_children(self, parent_id: impl Into<String>, nodes: Vec<Node>) -> Self {
        rwlock_write(&self.state.children).insert(parent_id.into(), nodes);
        self
    }

    pub fn with_children_error(self, parent_id: impl Into<String>, error: GatewayError) -> Self {
        self.queue_children(parent_id, FakeChildren::Error(error), Duration::ZERO);
        self
    }

    pub fn with_connection_error(self, connection_id: impl Into<String>, message: &str) -> Self {
        rwlock_write(&self.state.connection_errors)
            .insert(connection_id.into(), GatewayError::status(500, message));
        self
    }

    /// Every create/rename/update/delete/move call fails with `error`.
    pub fn with_failing_writes(self, error: GatewayError) -> Self {
        *rwlock_write(&self.state.failing_writes) = Some(error);
        self
    }

    pub fn with_db_options(self, options: DbOptions) -> Self {
        *rwlock_write(&self.state.db_options) = options;
        self
    }

    /// Answers the next children request for `parent_id` after `delay`.
    pub fn queue_children(&self, parent_id: impl Into<String>, answer: FakeChildren, delay: Duration) {
        mutex_lock(&self.state.queued_children)
            .entry(parent_id.into())
            .or_default()
            .push_back((answer, delay));
    }

    pub fn stats(&self) -> FakeGatewayStats {
        mutex_lock(&self.state.stats).clone()
    }

    pub fn children_in_flight(&self) -> usize {
        self.state.children_in_flight.load(Ordering::SeqCst)
    }

    pub fn tree(&self) -> Vec<Node> {
        rwlock_read(&self.state.tree).clone()
    }

    pub fn as_gateway_arc(self) -> Arc<dyn MetadataGateway> {
        Arc::new(self)
    }

    fn record(&self, f: impl FnOnce(&mut FakeGatewayStats)) {
        f(&mut mutex_lock(&self.state.stats));
    }

    fn check_write(&self) -> Result<(), GatewayError> {
        match rwlock_read(&self.state.failing_writes).as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn next_queued(&self, id: &str) -> Option<(FakeChildren, Duration)> {
        mutex_lock(&self.state.queued_children)
            .get_mut(id)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl MetadataGateway for FakeGateway {
    async fn fetch_tree(&self) -> Result<Vec<Node>, GatewayError> {
        self.record(|s| s.tree_fetches += 1);
        Ok(self.tree())
    }

    async fn fetch_children(&self, path: &NodePath) -> Result<Vec<Node>, GatewayError> {
        let id = path.to_string();
        self.record(|s| s.children_requests.push(id.clone()));

        let answer = match self.next_queued(&id) {
            Some((answer, delay)) => {
                self.state.children_in_flight.fetch_add(1, Ordering::SeqCst);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.state.children_in_flight.fetch_sub(1, Ordering::SeqCst);
                answer
            }
            None => FakeChildren::Nodes(
                rwlock_read(&self.state.children)
                    .get(&id)
                    .cloned()
                    .unwrap_or_default(),
            ),
        };

        answer.into_result()
    }

    async fn test_connection(&self, connection_id: &str) -> Result<(), GatewayError> {
        self.record(|s| s.connection_tests.push(connection_id.to_string()));

        match rwlock_read(&self.state.connection_errors).get(connection_id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn create_folder(&self, draft: &FolderDraft) -> Result<(), GatewayError> {
        self.record(|s| s.created_folders.push(draft.clone()));
        self.check_write()?;

        let mut folder = Node::folder(uuid::Uuid::new_v4().to_string(), &draft.name);
        folder.parent_id = draft.parent_id.clone();
        insert_node(&mut rwlock_write(&self.state.tree), folder);
        Ok(())
    }

    async fn rename_folder(&self, folder_id: &str, name: &str) -> Result<(), GatewayError> {
        self.record(|s| {
            s.renamed_folders
                .push((folder_id.to_string(), name.to_string()))
        });
        self.check_write()
    }

    async fn delete_folder(&self, folder_id: &str) -> Result<(), GatewayError> {
        self.record(|s| s.deleted_folders.push(folder_id.to_string()));
        self.check_write()
    }

    async fn create_connection(&self, draft: &ConnectionDraft) -> Result<(), GatewayError> {
        self.record(|s| s.created_connections.push(draft.clone()));
        self.check_write()?;

        let mut connection = Node::connection(
            uuid::Uuid::new_v4().to_string(),
            &draft.name,
            draft.db_type.clone(),
        );
        connection.parent_id = draft.parent_id.clone();
        insert_node(&mut rwlock_write(&self.state.tree), connection);
        Ok(())
    }

    async fn update_connection(
        &self,
        connection_id: &str,
        draft: &ConnectionDraft,
    ) -> Result<Node, GatewayError> {
        self.record(|s| {
            s.updated_connections
                .push((connection_id.to_string(), draft.clone()))
        });
        self.check_write()?;

        let mut stored = Node::connection(connection_id, &draft.name, draft.db_type.clone());
        stored.parent_id = draft.parent_id.clone();
        Ok(stored)
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<(), GatewayError> {
        self.record(|s| s.deleted_connections.push(connection_id.to_string()));
        self.check_write()
    }

    async fn move_node(&self, request: &MoveRequest) -> Result<(), GatewayError> {
        self.record(|s| s.moves.push(request.clone()));
        self.check_write()
    }

    async fn delete_object(&self, deletion: &ObjectDeletion) -> Result<(), GatewayError> {
        self.record(|s| s.object_deletions.push(deletion.clone()));
        self.check_write()
    }

    async fn db_options(
        &self,
        connection_id: &str,
        request: &DbOptionsRequest,
    ) -> Result<DbOptions, GatewayError> {
        self.record(|s| {
            s.option_requests
                .push((connection_id.to_string(), request.clone()))
        });
        Ok(rwlock_read(&self.state.db_options).clone())
    }
}

/// Appends `node` under its `parent_id` folder, or at the root.
fn insert_node(nodes: &mut Vec<Node>, node: Node) {
    let Some(parent_id) = node.parent_id.clone() else {
        nodes.push(node);
        return;
    };

    fn attach(nodes: &mut [Node], parent_id: &str, node: &Node) -> bool {
        for candidate in nodes.iter_mut() {
            if candidate.id == parent_id {
                candidate
                    .children
                    .get_or_insert_with(Vec::new)
                    .push(Arc::new(node.clone()));
                return true;
            }

            let mut children: Vec<Node> = candidate
                .child_nodes()
                .iter()
                .map(|child| child.as_ref().clone())
                .collect();
            if attach(&mut children, parent_id, node) {
                *candidate = candidate.clone().with_children(children);
                return true;
            }
        }
        false
    }

    if !attach(nodes, &parent_id, &node) {
        nodes.push(node);
    }
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

use crate::interaction::ViewIntent;
use crate::node::{Node, NodeType};
use std::collections::HashMap;

/// Dialogs a handler can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    NewConnection,
    NewFolder,
    RenameFolder,
    EditConnection,
}

/// What a destructive handler deletes; selects endpoint and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionKind {
    Folder,
    Connection,
    Database,
    Schema,
    /// Table, view or function, via the generic object endpoint.
    Object,
    Role,
    Publication,
}

/// Everything a handler id can mean. Handler ids map onto these values at
/// registry construction; nothing is probed at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Connect,
    Disconnect,
    /// Re-resolve the node's children and commit them expanded.
    Refresh,
    /// Re-read the tree endpoint and replace this folder's children.
    RefreshFolder,
    Modal(ModalKind),
    View(ViewIntent),
    Delete(DeletionKind),
    DefaultAction,
}

impl Action {
    pub fn is_destructive(self) -> bool {
        matches!(self, Action::Delete(_))
    }
}

/// The handler modules, one per fixed node type plus the generic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerModule {
    Folder,
    Connection,
    Database,
    Schema,
    Table,
    View,
    Function,
    Generic,
}

impl HandlerModule {
    pub fn for_type(node_type: &NodeType) -> Option<Self> {
        match node_type {
            NodeType::Folder => Some(Self::Folder),
            NodeType::Connection => Some(Self::Connection),
            NodeType::Database => Some(Self::Database),
            NodeType::Schema => Some(Self::Schema),
            NodeType::Table => Some(Self::Table),
            NodeType::View => Some(Self::View),
            NodeType::Function => Some(Self::Function),
            NodeType::Declared(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HandlerSet {
    handlers: HashMap<&'static str, Action>,
}

impl HandlerSet {
    fn from_entries(entries: &[(&'static str, Action)]) -> Self {
        Self {
            handlers: entries.iter().copied().collect(),
        }
    }

    pub fn lookup(&self, handler_id: &str) -> Option<Action> {
        self.handlers.get(handler_id).copied()
    }
}

/// A handler id resolved against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedHandler {
    pub module: HandlerModule,
    pub action: Action,
}

/// Static handler tables for every module, built once.
pub struct HandlerRegistry {
    modules: HashMap<HandlerModule, HandlerSet>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        use Action::*;
        use DeletionKind as D;
        use ViewIntent as V;

        let mut modules = HashMap::new();

        modules.insert(
            HandlerModule::Folder,
            HandlerSet::from_entries(&[
                ("openNewConnection", Modal(ModalKind::NewConnection)),
                ("openNewGroup", Modal(ModalKind::NewFolder)),
                ("openRenameFolder", Modal(ModalKind::RenameFolder)),
                ("deleteFolder", Delete(D::Folder)),
                ("refreshFolder", RefreshFolder),
            ]),
        );

        modules.insert(
            HandlerModule::Connection,
            HandlerSet::from_entries(&[
                ("connectAndExpand", Connect),
                ("disconnectDatabase", Disconnect),
                ("refreshConnection", Refresh),
                ("openEditConnection", Modal(ModalKind::EditConnection)),
                ("deleteConnection", Delete(D::Connection)),
            ]),
        );

        modules.insert(
            HandlerModule::Database,
            HandlerSet::from_entries(&[
                ("refreshDatabase", Refresh),
                ("createNewSchema", View(V::CreateSchema)),
                ("exportDatabase", View(V::ExportStructure)),
                ("deleteDatabase", Delete(D::Database)),
            ]),
        );

        modules.insert(
            HandlerModule::Schema,
            HandlerSet::from_entries(&[
                ("refreshSchema", Refresh),
                ("createNewTable", View(V::CreateTable)),
                ("exportSchema", View(V::ExportStructure)),
                ("deleteSchema", Delete(D::Schema)),
            ]),
        );

        modules.insert(
            HandlerModule::Table,
            HandlerSet::from_entries(&[
                ("previewTable", View(V::PreviewData)),
                ("editTableStructure", View(V::EditStructure)),
                ("generateTableSQL", View(V::GenerateSql)),
                ("exportTableData", View(V::ExportData)),
                ("deleteTable", Delete(D::Object)),
            ]),
        );

        modules.insert(
            HandlerModule::View,
            HandlerSet::from_entries(&[
                ("viewDefinition", View(V::ViewDefinition)),
                ("editView", View(V::EditView)),
                ("generateViewSQL", View(V::GenerateSql)),
                ("deleteView", Delete(D::Object)),
            ]),
        );

        modules.insert(
            HandlerModule::Function,
            HandlerSet::from_entries(&[
                ("editFunction", View(V::EditFunction)),
                ("viewFunctionSource", View(V::ViewSource)),
                ("testFunction", View(V::TestFunction)),
                ("deleteFunction", Delete(D::Object)),
            ]),
        );

        modules.insert(
            HandlerModule::Generic,
            HandlerSet::from_entries(&[
                ("showProperties", View(V::Properties)),
                ("refreshNode", Refresh),
                ("defaultAction", DefaultAction),
                ("createDatabase", View(V::CreateDatabase)),
                ("createNewSchema", View(V::CreateSchema)),
                ("createNewTable", View(V::CreateTable)),
                ("refreshMaterializedView", View(V::RefreshMaterializedView)),
                ("viewPublication", View(V::PublicationDetails)),
                ("createPublication", View(V::CreatePublication)),
                ("deletePublication", Delete(D::Publication)),
                ("showRoleProperties", View(V::RoleProperties)),
                ("createRole", View(V::CreateRole)),
                ("deleteRole", Delete(D::Role)),
            ]),
        );

        Self { modules }
    }

    pub fn module(&self, module: HandlerModule) -> Option<&HandlerSet> {
        self.modules.get(&module)
    }

    fn lookup_in(&self, module: HandlerModule, handler_id: &str) -> Option<ResolvedHandler> {
        self.module(module)?
            .lookup(handler_id)
            .map(|action| ResolvedHandler { module, action })
    }

    /// Routing order: folders only ever see the folder module; nodes without
    /// a database kind see the generic table; everything else tries its
    /// type's module and then the generic table.
    pub fn resolve(&self, node: &Node, handler_id: &str) -> Option<ResolvedHandler> {
        if node.is_folder() {
            return self.lookup_in(HandlerModule::Folder, handler_id);
        }

        if node.db_type.is_none() {
            return self.lookup_in(HandlerModule::Generic, handler_id);
        }

        HandlerModule::for_type(&node.node_type)
            .and_then(|module| self.lookup_in(module, handler_id))
            .or_else(|| self.lookup_in(HandlerModule::Generic, handler_id))
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

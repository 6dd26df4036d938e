use crate::node::{Node, NodeType};
use serde::{Deserialize, Serialize};

/// Visibility predicate attached to a menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Connected,
    Disconnected,
}

impl Condition {
    pub fn holds(self, node: &Node) -> bool {
        match self {
            Condition::Connected => node.connected,
            Condition::Disconnected => !node.connected,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Default,
    Danger,
}

/// A single invocable menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub label: String,
    pub handler: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default)]
    pub variant: Variant,

    #[serde(default)]
    pub primary: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl ActionItem {
    pub fn new(label: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            handler: handler.into(),
            icon: None,
            variant: Variant::Default,
            primary: false,
            condition: None,
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn danger(mut self) -> Self {
        self.variant = Variant::Danger;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_visible_for(&self, node: &Node) -> bool {
        self.condition.is_none_or(|condition| condition.holds(node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeparatorKind {
    #[serde(rename = "separator")]
    Separator,
}

/// Menu entries are either actions or explicit separators
/// (`{ type: separator }` in schema documents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MenuEntry {
    Separator {
        #[serde(rename = "type")]
        kind: SeparatorKind,
    },
    Action(ActionItem),
}

impl MenuEntry {
    pub fn separator() -> Self {
        Self::Separator {
            kind: SeparatorKind::Separator,
        }
    }

    pub fn as_action(&self) -> Option<&ActionItem> {
        match self {
            Self::Action(item) => Some(item),
            Self::Separator { .. } => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Self::Separator { .. })
    }
}

impl From<ActionItem> for MenuEntry {
    fn from(item: ActionItem) -> Self {
        Self::Action(item)
    }
}

/// The `actions` block of a descriptor or node config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<ActionItem>,

    #[serde(default)]
    pub menu: Vec<MenuEntry>,
}

/// A menu computed for one node: visible entries in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMenu {
    pub entries: Vec<MenuEntry>,
    declared_primary: Option<ActionItem>,
}

impl NodeMenu {
    /// Drops entries whose condition does not hold for `node`.
    pub fn for_node(actions: &ActionSet, node: &Node) -> Self {
        let entries = actions
            .menu
            .iter()
            .filter(|entry| match entry {
                MenuEntry::Action(item) => item.is_visible_for(node),
                MenuEntry::Separator { .. } => true,
            })
            .cloned()
            .collect();

        let declared_primary = actions
            .primary
            .clone()
            .filter(|item| item.is_visible_for(node));

        Self {
            entries,
            declared_primary,
        }
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionItem> {
        self.entries.iter().filter_map(MenuEntry::as_action)
    }

    /// First entry flagged primary, then the block's declared primary, then
    /// the first non-separator entry.
    pub fn primary(&self) -> Option<&ActionItem> {
        self.actions()
            .find(|item| item.primary)
            .or(self.declared_primary.as_ref())
            .or_else(|| self.actions().next())
    }

    pub fn find(&self, handler: &str) -> Option<&ActionItem> {
        self.actions().find(|item| item.handler == handler)
    }
}

/// The compiled-in menu for the fixed node types; used when no schema
/// declares one.
pub fn builtin_actions(node_type: &NodeType) -> ActionSet {
    let menu: Vec<MenuEntry> = match node_type {
        NodeType::Folder => vec![
            ActionItem::new("New Connection", "openNewConnection").into(),
            ActionItem::new("New Folder", "openNewGroup").into(),
            MenuEntry::separator(),
            ActionItem::new("Delete Folder", "deleteFolder")
                .danger()
                .into(),
            ActionItem::new("Rename", "openRenameFolder").into(),
        ],
        NodeType::Connection => vec![
            ActionItem::new("Connect", "connectAndExpand")
                .primary()
                .when(Condition::Disconnected)
                .into(),
            ActionItem::new("Disconnect", "disconnectDatabase")
                .when(Condition::Connected)
                .into(),
            MenuEntry::separator(),
            ActionItem::new("Refresh", "refreshConnection").into(),
            MenuEntry::separator(),
            ActionItem::new("Connection Settings", "openEditConnection").into(),
            ActionItem::new("Delete Connection", "deleteConnection")
                .danger()
                .into(),
        ],
        NodeType::Database => vec![
            ActionItem::new("Refresh", "refreshDatabase").into(),
            ActionItem::new("New Schema", "createNewSchema").into(),
            ActionItem::new("Export Structure", "exportDatabase").into(),
            MenuEntry::separator(),
            ActionItem::new("Delete Database", "deleteDatabase")
                .danger()
                .into(),
            ActionItem::new("Properties", "showProperties").into(),
        ],
        NodeType::Schema => vec![
            ActionItem::new("Refresh", "refreshSchema").into(),
            ActionItem::new("New Table", "createNewTable").into(),
            ActionItem::new("Export Structure", "exportSchema").into(),
            MenuEntry::separator(),
            ActionItem::new("Delete Schema", "deleteSchema")
                .danger()
                .into(),
            ActionItem::new("Properties", "showProperties").into(),
        ],
        NodeType::Table => vec![
            ActionItem::new("Preview Data", "previewTable").into(),
            ActionItem::new("Edit Structure", "editTableStructure").into(),
            ActionItem::new("Generate SQL", "generateTableSQL").into(),
            ActionItem::new("Export Data", "exportTableData").into(),
            MenuEntry::separator(),
            ActionItem::new("Delete Table", "deleteTable").danger().into(),
            ActionItem::new("Properties", "showProperties").into(),
        ],
        NodeType::View => vec![
            ActionItem::new("View Definition", "viewDefinition").into(),
            ActionItem::new("Edit View", "editView").into(),
            ActionItem::new("Generate SQL", "generateViewSQL").into(),
            MenuEntry::separator(),
            ActionItem::new("Delete View", "deleteView").danger().into(),
            ActionItem::new("Properties", "showProperties").into(),
        ],
        NodeType::Function => vec![
            ActionItem::new("Edit Function", "editFunction").into(),
            ActionItem::new("View Source", "viewFunctionSource").into(),
            ActionItem::new("Run Test", "testFunction").into(),
            MenuEntry::separator(),
            ActionItem::new("Delete Function", "deleteFunction")
                .danger()
                .into(),
            ActionItem::new("Properties", "showProperties").into(),
        ],
        NodeType::Declared(_) => Vec::new(),
    };

    ActionSet {
        primary: None,
        menu,
    }
}

use crate::node::Node;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub danger: bool,
}

impl ConfirmRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            danger: false,
        }
    }

    pub fn danger(mut self) -> Self {
        self.danger = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Dialogs whose submissions come back through `config_actions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalRequest {
    NewConnection { parent_id: Option<String> },
    NewFolder { parent_id: Option<String> },
    RenameFolder { folder_id: String, current_name: String },
    EditConnection { connection_id: String },
}

/// Views outside the tree (editor tabs, data grids, property panels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewIntent {
    PreviewData,
    EditStructure,
    GenerateSql,
    ExportData,
    ExportStructure,
    ViewDefinition,
    EditView,
    EditFunction,
    ViewSource,
    TestFunction,
    CreateSchema,
    CreateTable,
    CreateDatabase,
    CreatePublication,
    CreateRole,
    Properties,
    RoleProperties,
    PublicationDetails,
    RefreshMaterializedView,
}

/// The UI collaborator handlers talk to. Rendering is not the engine's
/// business; it only asks.
#[async_trait]
pub trait Interaction: Send + Sync {
    /// Resolves to `true` only if the user accepted.
    async fn confirm(&self, request: ConfirmRequest) -> bool;

    fn notify(&self, notice: Notice);

    fn open_modal(&self, request: ModalRequest);

    fn open_view(&self, intent: ViewIntent, node: &Node);
}

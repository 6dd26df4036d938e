mod app_config;
mod child_resolver;
mod config_actions;
mod dispatcher;
mod error;
mod expansion;
mod gateway;
mod handlers;
mod http_gateway;
mod interaction;
mod menu;
mod move_coordinator;
mod navigator;
mod node;
mod node_path;
mod schema_registry;
mod sync;
mod tree_cache;
mod tree_schema;

pub use app_config::{API_URL_ENV, ClientConfig, ClientConfigStore};
pub use child_resolver::ChildResolver;
pub use config_actions::{ConfigActions, normalize_forest};
pub use dispatcher::{DispatchContext, DispatchOutcome, Dispatcher, object_deletion};
pub use error::{
    ActionError, ConfigError, GatewayError, MoveError, ResolutionError, SchemaLoadError,
};
pub use expansion::{ExpandOutcome, ExpansionController, ExpansionState};
pub use gateway::{
    ConnectionDraft, DbOptions, DbOptionsRequest, FolderDraft, MetadataGateway, MoveRequest,
    ObjectDeletion,
};
pub use handlers::{
    Action, DeletionKind, HandlerModule, HandlerRegistry, HandlerSet, ModalKind, ResolvedHandler,
};
pub use http_gateway::HttpGateway;
pub use interaction::{
    ConfirmRequest, Interaction, ModalRequest, Notice, NoticeLevel, ViewIntent,
};
pub use menu::{
    ActionItem, ActionSet, Condition, MenuEntry, NodeMenu, SeparatorKind, Variant,
    builtin_actions,
};
pub use move_coordinator::{MoveCoordinator, MoveOutcome, MoveTarget};
pub use navigator::Navigator;
pub use node::{DbType, Node, NodeConfig, NodeType, humanize_alias};
pub use node_path::{
    NodePath, NodePathParseError, PATH_SEPARATOR, child_id, connection_id_of, is_descendant_id,
};
pub use schema_registry::{
    BundledSchemaSource, DirectorySchemaSource, SUPPORTED_SCHEMA_KEYS, SchemaRegistry,
    SchemaSource,
};
pub use tree_cache::{Forest, TreeCache, TreeChange, TreeEvent};
pub use tree_schema::{ChildStrategy, Descriptor, TreeSchema, bundled_document};

use thiserror::Error;

/// Failure talking to the metadata/CRUD backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// The message worth showing to a user, without the status prefix.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::Transport(message) | Self::Decode(message) => message,
        }
    }
}

/// The declarative tree schema for a database kind could not be produced.
///
/// `Clone` because a single in-flight load is shared by every concurrent waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaLoadError {
    #[error("No tree schema for database kind {0}")]
    Unsupported(String),

    #[error("Tree schema for {db_type} unreachable: {reason}")]
    Unreachable { db_type: String, reason: String },

    #[error("Tree schema for {db_type} is malformed: {reason}")]
    Malformed { db_type: String, reason: String },
}

/// Expanding a node failed; the node stays collapsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error(transparent)]
    Schema(#[from] SchemaLoadError),

    #[error("Failed to fetch children: {0}")]
    Fetch(#[from] GatewayError),

    #[error("Node {0} is not connected")]
    NotConnected(String),

    #[error("Node {0} has no database kind")]
    MissingDbType(String),

    #[error("Node id {0} is not a valid tree path")]
    InvalidId(String),

    #[error("No descriptor {key} in the {db_type} tree schema")]
    UnknownDescriptor { db_type: String, key: String },
}

/// A dispatched handler could not complete; cache state is left untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Backend(#[from] GatewayError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Node {0} no longer exists")]
    NodeGone(String),

    #[error("{0}")]
    Invalid(String),
}

/// Relocation was rejected or failed; nothing was applied.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("A node cannot be moved onto itself")]
    SelfMove,

    #[error("Cannot move {source_id} into its own descendant {target_id}")]
    IntoDescendant { source_id: String, target_id: String },

    #[error("Node {0} cannot be relocated")]
    NotRelocatable(String),

    #[error("Node {0} does not accept dropped nodes")]
    NotDropTarget(String),

    #[error("Node {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Backend(#[from] GatewayError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid client config: {0}")]
    Invalid(String),
}

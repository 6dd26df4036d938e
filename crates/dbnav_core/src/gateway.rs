use crate::error::GatewayError;
use crate::node::{DbType, Node};
use crate::node_path::NodePath;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDraft {
    pub name: String,

    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Fields of the connection creation/edit dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDraft {
    pub name: String,
    pub db_type: DbType,
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Body of `POST /api/config/move-node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub source_id: String,
    pub target_parent_id: Option<String>,

    #[serde(rename = "type")]
    pub node_type: String,
}

/// A scoped object deletion; each variant has its own endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectDeletion {
    Database {
        connection_id: String,
        db_name: String,
    },
    Schema {
        connection_id: String,
        db_name: String,
        schema_name: String,
    },
    /// Tables, views, functions and materialized views.
    Object {
        connection_id: String,
        db_name: String,
        schema_name: String,
        object_name: String,
        object_type: String,
    },
    Role {
        connection_id: String,
        role_name: String,
    },
    Publication {
        connection_id: String,
        db_name: String,
        publication_name: String,
    },
}

impl ObjectDeletion {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Database { .. } => "/api/db/delete-database",
            Self::Schema { .. } => "/api/db/delete-schema",
            Self::Object { .. } => "/api/db/delete-object",
            Self::Role { .. } => "/api/db/delete-role",
            Self::Publication { .. } => "/api/db/delete-publication",
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Self::Database {
                connection_id,
                db_name,
            } => json!({ "connectionId": connection_id, "dbName": db_name }),
            Self::Schema {
                connection_id,
                db_name,
                schema_name,
            } => json!({
                "connectionId": connection_id,
                "dbName": db_name,
                "schemaName": schema_name,
            }),
            Self::Object {
                connection_id,
                db_name,
                schema_name,
                object_name,
                object_type,
            } => json!({
                "connectionId": connection_id,
                "dbName": db_name,
                "schemaName": schema_name,
                "objectName": object_name,
                "objectType": object_type,
            }),
            Self::Role {
                connection_id,
                role_name,
            } => json!({ "connectionId": connection_id, "roleName": role_name }),
            Self::Publication {
                connection_id,
                db_name,
                publication_name,
            } => json!({
                "connectionId": connection_id,
                "dbName": db_name,
                "publicationName": publication_name,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbOptionsRequest {
    pub types: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_filter: Option<String>,
}

/// Option lists for object-creation dialogs; passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbOptions {
    pub encodings: Vec<Value>,
    pub collations: Vec<Value>,
    pub templates: Vec<Value>,
    pub tablespaces: Vec<Value>,
    pub roles: Vec<Value>,
    pub owners: Vec<Value>,
    pub locale_providers: Vec<Value>,
}

/// The remote metadata and CRUD API the engine talks to.
#[async_trait]
pub trait MetadataGateway: Send + Sync {
    /// Folders and connections (`GET /api/config/tree`).
    async fn fetch_tree(&self) -> Result<Vec<Node>, GatewayError>;

    /// Backend-resolved children of a real path.
    async fn fetch_children(&self, path: &NodePath) -> Result<Vec<Node>, GatewayError>;

    async fn test_connection(&self, connection_id: &str) -> Result<(), GatewayError>;

    async fn create_folder(&self, draft: &FolderDraft) -> Result<(), GatewayError>;

    async fn rename_folder(&self, folder_id: &str, name: &str) -> Result<(), GatewayError>;

    async fn delete_folder(&self, folder_id: &str) -> Result<(), GatewayError>;

    async fn create_connection(&self, draft: &ConnectionDraft) -> Result<(), GatewayError>;

    /// Returns the stored connection as the server now sees it.
    async fn update_connection(
        &self,
        connection_id: &str,
        draft: &ConnectionDraft,
    ) -> Result<Node, GatewayError>;

    async fn delete_connection(&self, connection_id: &str) -> Result<(), GatewayError>;

    async fn move_node(&self, request: &MoveRequest) -> Result<(), GatewayError>;

    async fn delete_object(&self, deletion: &ObjectDeletion) -> Result<(), GatewayError>;

    async fn db_options(
        &self,
        connection_id: &str,
        request: &DbOptionsRequest,
    ) -> Result<DbOptions, GatewayError>;
}

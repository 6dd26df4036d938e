use crate::app_config::ClientConfig;
use crate::error::GatewayError;
use crate::gateway::{
    ConnectionDraft, DbOptions, DbOptionsRequest, FolderDraft, MetadataGateway, MoveRequest,
    ObjectDeletion,
};
use crate::node::Node;
use crate::node_path::NodePath;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Standard backend wrapper: `{ success, code, message, data }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,

    #[serde(default)]
    message: Option<String>,

    // A missing key is `None` already; `default` here would demand `T: Default`.
    data: Option<T>,
}

/// The children endpoint answers either a bare list or a page object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChildrenPayload {
    List(Vec<Node>),
    Paged { items: Vec<Node> },
}

impl ChildrenPayload {
    fn into_nodes(self) -> Vec<Node> {
        match self {
            Self::List(nodes) | Self::Paged { items: nodes } => nodes,
        }
    }
}

/// `MetadataGateway` over the backend's JSON HTTP API.
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            GatewayError::Transport(format!("invalid API URL {}: {}", config.api_base_url, e))
        })?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Joins percent-encoded path segments onto the base URL.
    fn url<'a, I>(&self, segments: I) -> Result<Url, GatewayError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GatewayError::Transport(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.client.request(method, url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| status.to_string());
            warn!("Backend answered {}: {}", status.as_u16(), message);
            return Err(GatewayError::status(status.as_u16(), message));
        }

        Ok(body)
    }

    async fn fetch_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let body = self.send(request).await?;
        decode_data(&body)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(), GatewayError> {
        let body = self.send(request).await?;
        check_success(&body)
    }
}

/// Error text from a failed response: a JSON `message` field, else the
/// plain-text body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<Value>(body)
        && let Some(message) = value.get("message").and_then(Value::as_str)
        && !message.is_empty()
    {
        return Some(message.to_string());
    }

    let text = body.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub(crate) fn decode_data<T: DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))?;

    if envelope.success == Some(false) {
        return Err(GatewayError::status(
            200,
            envelope.message.unwrap_or_else(|| "request rejected".to_string()),
        ));
    }

    envelope
        .data
        .ok_or_else(|| GatewayError::Decode("response carries no data".to_string()))
}

/// Bodies of mutation endpoints may be empty; a wrapped `success: false`
/// still counts as a failure.
pub(crate) fn check_success(body: &str) -> Result<(), GatewayError> {
    if body.trim().is_empty() {
        return Ok(());
    }

    match serde_json::from_str::<Envelope<Value>>(body) {
        Ok(envelope) if envelope.success == Some(false) => Err(GatewayError::status(
            200,
            envelope.message.unwrap_or_else(|| "request rejected".to_string()),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn decode_children(body: &str) -> Result<Vec<Node>, GatewayError> {
    decode_data::<ChildrenPayload>(body).map(ChildrenPayload::into_nodes)
}

#[async_trait]
impl MetadataGateway for HttpGateway {
    async fn fetch_tree(&self) -> Result<Vec<Node>, GatewayError> {
        let url = self.url(["api", "config", "tree"])?;
        self.fetch_data(self.request(Method::GET, url)).await
    }

    async fn fetch_children(&self, path: &NodePath) -> Result<Vec<Node>, GatewayError> {
        let mut segments = vec!["api", "meta", path.connection_id()];
        segments.extend(path.segments().iter().map(String::as_str));
        segments.push("children");

        let url = self.url(segments)?;
        let body = self.send(self.request(Method::GET, url)).await?;
        decode_children(&body)
    }

    async fn test_connection(&self, connection_id: &str) -> Result<(), GatewayError> {
        let url = self.url(["api", "config", "connections", connection_id, "test"])?;
        self.execute(self.request(Method::GET, url)).await
    }

    async fn create_folder(&self, draft: &FolderDraft) -> Result<(), GatewayError> {
        let url = self.url(["api", "config", "folders"])?;
        self.execute(self.request(Method::POST, url).json(draft)).await
    }

    async fn rename_folder(&self, folder_id: &str, name: &str) -> Result<(), GatewayError> {
        let url = self.url(["api", "config", "folders", folder_id])?;
        self.execute(self.request(Method::PUT, url).json(&json!({ "name": name })))
            .await
    }

    async fn delete_folder(&self, folder_id: &str) -> Result<(), GatewayError> {
        let url = self.url(["api", "config", "folders", folder_id])?;
        self.execute(self.request(Method::DELETE, url)).await
    }

    async fn create_connection(&self, draft: &ConnectionDraft) -> Result<(), GatewayError> {
        let url = self.url(["api", "config", "connections"])?;
        self.execute(self.request(Method::POST, url).json(draft)).await
    }

    async fn update_connection(
        &self,
        connection_id: &str,
        draft: &ConnectionDraft,
    ) -> Result<Node, GatewayError> {
        let url = self.url(["api", "config", "connections", connection_id])?;
        self.fetch_data(self.request(Method::PUT, url).json(draft)).await
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<(), GatewayError> {
        let url = self.url(["api", "config", "connections", connection_id])?;
        self.execute(self.request(Method::DELETE, url)).await
    }

    async fn move_node(&self, request: &MoveRequest) -> Result<(), GatewayError> {
        let url = self.url(["api", "config", "move-node"])?;
        self.execute(self.request(Method::POST, url).json(request)).await
    }

    async fn delete_object(&self, deletion: &ObjectDeletion) -> Result<(), GatewayError> {
        let segments = deletion.endpoint().trim_start_matches('/').split('/');
        let url = self.url(segments)?;
        self.execute(self.request(Method::DELETE, url).json(&deletion.body()))
            .await
    }

    async fn db_options(
        &self,
        connection_id: &str,
        request: &DbOptionsRequest,
    ) -> Result<DbOptions, GatewayError> {
        let url = self.url(["api", "meta", "db", "options", connection_id])?;
        self.fetch_data(self.request(Method::POST, url).json(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_accepts_list_and_page() {
        let list = r#"{ "success": true, "data": [ { "id": "c1::databases::app", "name": "app", "type": "database" } ] }"#;
        let page = r#"{ "data": { "items": [ { "id": "app", "name": "app", "type": "database" } ] } }"#;

        assert_eq!(decode_children(list).unwrap()[0].name, "app");
        assert_eq!(decode_children(page).unwrap()[0].id, "app");
    }

    #[test]
    fn test_missing_data_is_a_decode_error() {
        let err = decode_data::<ChildrenPayload>(r#"{ "success": true }"#).unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));

        let nodes: Vec<Node> = decode_data(r#"{ "data": [] }"#).unwrap();
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_wrapped_failure_is_an_error() {
        let body = r#"{ "success": false, "code": "E500", "message": "boom", "data": null }"#;
        let err = decode_children(body).unwrap_err();
        assert_eq!(err.user_message(), "boom");
        assert!(check_success(body).is_err());
    }

    #[test]
    fn test_error_message_prefers_json_field() {
        assert_eq!(
            error_message(r#"{ "message": "password authentication failed" }"#).as_deref(),
            Some("password authentication failed")
        );
        assert_eq!(
            error_message("connection refused\n").as_deref(),
            Some("connection refused")
        );
        assert_eq!(error_message("  "), None);
    }

    #[test]
    fn test_empty_mutation_body_is_success() {
        assert!(check_success("").is_ok());
        assert!(check_success(r#"{ "success": true }"#).is_ok());
    }

    #[test]
    fn test_urls_are_percent_encoded() {
        let gateway = HttpGateway::new(&ClientConfig {
            api_base_url: "http://localhost:8080/".into(),
            ..ClientConfig::default()
        })
        .unwrap();

        let url = gateway
            .url(["api", "meta", "c1", "my db", "children"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/meta/c1/my%20db/children");
    }
}

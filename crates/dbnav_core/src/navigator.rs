use crate::app_config::ClientConfig;
use crate::child_resolver::ChildResolver;
use crate::config_actions::ConfigActions;
use crate::dispatcher::Dispatcher;
use crate::error::GatewayError;
use crate::expansion::ExpansionController;
use crate::gateway::MetadataGateway;
use crate::http_gateway::HttpGateway;
use crate::move_coordinator::MoveCoordinator;
use crate::schema_registry::SchemaRegistry;
use crate::tree_cache::TreeCache;
use std::sync::Arc;

/// One cache, one schema registry and the components that share them.
pub struct Navigator {
    pub cache: Arc<TreeCache>,
    pub schemas: Arc<SchemaRegistry>,
    pub resolver: Arc<ChildResolver>,
    pub expansion: Arc<ExpansionController>,
    pub dispatcher: Dispatcher,
    pub moves: MoveCoordinator,
    pub config: ConfigActions,
}

impl Navigator {
    pub fn new(gateway: Arc<dyn MetadataGateway>, schemas: Arc<SchemaRegistry>) -> Self {
        let cache = Arc::new(TreeCache::new());
        let resolver = Arc::new(ChildResolver::new(schemas.clone(), gateway.clone()));
        let expansion = Arc::new(ExpansionController::new(cache.clone(), resolver.clone()));
        let dispatcher = Dispatcher::new(
            cache.clone(),
            resolver.clone(),
            expansion.clone(),
            gateway.clone(),
        );
        let moves = MoveCoordinator::new(cache.clone(), gateway.clone());
        let config = ConfigActions::new(cache.clone(), gateway);

        Self {
            cache,
            schemas,
            resolver,
            expansion,
            dispatcher,
            moves,
            config,
        }
    }

    /// Wires an HTTP gateway and the schema sources named by `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, GatewayError> {
        let gateway = Arc::new(HttpGateway::new(config)?);
        let schemas = Arc::new(SchemaRegistry::with_defaults(config.schema_dir.clone()));
        Ok(Self::new(gateway, schemas))
    }
}

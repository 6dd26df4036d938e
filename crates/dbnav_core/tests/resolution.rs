use dbnav_core::{
    ChildResolver, DbType, Node, NodeType, ResolutionError, SchemaLoadError, SchemaRegistry,
    SchemaSource,
};
use dbnav_test_support::fixtures::{
    StaticSchemaSource, alias_schema_registry, bundled_schema_registry, connected,
    postgres_connection, record, table_node,
};
use dbnav_test_support::FakeGateway;
use std::sync::Arc;

fn resolver(gateway: &FakeGateway, schemas: Arc<SchemaRegistry>) -> ChildResolver {
    ChildResolver::new(schemas, gateway.clone().as_gateway_arc())
}

async fn child(resolver: &ChildResolver, parent: &Node, id: &str) -> Node {
    resolver
        .resolve_children(parent)
        .await
        .expect("children resolve")
        .into_iter()
        .find(|c| c.id == id)
        .unwrap_or_else(|| panic!("{} not among children of {}", id, parent.id))
}

#[tokio::test]
async fn aliases_of_one_descriptor_stay_distinct() {
    let gateway = FakeGateway::new();
    let resolver = resolver(&gateway, alias_schema_registry());
    let conn = connected(postgres_connection("c1"));

    let catalog = child(&resolver, &conn, "c1::catalog").await;
    let groups = resolver
        .resolve_children(&catalog)
        .await
        .expect("catalog fans out");

    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    let ids: Vec<&str> = groups.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(names, vec!["Hot Tables", "Cold Tables"]);
    assert_eq!(
        ids,
        vec!["c1::catalog::Hot_Tables", "c1::catalog::Cold_Tables"]
    );

    let configs: Vec<_> = groups
        .iter()
        .map(|g| g.config.clone().expect("synthesized config"))
        .collect();
    assert_eq!(configs[0], configs[1]);
    assert_eq!(configs[0].key.as_deref(), Some("tables"));
    let handlers: Vec<&str> = configs[0]
        .actions
        .menu
        .iter()
        .filter_map(|e| e.as_action())
        .map(|a| a.handler.as_str())
        .collect();
    assert_eq!(handlers, vec!["refreshNode", "createNewTable"]);

    assert!(groups.iter().all(|g| g.is_virtual && g.connected));
    assert_eq!(gateway.stats().total_calls(), 0);
}

#[tokio::test]
async fn alias_groups_fetch_their_own_path() {
    let gateway = FakeGateway::new()
        .with_children("c1::catalog::Cold_Tables", vec![record("events_2019", NodeType::Table)]);
    let resolver = resolver(&gateway, alias_schema_registry());
    let conn = connected(postgres_connection("c1"));
    let catalog = child(&resolver, &conn, "c1::catalog").await;
    let cold = child(&resolver, &catalog, "c1::catalog::Cold_Tables").await;

    let tables = resolver.resolve_children(&cold).await.expect("tables resolve");

    assert_eq!(gateway.stats().children_requests, vec!["c1::catalog::Cold_Tables"]);
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].id, "c1::catalog::Cold_Tables::events_2019");
    assert_eq!(
        tables[0].config.as_ref().and_then(|c| c.key.as_deref()),
        Some("table")
    );
}

#[tokio::test]
async fn concrete_nodes_hand_down_object_context() {
    let gateway = FakeGateway::new()
        .with_children("c1::databases", vec![record("app", NodeType::Database)])
        .with_children(
            "c1::databases::app::Schemas",
            vec![record("sales", NodeType::Schema)],
        );
    let resolver = resolver(&gateway, bundled_schema_registry());
    let conn = connected(postgres_connection("c1"));

    let databases = child(&resolver, &conn, "c1::databases").await;
    let app = child(&resolver, &databases, "c1::databases::app").await;
    let schemas = child(&resolver, &app, "c1::databases::app::Schemas").await;
    let sales = child(&resolver, &schemas, "c1::databases::app::Schemas::sales").await;
    let tables = child(&resolver, &sales, "c1::databases::app::Schemas::sales::Tables").await;

    assert_eq!(app.effective_type(), "database");
    assert_eq!(schemas.db_name.as_deref(), Some("app"));
    assert_eq!(sales.db_name.as_deref(), Some("app"));
    assert_eq!(tables.db_name.as_deref(), Some("app"));
    assert_eq!(tables.schema_name.as_deref(), Some("sales"));
    assert!(tables.is_virtual);
}

#[tokio::test]
async fn leaf_descriptors_have_no_children() {
    let gateway = FakeGateway::new();
    let resolver = resolver(&gateway, alias_schema_registry());
    let mut leaf = Node::new("c1::catalog::Hot_Tables::t", "t", NodeType::Table);
    leaf.db_type = Some(DbType::Postgresql);
    leaf.connected = true;
    leaf.is_virtual = true;
    leaf.config = Some(dbnav_core::NodeConfig {
        key: Some("table".to_string()),
        ..Default::default()
    });

    let children = resolver.resolve_children(&leaf).await.expect("leaf resolves");

    assert!(children.is_empty());
    assert_eq!(gateway.stats().total_calls(), 0);
}

#[tokio::test]
async fn concrete_leaf_nodes_never_reach_the_backend() {
    let gateway = FakeGateway::new();
    let resolver = resolver(&gateway, alias_schema_registry());
    let table = table_node("c1", "users");
    assert!(!table.is_virtual);

    let children = resolver.resolve_children(&table).await.expect("leaf resolves");

    assert!(children.is_empty());
    assert!(gateway.stats().children_requests.is_empty());
    assert_eq!(gateway.stats().total_calls(), 0);
}

#[tokio::test]
async fn resolution_failures_are_typed() {
    let gateway = FakeGateway::new();
    let resolver = resolver(&gateway, bundled_schema_registry());

    let offline = postgres_connection("c1");
    assert_eq!(
        resolver.resolve_children(&offline).await,
        Err(ResolutionError::NotConnected("c1".to_string()))
    );

    let redis = connected(Node::connection("r1", "cache", DbType::Redis));
    assert!(matches!(
        resolver.resolve_children(&redis).await,
        Err(ResolutionError::Schema(SchemaLoadError::Unsupported(_)))
    ));

    let mut orphan = Node::new("x::databases", "Databases", NodeType::from("databases"));
    orphan.connected = true;
    orphan.is_virtual = true;
    assert_eq!(
        resolver.resolve_children(&orphan).await,
        Err(ResolutionError::MissingDbType("x::databases".to_string()))
    );

    let mut stray = Node::new("c1::nowhere", "Nowhere", NodeType::from("nowhere"));
    stray.db_type = Some(DbType::Postgresql);
    stray.connected = true;
    stray.is_virtual = true;
    assert!(matches!(
        resolver.resolve_children(&stray).await,
        Err(ResolutionError::UnknownDescriptor { .. })
    ));
}

#[tokio::test]
async fn folders_yield_their_attachments() {
    let gateway = FakeGateway::new();
    let resolver = resolver(&gateway, bundled_schema_registry());
    let folder = Node::folder("f1", "Work")
        .with_children(vec![postgres_connection("c1"), Node::folder("f2", "Nested")]);

    let children = resolver.resolve_children(&folder).await.expect("folder resolves");

    let ids: Vec<&str> = children.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "f2"]);
    assert_eq!(gateway.stats().total_calls(), 0);
}

#[tokio::test]
async fn directory_schemas_override_bundled_ones() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("tree-postgresql.yml"),
        "tree:\n  - key: only\n    label: Only\n    type: only\n    virtual: true\n",
    )
    .expect("write schema");

    let gateway = FakeGateway::new();
    let schemas = Arc::new(SchemaRegistry::with_defaults(Some(dir.path().to_path_buf())));
    let resolver = resolver(&gateway, schemas);

    let children = resolver
        .resolve_children(&connected(postgres_connection("c1")))
        .await
        .expect("connection resolves");

    let ids: Vec<&str> = children.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1::only"]);
}

#[tokio::test]
async fn malformed_schemas_are_rejected() {
    let source = StaticSchemaSource::new().with_document(
        "mysql",
        "tree:\n  - key: a\n    type: a\n    nextLevel: b\n    children:\n      B: b\n  - key: b\n    type: b\n",
    );
    assert_eq!(source.name(), "static");
    let schemas = SchemaRegistry::new(vec![Arc::new(source)]);

    let result = schemas.get_schema(&DbType::Mysql).await;

    assert!(matches!(result, Err(SchemaLoadError::Malformed { .. })));
    assert!(schemas.cached(&DbType::Mysql).is_none());
}

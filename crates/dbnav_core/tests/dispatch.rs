use dbnav_core::{
    DbType, DeletionKind, DispatchContext, DispatchOutcome, ModalRequest, Node, NodeConfig,
    NodeType, NoticeLevel, ObjectDeletion, SchemaRegistry, ViewIntent, object_deletion,
};
use dbnav_test_support::fixtures::{
    StaticSchemaSource, alias_schema_registry, bundled_schema_registry, connected, navigator,
    postgres_connection, record, sample_forest, table_node,
};
use dbnav_test_support::{FakeChildren, FakeGateway, ScriptedInteraction};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn forest_with_table() -> Vec<Node> {
    let table = table_node("c1", "users");
    let mut conn = connected(postgres_connection("c1"));
    conn.expanded = true;
    vec![conn.with_children(vec![table])]
}

#[tokio::test]
async fn connect_and_expand_builds_top_level_groups() {
    let gateway = FakeGateway::new();
    let nav = navigator(&gateway, bundled_schema_registry(), vec![postgres_connection("c1")]);
    let ui = ScriptedInteraction::new();
    let node = nav.cache.find_node("c1").expect("connection in cache");

    let outcome = nav
        .dispatcher
        .dispatch("connectAndExpand", &node, &DispatchContext::new(&ui))
        .await;

    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(gateway.stats().connection_tests, vec!["c1"]);
    assert!(gateway.stats().children_requests.is_empty());

    let node = nav.cache.find_node("c1").expect("connection in cache");
    assert!(node.connected);
    assert!(node.expanded);

    let schema = nav
        .schemas
        .get_schema(&DbType::Postgresql)
        .await
        .expect("bundled postgresql schema");
    let expected: Vec<String> = schema
        .top_level()
        .iter()
        .map(|d| format!("c1::{}", d.key))
        .collect();
    let ids: Vec<String> = node.child_nodes().iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, expected);
    assert_eq!(ids, vec!["c1::databases", "c1::roles"]);

    for child in node.child_nodes() {
        assert!(child.is_virtual);
        assert!(child.connected);
        assert_eq!(child.parent_id.as_deref(), Some("c1"));
        assert_eq!(child.db_type, Some(DbType::Postgresql));
    }
}

#[tokio::test]
async fn connect_failure_leaves_connection_untouched() {
    let gateway = FakeGateway::new().with_connection_error("c1", "password authentication failed");
    let nav = navigator(&gateway, bundled_schema_registry(), vec![postgres_connection("c1")]);
    let ui = ScriptedInteraction::new();
    let node = nav.cache.find_node("c1").expect("connection in cache");

    let outcome = nav
        .dispatcher
        .dispatch("connectAndExpand", &node, &DispatchContext::new(&ui))
        .await;

    assert!(matches!(outcome, DispatchOutcome::Failed(_)));
    let node = nav.cache.find_node("c1").expect("connection in cache");
    assert!(!node.connected);
    assert!(!node.is_loaded());

    let errors = ui.notices_at(NoticeLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("password authentication failed"));
}

#[tokio::test]
async fn connect_without_schema_stays_collapsed() {
    let gateway = FakeGateway::new();
    let redis = Node::connection("r1", "cache", DbType::Redis);
    let nav = navigator(&gateway, bundled_schema_registry(), vec![redis]);
    let ui = ScriptedInteraction::new();
    let node = nav.cache.find_node("r1").expect("connection in cache");

    let outcome = nav
        .dispatcher
        .dispatch("connectAndExpand", &node, &DispatchContext::new(&ui))
        .await;

    assert!(matches!(outcome, DispatchOutcome::Failed(_)));
    let node = nav.cache.find_node("r1").expect("connection in cache");
    assert!(node.connected);
    assert!(!node.expanded);
    assert!(!node.is_loaded());
}

#[tokio::test]
async fn expansion_setter_sees_connect_and_disconnect() {
    let gateway = FakeGateway::new();
    let nav = navigator(&gateway, bundled_schema_registry(), vec![postgres_connection("c1")]);
    let ui = ScriptedInteraction::new();
    let seen = Mutex::new(Vec::new());
    let setter = |id: &str, expanded: bool| {
        seen.lock().unwrap().push((id.to_string(), expanded));
    };
    let ctx = DispatchContext::new(&ui).with_expansion_setter(&setter);

    let node = nav.cache.find_node("c1").expect("connection in cache");
    nav.dispatcher.dispatch("connectAndExpand", &node, &ctx).await;
    let node = nav.cache.find_node("c1").expect("connection in cache");
    nav.dispatcher.dispatch("disconnectDatabase", &node, &ctx).await;

    let node = nav.cache.find_node("c1").expect("connection in cache");
    assert!(!node.connected);
    assert!(!node.expanded);
    assert!(!node.is_loaded());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("c1".to_string(), true), ("c1".to_string(), false)]
    );
}

#[tokio::test]
async fn declined_delete_makes_no_backend_call() {
    let gateway = FakeGateway::new();
    let nav = navigator(&gateway, alias_schema_registry(), forest_with_table());
    let ui = ScriptedInteraction::declining();
    let before = nav.cache.snapshot();
    let table = nav
        .cache
        .find_node("c1::catalog::Hot_Tables::users")
        .expect("table in cache");

    let outcome = nav
        .dispatcher
        .dispatch("deleteTable", &table, &DispatchContext::new(&ui))
        .await;

    assert_eq!(outcome, DispatchOutcome::Cancelled);
    assert_eq!(gateway.stats().total_calls(), 0);
    assert_eq!(*nav.cache.snapshot(), *before);

    let confirms = ui.confirms();
    assert_eq!(confirms.len(), 1);
    assert!(confirms[0].danger);
}

#[tokio::test]
async fn accepted_delete_calls_backend_then_drops_node() {
    let gateway = FakeGateway::new();
    let nav = navigator(&gateway, alias_schema_registry(), forest_with_table());
    let ui = ScriptedInteraction::accepting(1);
    let table = nav
        .cache
        .find_node("c1::catalog::Hot_Tables::users")
        .expect("table in cache");

    let outcome = nav
        .dispatcher
        .dispatch("deleteTable", &table, &DispatchContext::new(&ui))
        .await;

    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(
        gateway.stats().object_deletions,
        vec![ObjectDeletion::Object {
            connection_id: "c1".to_string(),
            db_name: "app".to_string(),
            schema_name: "public".to_string(),
            object_name: "users".to_string(),
            object_type: "table".to_string(),
        }]
    );
    assert!(nav.cache.find_node(&table.id).is_none());
    assert_eq!(ui.notices_at(NoticeLevel::Success).len(), 1);
}

#[tokio::test]
async fn failed_delete_keeps_node() {
    let gateway = FakeGateway::new()
        .with_failing_writes(dbnav_core::GatewayError::status(409, "table is in use"));
    let nav = navigator(&gateway, alias_schema_registry(), forest_with_table());
    let ui = ScriptedInteraction::accepting(1);
    let table = nav
        .cache
        .find_node("c1::catalog::Hot_Tables::users")
        .expect("table in cache");

    let outcome = nav
        .dispatcher
        .dispatch("deleteTable", &table, &DispatchContext::new(&ui))
        .await;

    assert!(matches!(outcome, DispatchOutcome::Failed(_)));
    assert!(nav.cache.find_node(&table.id).is_some());
    assert!(ui.notices_at(NoticeLevel::Error)[0].contains("table is in use"));
}

#[tokio::test]
async fn table_falls_back_to_generic_handlers() {
    let gateway = FakeGateway::new();
    let nav = navigator(&gateway, alias_schema_registry(), forest_with_table());
    let ui = ScriptedInteraction::new();
    let table = nav
        .cache
        .find_node("c1::catalog::Hot_Tables::users")
        .expect("table in cache");

    let outcome = nav
        .dispatcher
        .dispatch("showProperties", &table, &DispatchContext::new(&ui))
        .await;

    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(ui.views(), vec![(ViewIntent::Properties, table.id.clone())]);
    assert!(ui.notices().is_empty());
}

#[tokio::test]
async fn unknown_handler_is_reported_not_raised() {
    let gateway = FakeGateway::new();
    let nav = navigator(&gateway, alias_schema_registry(), forest_with_table());
    let ui = ScriptedInteraction::new();
    let table = nav
        .cache
        .find_node("c1::catalog::Hot_Tables::users")
        .expect("table in cache");

    let outcome = nav
        .dispatcher
        .dispatch("vacuumTable", &table, &DispatchContext::new(&ui))
        .await;

    assert_eq!(
        outcome,
        DispatchOutcome::Unimplemented("vacuumTable".to_string())
    );
    assert_eq!(ui.notices_at(NoticeLevel::Info).len(), 1);
    assert_eq!(gateway.stats().total_calls(), 0);
}

#[tokio::test]
async fn folder_handlers_open_dialogs() {
    let gateway = FakeGateway::new();
    let nav = navigator(&gateway, bundled_schema_registry(), sample_forest());
    let ui = ScriptedInteraction::new();
    let folder = nav.cache.find_node("f-work").expect("folder in cache");
    let ctx = DispatchContext::new(&ui);

    nav.dispatcher.dispatch("openNewConnection", &folder, &ctx).await;
    nav.dispatcher.dispatch("openRenameFolder", &folder, &ctx).await;
    let outcome = nav.dispatcher.dispatch("previewTable", &folder, &ctx).await;

    assert_eq!(
        ui.modals(),
        vec![
            ModalRequest::NewConnection {
                parent_id: Some("f-work".to_string())
            },
            ModalRequest::RenameFolder {
                folder_id: "f-work".to_string(),
                current_name: "Work".to_string()
            },
        ]
    );
    assert_eq!(
        outcome,
        DispatchOutcome::Unimplemented("previewTable".to_string())
    );
}

#[tokio::test]
async fn refresh_folder_takes_only_that_subtree() {
    let server_side = vec![
        Node::folder("f-work", "Work").with_children(vec![
            postgres_connection("c1").with_parent("f-work"),
            postgres_connection("c3").with_parent("f-work"),
        ]),
        Node::folder("f-archive", "Archive")
            .with_children(vec![postgres_connection("c9").with_parent("f-archive")]),
    ];
    let gateway = FakeGateway::new().with_tree(server_side);
    let nav = navigator(&gateway, bundled_schema_registry(), sample_forest());
    let ui = ScriptedInteraction::new();
    let folder = nav.cache.find_node("f-work").expect("folder in cache");

    let outcome = nav
        .dispatcher
        .dispatch("refreshFolder", &folder, &DispatchContext::new(&ui))
        .await;

    assert_eq!(outcome, DispatchOutcome::Completed);
    let folder = nav.cache.find_node("f-work").expect("folder in cache");
    let ids: Vec<&str> = folder.child_nodes().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c3"]);
    assert!(
        nav.cache
            .find_node("f-archive")
            .expect("folder in cache")
            .child_nodes()
            .is_empty()
    );
}

#[tokio::test]
async fn overlapping_refreshes_keep_the_last_commit() {
    let mut schema = Node::new("c1::public", "public", NodeType::Schema).with_parent("c1");
    schema.db_type = Some(DbType::Postgresql);
    schema.connected = true;
    let conn = connected(postgres_connection("c1")).with_children(vec![schema]);

    let gateway = FakeGateway::new();
    gateway.queue_children(
        "c1::public",
        FakeChildren::Nodes(vec![record("slow", NodeType::Table)]),
        Duration::from_millis(40),
    );
    gateway.queue_children(
        "c1::public",
        FakeChildren::Nodes(vec![record("fast", NodeType::Table)]),
        Duration::ZERO,
    );
    let nav = navigator(&gateway, bundled_schema_registry(), vec![conn]);
    let ui = ScriptedInteraction::new();
    let ctx = DispatchContext::new(&ui);
    let node = nav.cache.find_node("c1::public").expect("schema in cache");

    let mut events = nav.cache.subscribe();
    let (first, second) = tokio::join!(
        nav.dispatcher.dispatch("refreshSchema", &node, &ctx),
        nav.dispatcher.dispatch("refreshSchema", &node, &ctx),
    );

    assert_eq!(first, DispatchOutcome::Completed);
    assert_eq!(second, DispatchOutcome::Completed);
    assert_eq!(gateway.stats().children_requests.len(), 2);

    // Both commits land; whichever ran last defines the children.
    let mut last_commit = None;
    while let Ok(event) = events.try_recv() {
        last_commit = Some(event.forest);
    }
    let last_commit = last_commit.expect("at least one commit");
    let committed = last_commit[0]
        .find_descendant("c1::public")
        .expect("schema in committed forest")
        .clone();
    let current = nav.cache.find_node("c1::public").expect("schema in cache");
    assert_eq!(*current, *committed);
    assert_eq!(current.child_nodes()[0].id, "c1::public::slow");
}

#[tokio::test]
async fn menus_prefer_schema_then_node_then_builtin() {
    let gateway = FakeGateway::new();
    let nav = navigator(&gateway, alias_schema_registry(), forest_with_table());
    let table = nav
        .cache
        .find_node("c1::catalog::Hot_Tables::users")
        .expect("table in cache");

    let menu = nav.dispatcher.list_actions(&table).await;
    let handlers: Vec<&str> = menu.actions().map(|a| a.handler.as_str()).collect();
    assert_eq!(handlers, vec!["previewTable", "deleteTable"]);
    assert_eq!(
        nav.dispatcher
            .primary_action(&table)
            .await
            .map(|a| a.handler),
        Some("previewTable".to_string())
    );

    let mut custom = Node::new("c1::x::seq", "seq", NodeType::from("sequence"));
    custom.db_type = Some(DbType::Postgresql);
    custom.config = Some(NodeConfig {
        actions: dbnav_core::ActionSet {
            primary: None,
            menu: vec![dbnav_core::ActionItem::new("Properties", "showProperties").into()],
        },
        ..NodeConfig::default()
    });
    let menu = nav.dispatcher.list_actions(&custom).await;
    assert_eq!(menu.actions().count(), 1);

    let conn = postgres_connection("c2");
    let menu = nav.dispatcher.list_actions(&conn).await;
    assert!(menu.find("connectAndExpand").is_some());
    assert!(menu.find("disconnectDatabase").is_none());
}

#[tokio::test]
async fn menus_fall_back_to_builtin_when_the_schema_is_unusable() {
    let broken = StaticSchemaSource::new()
        .with_document("mysql", "tree:\n  - key: a\n    type: a\n    nextLevel: missing\n");
    let schemas = Arc::new(SchemaRegistry::new(vec![Arc::new(broken)]));
    let gateway = FakeGateway::new();
    let nav = navigator(&gateway, schemas, Vec::new());

    let mut table = table_node("m1", "orders");
    table.db_type = Some(DbType::Mysql);
    let menu = nav.dispatcher.list_actions(&table).await;
    let handlers: Vec<&str> = menu.actions().map(|a| a.handler.as_str()).collect();
    assert_eq!(
        handlers,
        vec![
            "previewTable",
            "editTableStructure",
            "generateTableSQL",
            "exportTableData",
            "deleteTable",
            "showProperties",
        ]
    );
    assert!(nav.schemas.cached(&DbType::Mysql).is_none());

    let redis = Node::connection("r1", "cache", DbType::Redis);
    let menu = nav.dispatcher.list_actions(&redis).await;
    assert!(menu.find("connectAndExpand").is_some());
    assert_eq!(
        nav.dispatcher
            .primary_action(&redis)
            .await
            .map(|a| a.handler),
        Some("connectAndExpand".to_string())
    );
    assert_eq!(gateway.stats().total_calls(), 0);
}

#[tokio::test]
async fn connecting_twice_skips_the_second_test() {
    let gateway = FakeGateway::new();
    let nav = navigator(&gateway, bundled_schema_registry(), vec![postgres_connection("c1")]);
    let ui = ScriptedInteraction::new();
    let ctx = DispatchContext::new(&ui);
    let node = nav.cache.find_node("c1").expect("connection in cache");

    nav.dispatcher.dispatch("connectAndExpand", &node, &ctx).await;
    let before = nav.cache.snapshot();
    let outcome = nav.dispatcher.dispatch("connectAndExpand", &node, &ctx).await;

    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(gateway.stats().connection_tests, vec!["c1"]);
    assert!(Arc::ptr_eq(&before, &nav.cache.snapshot()));
    assert!(ui.notices_at(NoticeLevel::Info)[0].contains("Already connected"));
}

#[test]
fn deletion_payload_defaults_missing_context() {
    let mut view = Node::new("c7::x::orders_v", "orders_v", NodeType::View);
    view.db_type = Some(DbType::Postgresql);

    assert_eq!(
        object_deletion(DeletionKind::Object, &view),
        Some(ObjectDeletion::Object {
            connection_id: "c7".to_string(),
            db_name: "default".to_string(),
            schema_name: "public".to_string(),
            object_name: "orders_v".to_string(),
            object_type: "view".to_string(),
        })
    );
    assert_eq!(object_deletion(DeletionKind::Folder, &view), None);
}

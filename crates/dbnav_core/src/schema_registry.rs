use crate::error::SchemaLoadError;
use crate::node::DbType;
use crate::sync::mutex_lock;
use crate::tree_schema::{TreeSchema, bundled_document};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Database kinds that have a tree schema at all. Anything else is rejected
/// without touching a source.
pub const SUPPORTED_SCHEMA_KEYS: &[&str] =
    &["mysql", "postgresql", "oracle", "sqlserver", "mongodb"];

/// Somewhere a `tree-<key>.yml` document can come from.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when this source simply has no document for the key.
    async fn load(&self, schema_key: &str) -> Result<Option<String>, SchemaLoadError>;
}

/// Documents compiled into the crate.
pub struct BundledSchemaSource;

#[async_trait]
impl SchemaSource for BundledSchemaSource {
    fn name(&self) -> &str {
        "bundled"
    }

    async fn load(&self, schema_key: &str) -> Result<Option<String>, SchemaLoadError> {
        Ok(bundled_document(schema_key).map(str::to_string))
    }
}

/// Documents read from a directory on disk (`<dir>/tree-<key>.yml`).
pub struct DirectorySchemaSource {
    dir: PathBuf,
    label: String,
}

impl DirectorySchemaSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let label = dir.display().to_string();
        Self { dir, label }
    }
}

#[async_trait]
impl SchemaSource for DirectorySchemaSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn load(&self, schema_key: &str) -> Result<Option<String>, SchemaLoadError> {
        let path = self.dir.join(format!("tree-{}.yml", schema_key));

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SchemaLoadError::Unreachable {
                db_type: schema_key.to_string(),
                reason: format!("{}: {}", path.display(), e),
            }),
        }
    }
}

type SchemaResult = Result<Arc<TreeSchema>, SchemaLoadError>;
type SharedLoad = Shared<BoxFuture<'static, SchemaResult>>;

enum Slot {
    Ready(Arc<TreeSchema>),
    Loading(SharedLoad),
}

/// Loads and memoizes tree schemas per database kind.
///
/// Concurrent requests for the same kind share one in-flight load. A failed
/// load is forgotten so that the next user action retries it.
pub struct SchemaRegistry {
    sources: Arc<[Arc<dyn SchemaSource>]>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl SchemaRegistry {
    /// Sources are consulted in order; the first that has a document wins.
    pub fn new(sources: Vec<Arc<dyn SchemaSource>>) -> Self {
        Self {
            sources: sources.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// An optional directory overriding the bundled documents.
    pub fn with_defaults(schema_dir: Option<PathBuf>) -> Self {
        let mut sources: Vec<Arc<dyn SchemaSource>> = Vec::new();
        if let Some(dir) = schema_dir {
            sources.push(Arc::new(DirectorySchemaSource::new(dir)));
        }
        sources.push(Arc::new(BundledSchemaSource));
        Self::new(sources)
    }

    pub async fn get_schema(&self, db_type: &DbType) -> SchemaResult {
        let key = db_type.schema_key();
        if !SUPPORTED_SCHEMA_KEYS.contains(&key.as_str()) {
            return Err(SchemaLoadError::Unsupported(db_type.to_string()));
        }

        let load = {
            let mut slots = mutex_lock(&self.slots);
            match slots.get(&key) {
                Some(Slot::Ready(schema)) => return Ok(schema.clone()),
                Some(Slot::Loading(load)) => {
                    debug!("Joining in-flight schema load for {}", key);
                    load.clone()
                }
                None => {
                    let load = load_from(self.sources.clone(), key.clone())
                        .boxed()
                        .shared();
                    slots.insert(key.clone(), Slot::Loading(load.clone()));
                    load
                }
            }
        };

        let result = load.clone().await;

        let mut slots = mutex_lock(&self.slots);
        let still_ours = matches!(
            slots.get(&key),
            Some(Slot::Loading(current)) if current.ptr_eq(&load)
        );
        match &result {
            Ok(schema) => {
                if still_ours {
                    slots.insert(key, Slot::Ready(schema.clone()));
                }
            }
            Err(e) => {
                if still_ours {
                    slots.remove(&key);
                    warn!("Tree schema load failed, falling back to built-in menus: {}", e);
                }
            }
        }

        result
    }

    /// The schema if it has already been loaded; never starts a load.
    pub fn cached(&self, db_type: &DbType) -> Option<Arc<TreeSchema>> {
        match mutex_lock(&self.slots).get(&db_type.schema_key()) {
            Some(Slot::Ready(schema)) => Some(schema.clone()),
            _ => None,
        }
    }
}

async fn load_from(sources: Arc<[Arc<dyn SchemaSource>]>, key: String) -> SchemaResult {
    for source in sources.iter() {
        if let Some(text) = source.load(&key).await? {
            let schema = TreeSchema::parse(&key, &text)?;
            info!("Loaded tree schema {} from {}", key, source.name());
            return Ok(Arc::new(schema));
        }
    }

    Err(SchemaLoadError::Unreachable {
        reason: format!("no tree-{}.yml in any schema source", key),
        db_type: key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        document: Option<&'static str>,
        loads: AtomicUsize,
    }

    impl CountingSource {
        fn new(document: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                document,
                loads: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SchemaSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        async fn load(&self, _schema_key: &str) -> Result<Option<String>, SchemaLoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(self.document.map(str::to_string))
        }
    }

    const DOC: &str = "tree:\n  - key: databases\n    type: databases\n    virtual: true\n";

    #[tokio::test]
    async fn test_concurrent_loads_are_single_flight() {
        let source = CountingSource::new(Some(DOC));
        let registry = SchemaRegistry::new(vec![source.clone() as Arc<dyn SchemaSource>]);

        let (a, b) = tokio::join!(
            registry.get_schema(&DbType::Postgresql),
            registry.get_schema(&DbType::Postgresql)
        );

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        registry.get_schema(&DbType::Postgresql).await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert!(registry.cached(&DbType::Postgresql).is_some());
    }

    #[tokio::test]
    async fn test_unsupported_kind_never_loads() {
        let source = CountingSource::new(Some(DOC));
        let registry = SchemaRegistry::new(vec![source.clone() as Arc<dyn SchemaSource>]);

        let err = registry.get_schema(&DbType::Redis).await.unwrap_err();
        assert_eq!(err, SchemaLoadError::Unsupported("REDIS".into()));
        assert_eq!(source.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let source = CountingSource::new(None);
        let registry = SchemaRegistry::new(vec![source.clone() as Arc<dyn SchemaSource>]);

        let err = registry.get_schema(&DbType::Oracle).await.unwrap_err();
        assert!(matches!(err, SchemaLoadError::Unreachable { .. }));
        assert!(registry.get_schema(&DbType::Oracle).await.is_err());
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_source_with_document_wins() {
        let empty = CountingSource::new(None);
        let registry = SchemaRegistry::new(vec![
            empty.clone() as Arc<dyn SchemaSource>,
            Arc::new(BundledSchemaSource),
        ]);

        let schema = registry.get_schema(&DbType::Mysql).await.unwrap();
        assert!(schema.descriptor("databases").is_some());
        assert_eq!(empty.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_falls_through_to_bundled() {
        let registry = SchemaRegistry::with_defaults(Some(PathBuf::from(
            "/nonexistent/dbnav-schemas",
        )));
        assert!(registry.get_schema(&DbType::Postgresql).await.is_ok());
    }
}

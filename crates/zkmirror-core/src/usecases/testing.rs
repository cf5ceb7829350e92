//! In-memory port doubles shared by the use case tests

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;

use crate::domain::newtypes::NodePath;
use crate::domain::node::{Acl, CreateMode, NodeStat, StatusCode};
use crate::ports::{DirEntry, EntryKind, FileSystemState, ILocalFileSystem, ICoordinationStore, StoreResult};

pub fn node(path: &str) -> NodePath {
    NodePath::new(path.to_string()).unwrap()
}

// ============================================================================
// FakeStore
// ============================================================================

/// Versioned namespace with a root node and per-path failure injection
pub struct FakeStore {
    nodes: Mutex<BTreeMap<String, (Vec<u8>, i32)>>,
    failures: Mutex<HashMap<String, StatusCode>>,
    pub writes: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), (Vec::new(), 0));
        Self {
            nodes: Mutex::new(nodes),
            failures: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn with_nodes(paths: &[&str]) -> Self {
        let store = Self::new();
        for path in paths {
            store
                .nodes
                .lock()
                .unwrap()
                .insert((*path).to_string(), (Vec::new(), 0));
        }
        store
    }

    /// Every call touching `path` answers with `code`
    pub fn fail_on(&self, path: &str, code: StatusCode) {
        self.failures.lock().unwrap().insert(path.to_string(), code);
    }

    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.nodes.lock().unwrap().get(path).map(|(data, _)| data.clone())
    }

    pub fn version(&self, path: &str) -> Option<i32> {
        self.nodes.lock().unwrap().get(path).map(|(_, version)| *version)
    }

    pub fn paths(&self) -> Vec<String> {
        self.nodes.lock().unwrap().keys().cloned().collect()
    }

    fn injected(&self, path: &NodePath) -> Option<StatusCode> {
        self.failures.lock().unwrap().get(path.as_str()).copied()
    }
}

#[async_trait::async_trait]
impl ICoordinationStore for FakeStore {
    async fn exists(&self, path: &NodePath) -> StoreResult<NodeStat> {
        tokio::task::yield_now().await;
        if let Some(code) = self.injected(path) {
            return Err(code);
        }
        self.nodes
            .lock()
            .unwrap()
            .get(path.as_str())
            .map(|(data, version)| NodeStat {
                version: *version,
                data_length: data.len(),
            })
            .ok_or(StatusCode::NoNode)
    }

    async fn create(
        &self,
        path: &NodePath,
        data: &[u8],
        _acl: Acl,
        _mode: CreateMode,
    ) -> StoreResult<NodePath> {
        tokio::task::yield_now().await;
        if let Some(code) = self.injected(path) {
            return Err(code);
        }
        let mut nodes = self.nodes.lock().unwrap();
        let parent = path.parent().ok_or(StatusCode::NodeExists)?;
        if !nodes.contains_key(parent.as_str()) {
            return Err(StatusCode::NoNode);
        }
        if nodes.contains_key(path.as_str()) {
            return Err(StatusCode::NodeExists);
        }
        nodes.insert(path.to_string(), (data.to_vec(), 0));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(path.clone())
    }

    async fn set_data(
        &self,
        path: &NodePath,
        data: &[u8],
        expected_version: i32,
    ) -> StoreResult<NodeStat> {
        tokio::task::yield_now().await;
        if let Some(code) = self.injected(path) {
            return Err(code);
        }
        let mut nodes = self.nodes.lock().unwrap();
        let (stored, version) = nodes.get_mut(path.as_str()).ok_or(StatusCode::NoNode)?;
        if *version != expected_version {
            return Err(StatusCode::BadVersion);
        }
        *stored = data.to_vec();
        *version += 1;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(NodeStat {
            version: *version,
            data_length: stored.len(),
        })
    }
}

// ============================================================================
// FakeFileSystem
// ============================================================================

#[derive(Clone)]
enum FakeEntry {
    File(Vec<u8>),
    Directory,
    Special(EntryKind),
}

/// Path-keyed local tree with unreadable and unlistable markers
#[derive(Default)]
pub struct FakeFileSystem {
    entries: Mutex<BTreeMap<PathBuf, FakeEntry>>,
    broken: Mutex<Vec<PathBuf>>,
    aliases: Mutex<HashMap<PathBuf, PathBuf>>,
    read_scopes: Mutex<HashMap<PathBuf, Vec<&'static str>>>,
}

impl FakeFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(self, path: &str) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), FakeEntry::Directory);
        self
    }

    pub fn file(self, path: &str, data: &[u8]) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), FakeEntry::File(data.to_vec()));
        self
    }

    pub fn special(self, path: &str, kind: EntryKind) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), FakeEntry::Special(kind));
        self
    }

    /// Reads and listings of `path` fail with an I/O error
    pub fn broken(self, path: &str) -> Self {
        self.broken.lock().unwrap().push(PathBuf::from(path));
        self
    }

    /// `path` canonicalizes to `target`, as a followed link would
    pub fn alias(self, path: &str, target: &str) -> Self {
        self.aliases
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), PathBuf::from(target));
        self
    }

    /// Names of the spans entered when `path` was read, innermost first
    pub fn read_scope(&self, path: &str) -> Option<Vec<&'static str>> {
        self.read_scopes.lock().unwrap().get(Path::new(path)).cloned()
    }

    fn check(&self, path: &Path) -> anyhow::Result<()> {
        if self.broken.lock().unwrap().iter().any(|p| p == path) {
            return Err(anyhow!("Permission denied"));
        }
        Ok(())
    }

    fn kind_of(entry: &FakeEntry) -> EntryKind {
        match entry {
            FakeEntry::File(_) => EntryKind::File,
            FakeEntry::Directory => EntryKind::Directory,
            FakeEntry::Special(kind) => *kind,
        }
    }
}

#[async_trait::async_trait]
impl ILocalFileSystem for FakeFileSystem {
    async fn read_file(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        tokio::task::yield_now().await;
        self.read_scopes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), current_scope());
        self.check(path)?;
        match self.entries.lock().unwrap().get(path) {
            Some(FakeEntry::File(data)) => Ok(data.clone()),
            Some(_) => Err(anyhow!("Is a directory")),
            None => Err(anyhow!("No such file or directory")),
        }
    }

    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState> {
        Ok(match self.entries.lock().unwrap().get(path) {
            Some(entry) => FileSystemState {
                exists: true,
                kind: Self::kind_of(entry),
            },
            None => FileSystemState::not_found(),
        })
    }

    async fn list_entries(&self, directory: &Path) -> anyhow::Result<Vec<DirEntry>> {
        tokio::task::yield_now().await;
        self.check(directory)?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.parent() == Some(directory))
            .map(|(path, entry)| DirEntry::new(path.clone(), Self::kind_of(entry)))
            .collect())
    }

    async fn canonicalize(&self, path: &Path) -> anyhow::Result<PathBuf> {
        if !self.entries.lock().unwrap().contains_key(path) {
            return Err(anyhow!("No such file or directory"));
        }
        Ok(self
            .aliases
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| path.to_path_buf()))
    }
}

/// Span names from the current span out to the root, when a registry is set
fn current_scope() -> Vec<&'static str> {
    use tracing_subscriber::registry::{LookupSpan, Registry};

    tracing::Span::current()
        .with_subscriber(|(id, dispatch)| {
            dispatch
                .downcast_ref::<Registry>()
                .and_then(|registry| registry.span(id))
                .map(|span| span.scope().map(|s| s.name()).collect())
        })
        .flatten()
        .unwrap_or_default()
}

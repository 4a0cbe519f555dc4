//! In-process content store.

use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{Content, ContentManager, PropertyValue, Repository, Session};
use crate::error::{StoreError, StoreResult};

/// One node in a store dump.
///
/// A body is given either as UTF-8 text (`body`) or base64 (`body_base64`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredNode {
    pub path: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_base64: Option<String>,
}

/// Serialized form of a [`MemoryRepository`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDump {
    pub nodes: Vec<StoredNode>,
}

#[derive(Debug, Default)]
struct Node {
    properties: BTreeMap<String, PropertyValue>,
    body: Vec<u8>,
}

#[derive(Debug, Default)]
struct Shared {
    nodes: RwLock<BTreeMap<String, Node>>,
    faults: RwLock<HashSet<String>>,
    active_sessions: AtomicUsize,
    logins: AtomicUsize,
}

/// A content repository held entirely in memory.
///
/// Cloning is cheap and every clone sees the same nodes.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    shared: Arc<Shared>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from a JSON store dump.
    pub fn from_dump(dump: StoreDump) -> StoreResult<Self> {
        let repo = Self::new();
        for node in dump.nodes {
            let body = match (node.body, node.body_base64) {
                (_, Some(encoded)) => STANDARD.decode(encoded.trim()).map_err(|e| {
                    StoreError::Storage(format!("invalid base64 body for {}: {}", node.path, e))
                })?,
                (Some(text), None) => text.into_bytes(),
                (None, None) => Vec::new(),
            };
            repo.shared.nodes.write().insert(
                node.path,
                Node {
                    properties: node.properties,
                    body,
                },
            );
        }
        Ok(repo)
    }

    /// Read a JSON store dump from any reader.
    pub fn from_reader<R: Read>(reader: R) -> StoreResult<Self> {
        let dump: StoreDump = serde_json::from_reader(reader)
            .map_err(|e| StoreError::Storage(format!("invalid store dump: {}", e)))?;
        Self::from_dump(dump)
    }

    /// Read a JSON store dump from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Insert or replace a node's properties, keeping any existing body.
    pub fn insert(&self, content: Content) {
        let mut nodes = self.shared.nodes.write();
        let node = nodes.entry(content.path().to_string()).or_default();
        node.properties = content.properties().clone();
    }

    /// Set a node's body, creating the node if needed.
    pub fn set_body(&self, path: &str, body: impl Into<Vec<u8>>) {
        let mut nodes = self.shared.nodes.write();
        nodes.entry(path.to_string()).or_default().body = body.into();
    }

    pub fn content(&self, path: &str) -> Option<Content> {
        let nodes = self.shared.nodes.read();
        nodes
            .get(path)
            .map(|node| Content::from_properties(path, node.properties.clone()))
    }

    pub fn body(&self, path: &str) -> Option<Vec<u8>> {
        self.shared.nodes.read().get(path).map(|node| node.body.clone())
    }

    /// Make every access to `path` fail with a storage error.
    pub fn inject_fault(&self, path: &str) {
        self.shared.faults.write().insert(path.to_string());
    }

    /// Sessions currently logged in.
    pub fn active_sessions(&self) -> usize {
        self.shared.active_sessions.load(Ordering::SeqCst)
    }

    /// Total administrative logins so far.
    pub fn logins(&self) -> usize {
        self.shared.logins.load(Ordering::SeqCst)
    }
}

impl Repository for MemoryRepository {
    fn login_administrative(&self) -> StoreResult<Box<dyn Session + '_>> {
        self.shared.logins.fetch_add(1, Ordering::SeqCst);
        self.shared.active_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            manager: MemoryContentManager {
                shared: Arc::clone(&self.shared),
            },
            logged_out: false,
        }))
    }
}

struct MemorySession {
    manager: MemoryContentManager,
    logged_out: bool,
}

impl Session for MemorySession {
    fn content_manager(&self) -> &dyn ContentManager {
        &self.manager
    }

    fn logout(&mut self) -> StoreResult<()> {
        if !self.logged_out {
            self.logged_out = true;
            self.manager
                .shared
                .active_sessions
                .fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct MemoryContentManager {
    shared: Arc<Shared>,
}

impl MemoryContentManager {
    fn check(&self, path: &str) -> StoreResult<()> {
        if self.shared.faults.read().contains(path) {
            return Err(StoreError::Storage(format!("unable to access {}", path)));
        }
        Ok(())
    }
}

impl ContentManager for MemoryContentManager {
    fn get(&self, path: &str) -> StoreResult<Option<Content>> {
        self.check(path)?;
        let nodes = self.shared.nodes.read();
        Ok(nodes
            .get(path)
            .map(|node| Content::from_properties(path, node.properties.clone())))
    }

    fn input_stream(&self, path: &str) -> StoreResult<Box<dyn Read + '_>> {
        self.check(path)?;
        let nodes = self.shared.nodes.read();
        let node = nodes
            .get(path)
            .ok_or_else(|| StoreError::Storage(format!("no content at {}", path)))?;
        Ok(Box::new(Cursor::new(node.body.clone())))
    }

    fn write_body(&self, path: &str, body: &mut dyn Read) -> StoreResult<u64> {
        self.check(path)?;
        let mut data = Vec::new();
        body.read_to_end(&mut data)?;
        let len = data.len() as u64;
        let mut nodes = self.shared.nodes.write();
        nodes.entry(path.to_string()).or_default().body = data;
        Ok(len)
    }

    fn update(&self, content: &Content) -> StoreResult<()> {
        self.check(content.path())?;
        let mut nodes = self.shared.nodes.write();
        nodes.entry(content.path().to_string()).or_default().properties =
            content.properties().clone();
        Ok(())
    }
}

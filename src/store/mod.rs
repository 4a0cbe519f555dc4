//! Content store collaborators.
//!
//! The exporter never talks to a concrete repository. It consumes three traits:
//!
//! - [`Repository`] hands out administrative sessions
//! - [`Session`] owns a [`ContentManager`] until it is logged out
//! - [`ContentManager`] reads and writes content nodes and their bodies
//!
//! Sessions are always held through [`AdminSession`], which logs out on drop so
//! every exit path releases the elevated context.
//!
//! [`MemoryRepository`] is a complete in-process implementation used by the
//! command-line tool and the tests.

mod content;
mod memory;
mod session;

pub use content::{Content, ContentKind, PropertyValue};
pub use memory::{MemoryRepository, StoreDump, StoredNode};
pub use session::AdminSession;

use std::io::Read;

use crate::error::StoreResult;

/// Property holding a node's mimetype.
pub const MIMETYPE_FIELD: &str = "_mimeType";
/// Property holding the user-facing filename of pooled content.
pub const POOLED_CONTENT_FILENAME: &str = "sakai:pooled-content-file-name";
/// Property holding a pooled item's description.
pub const SAKAI_DESCRIPTION: &str = "sakai:description";
/// Property holding a pooled item's tags.
pub const SAKAI_TAGS: &str = "sakai:tags";
/// Property holding a document's page structure as a JSON string.
pub const STRUCTURE_FIELD: &str = "structure0";

/// Mimetype of structured documents.
pub const DOCUMENT_MIMETYPE: &str = "x-sakai/document";
/// Mimetype given to published packages.
pub const ZIP_MIMETYPE: &str = "application/zip";

/// Read/write access to content nodes.
///
/// Paths are slash-separated and relative to the store root (a pool id is a
/// top-level path).
pub trait ContentManager {
    /// Load the node at `path`, or `None` if there is none.
    fn get(&self, path: &str) -> StoreResult<Option<Content>>;

    /// Whether a node exists at `path`.
    fn exists(&self, path: &str) -> StoreResult<bool> {
        Ok(self.get(path)?.is_some())
    }

    /// Stream the body of the node at `path`.
    fn input_stream(&self, path: &str) -> StoreResult<Box<dyn Read + '_>>;

    /// Replace the body at `path`, creating the node if needed.
    fn write_body(&self, path: &str, body: &mut dyn Read) -> StoreResult<u64>;

    /// Persist the properties of `content`.
    fn update(&self, content: &Content) -> StoreResult<()>;
}

/// A logged-in context on a repository.
pub trait Session {
    fn content_manager(&self) -> &dyn ContentManager;

    /// Release the session. Called once by [`AdminSession`] on drop.
    fn logout(&mut self) -> StoreResult<()>;
}

/// Source of administrative sessions.
pub trait Repository {
    fn login_administrative(&self) -> StoreResult<Box<dyn Session + '_>>;
}

/// Join a child name onto a content path.
pub fn child_path(parent: &str, child: &str) -> String {
    format!("{}/{}", parent, child)
}

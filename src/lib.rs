//! # imscp
//!
//! Exports structured documents held in a content store as IMS Content
//! Packages.
//!
//! ## Features
//!
//! - Walks a document's page structure and row/column/element layout
//! - Builds an `imsmanifest.xml` with an organization, resources and LOM metadata
//! - Packages embedded images and files alongside the pages
//! - Publishes the zip back into the store next to its document
//!
//! ## Quick Start
//!
//! ```no_run
//! use imscp::{MemoryRepository, PackageResolver};
//!
//! let repo = MemoryRepository::load("store.json").unwrap();
//! let resolver = PackageResolver::new(repo);
//!
//! if let Some(package) = resolver.resolve("/imscp/ABC123") {
//!     println!("Published {}", package.path);
//! }
//! ```
//!
//! ## Working with Manifests
//!
//! The manifest model can be built and rendered on its own:
//!
//! ```
//! use imscp::manifest::{Item, Manifest, Organization, Resource};
//!
//! let manifest = Manifest {
//!     organization: Organization {
//!         items: vec![Item::new("page1", "Intro").with_ref("res1")],
//!     },
//!     resources: vec![Resource::for_ref("res1")],
//!     ..Manifest::default()
//! };
//!
//! let xml = manifest.to_xml().unwrap();
//! assert!(xml.contains("href=\"resources/res1.html\""));
//! ```

pub mod archive;
pub mod collect;
pub mod config;
pub mod error;
pub mod manifest;
pub mod resolver;
pub mod rewrite;
pub mod store;
pub mod structure;

pub use archive::{Archive, FinishedArchive, MemorySink, PackageSink};
pub use config::ExportConfig;
pub use error::{ExportError, Result, StoreError};
pub use manifest::{Manifest, build_manifest};
pub use resolver::{PackageResolver, PublishedPackage, ResourceProvider, Stage};
pub use store::{Content, ContentKind, ContentManager, MemoryRepository, Repository, Session};
pub use structure::{PageDescriptor, parse_structure};

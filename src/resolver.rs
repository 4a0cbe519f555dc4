//! Virtual path resolution.
//!
//! [`PackageResolver`] serves `/imscp/<poolId>` by exporting the document at
//! `<poolId>` as a content package, publishing the zip next to it and returning
//! a handle to the published node.

use std::fmt;

use tracing::{debug, warn};

use crate::archive::{Archive, FinishedArchive, PackageStep, write_package};
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::manifest::build_manifest;
use crate::store::{
    AdminSession, Content, ContentKind, ContentManager, MIMETYPE_FIELD, POOLED_CONTENT_FILENAME,
    Repository, STRUCTURE_FIELD, ZIP_MIMETYPE, child_path,
};
use crate::structure::parse_structure;

/// Root this provider answers for.
pub const IMSCP_ROOT: &str = "/imscp";

const IMSCP_PREFIX: &str = "/imscp/";

/// Prefix of the resolution path of published content.
const POOL_PATH_PREFIX: &str = "/p/";

/// A source of resources addressed by virtual paths.
pub trait ResourceProvider {
    type Resource;

    /// Path roots this provider is mounted at.
    fn roots(&self) -> &[&str];

    /// Resolve `path`, or `None` if there is nothing to serve.
    fn resolve(&self, path: &str) -> Option<Self::Resource>;

    /// Children of `path`, when the provider supports listing.
    fn list_children(&self, path: &str) -> Option<Vec<Self::Resource>>;
}

/// Progress of a single resolution, reported when it fails.
///
/// `NotFound` and `NotDocument` are terminal states for paths with nothing to
/// export. Faults leave the stage at the step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ResolvingDocument,
    NotDocument,
    NotFound,
    BuildingManifest,
    WritingResources,
    WritingManifest,
    Publishing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::ResolvingDocument => "resolving document",
            Stage::NotDocument => "not a document",
            Stage::NotFound => "not found",
            Stage::BuildingManifest => "building manifest",
            Stage::WritingResources => "writing resources",
            Stage::WritingManifest => "writing manifest",
            Stage::Publishing => "publishing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A package stored next to its document.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedPackage {
    /// The stored zip node, after its mimetype was set.
    pub content: Content,
    /// Path the package resolves at, `/p/<poolId>/<filename>.zip`.
    pub path: String,
    /// Root of the provider that produced it.
    pub provider: &'static str,
}

/// Exports structured documents as IMS content packages on request.
pub struct PackageResolver<R> {
    repository: R,
    config: ExportConfig,
}

impl<R: Repository> PackageResolver<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            config: ExportConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Resolve `path`, collapsing every failure to `None`.
    ///
    /// Missing or non-document content is logged at debug, anything else at
    /// warn together with the stage that failed.
    pub fn resolve(&self, path: &str) -> Option<PublishedPackage> {
        let mut stage = Stage::Idle;
        match self.run(path, &mut stage) {
            Ok(package) => Some(package),
            Err(e) if e.is_not_found() => {
                debug!(%path, error = %e, "No content package");
                None
            }
            Err(e) => {
                warn!(%path, %stage, error = %e, "Failed to export content package");
                None
            }
        }
    }

    /// Resolve `path`, returning the error that stopped it.
    pub fn try_resolve(&self, path: &str) -> Result<PublishedPackage> {
        let mut stage = Stage::Idle;
        self.run(path, &mut stage)
    }

    fn run(&self, path: &str, stage: &mut Stage) -> Result<PublishedPackage> {
        let Some(pool_id) = pool_id(path) else {
            *stage = Stage::NotFound;
            return Err(ExportError::NotFound(path.to_string()));
        };

        let session = AdminSession::login(&self.repository)?;
        let cm = session.content_manager();

        enter(stage, Stage::ResolvingDocument, pool_id);
        let Some(document) = cm.get(pool_id)? else {
            enter(stage, Stage::NotFound, pool_id);
            return Err(ExportError::NotFound(pool_id.to_string()));
        };
        if document.kind() != ContentKind::Document {
            enter(stage, Stage::NotDocument, pool_id);
            enter(stage, Stage::NotFound, pool_id);
            return Err(ExportError::NotDocument(pool_id.to_string()));
        }
        let filename = document
            .string(POOLED_CONTENT_FILENAME)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ExportError::MissingProperty {
                path: pool_id.to_string(),
                property: POOLED_CONTENT_FILENAME,
            })?
            .to_string();

        enter(stage, Stage::BuildingManifest, pool_id);
        let structure = document.string(STRUCTURE_FIELD).ok_or_else(|| {
            ExportError::MalformedStructure(format!("{} has no {}", pool_id, STRUCTURE_FIELD))
        })?;
        let pages = parse_structure(structure)?;
        let manifest = build_manifest(&document, &pages, cm)?;

        let archive = Archive::create(&filename, &self.config)?;
        let finished = write_package(
            &manifest,
            &document,
            pool_id,
            cm,
            archive,
            &self.config,
            |step| {
                let next = match step {
                    PackageStep::Resources => Stage::WritingResources,
                    PackageStep::Manifest => Stage::WritingManifest,
                };
                enter(stage, next, pool_id);
            },
        )?;

        enter(stage, Stage::Publishing, pool_id);
        let package = publish(cm, pool_id, &filename, finished)?;

        enter(stage, Stage::Done, pool_id);
        Ok(package)
    }
}

impl<R: Repository> ResourceProvider for PackageResolver<R> {
    type Resource = PublishedPackage;

    fn roots(&self) -> &[&str] {
        &[IMSCP_ROOT]
    }

    fn resolve(&self, path: &str) -> Option<PublishedPackage> {
        PackageResolver::resolve(self, path)
    }

    fn list_children(&self, _path: &str) -> Option<Vec<PublishedPackage>> {
        None
    }
}

fn enter(stage: &mut Stage, next: Stage, pool_id: &str) {
    *stage = next;
    debug!(%pool_id, stage = %next, "Export stage");
}

/// Pool id addressed by an `/imscp/<poolId>[/...]` path.
fn pool_id(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(IMSCP_PREFIX)?;
    rest.split('/').next().filter(|id| !id.is_empty())
}

/// Store the archive at `<poolId>/<filename>.zip` and mark it as a zip.
fn publish(
    cm: &dyn ContentManager,
    pool_id: &str,
    filename: &str,
    mut archive: FinishedArchive,
) -> Result<PublishedPackage> {
    let zip_name = format!("{}.zip", filename);
    let target = child_path(pool_id, &zip_name);

    let written = cm.write_body(&target, archive.reader())?;
    debug!(%pool_id, path = %target, bytes = written, "Stored content package");

    let mut content = cm
        .get(&target)?
        .ok_or_else(|| ExportError::NotFound(target.clone()))?;
    content.set_property(MIMETYPE_FIELD, ZIP_MIMETYPE);
    cm.update(&content)?;

    Ok(PublishedPackage {
        content,
        path: format!("{}{}", POOL_PATH_PREFIX, target),
        provider: IMSCP_ROOT,
    })
}

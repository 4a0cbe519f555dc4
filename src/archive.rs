//! Package archive assembly.
//!
//! The zip is written to a scoped temporary file, so a package is bounded by
//! disk rather than memory. The file is removed when the [`Archive`] or
//! [`FinishedArchive`] holding it is dropped, whatever the outcome.
//!
//! Layout:
//!
//! ```text
//! imsmanifest.xml
//! resources/<resourceId>.html      one per page
//! resources/<filename>             one per embedded item
//! ```

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use quick_xml::escape::partial_escape;
use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::collect::collect_page;
use crate::config::ExportConfig;
use crate::error::Result;
use crate::manifest::{Manifest, Resource};
use crate::rewrite::rewrite_embeds;
use crate::store::{Content, ContentManager};

/// Name of the manifest entry.
pub const MANIFEST_ENTRY: &str = "imsmanifest.xml";
/// Directory holding pages and embedded items.
pub const RESOURCES_DIR: &str = "resources/";

/// Destination for packaged files.
pub trait PackageSink {
    /// Add an entry named `name` with the bytes of `data`. Returns bytes written.
    fn add_entry(&mut self, name: &str, data: &mut dyn Read) -> Result<u64>;
}

/// A sink that keeps entries in memory, in write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub entries: Vec<(String, Vec<u8>)>,
}

impl PackageSink for MemorySink {
    fn add_entry(&mut self, name: &str, data: &mut dyn Read) -> Result<u64> {
        let mut bytes = Vec::new();
        let len = data.read_to_end(&mut bytes)? as u64;
        self.entries.push((name.to_string(), bytes));
        Ok(len)
    }
}

/// An in-progress zip backed by a temporary file.
pub struct Archive {
    zip: ZipWriter<NamedTempFile>,
    options: SimpleFileOptions,
    entries: Vec<String>,
}

impl Archive {
    /// Create an archive whose temporary file name starts with `name_hint`.
    pub fn create(name_hint: &str, config: &ExportConfig) -> Result<Self> {
        let prefix = name_hint.replace('/', "_");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".zip");
        let file = match config.temp_dir {
            Some(ref dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        debug!(path = %file.path().display(), "Created temporary archive");

        // Fixed timestamps keep repeated exports of unchanged content identical.
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(config.compression_level() as i64))
            .last_modified_time(DateTime::default());

        Ok(Self {
            zip: ZipWriter::new(file),
            options,
            entries: Vec::new(),
        })
    }

    /// Add an entry from a byte slice.
    pub fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        self.entries.push(name.to_string());
        Ok(())
    }

    /// Entry names written so far, in order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Write the central directory and rewind the file for reading.
    pub fn finish(self) -> Result<FinishedArchive> {
        let mut file = self.zip.finish()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(FinishedArchive {
            file,
            entries: self.entries,
        })
    }
}

impl PackageSink for Archive {
    fn add_entry(&mut self, name: &str, data: &mut dyn Read) -> Result<u64> {
        self.zip.start_file(name, self.options)?;
        let written = io::copy(data, &mut self.zip)?;
        self.entries.push(name.to_string());
        Ok(written)
    }
}

/// A completed zip, still owned by its temporary file.
pub struct FinishedArchive {
    file: NamedTempFile,
    entries: Vec<String>,
}

impl FinishedArchive {
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(self.file.as_file().metadata()?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The archive bytes, positioned at the start.
    pub fn reader(&mut self) -> &mut File {
        self.file.as_file_mut()
    }
}

/// Wrap a page body in a minimal HTML document.
pub fn page_document(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        partial_escape(title),
        body
    )
}

/// Title of the page for `resource`: its item's title, else its identifier.
fn origin_title(manifest: &Manifest, resource: &Resource) -> String {
    let title = manifest
        .organization
        .find_by_ref(&resource.identifier)
        .map(|item| item.title.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(&resource.identifier);
    format!("{}.html", title)
}

/// Write one HTML page per manifest resource, in manifest order.
///
/// Embedded items referenced from each page are written alongside it.
pub fn write_resources(
    manifest: &Manifest,
    document: &Content,
    pool_id: &str,
    cm: &dyn ContentManager,
    archive: &mut Archive,
) -> Result<()> {
    for resource in &manifest.resources {
        let title = origin_title(manifest, resource);
        let body = collect_page(cm, document.path(), &resource.identifier)?;
        let body = rewrite_embeds(&body, pool_id, cm, archive)?;
        let name = format!("{}{}.html", RESOURCES_DIR, resource.identifier);
        archive.add_bytes(&name, page_document(&title, &body).as_bytes())?;
        debug!(entry = %name, "Wrote page");
    }
    Ok(())
}

/// Write `imsmanifest.xml`.
pub fn write_manifest(
    manifest: &Manifest,
    archive: &mut Archive,
    config: &ExportConfig,
) -> Result<()> {
    let xml = manifest.to_xml_with(config.namespaces)?;
    archive.add_bytes(MANIFEST_ENTRY, xml.as_bytes())
}

/// The part of a package being written, reported to [`write_package`] callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStep {
    Resources,
    Manifest,
}

/// Write every page and the manifest, then close the archive.
///
/// `on_step` is called before each part is written.
pub fn write_package(
    manifest: &Manifest,
    document: &Content,
    pool_id: &str,
    cm: &dyn ContentManager,
    mut archive: Archive,
    config: &ExportConfig,
    mut on_step: impl FnMut(PackageStep),
) -> Result<FinishedArchive> {
    on_step(PackageStep::Resources);
    write_resources(manifest, document, pool_id, cm, &mut archive)?;
    on_step(PackageStep::Manifest);
    write_manifest(manifest, &mut archive, config)?;
    archive.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Item, Organization};
    use crate::store::{AdminSession, MemoryRepository};
    use zip::ZipArchive;

    fn read_entry(archive: &mut FinishedArchive, name: &str) -> Vec<u8> {
        let mut zip = ZipArchive::new(archive.reader()).unwrap();
        let mut entry = zip.by_name(name).unwrap();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        data
    }

    #[test]
    fn test_page_document() {
        assert_eq!(
            page_document("Intro.html", "<p>Hello</p>"),
            "<html><head><title>Intro.html</title></head><body><p>Hello</p></body></html>"
        );
        assert_eq!(
            page_document("Q&A.html", ""),
            "<html><head><title>Q&amp;A.html</title></head><body></body></html>"
        );
    }

    #[test]
    fn test_origin_title_fallback() {
        let manifest = Manifest {
            organization: Organization {
                items: vec![Item::new("p1", "Intro").with_ref("res1")],
            },
            resources: vec![Resource::for_ref("res1"), Resource::for_ref("orphan")],
            ..Manifest::default()
        };
        assert_eq!(origin_title(&manifest, &manifest.resources[0]), "Intro.html");
        assert_eq!(origin_title(&manifest, &manifest.resources[1]), "orphan.html");
    }

    #[test]
    fn test_temp_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig::new().with_temp_dir(dir.path());
        let archive = Archive::create("My/Doc", &config).unwrap();
        let finished = archive.finish().unwrap();
        let path = finished.path().to_path_buf();
        assert!(path.exists());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("My_Doc")
        );
        drop(finished);
        assert!(!path.exists());
    }

    #[test]
    fn test_write_package_entries() {
        let repo = MemoryRepository::new();
        repo.insert(Content::new("doc/res1"));
        let session = AdminSession::login(&repo).unwrap();

        let manifest = Manifest {
            organization: Organization {
                items: vec![Item::new("p1", "Intro").with_ref("res1")],
            },
            resources: vec![Resource::for_ref("res1")],
            ..Manifest::default()
        };
        let config = ExportConfig::default();
        let archive = Archive::create("doc", &config).unwrap();
        let mut steps = Vec::new();
        let mut finished = write_package(
            &manifest,
            &Content::new("doc"),
            "doc",
            session.content_manager(),
            archive,
            &config,
            |step| steps.push(step),
        )
        .unwrap();

        assert_eq!(steps, vec![PackageStep::Resources, PackageStep::Manifest]);
        assert_eq!(finished.entries(), ["resources/res1.html", "imsmanifest.xml"]);
        assert_eq!(
            read_entry(&mut finished, "resources/res1.html"),
            b"<html><head><title>Intro.html</title></head><body></body></html>"
        );
        let xml = String::from_utf8(read_entry(&mut finished, MANIFEST_ENTRY)).unwrap();
        assert!(xml.contains("<resource identifier=\"res1\" href=\"resources/res1.html\"/>"));
    }
}

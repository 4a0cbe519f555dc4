//! Embedded-content rewriting.
//!
//! Authoring tools place embedded items in page HTML as placeholder images:
//!
//! ```html
//! <img id="widget_embedcontent_id123" class="widget_inline" src="...">
//! ```
//!
//! The widget's data at `<poolId>/<embedId>/embedcontent/items` points at the
//! pooled item being embedded. Each resolvable placeholder is replaced with a
//! plain link (or image) to a copy of that item packaged under `resources/`.
//! Placeholders that cannot be resolved are left exactly as they were.

use std::collections::HashMap;

use memchr::memmem;
use quick_xml::escape::escape;
use tracing::{debug, trace};

use crate::archive::PackageSink;
use crate::error::Result;
use crate::store::{ContentKind, ContentManager, POOLED_CONTENT_FILENAME};

/// Literal prefix of an embedded-content placeholder.
pub const EMBED_MARKER: &str = "<img id=\"widget_embedcontent_";

/// Link prefix stripped from stored resource paths.
const POOL_LINK_PREFIX: &str = "/p/";

/// A placeholder that resolved to a packageable item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedReference {
    pub marker_html: String,
    pub embed_id: String,
    pub resolved_path: String,
    pub mime_type: String,
    pub filename: String,
    pub replacement_html: String,
}

impl EmbeddedReference {
    /// Archive entry the item's bytes are written to.
    pub fn entry_name(&self) -> String {
        format!("resources/{}", self.filename)
    }
}

/// Rewrite every resolvable placeholder in `html`, streaming the embedded
/// items into `sink`.
///
/// The text is scanned once from start to end. Repeated occurrences of the same
/// placeholder share one resolution, so the item is packaged only once per page.
pub fn rewrite_embeds(
    html: &str,
    pool_id: &str,
    cm: &dyn ContentManager,
    sink: &mut dyn PackageSink,
) -> Result<String> {
    if html.trim().is_empty() {
        return Ok(String::new());
    }

    let bytes = html.as_bytes();
    let finder = memmem::Finder::new(EMBED_MARKER);
    let mut output = String::with_capacity(html.len());
    let mut seen: HashMap<&str, Option<String>> = HashMap::new();
    let mut pos = 0;

    while let Some(rel) = finder.find(&bytes[pos..]) {
        let start = pos + rel;
        output.push_str(&html[pos..start]);

        let Some(tag_len) = memchr::memchr(b'>', &bytes[start..]) else {
            // Unterminated tag; the tail is copied verbatim below.
            pos = start;
            break;
        };
        let end = start + tag_len + 1;
        let marker_html = &html[start..end];

        let replacement = match seen.get(marker_html) {
            Some(known) => known.clone(),
            None => {
                let replacement = match resolve_embed(marker_html, pool_id, cm)? {
                    Some(reference) => {
                        let mut body = cm.input_stream(&reference.resolved_path)?;
                        let written = sink.add_entry(&reference.entry_name(), &mut body)?;
                        debug!(
                            embed_id = %reference.embed_id,
                            path = %reference.resolved_path,
                            bytes = written,
                            "Packaged embedded content"
                        );
                        Some(reference.replacement_html)
                    }
                    None => None,
                };
                seen.insert(marker_html, replacement.clone());
                replacement
            }
        };

        output.push_str(replacement.as_deref().unwrap_or(marker_html));
        pos = end;
    }

    output.push_str(&html[pos..]);
    Ok(output)
}

/// Resolve one placeholder tag to the item it embeds.
///
/// Returns `None` whenever any link in the chain is missing, or when the target
/// is itself a structured document.
pub fn resolve_embed(
    marker_html: &str,
    pool_id: &str,
    cm: &dyn ContentManager,
) -> Result<Option<EmbeddedReference>> {
    let Some(embed_id) = embed_id(marker_html) else {
        trace!(marker = %marker_html, "Placeholder has no id");
        return Ok(None);
    };

    let items_path = format!("{}/{}/embedcontent/items", pool_id, embed_id);
    let Some(items) = cm.get(&items_path)? else {
        trace!(%embed_id, "No embedcontent items");
        return Ok(None);
    };

    let Some(stored_path) = items
        .property("__array__0__")
        .map(ToString::to_string)
        .filter(|p| !p.is_empty())
    else {
        trace!(%embed_id, "Embed widget references nothing");
        return Ok(None);
    };
    let resolved_path = normalize_resource_path(&stored_path).to_string();

    let Some(target) = cm.get(&resolved_path)? else {
        trace!(%embed_id, path = %resolved_path, "Embedded content is gone");
        return Ok(None);
    };

    let mime_type = match target.kind() {
        ContentKind::Pooled { mime_type } => mime_type,
        ContentKind::Document | ContentKind::Untyped => {
            trace!(%embed_id, path = %resolved_path, "Embedded content is not packageable");
            return Ok(None);
        }
    };

    let Some(filename) = target
        .string(POOLED_CONTENT_FILENAME)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
    else {
        trace!(%embed_id, path = %resolved_path, "Embedded content has no filename");
        return Ok(None);
    };

    let replacement_html = replacement_markup(&mime_type, &filename);
    Ok(Some(EmbeddedReference {
        marker_html: marker_html.to_string(),
        embed_id: embed_id.to_string(),
        resolved_path,
        mime_type,
        filename,
        replacement_html,
    }))
}

/// The widget id: text between the marker prefix and the next quote.
fn embed_id(marker_html: &str) -> Option<&str> {
    let rest = marker_html.strip_prefix(EMBED_MARKER)?;
    let quote = memchr::memchr(b'"', rest.as_bytes())?;
    Some(&rest[..quote])
}

/// Drop everything up to and including the first `/p/` in a stored link.
fn normalize_resource_path(path: &str) -> &str {
    match path.find(POOL_LINK_PREFIX) {
        Some(idx) => &path[idx + POOL_LINK_PREFIX.len()..],
        None => path,
    }
}

fn replacement_markup(mime_type: &str, filename: &str) -> String {
    if mime_type.contains("image") {
        format!("<img src=\"{}\"/>", escape(filename))
    } else {
        format!("<a href=\"{}\">{}</a>", escape(filename), escape(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemorySink;
    use crate::store::{AdminSession, Content, MemoryRepository};

    fn embed(repo: &MemoryRepository, pool: &str, embed_id: &str, target: &str) {
        repo.insert(
            Content::new(format!("{}/{}/embedcontent/items", pool, embed_id))
                .with_property("__array__0__", target),
        );
    }

    fn pooled(repo: &MemoryRepository, path: &str, mime: &str, filename: &str, body: &[u8]) {
        repo.insert(
            Content::new(path)
                .with_property("_mimeType", mime)
                .with_property(POOLED_CONTENT_FILENAME, filename),
        );
        repo.set_body(path, body.to_vec());
    }

    #[test]
    fn test_embed_id() {
        assert_eq!(
            embed_id(r#"<img id="widget_embedcontent_id42" src="x">"#),
            Some("id42")
        );
        assert_eq!(embed_id(r#"<img id="widget_embedcontent_broken>"#), None);
    }

    #[test]
    fn test_normalize_resource_path() {
        assert_eq!(normalize_resource_path("/p/img1"), "img1");
        assert_eq!(normalize_resource_path("http://host/p/img1"), "img1");
        assert_eq!(normalize_resource_path("img1"), "img1");
    }

    #[test]
    fn test_replacement_markup() {
        assert_eq!(replacement_markup("image/png", "pic.png"), r#"<img src="pic.png"/>"#);
        assert_eq!(
            replacement_markup("application/pdf", "notes.pdf"),
            r#"<a href="notes.pdf">notes.pdf</a>"#
        );
    }

    #[test]
    fn test_replacement_escapes_filename() {
        assert_eq!(replacement_markup("image/png", "Q&A.png"), r#"<img src="Q&amp;A.png"/>"#);
        assert_eq!(
            replacement_markup("text/plain", "say \"hi\".txt"),
            r#"<a href="say &quot;hi&quot;.txt">say &quot;hi&quot;.txt</a>"#
        );
    }

    #[test]
    fn test_blank_input() {
        let repo = MemoryRepository::new();
        let session = AdminSession::login(&repo).unwrap();
        let mut sink = MemorySink::default();
        let out = rewrite_embeds("  \n ", "pool", session.content_manager(), &mut sink).unwrap();
        assert_eq!(out, "");
        assert!(sink.entries.is_empty());
    }

    #[test]
    fn test_image_embed_rewritten() {
        let repo = MemoryRepository::new();
        embed(&repo, "pool", "id1", "/p/img1");
        pooled(&repo, "img1", "image/png", "pic.png", b"\x89PNG");

        let session = AdminSession::login(&repo).unwrap();
        let mut sink = MemorySink::default();
        let html = r#"<p>before</p><img id="widget_embedcontent_id1" class="x"><p>after</p>"#;
        let out = rewrite_embeds(html, "pool", session.content_manager(), &mut sink).unwrap();

        assert_eq!(out, r#"<p>before</p><img src="pic.png"/><p>after</p>"#);
        assert_eq!(
            sink.entries,
            vec![("resources/pic.png".to_string(), b"\x89PNG".to_vec())]
        );
    }

    #[test]
    fn test_document_embed_left_alone() {
        let repo = MemoryRepository::new();
        embed(&repo, "pool", "id1", "doc2");
        pooled(&repo, "doc2", "x-sakai/document", "Other doc", b"");

        let session = AdminSession::login(&repo).unwrap();
        let mut sink = MemorySink::default();
        let html = r#"<img id="widget_embedcontent_id1">"#;
        let out = rewrite_embeds(html, "pool", session.content_manager(), &mut sink).unwrap();

        assert_eq!(out, html);
        assert!(sink.entries.is_empty());
    }

    #[test]
    fn test_unresolved_markers_verbatim() {
        let repo = MemoryRepository::new();
        // id2 references nothing, id3 references a missing item, id4 has no mimetype
        repo.insert(Content::new("pool/id2/embedcontent/items"));
        embed(&repo, "pool", "id3", "gone");
        embed(&repo, "pool", "id4", "plain");
        repo.insert(Content::new("plain"));

        let session = AdminSession::login(&repo).unwrap();
        let mut sink = MemorySink::default();
        let html = concat!(
            r#"<img id="widget_embedcontent_id1">"#,
            r#"<img id="widget_embedcontent_id2">"#,
            r#"<img id="widget_embedcontent_id3">"#,
            r#"<img id="widget_embedcontent_id4">"#,
            r#"<img id="widget_embedcontent_"#,
        );
        let out = rewrite_embeds(html, "pool", session.content_manager(), &mut sink).unwrap();

        assert_eq!(out, html);
        assert!(sink.entries.is_empty());
    }

    #[test]
    fn test_file_embed_and_repeats() {
        let repo = MemoryRepository::new();
        embed(&repo, "pool", "a", "/p/file1");
        embed(&repo, "pool", "b", "img2");
        pooled(&repo, "file1", "application/pdf", "notes.pdf", b"%PDF");
        pooled(&repo, "img2", "image/jpeg", "photo.jpg", b"JFIF");

        let session = AdminSession::login(&repo).unwrap();
        let mut sink = MemorySink::default();
        let html = concat!(
            r#"<img id="widget_embedcontent_a">|"#,
            r#"<img id="widget_embedcontent_b" alt="p">|"#,
            r#"<img id="widget_embedcontent_a">"#,
        );
        let out = rewrite_embeds(html, "pool", session.content_manager(), &mut sink).unwrap();

        assert_eq!(
            out,
            r#"<a href="notes.pdf">notes.pdf</a>|<img src="photo.jpg"/>|<a href="notes.pdf">notes.pdf</a>"#
        );
        let names: Vec<_> = sink.entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["resources/notes.pdf", "resources/photo.jpg"]);
    }

    #[test]
    fn test_replacement_not_rescanned() {
        let repo = MemoryRepository::new();
        embed(&repo, "pool", "a", "file1");
        // A filename that looks like a marker must not trigger a second pass.
        pooled(
            &repo,
            "file1",
            "text/plain",
            "<img id=\"widget_embedcontent_a\">",
            b"x",
        );

        let session = AdminSession::login(&repo).unwrap();
        let mut sink = MemorySink::default();
        let out = rewrite_embeds(
            r#"<img id="widget_embedcontent_a">"#,
            "pool",
            session.content_manager(),
            &mut sink,
        )
        .unwrap();

        assert!(out.starts_with("<a href=\"&lt;img"));
        assert_eq!(sink.entries.len(), 1);
    }

    #[test]
    fn test_resolve_embed_reference() {
        let repo = MemoryRepository::new();
        embed(&repo, "pool", "id1", "/p/img1");
        pooled(&repo, "img1", "image/png", "pic.png", b"");

        let session = AdminSession::login(&repo).unwrap();
        let reference = resolve_embed(
            r#"<img id="widget_embedcontent_id1">"#,
            "pool",
            session.content_manager(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(reference.embed_id, "id1");
        assert_eq!(reference.resolved_path, "img1");
        assert_eq!(reference.mime_type, "image/png");
        assert_eq!(reference.entry_name(), "resources/pic.png");
    }
}

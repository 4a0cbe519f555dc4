//! Property tests for the structure walker and the embed rewriter.

use proptest::prelude::*;

use imscp::rewrite::{EMBED_MARKER, rewrite_embeds};
use imscp::store::AdminSession;
use imscp::{MemoryRepository, MemorySink, parse_structure};

fn structure_json(entries: &[(String, String)]) -> String {
    let mut map = serde_json::Map::new();
    for (key, title) in entries {
        map.insert(
            key.clone(),
            serde_json::json!({ "_title": title, "_ref": format!("ref-{}", key) }),
        );
    }
    serde_json::Value::Object(map).to_string()
}

proptest! {
    #[test]
    fn test_underscore_keys_never_pages(
        entries in prop::collection::vec(("_?[a-z]{1,8}", "[ a-zA-Z]{0,12}"), 0..12)
    ) {
        let pages = parse_structure(&structure_json(&entries)).unwrap();
        for page in &pages {
            prop_assert!(!page.page_id.starts_with('_'));
            prop_assert!(!page.title.trim().is_empty());
        }
    }

    #[test]
    fn test_marker_free_text_unchanged(html in "[^<]{0,200}|<p>[a-z ]{0,40}</p>") {
        prop_assume!(!html.contains(EMBED_MARKER));
        prop_assume!(!html.trim().is_empty());

        let repo = MemoryRepository::new();
        let session = AdminSession::login(&repo).unwrap();
        let mut sink = MemorySink::default();

        let out = rewrite_embeds(&html, "DOC", session.content_manager(), &mut sink).unwrap();
        prop_assert_eq!(out, html);
        prop_assert!(sink.entries.is_empty());
    }

    #[test]
    fn test_unresolved_markers_preserved(
        before in "[a-z ]{0,20}",
        id in "[a-z0-9]{1,8}",
        after in "[a-z ]{0,20}",
    ) {
        let html = format!("{}{}{}\" src=\"x\">{}", before, EMBED_MARKER, id, after);
        prop_assume!(!html.trim().is_empty());

        let repo = MemoryRepository::new();
        let session = AdminSession::login(&repo).unwrap();
        let mut sink = MemorySink::default();

        let out = rewrite_embeds(&html, "DOC", session.content_manager(), &mut sink).unwrap();
        prop_assert_eq!(out, html);
        prop_assert!(sink.entries.is_empty());
    }
}

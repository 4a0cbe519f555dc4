//! Page structure descriptors.
//!
//! A document's `structure0` property is a JSON object whose keys are page ids:
//!
//! ```json
//! {"page1": {"_title": "Intro", "_ref": "res1", "_order": 0}}
//! ```
//!
//! Keys starting with `_` are bookkeeping, not pages.

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{ExportError, Result};

/// One page of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    pub page_id: String,
    pub title: String,
    /// Child node holding the page's rows, if the page has content.
    pub content_ref: Option<String>,
}

/// Parse a structure descriptor into pages, in key order.
///
/// Entries that are not objects or have no usable `_title` are skipped.
pub fn parse_structure(json: &str) -> Result<Vec<PageDescriptor>> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Object(entries) = value else {
        return Err(ExportError::MalformedStructure(
            "structure is not a JSON object".to_string(),
        ));
    };
    Ok(pages_from_map(&entries))
}

fn pages_from_map(entries: &Map<String, Value>) -> Vec<PageDescriptor> {
    let mut pages = Vec::with_capacity(entries.len());

    for (key, entry) in entries {
        if key.is_empty() || key.starts_with('_') {
            continue;
        }

        let Some(entry) = entry.as_object() else {
            trace!(page_id = %key, "Skipping non-object structure entry");
            continue;
        };

        let title = entry.get("_title").and_then(scalar_string).unwrap_or_default();
        if title.trim().is_empty() {
            trace!(page_id = %key, "Skipping untitled structure entry");
            continue;
        }

        let content_ref = entry
            .get("_ref")
            .and_then(scalar_string)
            .filter(|r| !r.is_empty());

        pages.push(PageDescriptor {
            page_id: key.clone(),
            title,
            content_ref,
        });
    }

    pages
}

/// Strings, numbers and booleans as text. Null, arrays and objects are absent.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

//! Page body collection.
//!
//! A page node stores its layout as nested arrays encoded in child names:
//!
//! ```text
//! <page>/rows/__array__0__/columns/__array__0__/elements/__array__0__
//! ```
//!
//! Each element names a widget (`id`, `type`); the widget's data lives at
//! `<page>/<id>/<type>`. Only `pagetitle` and `htmlblock` widgets carry HTML.

use tracing::trace;

use crate::error::Result;
use crate::store::{Content, ContentManager, child_path};

const ROWS: &str = "rows";
const COLUMNS: &str = "columns";
const ELEMENTS: &str = "elements";

/// Widget types whose `content` property is page HTML.
const HTML_WIDGETS: [&str; 2] = ["pagetitle", "htmlblock"];

/// Path of the `index`-th entry of an array-encoded node.
pub fn array_child_path(parent: &str, index: usize) -> String {
    format!("{}/__array__{}__", parent, index)
}

/// Load the `index`-th entry of an array-encoded node.
pub fn array_child(
    cm: &dyn ContentManager,
    parent: &Content,
    index: usize,
) -> Result<Option<Content>> {
    Ok(cm.get(&array_child_path(parent.path(), index))?)
}

/// Load every entry of an array-encoded node, stopping at the first gap.
fn array_children(cm: &dyn ContentManager, parent: &Content) -> Result<Vec<Content>> {
    let mut children = Vec::new();
    while let Some(child) = array_child(cm, parent, children.len())? {
        children.push(child);
    }
    Ok(children)
}

/// Load the array node named `name` under `node` and return its entries.
fn nested(cm: &dyn ContentManager, node: &Content, name: &str) -> Result<Vec<Content>> {
    match cm.get(&child_path(node.path(), name))? {
        Some(array) => array_children(cm, &array),
        None => Ok(Vec::new()),
    }
}

/// Concatenate the HTML of one page: rows, then columns, then elements.
pub fn collect_page(cm: &dyn ContentManager, document_path: &str, resource_id: &str) -> Result<String> {
    let page_path = child_path(document_path, resource_id);
    let mut html = String::new();

    let Some(rows) = cm.get(&child_path(&page_path, ROWS))? else {
        return Ok(html);
    };

    for row in array_children(cm, &rows)? {
        for column in nested(cm, &row, COLUMNS)? {
            for element in nested(cm, &column, ELEMENTS)? {
                append_element(cm, &page_path, &element, &mut html)?;
            }
        }
    }

    Ok(html)
}

fn append_element(
    cm: &dyn ContentManager,
    page_path: &str,
    element: &Content,
    html: &mut String,
) -> Result<()> {
    let Some(widget_type) = element.property("type").map(|t| t.to_string()) else {
        return Ok(());
    };
    if !HTML_WIDGETS.contains(&widget_type.as_str()) {
        return Ok(());
    }
    let Some(id) = element.property("id").map(|id| id.to_string()) else {
        trace!(path = %element.path(), "Element has no id");
        return Ok(());
    };

    let widget_path = format!("{}/{}/{}", page_path, id, widget_type);
    if let Some(widget) = cm.get(&widget_path)?
        && let Some(content) = widget.property("content")
    {
        html.push_str(&content.to_string());
    }
    Ok(())
}

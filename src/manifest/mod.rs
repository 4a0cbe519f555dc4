//! Content package manifest model.
//!
//! A [`Manifest`] holds one organization (the page tree), the resources the
//! pages point at, and descriptive metadata. [`build_manifest`] derives it from
//! a document's structure descriptors; [`Manifest::to_xml`] renders it.

mod lom;
mod xml;

pub use lom::{General, LangString, Lom, Metadata, SCHEMA, SCHEMA_VERSION};

use std::collections::VecDeque;

use tracing::debug;

use crate::error::Result;
use crate::store::{
    Content, ContentManager, POOLED_CONTENT_FILENAME, SAKAI_DESCRIPTION, SAKAI_TAGS, child_path,
};
use crate::structure::PageDescriptor;

/// An entry in the organization tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub identifier: String,
    pub title: String,
    /// Identifier of the [`Resource`] this item displays.
    pub identifier_ref: Option<String>,
    pub children: Vec<Item>,
}

impl Item {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            identifier_ref: None,
            children: Vec::new(),
        }
    }

    pub fn with_ref(mut self, identifier_ref: impl Into<String>) -> Self {
        self.identifier_ref = Some(identifier_ref.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Organization {
    pub items: Vec<Item>,
}

impl Organization {
    /// Breadth-first search for the first item pointing at `identifier`.
    pub fn find_by_ref(&self, identifier: &str) -> Option<&Item> {
        let mut queue: VecDeque<&Item> = self.items.iter().collect();
        while let Some(item) = queue.pop_front() {
            if item.identifier_ref.as_deref() == Some(identifier) {
                return Some(item);
            }
            queue.extend(item.children.iter());
        }
        None
    }
}

/// A packaged page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub identifier: String,
    pub href: String,
}

impl Resource {
    /// The resource for a page's content node, packaged as `resources/<id>.html`.
    pub fn for_ref(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let href = format!("resources/{}.html", identifier);
        Self { identifier, href }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub organization: Organization,
    pub resources: Vec<Resource>,
    pub metadata: Metadata,
}

/// Build the manifest for `document` from its page descriptors.
///
/// A page whose content reference does not resolve to a child of the document
/// is left out entirely. Resources are neither sorted nor deduplicated.
pub fn build_manifest(
    document: &Content,
    pages: &[PageDescriptor],
    cm: &dyn ContentManager,
) -> Result<Manifest> {
    let mut manifest = Manifest::default();

    for page in pages {
        let item = Item::new(&page.page_id, &page.title);
        match page.content_ref {
            Some(ref content_ref) => {
                if cm.exists(&child_path(document.path(), content_ref))? {
                    manifest.organization.items.push(item.with_ref(content_ref));
                    manifest.resources.push(Resource::for_ref(content_ref));
                } else {
                    debug!(page_id = %page.page_id, %content_ref, "Page content is missing");
                }
            }
            None => manifest.organization.items.push(item),
        }
    }

    manifest.metadata.lom.general = general_metadata(document);
    Ok(manifest)
}

fn general_metadata(document: &Content) -> General {
    let mut general = General::default();

    if let Some(description) = document
        .string(SAKAI_DESCRIPTION)
        .filter(|d| !d.trim().is_empty())
    {
        general.descriptions.push(LangString::new(description));
    }

    if let Some(tags) = document.property(SAKAI_TAGS) {
        general.keywords = tags
            .as_strings()
            .into_iter()
            .map(LangString::new)
            .collect();
    }

    if let Some(filename) = document
        .string(POOLED_CONTENT_FILENAME)
        .filter(|f| !f.is_empty())
    {
        general.title = Some(LangString::new(filename));
    }

    general
}

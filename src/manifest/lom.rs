//! The slice of Learning Object Metadata the exporter emits.
//!
//! Only the `general` category is populated: title, keywords and descriptions,
//! each as a language-tagged string.

use quick_xml::Writer;

use super::xml::{end, start, text_element};
use crate::error::Result;

pub const SCHEMA: &str = "IMS Content";
pub const SCHEMA_VERSION: &str = "1.2";

/// A string with an optional language tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangString {
    pub language: Option<String>,
    pub string: String,
}

impl LangString {
    pub fn new(string: impl Into<String>) -> Self {
        Self {
            language: None,
            string: string.into(),
        }
    }

    fn write_into(&self, w: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
        start(w, name)?;
        if let Some(ref language) = self.language {
            text_element(w, "language", language)?;
        }
        text_element(w, "string", &self.string)?;
        end(w, name)
    }
}

/// LOM `general` category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct General {
    pub title: Option<LangString>,
    pub keywords: Vec<LangString>,
    pub descriptions: Vec<LangString>,
}

impl General {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.keywords.is_empty() && self.descriptions.is_empty()
    }

    fn write_into(&self, w: &mut Writer<Vec<u8>>) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        start(w, "general")?;
        if let Some(ref title) = self.title {
            title.write_into(w, "title")?;
        }
        for keyword in &self.keywords {
            keyword.write_into(w, "keyword")?;
        }
        for description in &self.descriptions {
            description.write_into(w, "description")?;
        }
        end(w, "general")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lom {
    pub general: General,
}

/// Manifest-level metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub schema: String,
    pub schema_version: String,
    pub lom: Lom,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            schema: SCHEMA.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            lom: Lom::default(),
        }
    }
}

impl Metadata {
    pub(crate) fn write_into(&self, w: &mut Writer<Vec<u8>>) -> Result<()> {
        start(w, "metadata")?;
        text_element(w, "schema", &self.schema)?;
        text_element(w, "schemaversion", &self.schema_version)?;
        start(w, "lom")?;
        self.lom.general.write_into(w)?;
        end(w, "lom")?;
        end(w, "metadata")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(metadata: &Metadata) -> String {
        let mut w = Writer::new(Vec::new());
        metadata.write_into(&mut w).unwrap();
        String::from_utf8(w.into_inner()).unwrap()
    }

    #[test]
    fn test_empty_general_omitted() {
        assert_eq!(
            render(&Metadata::default()),
            "<metadata><schema>IMS Content</schema><schemaversion>1.2</schemaversion><lom></lom></metadata>"
        );
    }

    #[test]
    fn test_general_order() {
        let mut metadata = Metadata::default();
        metadata.lom.general = General {
            title: Some(LangString::new("Course.doc")),
            keywords: vec![LangString::new("rust"), LangString::new("xml")],
            descriptions: vec![LangString {
                language: Some("en".into()),
                string: "About <things>".into(),
            }],
        };
        let xml = render(&metadata);
        assert!(xml.contains(
            "<lom><general><title><string>Course.doc</string></title>\
             <keyword><string>rust</string></keyword><keyword><string>xml</string></keyword>\
             <description><language>en</language><string>About &lt;things&gt;</string></description>\
             </general></lom>"
        ));
    }
}

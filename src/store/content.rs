use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{DOCUMENT_MIMETYPE, MIMETYPE_FIELD};

/// A single property value on a content node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Strings(Vec<String>),
    Integer(i64),
    Boolean(bool),
}

impl PropertyValue {
    /// The value if it is a single string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a list of strings. A single string is a one-element list;
    /// non-string values give an empty list.
    pub fn as_strings(&self) -> Vec<&str> {
        match self {
            PropertyValue::String(s) => vec![s.as_str()],
            PropertyValue::Strings(v) => v.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Strings(v) => f.write_str(&v.join(",")),
            PropertyValue::Integer(n) => write!(f, "{}", n),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        PropertyValue::Strings(v)
    }
}

impl From<&[&str]> for PropertyValue {
    fn from(v: &[&str]) -> Self {
        PropertyValue::Strings(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Integer(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// What a node is, derived once from its mimetype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// A structured document (`x-sakai/document`).
    Document,
    /// Any other pooled item with a mimetype (images, files, packages).
    Pooled { mime_type: String },
    /// No mimetype, e.g. rows, columns and widget data inside a document.
    Untyped,
}

impl ContentKind {
    pub fn from_mime_type(mime_type: Option<&str>) -> Self {
        match mime_type {
            None | Some("") => ContentKind::Untyped,
            Some(DOCUMENT_MIMETYPE) => ContentKind::Document,
            Some(other) => ContentKind::Pooled {
                mime_type: other.to_string(),
            },
        }
    }
}

/// A content node: a path and its properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    path: String,
    properties: BTreeMap<String, PropertyValue>,
}

impl Content {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn from_properties(
        path: impl Into<String>,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    /// Builder-style property setter.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// A property's value if it is a single string.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(PropertyValue::as_str)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.string(MIMETYPE_FIELD)
    }

    pub fn kind(&self) -> ContentKind {
        ContentKind::from_mime_type(self.mime_type())
    }
}

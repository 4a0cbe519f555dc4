//! `imsmanifest.xml` serialization.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::{Item, Manifest};
use crate::error::{ExportError, Result};

/// Root attributes declaring the IMS CP 1.1 and IMS MD 1.2 schemas.
const NAMESPACE_ATTRIBUTES: [(&str, &str); 4] = [
    ("xmlns", "http://www.imsglobal.org/xsd/imscp_v1p1"),
    ("xmlns:imsmd", "http://www.imsglobal.org/xsd/imsmd_v1p2"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    (
        "xsi:schemaLocation",
        "http://www.imsglobal.org/xsd/imscp_v1p1 http://www.imsglobal.org/xsd/imscp_v1p1.xsd \
         http://www.imsglobal.org/xsd/imsmd_v1p2 http://www.imsglobal.org/xsd/imsmd_v1p2.xsd",
    ),
];

fn xml_error<E: std::fmt::Display>(e: E) -> ExportError {
    ExportError::Xml(e.to_string())
}

pub(crate) fn write_event(w: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    w.write_event(event).map_err(xml_error)
}

pub(crate) fn start(w: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    write_event(w, Event::Start(BytesStart::new(name)))
}

pub(crate) fn end(w: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    write_event(w, Event::End(BytesEnd::new(name)))
}

pub(crate) fn text_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    start(w, name)?;
    write_event(w, Event::Text(BytesText::new(text)))?;
    end(w, name)
}

impl Manifest {
    /// Serialize to `imsmanifest.xml` without namespace declarations.
    pub fn to_xml(&self) -> Result<String> {
        self.to_xml_with(false)
    }

    /// Serialize to `imsmanifest.xml`, optionally declaring the IMS schemas on
    /// the root element.
    pub fn to_xml_with(&self, namespaces: bool) -> Result<String> {
        let mut w = Writer::new(Vec::new());

        write_event(
            &mut w,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        w.get_mut().push(b'\n');

        let mut root = BytesStart::new("manifest");
        if namespaces {
            for attr in NAMESPACE_ATTRIBUTES {
                root.push_attribute(attr);
            }
        }
        write_event(&mut w, Event::Start(root))?;

        start(&mut w, "organizations")?;
        start(&mut w, "organization")?;
        for item in &self.organization.items {
            write_item(&mut w, item)?;
        }
        end(&mut w, "organization")?;
        end(&mut w, "organizations")?;

        start(&mut w, "resources")?;
        for resource in &self.resources {
            let mut elem = BytesStart::new("resource");
            elem.push_attribute(("identifier", resource.identifier.as_str()));
            elem.push_attribute(("href", resource.href.as_str()));
            write_event(&mut w, Event::Empty(elem))?;
        }
        end(&mut w, "resources")?;

        self.metadata.write_into(&mut w)?;

        end(&mut w, "manifest")?;

        String::from_utf8(w.into_inner()).map_err(xml_error)
    }
}

fn write_item(w: &mut Writer<Vec<u8>>, item: &Item) -> Result<()> {
    let mut elem = BytesStart::new("item");
    elem.push_attribute(("identifier", item.identifier.as_str()));
    if let Some(ref identifier_ref) = item.identifier_ref {
        elem.push_attribute(("identifierref", identifier_ref.as_str()));
    }
    write_event(w, Event::Start(elem))?;

    if !item.title.is_empty() {
        text_element(w, "title", &item.title)?;
    }
    for child in &item.children {
        write_item(w, child)?;
    }

    end(w, "item")
}

//! # DOM Module
//!
//! A small read-only element tree built from `quick-xml` events. It offers
//! exactly what the converters need: descendant lookup by qualified tag name
//! (`Placemark`, `gx:Track`, ...), attribute access, normalized text content
//! and serialization back to XML.
//!
//! Tag names are matched literally, prefix included, so `Track` and
//! `gx:Track` are distinct names.

use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn from_start(start: &BytesStart) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let attributes = start
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect();

        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    /// Qualified tag name, e.g. `gx:Track`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute parsed as `f64`; `NaN` when missing or not numeric.
    pub fn attr_f64(&self, key: &str) -> f64 {
        self.attr(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(f64::NAN)
    }

    /// Direct child elements.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// All descendants named `tag`, in document order. The element itself is
    /// not included.
    pub fn descendants<'a>(&'a self, tag: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_descendants(tag, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, tag: &str, found: &mut Vec<&'a Element>) {
        for child in self.children() {
            if child.name == tag {
                found.push(child);
            }
            child.collect_descendants(tag, found);
        }
    }

    /// First descendant named `tag` in document order.
    pub fn first(&self, tag: &str) -> Option<&Element> {
        for child in self.children() {
            if child.name == tag {
                return Some(child);
            }
            if let Some(found) = child.first(tag) {
                return Some(found);
            }
        }
        None
    }

    /// Text and CDATA content directly under this element, with entities
    /// decoded and surrounding whitespace trimmed.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => text.push_str(t),
                Node::Element(_) => {}
            }
        }
        text.trim().to_string()
    }

    /// Text of the first descendant named `tag`, or an empty string.
    pub fn first_text(&self, tag: &str) -> String {
        self.first(tag).map(Element::text).unwrap_or_default()
    }

    /// Serializes the element and its subtree back to XML.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for node in &self.children {
            match node {
                Node::Element(el) => el.write_to(writer)?,
                Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
                Node::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str())))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_reader(xml.as_bytes())
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut reader = Reader::from_reader(reader);
        let mut buf = Vec::new();
        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => open.push(Element::from_start(&e)),
                Event::Empty(e) => attach(&mut open, &mut root, Element::from_start(&e)),
                Event::End(_) => {
                    if let Some(el) = open.pop() {
                        attach(&mut open, &mut root, el);
                    }
                }
                Event::Text(e) => {
                    if let Some(parent) = open.last_mut() {
                        let text = e
                            .unescape()
                            .map(Cow::into_owned)
                            .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                        // whitespace between elements carries nothing
                        if !text.trim().is_empty() {
                            parent.children.push(Node::Text(text));
                        }
                    }
                }
                Event::CData(e) => {
                    if let Some(parent) = open.last_mut() {
                        let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                        parent.children.push(Node::CData(text));
                    }
                }
                Event::Eof => break,
                _ => (),
            }
            buf.clear();
        }

        if let Some(unclosed) = open.pop() {
            return Err(Error::UnclosedElement(unclosed.name));
        }

        let root = root.ok_or(Error::EmptyDocument)?;
        debug!("Parsed XML document with root <{}>", root.name);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// All elements named `tag` in document order, the root included.
    pub fn descendants(&self, tag: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        if self.root.name == tag {
            found.push(&self.root);
        }
        self.root.collect_descendants(tag, &mut found);
        found
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn attach(open: &mut [Element], root: &mut Option<Element>, el: Element) {
    match open.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

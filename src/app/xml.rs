//! Minimal namespace-aware XML tree
//!
//! KML and meta4 documents are small enough to load completely. The reader
//! builds a tree of [`XmlElement`]s and marks which elements belong to the
//! namespace the caller cares about; lookups only ever match those.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

/// One element of a parsed document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name without prefix
    pub name: String,
    /// Whether the element is bound to the requested namespace
    pub in_namespace: bool,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Text before the first child element (character data and CDATA)
    pub text: String,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn open<E>(start: &BytesStart, in_namespace: bool) -> Result<Self, E>
    where
        E: From<quick_xml::Error> + From<AttrError> + From<std::str::Utf8Error>,
    {
        let name = std::str::from_utf8(start.local_name().as_ref())?.to_string();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.local_name().as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            in_namespace,
            attributes,
            ..Default::default()
        })
    }

    fn matches(&self, name: &str) -> bool {
        self.in_namespace && self.name == name
    }

    /// First direct child with the given local name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.matches(name))
    }

    /// All direct children with the given local name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.matches(name))
    }

    /// All descendants with the given local name, in document order
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.matches(name) {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// Text of the first direct child with the given name
    ///
    /// An element that exists but carries no text yields `Some("")`.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Attribute value by local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a document, marking elements bound to `namespace`
///
/// Returns `Ok(None)` for a document without any element.
///
/// # Errors
///
/// Propagates malformed XML, bad attributes and invalid UTF-8 into the
/// caller's error type
pub fn parse_document<E>(content: &[u8], namespace: &str) -> Result<Option<XmlElement>, E>
where
    E: From<quick_xml::Error> + From<AttrError> + From<std::str::Utf8Error>,
{
    let mut reader = NsReader::from_reader(content);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
        let in_namespace =
            matches!(resolved, ResolveResult::Bound(Namespace(ns)) if ns == namespace.as_bytes());

        match event {
            Event::Start(start) => stack.push(XmlElement::open::<E>(&start, in_namespace)?),
            Event::Empty(start) => {
                let element = XmlElement::open::<E>(&start, in_namespace)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut().filter(|c| c.children.is_empty()) {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut().filter(|c| c.children.is_empty()) {
                    current.text.push_str(std::str::from_utf8(&data)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(root)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => tracing::debug!("Ignoring extra top-level element <{}>", element.name),
    }
}

//! Structured record access over XML documents.
//!
//! Every file filestack touches (the catalog, content files and the legacy
//! export) is an XML document. This module parses them into a tree of
//! [`Record`]s and gives a uniform way to read fields, either un-namespaced
//! (`record.field("title")`) or through a namespace prefix
//! (`record.ns(&table, "wp").field("post_name")`).
//!
//! The [`NamespaceTable`] is built once per parse by collecting every prefix
//! declaration in the whole document, regardless of scope, and is returned as
//! part of the [`Document`]. A prefix bound to two different URIs in the same
//! document is rejected: that is valid XML, but the flat table cannot represent it.

use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use log::{debug, error, trace};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};

use crate::{FsError, Result};

/// Prefix to URI bindings collected from a whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceTable {
    bindings: HashMap<String, String>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `uri`. The empty prefix is the default namespace.
    pub fn bind(&mut self, prefix: &str, uri: &str) -> Result<()> {
        match self.bindings.get(prefix) {
            Some(existing) if existing != uri => {
                let message = format!(
                    "namespace prefix '{}' bound to both '{}' and '{}'",
                    prefix, existing, uri
                );
                error!("{}", message);
                Err(FsError::Parse { message })
            }
            Some(_) => Ok(()),
            None => {
                trace!("Binding namespace prefix '{}' to {}", prefix, uri);
                self.bindings.insert(prefix.to_string(), uri.to_string());
                Ok(())
            }
        }
    }

    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Element name as written (`prefix:local`) plus its resolved namespace URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub namespace: Option<String>,
}

impl QName {
    /// An un-namespaced name.
    pub fn plain(local: &str) -> Self {
        Self {
            prefix: None,
            local: local.to_string(),
            namespace: None,
        }
    }

    fn resolve(raw: &str, namespaces: &NamespaceTable) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
                namespace: namespaces.resolve(prefix).map(str::to_string),
            },
            None => Self {
                prefix: None,
                local: raw.to_string(),
                namespace: namespaces.resolve("").map(str::to_string),
            },
        }
    }

    /// The name as it appears in the document.
    pub fn qualified(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(prefix) => Cow::Owned(format!("{}:{}", prefix, self.local)),
            None => Cow::Borrowed(&self.local),
        }
    }
}

/// One XML element: name, attributes, child records and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    name: QName,
    attributes: BTreeMap<String, String>,
    children: Vec<Record>,
    text: String,
}

impl Record {
    /// Creates an empty, un-namespaced record.
    pub fn new(tag: &str) -> Self {
        Self {
            name: QName::plain(tag),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    /// Creates an un-namespaced leaf record holding `text`.
    pub fn leaf(tag: &str, text: impl Into<String>) -> Self {
        let mut record = Self::new(tag);
        record.text = text.into();
        record
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Local part of the record's tag.
    pub fn tag(&self) -> &str {
        &self.name.local
    }

    /// Changes the record's tag, e.g. to move a catalog entry between sections.
    pub fn rename(&mut self, tag: &str) {
        self.name = QName::plain(tag);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), value.to_string());
    }

    pub fn children(&self) -> &[Record] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Record> {
        &mut self.children
    }

    pub fn push_child(&mut self, child: Record) {
        self.children.push(child);
    }

    /// Un-namespaced children with the given tag, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.children
            .iter()
            .filter(move |c| c.name.namespace.is_none() && c.name.local == tag)
    }

    pub fn child(&self, tag: &str) -> Option<&Record> {
        self.children
            .iter()
            .find(|c| c.name.namespace.is_none() && c.name.local == tag)
    }

    /// Text of the first un-namespaced child named `tag`.
    pub fn field(&self, tag: &str) -> Option<&str> {
        self.child(tag).map(Record::text)
    }

    /// Namespaced view of this record. Unknown prefixes fall back to
    /// un-namespaced access.
    pub fn ns<'a>(&'a self, namespaces: &'a NamespaceTable, prefix: &str) -> Scoped<'a> {
        let namespace = namespaces.resolve(prefix);
        if namespace.is_none() {
            debug!("Unknown namespace prefix '{}', using plain lookup", prefix);
        }
        Scoped {
            record: self,
            namespace,
        }
    }

    /// Serializes the record as a standalone UTF-8 document.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| FsError::parse(format!("serialized record is not UTF-8: {}", e)))
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let name = self.name.qualified();
        let mut start = BytesStart::new(name.as_ref());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_ref())))?;
        Ok(())
    }
}

/// A record seen through one namespace.
#[derive(Debug, Clone, Copy)]
pub struct Scoped<'a> {
    record: &'a Record,
    namespace: Option<&'a str>,
}

impl<'a> Scoped<'a> {
    pub fn children_named(&self, tag: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        let namespace = self.namespace;
        self.record
            .children
            .iter()
            .filter(move |c| c.name.namespace.as_deref() == namespace && c.name.local == tag)
    }

    pub fn child(&self, tag: &'a str) -> Option<&'a Record> {
        self.children_named(tag).next()
    }

    pub fn field(&self, tag: &'a str) -> Option<&'a str> {
        self.child(tag).map(Record::text)
    }
}

/// A parsed document: root record plus the namespace table of the whole file.
#[derive(Debug, Clone)]
pub struct Document {
    pub root: Record,
    pub namespaces: NamespaceTable,
}

impl Document {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut namespaces = NamespaceTable::new();
        let mut stack: Vec<Record> = Vec::new();
        let mut root: Option<Record> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let record = open_record(&start, &mut namespaces)?;
                    stack.push(record);
                }
                Event::Empty(start) => {
                    let record = open_record(&start, &mut namespaces)?;
                    close_record(record, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let record = stack
                        .pop()
                        .ok_or_else(|| FsError::parse("closing tag without an open element"))?;
                    close_record(record, &mut stack, &mut root)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(utf8(&data.into_inner())?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(FsError::parse(format!(
                "element <{}> is never closed",
                open.name.qualified()
            )));
        }
        let root = root.ok_or_else(|| FsError::parse("document has no root element"))?;
        Ok(Self { root, namespaces })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Parsing XML document: {}", path.display());
        let xml = fs::read_to_string(path).map_err(|e| {
            error!("Failed to read {}: {}", path.display(), e);
            FsError::Io(e)
        })?;
        Self::parse(&xml).map_err(|e| {
            error!("Failed to parse {}: {}", path.display(), e);
            e
        })
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| FsError::parse(format!("invalid UTF-8: {}", e)))
}

fn open_record(start: &BytesStart<'_>, namespaces: &mut NamespaceTable) -> Result<Record> {
    let mut attributes = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        if key == "xmlns" {
            namespaces.bind("", &value)?;
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.bind(prefix, &value)?;
        }
        attributes.insert(key, value);
    }

    let name = QName::resolve(utf8(start.name().as_ref())?, namespaces);
    Ok(Record {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn close_record(
    mut record: Record,
    stack: &mut [Record],
    root: &mut Option<Record>,
) -> Result<()> {
    // Indentation between child elements is not content.
    if !record.children.is_empty() && record.text.trim().is_empty() {
        record.text.clear();
    }

    match stack.last_mut() {
        Some(parent) => parent.children.push(record),
        None if root.is_some() => {
            return Err(FsError::parse("document has more than one root element"))
        }
        None => *root = Some(record),
    }
    Ok(())
}

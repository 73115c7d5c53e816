//! XML page → nested mapping.
//!
//! Phones return small XML documents whose shape drifts between firmware
//! releases. Pages are converted into a loose tree: leaf elements become
//! text, elements with children become ordered maps, and repeated sibling
//! names collapse into a list. A sibling that appears once stays a single
//! value, so consumers must accept both shapes.
//!
//! Namespace prefixes are dropped (`<ns:Name>` → `Name`), which lets the
//! same tree serve SOAP responses from the call manager.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct XmlError(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlValue {
    Text(String),
    Map(Vec<(String, XmlValue)>),
    List(Vec<XmlValue>),
}

impl XmlValue {
    /// Child value by name, for map nodes.
    pub fn get(&self, key: &str) -> Option<&XmlValue> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[(String, XmlValue)] {
        match self {
            Self::Map(entries) => entries,
            _ => &[],
        }
    }

    /// Values of `key` as a slice-like list: absent → empty, single → one,
    /// repeated → all of them.
    pub fn get_all(&self, key: &str) -> Vec<&XmlValue> {
        match self.get(key) {
            None => Vec::new(),
            Some(Self::List(items)) => items.iter().collect(),
            Some(value) => vec![value],
        }
    }

    /// Every value stored under `key` anywhere below this node, depth first.
    pub fn find_all<'a>(&'a self, key: &str, out: &mut Vec<&'a XmlValue>) {
        match self {
            Self::Text(_) => {}
            Self::List(items) => {
                for item in items {
                    item.find_all(key, out);
                }
            }
            Self::Map(entries) => {
                for (k, v) in entries {
                    if k == key {
                        match v {
                            Self::List(items) => out.extend(items.iter()),
                            other => out.push(other),
                        }
                    }
                    v.find_all(key, out);
                }
            }
        }
    }

    /// First text value stored under `key` anywhere below this node.
    pub fn find_text(&self, key: &str) -> Option<&str> {
        let mut found = Vec::new();
        self.find_all(key, &mut found);
        found.into_iter().find_map(|v| v.as_text())
    }
}

/// A parsed page: root element name plus its converted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: String,
    pub value: XmlValue,
}

impl XmlDocument {
    /// Content of the top-level container, if the root carries that name.
    pub fn container(&self, name: &str) -> Option<&XmlValue> {
        (self.root == name).then_some(&self.value)
    }
}

struct Frame {
    name: String,
    text: String,
    children: Vec<(String, XmlValue)>,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn finish(self) -> (String, XmlValue) {
        let value = if self.children.is_empty() {
            XmlValue::Text(self.text.trim().to_string())
        } else {
            XmlValue::Map(group_repeated(self.children))
        };
        (self.name, value)
    }
}

/// Merge repeated sibling names into a list at the first occurrence.
fn group_repeated(children: Vec<(String, XmlValue)>) -> Vec<(String, XmlValue)> {
    let mut grouped: Vec<(String, XmlValue)> = Vec::with_capacity(children.len());
    for (name, value) in children {
        match grouped.iter_mut().find(|(k, _)| *k == name) {
            Some((_, XmlValue::List(items))) => items.push(value),
            Some((_, existing)) => {
                let first = std::mem::replace(existing, XmlValue::List(Vec::new()));
                *existing = XmlValue::List(vec![first, value]);
            }
            None => grouped.push((name, value)),
        }
    }
    grouped
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Parse a whole document. Fails on anything that is not well-formed.
pub fn parse_document(input: &str) -> Result<XmlDocument, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, XmlValue)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            XmlError(format!("at byte {}: {e}", reader.buffer_position()))
        })?;

        match event {
            Event::Start(e) => {
                let name = element_name(e.local_name().as_ref());
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError(format!("junk after document element: <{name}>")));
                }
                stack.push(Frame::new(name));
            }
            Event::Empty(e) => {
                let leaf = (element_name(e.local_name().as_ref()), XmlValue::Text(String::new()));
                match stack.last_mut() {
                    Some(parent) => parent.children.push(leaf),
                    None if root.is_none() => root = Some(leaf),
                    None => {
                        return Err(XmlError(format!("junk after document element: <{}/>", leaf.0)));
                    }
                }
            }
            Event::Text(t) => match stack.last_mut() {
                Some(frame) => {
                    let text = t
                        .unescape()
                        .map_err(|e| XmlError(format!("bad text in <{}>: {e}", frame.name)))?;
                    frame.text.push_str(&text);
                }
                None if t.iter().all(u8::is_ascii_whitespace) => {}
                None => return Err(XmlError("text outside the document element".into())),
            },
            Event::CData(c) => match stack.last_mut() {
                Some(frame) => frame.text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                None => return Err(XmlError("CDATA outside the document element".into())),
            },
            Event::End(_) => {
                let Some(frame) = stack.pop() else {
                    return Err(XmlError("closing tag without an open element".into()));
                };
                let finished = frame.finish();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(finished),
                    None => root = Some(finished),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError(format!("document ends inside <{}>", open.name)));
    }

    let (root, value) = root.ok_or_else(|| XmlError("no root element".into()))?;
    Ok(XmlDocument { root, value })
}

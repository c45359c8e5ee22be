//! Namespace-agnostic XML element tree.
//!
//! Harvest envelopes (SRU, OAI-PMH), RDF records and the backend's system
//! info page are small enough to load whole. Element and attribute names are
//! stored by local name so `dcndl:BibResource` and `BibResource` match alike.

use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    /// Concatenated direct text content, trimmed.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first direct child named `name`, if non-empty.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|c| c.text.clone())
            .filter(|t| !t.is_empty())
    }

    /// Follows a chain of direct children.
    pub fn path(&self, names: &[&str]) -> Option<&XmlElement> {
        let mut cur = self;
        for n in names {
            cur = cur.child(n)?;
        }
        Some(cur)
    }

    /// Depth-first search for the first element (self included) named `name`.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Depth-first search for every element named `name`.
    pub fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        if self.name == name {
            out.push(self);
        }
        for c in &self.children {
            c.find_all(name, out);
        }
    }

    /// Depth-first search for the first element whose attribute `attr` equals `value`.
    pub fn find_by_attr(&self, attr: &str, value: &str) -> Option<&XmlElement> {
        if self.attr(attr) == Some(value) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|c| c.find_by_attr(attr, value))
    }
}

fn local(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn open(e: &BytesStart<'_>) -> XmlElement {
    let attrs = e
        .attributes()
        .flatten()
        .map(|a| {
            (
                local(a.key.local_name().as_ref()),
                a.unescape_value().unwrap_or_default().into_owned(),
            )
        })
        .collect();
    XmlElement {
        name: local(e.local_name().as_ref()),
        attrs,
        ..Default::default()
    }
}

fn close(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>) {
    if let Some(mut done) = stack.pop() {
        done.text = done.text.trim().to_string();
        match stack.last_mut() {
            Some(parent) => parent.children.push(done),
            None => {
                if root.is_none() {
                    *root = Some(done);
                }
            }
        }
    }
}

/// Parses `xml` into its root element.
pub fn parse(xml: &str) -> Result<XmlElement, quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(open(&e)),
            Event::Empty(e) => {
                stack.push(open(&e));
                close(&mut stack, &mut root);
            }
            Event::End(_) => close(&mut stack, &mut root),
            Event::Text(te) => {
                if let Some(cur) = stack.last_mut() {
                    cur.text.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Event::CData(cd) => {
                if let Some(cur) = stack.last_mut() {
                    cur.text.push_str(&String::from_utf8_lossy(&cd.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Unclosed elements in truncated input still yield a tree.
    while !stack.is_empty() {
        close(&mut stack, &mut root);
    }
    Ok(root.unwrap_or_default())
}

/// Last `/`- or `#`-separated segment of a URI, e.g. the `ISBN` in
/// `http://ndl.go.jp/dcndl/terms/ISBN`.
pub fn last_segment(uri: &str) -> &str {
    let trimmed = uri.trim_end_matches(['/', '#']);
    trimmed
        .rsplit(['/', '#'])
        .next()
        .unwrap_or(trimmed)
}

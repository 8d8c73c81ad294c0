//! CSS selectors over element snapshots
//!
//! Parsing and matching are done by `scraper`. A snapshot tree is rendered
//! into an HTML document whose elements carry their `NodeId` in a private
//! attribute, so matches map straight back to snapshot nodes. Trees the HTML
//! parser would restructure (block content inside `<p>`, nested `<a>` or
//! `<button>`, table fragments) match the way the parser rebuilds them.

use std::fmt;
use std::str::FromStr;

use scraper::{ElementRef, Html};
use thiserror::Error;

use super::dom::{Element, Node, NodeId};

/// Attribute carrying the snapshot node id in rendered documents
const NODE_ID_ATTR: &str = "data-snapshot-node";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("invalid selector `{selector}`: {reason}")]
    Invalid { selector: String, reason: String },
}

/// Parsed selector list
#[derive(Clone)]
pub struct Selector {
    text: String,
    inner: scraper::Selector,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SelectorError::Empty);
        }
        let inner = scraper::Selector::parse(text).map_err(|e| SelectorError::Invalid {
            selector: text.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            text: text.to_string(),
            inner,
        })
    }

    /// Parses one of the crate's compile-time selectors
    pub(crate) fn builtin(input: &str) -> Self {
        Self::parse(input).expect("failed to compile built-in selector")
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn matches_ref(&self, element: &ElementRef<'_>) -> bool {
        self.inner.matches(element)
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Selector {}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.text).finish()
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A snapshot tree parsed as an HTML document, ready for matching
pub(crate) struct RenderedTree {
    html: Html,
}

impl RenderedTree {
    pub(crate) fn new(root: &Element) -> Self {
        let mut out = String::from("<!DOCTYPE html>");
        render(root, &mut out);
        Self {
            html: Html::parse_document(&out),
        }
    }

    /// Ids of all matching snapshot elements, in document order
    pub(crate) fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.html
            .select(&selector.inner)
            .filter_map(|el| node_id(&el))
            .collect()
    }

    /// Nearest of `id` and its ancestors that matches `selector`
    pub(crate) fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        let start = self.element(id)?;
        std::iter::once(start)
            .chain(start.ancestors().filter_map(ElementRef::wrap))
            .filter(|el| node_id(el).is_some())
            .find(|el| selector.matches_ref(el))
            .and_then(|el| node_id(&el))
    }

    /// Nearest proper ancestor of `id` that is a snapshot element
    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.element(id)?
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find_map(|el| node_id(&el))
    }

    /// Whether any element strictly below `id` matches `selector`
    pub(crate) fn has_descendant(&self, id: NodeId, selector: &Selector) -> bool {
        let Some(start) = self.element(id) else {
            return false;
        };
        start
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .any(|el| selector.matches_ref(&el))
    }

    fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| node_id(el) == Some(id))
    }
}

fn node_id(element: &ElementRef<'_>) -> Option<NodeId> {
    element
        .value()
        .attr(NODE_ID_ATTR)
        .and_then(|raw| raw.parse().ok())
        .map(NodeId)
}

fn render(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    push_attr(out, NODE_ID_ATTR, &element.id.0.to_string());
    if !element.classes.is_empty() {
        push_attr(out, "class", &element.classes.join(" "));
    }
    for (name, value) in &element.attributes {
        if name == "class" || name == NODE_ID_ATTR || !is_attr_name(name) {
            continue;
        }
        push_attr(out, name, value);
    }
    out.push('>');

    for child in &element.children {
        match child {
            Node::Element(el) => render(el, out),
            Node::Text(text) => push_escaped(out, text, false),
        }
    }

    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    push_escaped(out, value, true);
    out.push('"');
}

fn push_escaped(out: &mut String, text: &str, in_attr: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attr => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

fn is_attr_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| !c.is_whitespace() && !matches!(c, '"' | '\'' | '>' | '/' | '=' | '<'))
}

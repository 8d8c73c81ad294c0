//! Owned element-tree snapshots of the observed page
//!
//! The host hands out `Element` values that are detached copies of a live
//! node and its subtree. Every element carries the `NodeId` of the live node
//! it was copied from, so later reads can ask the host for a fresh copy.

use std::collections::BTreeMap;

use super::selector::{RenderedTree, Selector};

/// Stable identity of a live node in the host document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// A child of an element: either another element or a text run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }
}

/// Snapshot of one element and its subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: NodeId,
    pub tag: String,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Node>,
    /// Whether the element is display-suppressed (computed `display: none`)
    pub hidden: bool,
}

impl Element {
    pub fn new(id: NodeId, tag: &str) -> Self {
        Self {
            id,
            tag: tag.to_ascii_lowercase(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            hidden: false,
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        for c in class.split_whitespace() {
            if !self.has_class(c) {
                self.classes.push(c.to_string());
            }
        }
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(text.to_string()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Concatenated text of the whole subtree, hidden parts included
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out, &|_: &Element| true);
        out
    }

    /// Concatenated text of the subtree, skipping hidden elements
    pub fn visible_text(&self) -> String {
        self.visible_text_excluding(|_| false)
    }

    /// Visible text that also skips every element for which `skip` holds
    pub fn visible_text_excluding<F>(&self, skip: F) -> String
    where
        F: Fn(&Element) -> bool,
    {
        let mut out = String::new();
        if !self.hidden {
            self.collect_text(&mut out, &|el: &Element| !el.hidden && !skip(el));
        }
        out
    }

    fn collect_text(&self, out: &mut String, include: &dyn Fn(&Element) -> bool) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) if include(el) => el.collect_text(out, include),
                Node::Element(_) => {}
            }
        }
    }

    /// First descendant (not self) matching `selector`, in document order
    pub fn query(&self, selector: &Selector) -> Option<&Element> {
        RenderedTree::new(self)
            .select(selector)
            .into_iter()
            .find(|id| *id != self.id)
            .and_then(|id| self.find_by_id(id))
    }

    /// All descendants (not self) matching `selector`, in document order
    pub fn query_all(&self, selector: &Selector) -> Vec<&Element> {
        RenderedTree::new(self)
            .select(selector)
            .into_iter()
            .filter(|id| *id != self.id)
            .filter_map(|id| self.find_by_id(id))
            .collect()
    }

    /// Depth-first search for the element with `id`, self included
    pub fn find_by_id(&self, id: NodeId) -> Option<&Element> {
        if self.id == id {
            return Some(self);
        }
        self.child_elements().find_map(|c| c.find_by_id(id))
    }

    pub(crate) fn find_by_id_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            Node::Element(el) => el.find_by_id_mut(id),
            Node::Text(_) => None,
        })
    }

    /// Detaches the descendant `id`, returning its former parent's id
    pub(crate) fn remove_descendant(&mut self, id: NodeId) -> Option<NodeId> {
        let position = self
            .children
            .iter()
            .position(|child| matches!(child, Node::Element(el) if el.id == id));
        if let Some(index) = position {
            self.children.remove(index);
            return Some(self.id);
        }
        self.children.iter_mut().find_map(|child| match child {
            Node::Element(el) => el.remove_descendant(id),
            Node::Text(_) => None,
        })
    }
}

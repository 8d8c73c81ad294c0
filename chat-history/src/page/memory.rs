//! In-memory host document
//!
//! `MemoryPage` plays the part of the browser: it holds a mutable element
//! tree and an address, answers [`Page`] reads, and queues mutation records
//! for every live observation whose scope covers a change. Queued records are
//! handed out per subscription with [`MemoryPage::take_batches`], mirroring
//! how a browser delivers one batch per observer per task.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::dom::{Element, Node, NodeId};
use super::selector::{RenderedTree, Selector};
use super::{
    ChangeObserver, ClickEvent, MutationKind, MutationRecord, ObservationHandle, ObserveOptions,
    Page, SubscriptionId,
};

#[derive(Debug)]
struct Observation {
    id: SubscriptionId,
    target: NodeId,
    options: ObserveOptions,
}

#[derive(Debug)]
struct Inner {
    address: String,
    root: Element,
    next_node: u64,
    next_subscription: u64,
    observations: Vec<Observation>,
    queued: Vec<(SubscriptionId, Vec<MutationRecord>)>,
}

impl Inner {
    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.root
            .find_by_id(ancestor)
            .is_some_and(|el| el.find_by_id(node).is_some())
    }

    fn notify(&mut self, record: MutationRecord) {
        let interested: Vec<SubscriptionId> = self
            .observations
            .iter()
            .filter(|o| o.options.wants(&record.kind))
            .filter(|o| {
                o.target == record.target
                    || (o.options.subtree && self.is_within(record.target, o.target))
            })
            .map(|o| o.id)
            .collect();

        for id in interested {
            match self.queued.iter().position(|(queued_id, _)| *queued_id == id) {
                Some(index) => self.queued[index].1.push(record.clone()),
                None => self.queued.push((id, vec![record.clone()])),
            }
        }
    }

    fn disconnect(&mut self, id: SubscriptionId) {
        self.observations.retain(|o| o.id != id);
        self.queued.retain(|(queued_id, _)| *queued_id != id);
    }
}

/// Shared, single-threaded in-memory page. Clones share the same document.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryPage {
    /// Creates a page whose document is a bare `<body>`
    pub fn new(address: &str) -> Self {
        let root = Element::new(NodeId(0), "body");
        Self {
            inner: Rc::new(RefCell::new(Inner {
                address: address.to_string(),
                root,
                next_node: 1,
                next_subscription: 1,
                observations: Vec::new(),
                queued: Vec::new(),
            })),
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.inner.borrow().root.id
    }

    /// Fresh detached element with a unique id, for building subtrees
    pub fn create_element(&self, tag: &str) -> Element {
        let mut inner = self.inner.borrow_mut();
        let id = NodeId(inner.next_node);
        inner.next_node += 1;
        Element::new(id, tag)
    }

    /// Moves the page to a new address. Navigation produces no mutation records.
    pub fn navigate(&self, address: &str) {
        self.inner.borrow_mut().address = address.to_string();
    }

    /// Inserts `child` as the last child of `parent`. Returns false if
    /// `parent` is not in the document.
    pub fn append_child(&self, parent: NodeId, child: Element) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(parent_el) = inner.root.find_by_id_mut(parent) else {
            return false;
        };
        parent_el.children.push(Node::Element(child.clone()));
        inner.notify(MutationRecord {
            kind: MutationKind::ChildList,
            target: parent,
            added_nodes: vec![Node::Element(child)],
        });
        true
    }

    /// Detaches a node (and its subtree) from the document
    pub fn remove(&self, id: NodeId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(parent) = inner.root.remove_descendant(id) else {
            return false;
        };
        inner.notify(MutationRecord {
            kind: MutationKind::ChildList,
            target: parent,
            added_nodes: Vec::new(),
        });
        true
    }

    /// Replaces the text runs of an element, keeping its child elements
    pub fn set_text(&self, id: NodeId, text: &str) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(el) = inner.root.find_by_id_mut(id) else {
            return false;
        };
        el.children.retain(|c| matches!(c, Node::Element(_)));
        el.children.insert(0, Node::Text(text.to_string()));
        inner.notify(MutationRecord {
            kind: MutationKind::CharacterData,
            target: id,
            added_nodes: Vec::new(),
        });
        true
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(el) = inner.root.find_by_id_mut(id) else {
            return false;
        };
        el.attributes.insert(name.to_string(), value.to_string());
        inner.notify(MutationRecord {
            kind: MutationKind::Attributes {
                name: name.to_string(),
            },
            target: id,
            added_nodes: Vec::new(),
        });
        true
    }

    /// Toggles display suppression; reported as a `style` attribute change
    pub fn set_hidden(&self, id: NodeId, hidden: bool) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(el) = inner.root.find_by_id_mut(id) else {
            return false;
        };
        el.hidden = hidden;
        inner.notify(MutationRecord {
            kind: MutationKind::Attributes {
                name: "style".to_string(),
            },
            target: id,
            added_nodes: Vec::new(),
        });
        true
    }

    /// Drains queued notification batches, one per subscription, in the
    /// order each subscription first received a record
    pub fn take_batches(&self) -> Vec<(SubscriptionId, Vec<MutationRecord>)> {
        std::mem::take(&mut self.inner.borrow_mut().queued)
    }

    /// Number of observations that have not been disconnected
    pub fn live_observations(&self) -> usize {
        self.inner.borrow().observations.len()
    }

    /// Click event whose composed path runs from `target` up to the root
    pub fn click_event(&self, target: NodeId) -> Option<ClickEvent> {
        let inner = self.inner.borrow();
        let chain = lineage(&inner.root, target)?;
        Some(ClickEvent::new(chain.into_iter().rev().cloned().collect()))
    }

    /// Node observed by a live subscription
    pub fn observed_target(&self, id: SubscriptionId) -> Option<NodeId> {
        self.inner
            .borrow()
            .observations
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.target)
    }
}

/// Elements from `root` down to `target`, both included
fn lineage(root: &Element, target: NodeId) -> Option<Vec<&Element>> {
    fn trail<'a>(el: &'a Element, target: NodeId, out: &mut Vec<&'a Element>) -> bool {
        out.push(el);
        if el.id == target {
            return true;
        }
        for child in el.child_elements() {
            if trail(child, target, out) {
                return true;
            }
        }
        out.pop();
        false
    }

    let mut chain = Vec::new();
    trail(root, target, &mut chain).then_some(chain)
}

impl Page for MemoryPage {
    fn address(&self) -> String {
        self.inner.borrow().address.clone()
    }

    fn query(&self, selector: &Selector) -> Option<Element> {
        let inner = self.inner.borrow();
        RenderedTree::new(&inner.root)
            .select(selector)
            .into_iter()
            .find_map(|id| inner.root.find_by_id(id).cloned())
    }

    fn query_all(&self, selector: &Selector) -> Vec<Element> {
        let inner = self.inner.borrow();
        RenderedTree::new(&inner.root)
            .select(selector)
            .into_iter()
            .filter_map(|id| inner.root.find_by_id(id).cloned())
            .collect()
    }

    fn element(&self, id: NodeId) -> Option<Element> {
        self.inner.borrow().root.find_by_id(id).cloned()
    }

    fn is_displayed(&self, id: NodeId) -> bool {
        let inner = self.inner.borrow();
        match lineage(&inner.root, id) {
            Some(chain) => chain.iter().all(|el| !el.hidden),
            None => false,
        }
    }
}

struct MemoryHandle {
    id: SubscriptionId,
    inner: Weak<RefCell<Inner>>,
}

impl ObservationHandle for MemoryHandle {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn disconnect(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.borrow_mut().disconnect(self.id);
        }
    }
}

impl ChangeObserver for MemoryPage {
    fn observe(&self, target: NodeId, options: ObserveOptions) -> Box<dyn ObservationHandle> {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.observations.push(Observation {
            id,
            target,
            options,
        });
        Box::new(MemoryHandle {
            id,
            inner: Rc::downgrade(&self.inner),
        })
    }
}

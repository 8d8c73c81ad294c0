//! Page model: element snapshots, selectors and the host seams
//!
//! The capture pipeline never touches a live document directly. It reads
//! through [`Page`], subscribes through [`ChangeObserver`] and receives
//! click events and mutation batches from whoever hosts it.

pub mod dom;
pub mod memory;
pub mod selector;

pub use dom::{Element, Node, NodeId};
pub use memory::MemoryPage;
pub(crate) use selector::RenderedTree;
pub use selector::{Selector, SelectorError};

/// Read access to the observed page
pub trait Page {
    /// Current address (URL) of the page
    fn address(&self) -> String;
    /// First element in document order matching `selector`
    fn query(&self, selector: &Selector) -> Option<Element>;
    /// All elements in document order matching `selector`
    fn query_all(&self, selector: &Selector) -> Vec<Element>;
    /// Fresh snapshot of a live node, or None once it left the document
    fn element(&self, id: NodeId) -> Option<Element>;
    /// False if the node or any ancestor is display-suppressed, or the node
    /// left the document
    fn is_displayed(&self, id: NodeId) -> bool;
}

/// Which kinds of change a subscription wants delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
    pub character_data: bool,
}

impl ObserveOptions {
    /// Insertions anywhere below the target
    pub const fn child_list_subtree() -> Self {
        Self {
            child_list: true,
            subtree: true,
            attributes: false,
            character_data: false,
        }
    }

    /// Structural, attribute and text changes anywhere below the target
    pub const fn everything() -> Self {
        Self {
            child_list: true,
            subtree: true,
            attributes: true,
            character_data: true,
        }
    }

    pub fn wants(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes { .. } => self.attributes,
            MutationKind::CharacterData => self.character_data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes { name: String },
    CharacterData,
}

/// One entry of a notification batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Node whose children, attributes or text changed
    pub target: NodeId,
    /// Nodes inserted under `target` (child-list records only)
    pub added_nodes: Vec<Node>,
}

/// Host-side handle of one live observation
pub trait ObservationHandle {
    fn id(&self) -> SubscriptionId;
    /// Stop delivery; nothing is delivered for this id afterwards
    fn disconnect(&mut self);
}

/// Change-notification service offered by the host
pub trait ChangeObserver {
    fn observe(&self, target: NodeId, options: ObserveOptions) -> Box<dyn ObservationHandle>;
}

/// Owned subscription; released explicitly or on drop
pub struct Subscription {
    id: SubscriptionId,
    target: NodeId,
    handle: Option<Box<dyn ObservationHandle>>,
}

impl Subscription {
    pub fn open(observer: &dyn ChangeObserver, target: NodeId, options: ObserveOptions) -> Self {
        let handle = observer.observe(target, options);
        Self {
            id: handle.id(),
            target,
            handle: Some(handle),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Disconnects the host observation. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.disconnect();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("live", &self.is_live())
            .finish()
    }
}

/// A capture-phase click, with the composed path from target to root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub path: Vec<Element>,
}

impl ClickEvent {
    pub fn new(path: Vec<Element>) -> Self {
        Self { path }
    }
}

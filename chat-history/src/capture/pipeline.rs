//! Capture state machine
//!
//! One attempt runs from a send click to a committed record:
//!
//! ```text
//! Idle --click--> TriggerCaptured --settled--> AwaitingItem --item inserted--> AwaitingLabel --label--> Idle
//! ```
//!
//! The machine owns whatever subscriptions the current stage needs, inside
//! the state variant itself, so leaving a stage (by advancing, aborting or
//! being pre-empted by a newer trigger) releases them. Waiting stages have
//! no timeout.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;

use crate::capture::address::{is_composer_origin, is_resolved_conversation_address};
use crate::capture::context::{ContextExtractor, ModelCatalog};
use crate::capture::models::{CaptureContext, ConversationRecord};
use crate::capture::store::RecordStore;
use crate::capture::trigger::SendControlDetector;
use crate::config::{default_utc_offset, DEFAULT_SETTLE_DELAY};
use crate::page::{
    ChangeObserver, ClickEvent, Element, MutationKind, MutationRecord, Node, NodeId,
    ObserveOptions, Page, Selector, Subscription, SubscriptionId,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static CONTAINER_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::builtin(r#"conversations-list[data-test-id="all-conversations"]"#)
});

const ITEM_GROUP_CLASS: &str = "conversation-items-container";

static ITEM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::builtin(r#"div[data-test-id="conversation"]"#));

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::builtin(".conversation-title"));

const TITLE_COVER_CLASS: &str = "conversation-title-cover";

/// Timing and zone parameters of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub settle_delay: Duration,
    pub utc_offset: FixedOffset,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            utc_offset: default_utc_offset(),
        }
    }
}

pub trait Clock {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall-clock time in `offset`, `YYYY-MM-DDTHH:MM:SS`
pub fn format_timestamp(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string()
}

/// Issued per trigger; the host hands it back once the settle delay elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettleTicket(u64);

impl SettleTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The conversation list was not on the page after the settle delay
    ContainerMissing,
    /// The new conversation item left the document before it had a label
    ItemMissing,
    /// The page moved away from the captured conversation
    AddressChanged { expected: String, actual: String },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::ContainerMissing => f.write_str("conversation list container not found"),
            AbortReason::ItemMissing => f.write_str("conversation item left the document"),
            AbortReason::AddressChanged { expected, actual } => {
                write!(f, "address changed from {} to {}", expected, actual)
            }
        }
    }
}

/// How an attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Committed(ConversationRecord),
    /// The store refused the record (duplicate, invalid or unsaved)
    Rejected(ConversationRecord),
    Aborted(AbortReason),
}

/// Observable stage, for hosts and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    TriggerCaptured,
    AwaitingItem,
    AwaitingLabel,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::TriggerCaptured => "trigger captured",
            PipelineStage::AwaitingItem => "awaiting item",
            PipelineStage::AwaitingLabel => "awaiting label",
        };
        f.write_str(name)
    }
}

/// Everything known about the attempt once its item appeared
#[derive(Debug)]
struct PendingCapture {
    timestamp: String,
    address: String,
    item: NodeId,
    context: CaptureContext,
}

#[derive(Debug)]
enum PipelineState {
    Idle,
    TriggerCaptured {
        ticket: SettleTicket,
        context: CaptureContext,
    },
    AwaitingItem {
        context: CaptureContext,
        container: Subscription,
    },
    AwaitingLabel {
        pending: PendingCapture,
        item: Subscription,
    },
}

impl PipelineState {
    fn stage(&self) -> PipelineStage {
        match self {
            PipelineState::Idle => PipelineStage::Idle,
            PipelineState::TriggerCaptured { .. } => PipelineStage::TriggerCaptured,
            PipelineState::AwaitingItem { .. } => PipelineStage::AwaitingItem,
            PipelineState::AwaitingLabel { .. } => PipelineStage::AwaitingLabel,
        }
    }
}

pub struct CaptureMachine {
    page: Rc<dyn Page>,
    observer: Rc<dyn ChangeObserver>,
    store: RecordStore,
    clock: Rc<dyn Clock>,
    catalog: ModelCatalog,
    detector: SendControlDetector,
    settings: CaptureSettings,
    state: PipelineState,
    next_ticket: u64,
}

impl CaptureMachine {
    pub fn new(
        page: Rc<dyn Page>,
        observer: Rc<dyn ChangeObserver>,
        store: RecordStore,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            page,
            observer,
            store,
            clock: Rc::new(SystemClock),
            catalog: ModelCatalog::default(),
            detector: SendControlDetector::default(),
            settings,
            state: PipelineState::Idle,
            next_ticket: 1,
        }
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_detector(mut self, detector: SendControlDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn stage(&self) -> PipelineStage {
        self.state.stage()
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The one subscription the current stage holds, if any
    pub fn live_subscription(&self) -> Option<SubscriptionId> {
        match &self.state {
            PipelineState::AwaitingItem { container, .. } if container.is_live() => {
                Some(container.id())
            }
            PipelineState::AwaitingLabel { item, .. } if item.is_live() => Some(item.id()),
            _ => None,
        }
    }

    /// Entry point for capture-phase clicks. Only enabled send controls start
    /// an attempt.
    pub fn on_click(&mut self, event: &ClickEvent) -> Option<SettleTicket> {
        if !self.detector.is_send_click(event) {
            return None;
        }
        self.on_trigger()
    }

    /// Starts a new attempt from the composer, pre-empting any attempt in
    /// flight. The returned ticket must be handed to
    /// [`CaptureMachine::on_settled`] after the settle delay.
    pub fn on_trigger(&mut self) -> Option<SettleTicket> {
        let address = self.page.address();
        if !is_composer_origin(&address) {
            log::debug!(
                target: crate::LOG_TARGET,
                "Send clicked outside the composer ({}), not capturing",
                address
            );
            return None;
        }

        let context = ContextExtractor::new(self.page.as_ref(), &self.catalog).snapshot();

        let previous = self.take_state();
        if !matches!(previous, PipelineState::Idle) {
            log::info!(
                target: crate::LOG_TARGET,
                "New trigger discards the attempt that was {}",
                previous.stage()
            );
        }
        drop(previous);

        let ticket = SettleTicket(self.next_ticket);
        self.next_ticket += 1;
        log::info!(
            target: crate::LOG_TARGET,
            "Captured trigger (model {:?}, {} attachment(s)), waiting {:?}",
            context.model_name,
            context.attached_files.len(),
            self.settings.settle_delay
        );
        self.state = PipelineState::TriggerCaptured { ticket, context };
        Some(ticket)
    }

    /// Settle delay elapsed: look for the conversation list and watch it
    pub fn on_settled(&mut self, ticket: SettleTicket) -> Option<CaptureOutcome> {
        let context = match self.take_state() {
            PipelineState::TriggerCaptured {
                ticket: current,
                context,
            } if current == ticket => context,
            other => {
                log::debug!(
                    target: crate::LOG_TARGET,
                    "Ignoring stale settle ticket {} while {}",
                    ticket.value(),
                    other.stage()
                );
                self.state = other;
                return None;
            }
        };

        let Some(container) = self.page.query(&CONTAINER_SELECTOR) else {
            return Some(self.abort(AbortReason::ContainerMissing));
        };

        let subscription = Subscription::open(
            self.observer.as_ref(),
            container.id,
            ObserveOptions::child_list_subtree(),
        );
        log::info!(
            target: crate::LOG_TARGET,
            "Watching conversation list for the new item"
        );
        self.state = PipelineState::AwaitingItem {
            context,
            container: subscription,
        };
        None
    }

    /// Delivers one notification batch. Batches for anything but the
    /// current stage's subscription are ignored.
    pub fn on_batch(
        &mut self,
        subscription: SubscriptionId,
        records: &[MutationRecord],
    ) -> Option<CaptureOutcome> {
        if self.live_subscription() != Some(subscription) {
            log::debug!(
                target: crate::LOG_TARGET,
                "Ignoring batch of {} record(s) for retired subscription {:?}",
                records.len(),
                subscription
            );
            return None;
        }

        match self.stage() {
            PipelineStage::AwaitingItem => self.scan_for_item(records),
            PipelineStage::AwaitingLabel => self.check_label(),
            PipelineStage::Idle | PipelineStage::TriggerCaptured => None,
        }
    }

    fn scan_for_item(&mut self, records: &[MutationRecord]) -> Option<CaptureOutcome> {
        let address = self.page.address();
        if !is_resolved_conversation_address(&address) {
            log::debug!(
                target: crate::LOG_TARGET,
                "Address {} not resolved yet, still waiting",
                address
            );
            return None;
        }

        let item_id = find_inserted_item(records)?;

        let PipelineState::AwaitingItem {
            context,
            mut container,
        } = self.take_state()
        else {
            return None;
        };
        container.release();

        let timestamp = format_timestamp(self.clock.now_utc(), self.settings.utc_offset);
        let item = Subscription::open(self.observer.as_ref(), item_id, ObserveOptions::everything());
        log::info!(
            target: crate::LOG_TARGET,
            "Conversation item appeared for {}, waiting for its title",
            address
        );
        self.state = PipelineState::AwaitingLabel {
            pending: PendingCapture {
                timestamp,
                address,
                item: item_id,
                context,
            },
            item,
        };
        self.check_label()
    }

    fn check_label(&mut self) -> Option<CaptureOutcome> {
        let PipelineState::AwaitingLabel { pending, .. } = &self.state else {
            return None;
        };
        let (expected, item_id) = (pending.address.clone(), pending.item);

        let actual = self.page.address();
        if actual != expected {
            return Some(self.abort(AbortReason::AddressChanged { expected, actual }));
        }

        let Some(item) = self.page.element(item_id) else {
            return Some(self.abort(AbortReason::ItemMissing));
        };
        if !self.page.is_displayed(item_id) {
            log::debug!(target: crate::LOG_TARGET, "Conversation item not displayed yet");
            return None;
        }

        let title = read_item_label(&item)?;

        let PipelineState::AwaitingLabel { pending, mut item } = self.take_state() else {
            return None;
        };
        item.release();

        let record = ConversationRecord::from_capture(
            pending.timestamp,
            pending.address,
            title,
            pending.context,
        );
        if self.store.try_append(record.clone()) {
            Some(CaptureOutcome::Committed(record))
        } else {
            Some(CaptureOutcome::Rejected(record))
        }
    }

    fn abort(&mut self, reason: AbortReason) -> CaptureOutcome {
        let stage = self.state.stage();
        drop(self.take_state());
        log::warn!(
            target: crate::LOG_TARGET,
            "Capture aborted while {}: {}",
            stage,
            reason
        );
        CaptureOutcome::Aborted(reason)
    }

    fn take_state(&mut self) -> PipelineState {
        std::mem::replace(&mut self.state, PipelineState::Idle)
    }
}

impl fmt::Debug for CaptureMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureMachine")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// First item inside an inserted item group, in delivery order
fn find_inserted_item(records: &[MutationRecord]) -> Option<NodeId> {
    records
        .iter()
        .filter(|record| record.kind == MutationKind::ChildList)
        .flat_map(|record| record.added_nodes.iter())
        .filter_map(Node::as_element)
        .filter(|group| group.has_class(ITEM_GROUP_CLASS))
        .find_map(|group| group.query(&ITEM_SELECTOR).map(|item| item.id))
}

/// Visible label of a conversation item, if it has one yet
fn read_item_label(item: &Element) -> Option<String> {
    let title = item.query(&TITLE_SELECTOR).unwrap_or(item);
    if title.hidden {
        return None;
    }

    let direct = title.children.iter().find_map(|child| match child {
        Node::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    });
    let label = direct.unwrap_or_else(|| {
        title
            .visible_text_excluding(|el| el.has_class(TITLE_COVER_CLASS))
            .trim()
            .to_string()
    });
    (!label.is_empty()).then_some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemoryPage;
    use crate::storage::MemoryKeyValueStore;
    use chrono::TimeZone;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now_utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct Fixture {
        page: MemoryPage,
        list: NodeId,
        backend: Rc<MemoryKeyValueStore>,
        machine: CaptureMachine,
    }

    fn fixture() -> Fixture {
        let page = MemoryPage::new("https://gemini.google.com/app");
        let list = page
            .create_element("conversations-list")
            .with_attr("data-test-id", "all-conversations");
        let list_id = list.id;
        assert!(page.append_child(page.root_id(), list));

        let backend = Rc::new(MemoryKeyValueStore::new());
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 10, 19, 7, 3, 11).unwrap());
        let machine = CaptureMachine::new(
            Rc::new(page.clone()),
            Rc::new(page.clone()),
            RecordStore::new(backend.clone()),
            CaptureSettings::default(),
        )
        .with_clock(Rc::new(clock));

        Fixture {
            page,
            list: list_id,
            backend,
            machine,
        }
    }

    /// Inserts an item group holding one conversation item with the given
    /// title text; returns the item and title ids
    fn insert_item(page: &MemoryPage, list: NodeId, title: &str) -> (NodeId, NodeId) {
        let title_el = page
            .create_element("div")
            .with_class("conversation-title")
            .with_text(title);
        let title_id = title_el.id;
        let item = page
            .create_element("div")
            .with_attr("data-test-id", "conversation")
            .with_child(title_el);
        let item_id = item.id;
        let group = page
            .create_element("div")
            .with_class("conversation-items-container")
            .with_child(item);
        assert!(page.append_child(list, group));
        (item_id, title_id)
    }

    fn deliver(fx: &mut Fixture) -> Vec<CaptureOutcome> {
        fx.page
            .take_batches()
            .into_iter()
            .filter_map(|(id, records)| fx.machine.on_batch(id, &records))
            .collect()
    }

    #[test]
    fn test_timestamp_uses_fixed_offset() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 20, 30, 0).unwrap();
        assert_eq!(format_timestamp(now, default_utc_offset()), "2026-10-20T03:30:00");
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(format_timestamp(now, utc), "2026-10-19T20:30:00");
    }

    #[test]
    fn test_label_waits_until_title_has_text() {
        let mut fx = fixture();
        let ticket = fx.machine.on_trigger().unwrap();
        assert_eq!(fx.machine.on_settled(ticket), None);

        fx.page.navigate("https://gemini.google.com/app/ab12cd");
        let (_, title_id) = insert_item(&fx.page, fx.list, "");
        assert!(deliver(&mut fx).is_empty());
        assert_eq!(fx.machine.stage(), PipelineStage::AwaitingLabel);

        assert!(fx.page.set_text(title_id, "Trip planning"));
        let outcomes = deliver(&mut fx);
        let [CaptureOutcome::Committed(record)] = outcomes.as_slice() else {
            panic!("unexpected outcomes {:?}", outcomes);
        };
        assert_eq!(record.title, "Trip planning");
        assert_eq!(record.timestamp, "2026-10-19T14:03:11");
        assert_eq!(fx.machine.stage(), PipelineStage::Idle);
        assert_eq!(fx.page.live_observations(), 0);
    }

    #[test]
    fn test_batches_before_address_resolves_are_ignored() {
        let mut fx = fixture();
        let ticket = fx.machine.on_trigger().unwrap();
        fx.machine.on_settled(ticket);

        insert_item(&fx.page, fx.list, "Too early");
        assert!(deliver(&mut fx).is_empty());
        assert_eq!(fx.machine.stage(), PipelineStage::AwaitingItem);
        assert!(fx.machine.live_subscription().is_some());
    }

    #[test]
    fn test_hidden_item_keeps_waiting() {
        let mut fx = fixture();
        let ticket = fx.machine.on_trigger().unwrap();
        fx.machine.on_settled(ticket);
        fx.page.navigate("https://gemini.google.com/app/ab12cd");

        let title_el = fx
            .page
            .create_element("div")
            .with_class("conversation-title")
            .with_text("Hidden for now");
        let item = fx
            .page
            .create_element("div")
            .with_attr("data-test-id", "conversation")
            .with_hidden(true)
            .with_child(title_el);
        let item_id = item.id;
        let group = fx
            .page
            .create_element("div")
            .with_class("conversation-items-container")
            .with_child(item);
        fx.page.append_child(fx.list, group);
        assert!(deliver(&mut fx).is_empty());

        fx.page.set_hidden(item_id, false);
        let outcomes = deliver(&mut fx);
        assert!(matches!(
            outcomes.as_slice(),
            [CaptureOutcome::Committed(record)] if record.title == "Hidden for now"
        ));
    }

    #[test]
    fn test_item_in_hidden_group_keeps_waiting() {
        let mut fx = fixture();
        let ticket = fx.machine.on_trigger().unwrap();
        fx.machine.on_settled(ticket);
        fx.page.navigate("https://gemini.google.com/app/ab12cd");

        let title_el = fx
            .page
            .create_element("div")
            .with_class("conversation-title")
            .with_text("Behind a hidden group");
        let title_id = title_el.id;
        let item = fx
            .page
            .create_element("div")
            .with_attr("data-test-id", "conversation")
            .with_child(title_el);
        let group = fx
            .page
            .create_element("div")
            .with_class("conversation-items-container")
            .with_hidden(true)
            .with_child(item);
        let group_id = group.id;
        fx.page.append_child(fx.list, group);
        assert!(deliver(&mut fx).is_empty());
        assert_eq!(fx.machine.stage(), PipelineStage::AwaitingLabel);
        assert_eq!(fx.backend.write_count(), 0);

        fx.page.set_hidden(group_id, false);
        fx.page.set_text(title_id, "Behind a hidden group");
        let outcomes = deliver(&mut fx);
        assert!(matches!(
            outcomes.as_slice(),
            [CaptureOutcome::Committed(record)] if record.title == "Behind a hidden group"
        ));
    }

    #[test]
    fn test_first_inserted_item_group_wins() {
        let mut fx = fixture();
        let ticket = fx.machine.on_trigger().unwrap();
        fx.machine.on_settled(ticket);
        fx.page.navigate("https://gemini.google.com/app/ab12cd");

        let bare = fx.page.create_element("div");
        let empty_group = fx
            .page
            .create_element("div")
            .with_class("conversation-items-container");
        assert!(fx.page.append_child(fx.list, bare));
        assert!(fx.page.append_child(fx.list, empty_group));
        let (first_item, first_title) = insert_item(&fx.page, fx.list, "");
        insert_item(&fx.page, fx.list, "B");

        assert!(deliver(&mut fx).is_empty());
        assert_eq!(fx.machine.stage(), PipelineStage::AwaitingLabel);
        let live = fx.machine.live_subscription().unwrap();
        assert_eq!(fx.page.observed_target(live), Some(first_item));

        assert!(fx.page.set_text(first_title, "A"));
        let outcomes = deliver(&mut fx);
        assert!(matches!(
            outcomes.as_slice(),
            [CaptureOutcome::Committed(record)] if record.title == "A"
        ));
    }

    #[test]
    fn test_label_skips_title_cover() {
        let page = MemoryPage::new("https://gemini.google.com/app");
        let cover = page
            .create_element("div")
            .with_class("conversation-title-cover")
            .with_text("Cover");
        let inner = page.create_element("span").with_text("Trip planning");
        let title = page
            .create_element("div")
            .with_class("conversation-title")
            .with_child(inner)
            .with_child(cover);
        let item = page.create_element("div").with_child(title);
        assert_eq!(read_item_label(&item).as_deref(), Some("Trip planning"));

        let bare = page.create_element("div").with_text("  Direct label ");
        assert_eq!(read_item_label(&bare).as_deref(), Some("Direct label"));

        let empty = page.create_element("div").with_text("   ");
        assert_eq!(read_item_label(&empty), None);
    }

    #[test]
    fn test_trigger_outside_composer_is_ignored() {
        let mut fx = fixture();
        fx.page.navigate("https://gemini.google.com/app/ab12cd");
        assert_eq!(fx.machine.on_trigger(), None);
        assert_eq!(fx.machine.stage(), PipelineStage::Idle);
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut fx = fixture();
        let first = fx.machine.on_trigger().unwrap();
        let second = fx.machine.on_trigger().unwrap();
        assert_ne!(first, second);

        assert_eq!(fx.machine.on_settled(first), None);
        assert_eq!(fx.machine.stage(), PipelineStage::TriggerCaptured);
        assert_eq!(fx.page.live_observations(), 0);

        assert_eq!(fx.machine.on_settled(second), None);
        assert_eq!(fx.machine.stage(), PipelineStage::AwaitingItem);
        assert_eq!(fx.page.live_observations(), 1);
    }

    #[test]
    fn test_missing_container_aborts() {
        let mut fx = fixture();
        fx.page.remove(fx.list);
        let ticket = fx.machine.on_trigger().unwrap();
        assert_eq!(
            fx.machine.on_settled(ticket),
            Some(CaptureOutcome::Aborted(AbortReason::ContainerMissing))
        );
        assert_eq!(fx.machine.stage(), PipelineStage::Idle);
        assert_eq!(fx.page.live_observations(), 0);
        assert_eq!(fx.backend.write_count(), 0);
    }

    #[test]
    fn test_removed_item_aborts() {
        let mut fx = fixture();
        let ticket = fx.machine.on_trigger().unwrap();
        fx.machine.on_settled(ticket);
        fx.page.navigate("https://gemini.google.com/app/ab12cd");
        let (item_id, _) = insert_item(&fx.page, fx.list, "");
        assert!(deliver(&mut fx).is_empty());

        // Removal is reported to the item's own observation only when it
        // touches the item's subtree, so poke the item before detaching it.
        fx.page.set_attribute(item_id, "class", "leaving");
        fx.page.remove(item_id);
        let outcomes = deliver(&mut fx);
        assert_eq!(outcomes, vec![CaptureOutcome::Aborted(AbortReason::ItemMissing)]);
        assert_eq!(fx.page.live_observations(), 0);
    }

    #[test]
    fn test_duplicate_commit_is_rejected() {
        let mut fx = fixture();
        for expected_written in [true, false] {
            fx.page.navigate("https://gemini.google.com/app");
            let ticket = fx.machine.on_trigger().unwrap();
            fx.machine.on_settled(ticket);
            fx.page.navigate("https://gemini.google.com/app/ab12cd");
            insert_item(&fx.page, fx.list, "Trip planning");
            let outcomes = deliver(&mut fx);
            assert_eq!(outcomes.len(), 1);
            assert_eq!(
                matches!(outcomes[0], CaptureOutcome::Committed(_)),
                expected_written
            );
        }
        assert_eq!(fx.backend.write_count(), 1);
    }
}

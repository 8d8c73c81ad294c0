//! Async host loop around [`CaptureMachine`]
//!
//! Hosts push [`HostEvent`]s into one channel. The driver feeds them to the
//! machine one at a time and schedules settle timers that report back over
//! the same channel, so every transition happens on the driver's task. The
//! machine holds `Rc` handles, so the driver runs on a current-thread
//! runtime or a `LocalSet`.

use tokio::sync::mpsc;

use crate::capture::pipeline::{CaptureMachine, CaptureOutcome, SettleTicket};
use crate::page::{ClickEvent, MutationRecord, SubscriptionId};

#[derive(Debug)]
pub enum HostEvent {
    /// Capture-phase click anywhere on the page
    Click(ClickEvent),
    /// One notification batch for one subscription
    Mutations {
        subscription: SubscriptionId,
        records: Vec<MutationRecord>,
    },
    /// A settle timer fired
    Settled(SettleTicket),
    Shutdown,
}

pub struct CaptureDriver {
    machine: CaptureMachine,
    events_tx: mpsc::UnboundedSender<HostEvent>,
    events_rx: mpsc::UnboundedReceiver<HostEvent>,
    outcomes_tx: Option<mpsc::UnboundedSender<CaptureOutcome>>,
}

impl CaptureDriver {
    pub fn new(machine: CaptureMachine) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            machine,
            events_tx,
            events_rx,
            outcomes_tx: None,
        }
    }

    /// Handle for delivering host events
    pub fn sender(&self) -> mpsc::UnboundedSender<HostEvent> {
        self.events_tx.clone()
    }

    /// Receives every finished attempt. Replaces any earlier receiver.
    pub fn outcomes(&mut self) -> mpsc::UnboundedReceiver<CaptureOutcome> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outcomes_tx = Some(tx);
        rx
    }

    /// Processes events until `Shutdown`, then hands the machine back
    pub async fn run(mut self) -> CaptureMachine {
        while let Some(event) = self.events_rx.recv().await {
            let outcome = match event {
                HostEvent::Click(click) => {
                    if let Some(ticket) = self.machine.on_click(&click) {
                        self.schedule_settle(ticket);
                    }
                    None
                }
                HostEvent::Mutations {
                    subscription,
                    records,
                } => self.machine.on_batch(subscription, &records),
                HostEvent::Settled(ticket) => self.machine.on_settled(ticket),
                HostEvent::Shutdown => {
                    log::info!(target: crate::LOG_TARGET, "Capture driver shutting down");
                    break;
                }
            };

            if let (Some(outcome), Some(tx)) = (outcome, &self.outcomes_tx) {
                if tx.send(outcome).is_err() {
                    log::debug!(target: crate::LOG_TARGET, "Outcome receiver dropped");
                    self.outcomes_tx = None;
                }
            }
        }
        self.machine
    }

    fn schedule_settle(&self, ticket: SettleTicket) {
        let tx = self.events_tx.clone();
        let delay = self.machine.settings().settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Closed channel means the driver already stopped
            let _ = tx.send(HostEvent::Settled(ticket));
        });
    }
}

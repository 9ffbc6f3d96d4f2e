//! Single-consumer command dispatch.
//!
//! Every producer (GPIO button task, CAN receive task, the Bluetooth
//! transport task) funnels its work through one bounded queue, and one
//! dispatcher task executes items strictly in arrival order. Nothing
//! else ever touches the connection state machine or the identity
//! store, which removes data races on them by construction.

use crate::error::DispatchError;
use crate::identity::PeerAddress;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

/// Queue depth. Deep enough that a burst of panel frames never stalls
/// lifecycle events.
pub const QUEUE_DEPTH: usize = crate::config::WORK_QUEUE_DEPTH;

/// A logical playback command, one per physical button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Skip to the next track.
    Next,
    /// Skip to the previous track.
    Previous,
}

/// Connection lifecycle events, produced by startup and by the
/// Bluetooth transport task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleEvent {
    /// The Bluetooth stack finished booting; begin the startup sequence.
    StackReady,
    /// Outbound reconnect to the stored peer completed.
    ConnectSucceeded,
    /// Outbound reconnect failed; fall back to discoverable mode.
    ConnectFailed,
    /// A peer authenticated with us; carries its address for persisting.
    AuthSucceeded(PeerAddress),
    /// A peer failed authentication; stay discoverable.
    AuthFailed,
    /// The connected peer dropped the link.
    PeerDisconnected,
}

/// A unit of work owned by the queue from enqueue until the dispatcher
/// hands it to the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WorkItem {
    Lifecycle(LifecycleEvent),
    Command(Command),
}

/// Bounded FIFO work queue with a single consumer.
///
/// Ordering: items from one producer execute in the order that producer
/// enqueued them. Across producers the order is whichever enqueue
/// completed first; no total order is promised.
pub struct Dispatcher {
    queue: Channel<CriticalSectionRawMutex, WorkItem, QUEUE_DEPTH>,
}

impl Dispatcher {
    /// Create an empty queue. `const` so it can live in a `static`.
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
        }
    }

    /// Append an item without blocking. Safe from any context.
    ///
    /// On `QueueFull` the producer decides: best-effort input commands
    /// are dropped and logged, lifecycle events must use [`enqueue`]
    /// instead.
    ///
    /// [`enqueue`]: Dispatcher::enqueue
    pub fn try_enqueue(&self, item: WorkItem) -> Result<(), DispatchError> {
        self.queue.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull,
        })
    }

    /// Append an item, waiting for queue space. For lifecycle events,
    /// which are not safely droppable.
    pub async fn enqueue(&self, item: WorkItem) {
        self.queue.send(item).await;
    }

    /// Remove the head item, waiting while the queue is empty.
    ///
    /// Only the dispatcher task calls this; it runs each item's handler
    /// to completion before dequeuing the next.
    pub async fn dequeue(&self) -> WorkItem {
        self.queue.receive().await
    }

    /// Non-blocking dequeue, `None` when empty.
    pub fn try_dequeue(&self) -> Option<WorkItem> {
        self.queue.try_receive().ok()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

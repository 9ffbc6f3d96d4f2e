//! Connection lifecycle coordinator.
//!
//! Owns the [`ConnectionPhase`] state machine and is the only code
//! that touches the identity store or issues transport requests. It
//! runs entirely inside the dispatcher task, so every transition is a
//! plain function of (current phase, dispatched item) with no locking.
//!
//! Startup sequence: once the stack reports ready we register our
//! capabilities, then either reconnect to the remembered peer or sit
//! discoverable waiting for a new one. A peer that pairs successfully
//! gets remembered for next boot.

use crate::dispatch::{Command, Dispatcher, LifecycleEvent, WorkItem};
use crate::identity::IdentityStore;
use crate::transport::{ControlAction, MediaTransport};

/// Where we are in the connection lifecycle.
///
/// Not the source of truth for the radio link (the stack is); used to
/// decide whether a command can be delivered right now or is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionPhase {
    /// Stack not up yet.
    Idle,
    /// Registering capabilities with the stack.
    Initializing,
    /// Outbound connect to the stored peer in flight.
    Reconnecting,
    /// Discoverable, waiting for a peer to pair with us.
    AwaitingPeer,
    /// Link up; commands flow.
    Connected,
}

/// Drives the lifecycle state machine and turns commands into outbound
/// control messages.
pub struct Coordinator<S, T> {
    phase: ConnectionPhase,
    store: S,
    transport: T,
}

impl<S: IdentityStore, T: MediaTransport> Coordinator<S, T> {
    pub fn new(store: S, transport: T) -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            store,
            transport,
        }
    }

    /// Current phase (for status display and tests).
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Read access to the identity store (for status display and tests).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read access to the transport (for status display and tests).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Tear down, handing back the identity store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Consume the dispatcher queue forever. The single-consumer loop:
    /// each item is handled to completion before the next is dequeued.
    pub async fn run(&mut self, queue: &Dispatcher) -> ! {
        loop {
            let item = queue.dequeue().await;
            self.handle(item).await;
        }
    }

    /// Execute one dispatched work item.
    pub async fn handle(&mut self, item: WorkItem) {
        match item {
            WorkItem::Lifecycle(event) => self.handle_lifecycle(event).await,
            WorkItem::Command(command) => self.handle_command(command).await,
        }
    }

    async fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        match (self.phase, event) {
            (ConnectionPhase::Idle, LifecycleEvent::StackReady) => {
                self.phase = ConnectionPhase::Initializing;
                if let Err(e) = self.transport.register_capabilities().await {
                    error!("capability registration rejected: {:?}", e);
                }
                self.start_peer_search().await;
            }

            (ConnectionPhase::Reconnecting, LifecycleEvent::ConnectSucceeded) => {
                info!("reconnected to stored peer");
                self.phase = ConnectionPhase::Connected;
            }

            // Stored peer gone or changed: don't retry forever, open up
            // for a fresh pairing instead.
            (ConnectionPhase::Reconnecting, LifecycleEvent::ConnectFailed) => {
                info!("stored peer unreachable, becoming discoverable");
                self.become_discoverable().await;
            }

            // Saved on every successful authentication, reconnect path
            // included, so an address change by the peer sticks.
            (_, LifecycleEvent::AuthSucceeded(addr)) => {
                info!("peer authenticated");
                if let Err(e) = self.store.save(addr).await {
                    // Not fatal: the pairing holds for this session, it
                    // just won't survive a restart.
                    warn!("failed to persist peer address: {:?}", e);
                }
                self.phase = ConnectionPhase::Connected;
            }

            (ConnectionPhase::AwaitingPeer, LifecycleEvent::AuthFailed) => {
                // Not fatal; re-arm advertising and keep waiting.
                warn!("peer authentication failed, staying discoverable");
                self.become_discoverable().await;
            }

            (ConnectionPhase::Connected, LifecycleEvent::PeerDisconnected) => {
                info!("peer disconnected, becoming discoverable");
                self.become_discoverable().await;
            }

            (phase, event) => {
                debug!("ignoring {:?} in phase {:?}", event, phase);
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        // No peer to address: dropping is policy, not an error. Stale
        // presses must not fire after a long reconnect.
        if self.phase != ConnectionPhase::Connected {
            debug!("dropping {:?}, not connected", command);
            return;
        }

        let action = match command {
            Command::Next => ControlAction::SkipForward,
            Command::Previous => ControlAction::SkipBackward,
        };

        info!("sending {:?}", action);
        if let Err(e) = self.transport.send_control(action).await {
            warn!("control message rejected: {:?}", e);
        }
    }

    /// Reconnect to the remembered peer if we have one, otherwise wait
    /// discoverable for a new pairing.
    async fn start_peer_search(&mut self) {
        match self.store.load().await {
            Some(addr) => {
                info!("reconnecting to stored peer");
                match self.transport.connect(addr).await {
                    Ok(()) => self.phase = ConnectionPhase::Reconnecting,
                    Err(e) => {
                        warn!("connect request rejected: {:?}", e);
                        self.become_discoverable().await;
                    }
                }
            }
            None => {
                info!("no stored peer, waiting to be paired");
                self.become_discoverable().await;
            }
        }
    }

    async fn become_discoverable(&mut self) {
        if let Err(e) = self.transport.set_discoverable().await {
            error!("failed to enter discoverable mode: {:?}", e);
        }
        self.phase = ConnectionPhase::AwaitingPeer;
    }
}

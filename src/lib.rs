//! btwheel - steering-wheel-to-Bluetooth media control bridge.
//!
//! Turns two noisy vehicle inputs - a dash button on a GPIO line and
//! steering-wheel control frames on the CAN bus - into single
//! skip-forward / skip-backward commands for a Bluetooth audio peer,
//! and remembers that peer across power cycles so the car reconnects
//! by itself.
//!
//! The core pipeline:
//!
//! ```text
//! raw signals → input debouncers → dispatcher queue → coordinator → peer
//! ```
//!
//! Everything left of the radio is plain logic and testable on the
//! host (`cargo test`); the Embassy/SoftDevice/CAN-controller bindings
//! only build with the `embedded` feature (see `main.rs`).

#![cfg_attr(not(test), no_std)]

// This module must go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod input;
pub mod media;
pub mod transport;

#[cfg(feature = "embedded")]
pub mod storage;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use crate::coordinator::{ConnectionPhase, Coordinator};
    use crate::dispatch::{Command, Dispatcher, LifecycleEvent, WorkItem};
    use crate::error::{DispatchError, StoreError, TransportError};
    use crate::identity::{IdentityStore, PeerAddress};
    use crate::input::debounce::{ButtonDebouncer, FrameDebouncer};
    use crate::input::frame::PanelFrame;
    use crate::transport::{ControlAction, MediaTransport};
    use embassy_futures::block_on;

    const ADDR: PeerAddress = PeerAddress::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

    // ════════════════════════════════════════════════════════════════════════
    // Test doubles
    // ════════════════════════════════════════════════════════════════════════

    /// Identity store fake: preloaded contents plus a save log.
    struct FakeStore {
        stored: Option<PeerAddress>,
        saves: Vec<PeerAddress>,
        fail_saves: bool,
    }

    impl FakeStore {
        fn empty() -> Self {
            Self {
                stored: None,
                saves: Vec::new(),
                fail_saves: false,
            }
        }

        fn with(addr: PeerAddress) -> Self {
            Self {
                stored: Some(addr),
                ..Self::empty()
            }
        }
    }

    impl IdentityStore for FakeStore {
        async fn load(&mut self) -> Option<PeerAddress> {
            self.stored
        }

        async fn save(&mut self, addr: PeerAddress) -> Result<(), StoreError> {
            if self.fail_saves {
                return Err(StoreError::WriteFailed);
            }
            self.saves.push(addr);
            self.stored = Some(addr);
            Ok(())
        }
    }

    /// Transport fake recording every request in order.
    #[derive(Default)]
    struct FakeTransport {
        registered: usize,
        connects: Vec<PeerAddress>,
        discoverable: usize,
        controls: Vec<ControlAction>,
        reject_connects: bool,
    }

    impl MediaTransport for FakeTransport {
        async fn register_capabilities(&mut self) -> Result<(), TransportError> {
            self.registered += 1;
            Ok(())
        }

        async fn connect(&mut self, addr: PeerAddress) -> Result<(), TransportError> {
            self.connects.push(addr);
            if self.reject_connects {
                return Err(TransportError::Rejected);
            }
            Ok(())
        }

        async fn set_discoverable(&mut self) -> Result<(), TransportError> {
            self.discoverable += 1;
            Ok(())
        }

        async fn send_control(&mut self, action: ControlAction) -> Result<(), TransportError> {
            self.controls.push(action);
            Ok(())
        }
    }

    fn coordinator(
        store: FakeStore,
        transport: FakeTransport,
    ) -> Coordinator<FakeStore, FakeTransport> {
        Coordinator::new(store, transport)
    }

    /// Drive the coordinator through `StackReady` and return it.
    fn booted(store: FakeStore) -> Coordinator<FakeStore, FakeTransport> {
        let mut c = coordinator(store, FakeTransport::default());
        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::StackReady)));
        c
    }

    // ════════════════════════════════════════════════════════════════════════
    // Debouncer Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn button_press_sequence_yields_two_commands() {
        // active, active, active, inactive, active → exactly two.
        let mut btn = ButtonDebouncer::new(Command::Next);
        let observations = [true, true, true, false, true];
        let commands: Vec<_> = observations
            .iter()
            .filter_map(|&level| btn.observe(level))
            .collect();
        assert_eq!(commands, [Command::Next, Command::Next]);
    }

    #[test]
    fn panel_hold_sequence_yields_two_commands() {
        // held, held, held, released, held → exactly two for that button.
        let mut panel = FrameDebouncer::new();
        let states = [1u8, 1, 1, 0, 1];
        let commands: Vec<_> = states
            .iter()
            .filter_map(|&state| {
                panel.observe(&PanelFrame {
                    button: crate::config::PANEL_BUTTON_NEXT,
                    state,
                })
            })
            .collect();
        assert_eq!(commands, [Command::Next, Command::Next]);
    }

    #[test]
    fn panel_buttons_latch_independently() {
        let mut panel = FrameDebouncer::new();
        let next = crate::config::PANEL_BUTTON_NEXT;
        let prev = crate::config::PANEL_BUTTON_PREV;

        // Hold NEXT; traffic on PREV must not touch NEXT's latch.
        assert_eq!(
            panel.observe(&PanelFrame { button: next, state: 1 }),
            Some(Command::Next)
        );
        assert_eq!(
            panel.observe(&PanelFrame { button: prev, state: 1 }),
            Some(Command::Previous)
        );
        assert_eq!(panel.observe(&PanelFrame { button: prev, state: 0 }), None);
        // NEXT is still held, so no re-fire.
        assert_eq!(panel.observe(&PanelFrame { button: next, state: 1 }), None);
    }

    #[test]
    fn unknown_discriminator_is_ignored() {
        let mut panel = FrameDebouncer::new();
        assert_eq!(panel.observe(&PanelFrame { button: 0x42, state: 1 }), None);
        assert_eq!(panel.observe(&PanelFrame { button: 0x42, state: 0 }), None);
        // And it hasn't disturbed the real buttons.
        assert_eq!(
            panel.observe(&PanelFrame {
                button: crate::config::PANEL_BUTTON_NEXT,
                state: 1
            }),
            Some(Command::Next)
        );
    }

    // ════════════════════════════════════════════════════════════════════════
    // Dispatcher Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn dispatcher_is_strict_fifo() {
        let queue = Dispatcher::new();
        queue
            .try_enqueue(WorkItem::Command(Command::Next))
            .unwrap();
        queue
            .try_enqueue(WorkItem::Command(Command::Previous))
            .unwrap();
        queue
            .try_enqueue(WorkItem::Lifecycle(LifecycleEvent::AuthFailed))
            .unwrap();

        assert_eq!(queue.try_dequeue(), Some(WorkItem::Command(Command::Next)));
        assert_eq!(
            queue.try_dequeue(),
            Some(WorkItem::Command(Command::Previous))
        );
        assert_eq!(
            queue.try_dequeue(),
            Some(WorkItem::Lifecycle(LifecycleEvent::AuthFailed))
        );
        assert_eq!(queue.try_dequeue(), None);
    }

    #[test]
    fn dispatcher_reports_backpressure_when_full() {
        let queue = Dispatcher::new();
        for _ in 0..crate::dispatch::QUEUE_DEPTH {
            queue.try_enqueue(WorkItem::Command(Command::Next)).unwrap();
        }
        assert_eq!(
            queue.try_enqueue(WorkItem::Command(Command::Next)),
            Err(DispatchError::QueueFull)
        );

        // Draining one slot makes room again.
        queue.try_dequeue().unwrap();
        queue.try_enqueue(WorkItem::Command(Command::Next)).unwrap();
    }

    // ════════════════════════════════════════════════════════════════════════
    // Coordinator Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn startup_without_identity_waits_for_peer() {
        let c = booted(FakeStore::empty());
        assert_eq!(c.phase(), ConnectionPhase::AwaitingPeer);
        assert!(c.transport().connects.is_empty());
        assert_eq!(c.transport().registered, 1);
        assert_eq!(c.transport().discoverable, 1);
    }

    #[test]
    fn startup_with_identity_reconnects() {
        let c = booted(FakeStore::with(ADDR));
        assert_eq!(c.phase(), ConnectionPhase::Reconnecting);
        assert_eq!(c.transport().connects, [ADDR]);
        assert_eq!(c.transport().discoverable, 0);
    }

    #[test]
    fn reconnect_success_goes_connected() {
        let mut c = booted(FakeStore::with(ADDR));
        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::ConnectSucceeded)));
        assert_eq!(c.phase(), ConnectionPhase::Connected);
    }

    #[test]
    fn rejected_connect_request_falls_back_to_discoverable() {
        // The stack refuses the connect call itself (no in-flight
        // attempt ever starts): same fallback, straight away.
        let transport = FakeTransport {
            reject_connects: true,
            ..FakeTransport::default()
        };
        let mut c = coordinator(FakeStore::with(ADDR), transport);
        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::StackReady)));

        assert_eq!(c.phase(), ConnectionPhase::AwaitingPeer);
        assert_eq!(c.transport().connects, [ADDR]);
        assert_eq!(c.transport().discoverable, 1);
    }

    #[test]
    fn reconnect_failure_falls_back_to_discoverable() {
        let mut c = booted(FakeStore::with(ADDR));
        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::ConnectFailed)));
        assert_eq!(c.phase(), ConnectionPhase::AwaitingPeer);
        assert_eq!(c.transport().discoverable, 1);
        // One connect attempt, no retry storm.
        assert_eq!(c.transport().connects.len(), 1);
    }

    #[test]
    fn command_while_awaiting_peer_is_dropped() {
        let mut c = booted(FakeStore::empty());
        block_on(c.handle(WorkItem::Command(Command::Next)));
        assert!(c.transport().controls.is_empty());
    }

    #[test]
    fn command_while_connected_sends_exactly_one_message() {
        let mut c = booted(FakeStore::empty());
        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::AuthSucceeded(ADDR))));
        block_on(c.handle(WorkItem::Command(Command::Next)));
        assert_eq!(c.transport().controls, [ControlAction::SkipForward]);

        block_on(c.handle(WorkItem::Command(Command::Previous)));
        assert_eq!(
            c.transport().controls,
            [ControlAction::SkipForward, ControlAction::SkipBackward]
        );
    }

    #[test]
    fn authentication_persists_peer_and_connects() {
        let mut c = booted(FakeStore::empty());
        assert_eq!(c.phase(), ConnectionPhase::AwaitingPeer);

        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::AuthSucceeded(ADDR))));
        assert_eq!(c.phase(), ConnectionPhase::Connected);
        assert_eq!(c.store().saves, [ADDR]);
    }

    #[test]
    fn failed_save_does_not_block_pairing() {
        let mut store = FakeStore::empty();
        store.fail_saves = true;
        let mut c = booted(store);

        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::AuthSucceeded(ADDR))));
        // Session still usable even though nothing was persisted.
        assert_eq!(c.phase(), ConnectionPhase::Connected);
        assert!(c.store().saves.is_empty());
    }

    #[test]
    fn auth_failure_stays_discoverable() {
        let mut c = booted(FakeStore::empty());
        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::AuthFailed)));
        assert_eq!(c.phase(), ConnectionPhase::AwaitingPeer);
        assert!(c.store().saves.is_empty());
    }

    #[test]
    fn disconnect_returns_to_discoverable() {
        let mut c = booted(FakeStore::with(ADDR));
        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::ConnectSucceeded)));
        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::PeerDisconnected)));
        assert_eq!(c.phase(), ConnectionPhase::AwaitingPeer);

        // Commands stop flowing after the drop.
        block_on(c.handle(WorkItem::Command(Command::Next)));
        assert!(c.transport().controls.is_empty());
    }

    #[test]
    fn stray_lifecycle_events_are_ignored() {
        let mut c = booted(FakeStore::empty());
        // ConnectSucceeded with no connect in flight changes nothing.
        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::ConnectSucceeded)));
        assert_eq!(c.phase(), ConnectionPhase::AwaitingPeer);

        // A second StackReady after boot is likewise ignored.
        block_on(c.handle(WorkItem::Lifecycle(LifecycleEvent::StackReady)));
        assert_eq!(c.transport().registered, 1);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Identity Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn peer_address_requires_exact_length() {
        assert!(PeerAddress::from_slice(&[1, 2, 3, 4, 5, 6]).is_some());
        assert!(PeerAddress::from_slice(&[1, 2, 3, 4, 5]).is_none());
        assert!(PeerAddress::from_slice(&[1, 2, 3, 4, 5, 6, 7]).is_none());
        assert!(PeerAddress::from_slice(&[]).is_none());
    }

    #[test]
    fn peer_address_roundtrips_bytes() {
        let addr = PeerAddress::from_slice(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(addr.bytes(), [1, 2, 3, 4, 5, 6]);
        assert_eq!(addr, PeerAddress::new([1, 2, 3, 4, 5, 6]));
    }
}

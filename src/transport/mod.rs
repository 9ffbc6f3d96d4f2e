//! Bluetooth transport boundary.
//!
//! The coordinator drives the link through this trait and never sees
//! stack internals. On target it is backed by a request channel into
//! the SoftDevice task ([`ble`]); host tests substitute recording
//! fakes. Completion of connect/authentication comes back
//! asynchronously as `LifecycleEvent`s on the dispatcher, not as
//! return values here.

#[cfg(feature = "embedded")]
pub mod ble;

use crate::error::TransportError;
use crate::identity::PeerAddress;

/// Outbound playback control message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlAction {
    /// Skip forward one track.
    SkipForward,
    /// Skip backward one track.
    SkipBackward,
}

/// Requests the coordinator can make of the Bluetooth stack.
pub trait MediaTransport {
    /// Register device name, profiles, and callbacks with the stack.
    /// Called once, on `StackReady`.
    async fn register_capabilities(&mut self) -> Result<(), TransportError>;

    /// Begin an outbound connection to a known peer. The outcome
    /// arrives later as `ConnectSucceeded` / `ConnectFailed`.
    async fn connect(&mut self, addr: PeerAddress) -> Result<(), TransportError>;

    /// Become discoverable and connectable, waiting for a peer to find
    /// us.
    async fn set_discoverable(&mut self) -> Result<(), TransportError>;

    /// Send one control message to the connected peer.
    async fn send_control(&mut self, action: ControlAction) -> Result<(), TransportError>;
}

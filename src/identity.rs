//! Durable peer identity.
//!
//! The last authenticated peer's Bluetooth address is kept across power
//! cycles so the device reconnects on its own after ignition. The store
//! holds exactly one address; a new pairing overwrites it.

use crate::error::StoreError;

/// Length of a Bluetooth device address in bytes.
pub const PEER_ADDRESS_LEN: usize = 6;

/// Opaque 6-byte address of a remote peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerAddress([u8; PEER_ADDRESS_LEN]);

impl PeerAddress {
    /// Wrap a raw 6-byte address.
    pub const fn new(bytes: [u8; PEER_ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a stored blob. Anything other than exactly 6 bytes is
    /// treated as "no address stored", never as a fatal error.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; PEER_ADDRESS_LEN] = data.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw address bytes.
    pub const fn bytes(&self) -> [u8; PEER_ADDRESS_LEN] {
        self.0
    }
}

impl AsRef<[u8]> for PeerAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Durable load/save of the current peer address.
///
/// Single owner: only the connection coordinator calls this, once at
/// startup (load) and after each successful authentication (save).
pub trait IdentityStore {
    /// Return the previously saved address, or `None` if nothing usable
    /// was ever saved.
    async fn load(&mut self) -> Option<PeerAddress>;

    /// Write the address and durably commit before returning.
    ///
    /// Callers treat a failure as non-fatal: pairing still proceeds for
    /// the session, it just won't survive a restart.
    async fn save(&mut self, addr: PeerAddress) -> Result<(), StoreError>;
}

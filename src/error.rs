//! Unified error types for btwheel.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.
//!
//! Every failure here is recoverable: components handle errors locally
//! and fall back (drop a command, stay discoverable, skip a save)
//! instead of propagating them as crashes.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Peer identity load/save failed.
    Store(StoreError),

    /// Work item could not be queued.
    Dispatch(DispatchError),

    /// The Bluetooth transport rejected a request.
    Transport(TransportError),
}

/// Identity store failures.
///
/// A missing or wrong-length stored address is *not* an error - the
/// store reports it as absence and startup proceeds discoverable-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The storage medium rejected the read.
    ReadFailed,
    /// The storage medium rejected the write or commit.
    WriteFailed,
}

/// Command dispatch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// The bounded work queue is at capacity. Backpressure: input
    /// commands may be dropped and logged, lifecycle events must not.
    QueueFull,
}

/// Transport request failures (the stack itself stays up).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The transport task's request queue is full.
    Busy,
    /// The stack refused the request outright.
    Rejected,
}

// Convenience conversions

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Error::Dispatch(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

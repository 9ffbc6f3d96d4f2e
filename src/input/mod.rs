//! Input subsystem - raw hardware signals in, logical commands out.
//!
//! Two independent sources, each owning its own task and debounce
//! state:
//!
//! - **Dash button**: a single GPIO line, edge-interrupt driven.
//! - **CAN panel**: steering-wheel control frames that repeat for the
//!   whole duration of a hold.
//!
//! Sources never call into the connection coordinator directly; they
//! only enqueue commands on the dispatcher.

pub mod debounce;
pub mod frame;

#[cfg(feature = "embedded")]
pub mod button;
#[cfg(feature = "embedded")]
pub mod can;
#[cfg(feature = "embedded")]
pub mod mcp2515;

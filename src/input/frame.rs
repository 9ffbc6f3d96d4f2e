//! CAN control-panel frame decoding.
//!
//! The steering-wheel panel broadcasts one standard frame (ID 0x206)
//! whose payload carries a state byte followed by a button
//! discriminator byte. Everything else on the bus is ignored here; the
//! controller itself runs listen-only with a hardware acceptance
//! filter, this check is the software half of that filter.

use crate::config::CAN_PANEL_FRAME_ID;

/// Decoded control-panel observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelFrame {
    /// Which logical button this frame refers to.
    pub button: u8,
    /// 1 while held, 0 on release.
    pub state: u8,
}

impl PanelFrame {
    /// Decode a raw frame. Returns `None` for foreign IDs or truncated
    /// payloads.
    pub fn parse(id: u16, data: &[u8]) -> Option<Self> {
        if id != CAN_PANEL_FRAME_ID || data.len() < 2 {
            return None;
        }
        Some(Self {
            button: data[1],
            state: data[0],
        })
    }
}

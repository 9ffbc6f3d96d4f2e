//! Consumer Control HID encoding for media commands.
//!
//! The peer sees this device as a Bluetooth consumer-control remote
//! (usage page 0x0C). A skip command is a 2-byte report carrying a
//! single usage code, followed by an all-zero release report.

use crate::transport::ControlAction;

/// Consumer control report size (2 bytes for usage ID).
pub const CONTROL_REPORT_SIZE: usize = 2;

/// Consumer usage codes this device sends (Usage Page 0x0C).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum MediaUsage {
    /// No key pressed - the release half of a press.
    None = 0x0000,
    /// Scan Next Track.
    NextTrack = 0x00B5,
    /// Scan Previous Track.
    PrevTrack = 0x00B6,
}

/// Consumer Control HID report: one little-endian u16 usage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlReport {
    pub usage: u16,
}

impl ControlReport {
    /// The "nothing pressed" report sent after every key report.
    pub const fn release() -> Self {
        Self::new(MediaUsage::None)
    }

    pub const fn new(usage: MediaUsage) -> Self {
        Self {
            usage: usage as u16,
        }
    }

    /// Serialize to HID report bytes.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < CONTROL_REPORT_SIZE {
            return 0;
        }
        buf[..CONTROL_REPORT_SIZE].copy_from_slice(&self.usage.to_le_bytes());
        CONTROL_REPORT_SIZE
    }
}

impl From<ControlAction> for ControlReport {
    fn from(action: ControlAction) -> Self {
        match action {
            ControlAction::SkipForward => ControlReport::new(MediaUsage::NextTrack),
            ControlAction::SkipBackward => ControlReport::new(MediaUsage::PrevTrack),
        }
    }
}

/// HID Report Descriptor for Consumer Control.
///
/// Minimal descriptor for a single 16-bit usage.
pub const CONTROL_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x03, //   Logical Maximum (1023)
    0x19, 0x00, //   Usage Minimum (0)
    0x2A, 0xFF, 0x03, //   Usage Maximum (1023)
    0x75, 0x10, //   Report Size (16)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];

//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// Bluetooth

/// GAP device name advertised to peers.
pub const BT_DEVICE_NAME: &str = "btwheel";

// CAN bus

/// Standard CAN identifier of the steering-wheel control panel frame.
pub const CAN_PANEL_FRAME_ID: u16 = 0x206;

/// Discriminator byte for the "next track" panel button.
pub const PANEL_BUTTON_NEXT: u8 = 0x91;

/// Discriminator byte for the "previous track" panel button.
pub const PANEL_BUTTON_PREV: u8 = 0x92;

/// Panel frame state byte while the button is physically held.
/// Frames repeat every few tens of milliseconds for the whole hold.
pub const PANEL_STATE_HELD: u8 = 1;

/// Idle delay between CAN controller polls when the RX buffer is empty (ms).
pub const CAN_POLL_IDLE_MS: u64 = 2;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs` via type aliases.  Adjust for your custom PCB.
//
//   Dash button     → P0.11 (active low, internal pull-up)
//   MCP2515 SCK     → P0.19
//   MCP2515 MOSI    → P0.20
//   MCP2515 MISO    → P0.21
//   MCP2515 CS      → P0.22

/// Dash button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

// Command dispatch

/// Depth of the bounded work queue feeding the dispatcher task.
pub const WORK_QUEUE_DEPTH: usize = 10;

// Peer identity storage

/// Flash page index where identity storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for identity storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;

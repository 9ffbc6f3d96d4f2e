//! Press debouncing for both input sources.
//!
//! Raw observations repeat: the CAN panel re-sends a "held" frame every
//! few tens of milliseconds for as long as a button is held, and a GPIO
//! edge can be delivered spuriously. Each monitored button gets its own
//! latch that emits a command only on the released→pressed transition,
//! so one physical press becomes exactly one command.
//!
//! Latches are plain values owned by their source's task - never shared
//! between execution contexts.

use crate::config::{PANEL_BUTTON_NEXT, PANEL_BUTTON_PREV, PANEL_STATE_HELD};
use crate::dispatch::Command;
use crate::input::frame::PanelFrame;

/// Two-state press latch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceLatch {
    /// Armed; the next active observation fires.
    Released,
    /// Already fired; active observations are ignored until release.
    Pressed,
}

impl DebounceLatch {
    /// Feed one raw observation. Returns `true` only on the
    /// released→pressed transition; an inactive observation re-arms the
    /// latch and never fires.
    pub fn observe(&mut self, active: bool) -> bool {
        match (*self, active) {
            (DebounceLatch::Released, true) => {
                *self = DebounceLatch::Pressed;
                true
            }
            (DebounceLatch::Pressed, false) => {
                *self = DebounceLatch::Released;
                false
            }
            _ => false,
        }
    }
}

/// Debouncer for a single GPIO button line.
///
/// The edge interrupt shouldn't re-fire without an intervening release,
/// but the latch still guards against re-entrant delivery.
pub struct ButtonDebouncer {
    latch: DebounceLatch,
    command: Command,
}

impl ButtonDebouncer {
    /// Bind a latch to the command this line produces.
    pub const fn new(command: Command) -> Self {
        Self {
            latch: DebounceLatch::Released,
            command,
        }
    }

    /// Feed the line level (`true` = active). One command per press.
    pub fn observe(&mut self, active: bool) -> Option<Command> {
        self.latch.observe(active).then_some(self.command)
    }
}

/// Debouncer for the CAN control-panel frames.
///
/// One latch per recognized discriminator, so holding one panel button
/// never masks or fires another. Unrecognized discriminators are
/// ignored without touching any latch.
pub struct FrameDebouncer {
    buttons: [(u8, Command, DebounceLatch); 2],
}

impl FrameDebouncer {
    pub const fn new() -> Self {
        Self {
            buttons: [
                (PANEL_BUTTON_NEXT, Command::Next, DebounceLatch::Released),
                (PANEL_BUTTON_PREV, Command::Previous, DebounceLatch::Released),
            ],
        }
    }

    /// Feed one panel frame. Emits the mapped command exactly once per
    /// held→released→held cycle of that discriminator.
    pub fn observe(&mut self, frame: &PanelFrame) -> Option<Command> {
        let (_, command, latch) = self
            .buttons
            .iter_mut()
            .find(|(disc, _, _)| *disc == frame.button)?;

        latch.observe(frame.state == PANEL_STATE_HELD).then_some(*command)
    }
}

impl Default for FrameDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

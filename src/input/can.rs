//! CAN receive task.
//!
//! The steering-wheel panel lives on a low-speed body bus; we listen
//! through an SPI-attached MCP2515 whose hardware acceptance filter is
//! set to the panel frame ID. The task polls the controller, decodes
//! panel frames, debounces them (frames repeat for the whole hold) and
//! enqueues at most one command per press.

use crate::config::CAN_POLL_IDLE_MS;
use crate::dispatch::{Dispatcher, WorkItem};
use crate::input::debounce::FrameDebouncer;
use crate::input::frame::PanelFrame;
use embassy_time::{Duration, Timer};
use embedded_can::{Frame, Id};

/// Run the CAN receive loop over any `embedded-can` controller.
pub async fn can_task<B>(mut bus: B, queue: &'static Dispatcher) -> !
where
    B: embedded_can::nb::Can,
{
    let mut debounce = FrameDebouncer::new();

    loop {
        match bus.receive() {
            Ok(frame) => {
                if let Some(panel) = decode(&frame) {
                    if let Some(cmd) = debounce.observe(&panel) {
                        info!("panel: {:?}", cmd);
                        // Best-effort: commands are droppable under
                        // backpressure, the next frame burst retries.
                        if queue.try_enqueue(WorkItem::Command(cmd)).is_err() {
                            warn!("work queue full, dropping {:?}", cmd);
                        }
                    }
                }
            }
            Err(nb::Error::WouldBlock) => {
                Timer::after(Duration::from_millis(CAN_POLL_IDLE_MS)).await;
            }
            Err(nb::Error::Other(_)) => {
                // Bus-off or RX overrun; the controller recovers on its
                // own in listen-only mode, just don't spin.
                warn!("CAN receive error");
                Timer::after(Duration::from_millis(CAN_POLL_IDLE_MS)).await;
            }
        }
    }
}

fn decode(frame: &impl Frame) -> Option<PanelFrame> {
    let Id::Standard(id) = frame.id() else {
        return None;
    };
    PanelFrame::parse(id.as_raw(), frame.data())
}

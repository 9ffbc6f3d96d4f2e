//! Dash button input task.
//!
//! One physical button (active-low with internal pull-up) wired to a
//! GPIO line; a press means "next track". The task waits for a falling
//! edge, debounces it, and enqueues the command on the dispatcher -
//! it never touches connection state itself.

use crate::config::BUTTON_DEBOUNCE_MS;
use crate::dispatch::{Command, Dispatcher, WorkItem};
use crate::input::debounce::ButtonDebouncer;
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::{Duration, Timer};

/// Run the button polling loop.
///
/// Waits for the pin to go low (pressed), debounces, enqueues the
/// bound command, then waits for release before repeating. The latch
/// additionally guards against a spuriously repeated edge.
pub async fn button_task(pin: AnyPin, command: Command, queue: &'static Dispatcher) -> ! {
    let mut btn = Input::new(pin, Pull::Up);
    let mut debounce = ButtonDebouncer::new(command);

    loop {
        // Wait for falling edge (button press, active-low).
        btn.wait_for_falling_edge().await;

        // Debounce: wait and re-check.
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        if btn.is_low() {
            if let Some(cmd) = debounce.observe(true) {
                info!("button: {:?}", cmd);
                // Best-effort: a press during backpressure is dropped.
                if queue.try_enqueue(WorkItem::Command(cmd)).is_err() {
                    warn!("work queue full, dropping {:?}", cmd);
                }
            }

            // Wait for release to avoid repeat triggers.
            btn.wait_for_rising_edge().await;
            Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
            debounce.observe(false);
        }
    }
}

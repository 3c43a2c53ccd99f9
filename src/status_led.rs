//! Link-status LED driver.
//!
//! The server reports connection lifecycle transitions through
//! [`StatusIndicator`]; this driver maps them onto the two board LEDs.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the red and status LED GPIOs.
//! On host/test: tracks state in-memory and logs transitions.

use log::info;

use crate::server::BoardState;

/// Consumer of connection lifecycle transitions.
pub trait StatusIndicator {
    fn set_state(&mut self, state: BoardState);
}

pub struct StatusLed {
    current: Option<BoardState>,
}

impl StatusLed {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn current_state(&self) -> Option<BoardState> {
        self.current
    }
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusIndicator for StatusLed {
    fn set_state(&mut self, state: BoardState) {
        if self.current == Some(state) {
            return;
        }
        self.current = Some(state);
        // Solid LED while connected; off while waiting. Blink patterns for
        // the waiting state live outside this firmware's scope.
        hw::set_status_led(state == BoardState::Connected);
        info!("led: board state {state:?}");
    }
}

#[cfg(target_os = "espidf")]
mod hw {
    use crate::pins;

    pub fn set_status_led(on: bool) {
        // SAFETY: plain GPIO level write on a pin configured as output at
        // bring-up; no shared state.
        unsafe {
            esp_idf_svc::sys::gpio_set_level(pins::STATUS_LED_GPIO, u32::from(on));
            // The red LED is wired active low and mirrors the status LED.
            esp_idf_svc::sys::gpio_set_level(pins::RED_LED_GPIO, u32::from(!on));
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod hw {
    pub fn set_status_led(_on: bool) {}
}

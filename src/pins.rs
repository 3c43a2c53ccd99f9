//! GPIO / peripheral pin assignments for the instrument main board.
//!
//! Raw GPIO numbers consumed through `esp_idf_svc::sys` calls (encoder
//! edge interrupts, LEDs). The SPI link to the converter goes through
//! typed esp-idf-hal peripherals instead, so its pin bindings live in
//! the board bring-up in `main`. Only meaningful for espidf builds; the
//! host simulation ignores pins.

// ---------------------------------------------------------------------------
// ADC frontend (SPI2)
// ---------------------------------------------------------------------------

/// SPI clock for the converter (it tolerates up to 30 MHz).
pub const ADC_SPI_HZ: u32 = 30_000_000;

// ---------------------------------------------------------------------------
// Quadrature encoders (PCNT units)
// ---------------------------------------------------------------------------

pub const ENC_X_A_GPIO: i32 = 4;
pub const ENC_X_B_GPIO: i32 = 5;
pub const ENC_Y_A_GPIO: i32 = 6;
pub const ENC_Y_B_GPIO: i32 = 7;
pub const ENC_Z_A_GPIO: i32 = 15;
pub const ENC_Z_B_GPIO: i32 = 16;

// ---------------------------------------------------------------------------
// Status LEDs
// ---------------------------------------------------------------------------

/// Red fault/activity LED, active low.
pub const RED_LED_GPIO: i32 = 17;
/// Link status LED: solid while a client is connected.
pub const STATUS_LED_GPIO: i32 = 18;

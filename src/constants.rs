//! HAL Constants
//!
//! This module defines the pin numbering, SPI defaults and board wiring
//! constants used by the Raspberry Pi radio HAL.

/// Pin number reserved for "not connected" lines
///
/// Every pin-accepting operation treats this value as a no-op and never
/// forwards it to the platform facility.
pub const NC: u32 = u32::MAX;

/// Highest user-accessible GPIO number (BCM numbering)
pub const MAX_USER_GPIO: u32 = 31;

/// Number of entries in the interrupt emulation table
pub const INTERRUPT_TABLE_SIZE: usize = MAX_USER_GPIO as usize + 1;

/// Radio enable line on the Waveshare LoRaWAN HAT (GPIO 18, Pin 12)
///
/// Driven high by `init()` to power the radio and low by `term()`.
pub const ENABLE_PIN: u32 = 18;

/// Default SPI clock speed in Hz
pub const DEFAULT_SPI_SPEED: u32 = 2_000_000;

/// Default SPI channel (chip select 0 on the main SPI bus)
pub const DEFAULT_SPI_CHANNEL: u8 = 0;

/// Highest SPI channel on the main bus (CE0, CE1)
pub const MAX_SPI_CHANNEL: u8 = 1;

/// Maximum SPI clock accepted by configuration validation
pub const MAX_SPI_SPEED: u32 = 32_000_000;

/// SPI open flags passed to the platform facility (mode 0, main bus)
pub const SPI_FLAGS: u32 = 0;

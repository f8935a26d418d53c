//! # Hardware Abstraction Layer for Radio Drivers
//!
//! This module defines the [`RadioHal`] trait, the contract a generic radio
//! transceiver driver programs against, and the Raspberry Pi adapter that
//! implements it on top of a [`Platform`](crate::platform::Platform)
//! facility.
//!
//! The adapter is split along the lines of what the driver needs:
//!
//! - [`clock`] - monotonic time, delays and pulse measurement
//! - [`gpio`] - pin mode/read/write with not-connected handling
//! - [`spi`] - one SPI channel with open-once/close-once semantics
//! - [`interrupt`] - emulated edge interrupts on top of facility alerts
//! - [`pi_hal`] - the adapter itself, its configuration and lifecycle

use crate::error::HalError;

pub mod clock;
pub mod gpio;
pub mod interrupt;
pub mod pi_hal;
pub mod spi;

pub use clock::{measure_pulse, Clock};
pub use gpio::{Level, PinMode};
pub use interrupt::{alert_dispatch, EdgeMode, InterruptCallback, InterruptEntry, InterruptTable};
pub use pi_hal::{PiHal, PiHalBuilder, PiHalConfig};
pub use spi::SpiChannel;

/// Hardware operations required by the radio driver
///
/// Pins use BCM numbering; [`NC`](crate::constants::NC) marks a line that is
/// not connected and turns every pin operation into a no-op. Errors are
/// platform failures, passed through unchanged.
pub trait RadioHal {
    /// Bring up the facility, the SPI channel and the radio's enable line
    fn init(&mut self) -> Result<(), HalError>;

    /// Reverse of [`RadioHal::init`]
    fn term(&mut self) -> Result<(), HalError>;

    /// Set the direction of a pin
    fn pin_mode(&mut self, pin: u32, mode: PinMode) -> Result<(), HalError>;

    /// Drive a pin
    fn digital_write(&mut self, pin: u32, level: Level) -> Result<(), HalError>;

    /// Sample a pin
    fn digital_read(&mut self, pin: u32) -> Result<Level, HalError>;

    /// Call `callback` on every `mode` edge of `pin`
    fn attach_interrupt(
        &mut self,
        pin: u32,
        callback: InterruptCallback,
        mode: EdgeMode,
    ) -> Result<(), HalError>;

    /// Stop calling the callback attached to `pin`
    fn detach_interrupt(&mut self, pin: u32) -> Result<(), HalError>;

    fn delay_ms(&self, ms: u64);

    fn delay_us(&self, us: u64);

    fn millis(&self) -> u64;

    fn micros(&self) -> u64;

    /// Width in microseconds of a `level` pulse on `pin`, 0 on timeout
    fn pulse_in(&mut self, pin: u32, level: Level, timeout_us: u64) -> Result<u64, HalError>;

    fn spi_begin(&mut self) -> Result<(), HalError>;

    fn spi_begin_transaction(&mut self);

    /// Full-duplex exchange of `len` bytes
    fn spi_transfer(&mut self, out: &[u8], len: usize, input: &mut [u8]) -> Result<(), HalError>;

    fn spi_end_transaction(&mut self);

    fn spi_end(&mut self) -> Result<(), HalError>;
}

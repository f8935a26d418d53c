//! # GPIO/SPI Platform Facility
//!
//! This module defines the [`Platform`] trait: the fixed set of primitive
//! operations the HAL consumes from the board's GPIO/SPI access library, plus
//! the value types that cross that boundary.
//!
//! ## Implementations
//!
//! - [`raspberry_pi::RppalPlatform`] - Raspberry Pi 4/5 via the rppal crate
//!   (feature `raspberry-pi`)
//! - [`mock::MockPlatform`] - simulated facility for tests and benches
//!
//! ## Alerts
//!
//! The facility offers one edge-notification mechanism per pin. An [`Alert`]
//! bundles the requested edge, a handler function and an opaque context; the
//! facility invokes the handler from its own notification context with the
//! pin, the level observed after the edge and a tick timestamp.

use crate::error::HalError;
use crate::hal::interrupt::InterruptTable;
use std::fmt;
use std::sync::Arc;

pub mod mock;

#[cfg(feature = "raspberry-pi")]
pub mod raspberry_pi;

/// Logic level of a GPIO line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    /// Decode a raw level value (any non-zero value is high)
    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            Level::Low
        } else {
            Level::High
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for u32 {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

/// GPIO pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    Input,
    Output,
}

/// Edge selection requested from the facility's alert mechanism
///
/// The facility encodes these as `RISING_EDGE = 0`, `FALLING_EDGE = 1` and
/// `EITHER_EDGE = 2`; see [`crate::hal::interrupt`] for how driver edge
/// modes map onto them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    RisingEdge,
    FallingEdge,
    Both,
}

/// Opaque handle to an open SPI channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpiHandle(pub u32);

/// Alert handler invoked by the facility on every matching edge
///
/// Arguments: triggering pin, level observed after the edge, tick timestamp
/// in microseconds, and the context supplied at registration.
pub type AlertHandler = fn(pin: u32, level: Level, tick: u64, context: Option<&InterruptTable>);

/// Edge alert registration for a single pin
#[derive(Clone)]
pub struct Alert {
    /// Edges the facility should report
    pub trigger: Trigger,
    /// Function called on each reported edge
    pub handler: AlertHandler,
    /// Context handed back to `handler` untouched
    pub context: Option<Arc<InterruptTable>>,
}

impl Alert {
    /// Invoke the handler with the registered context
    #[inline]
    pub fn notify(&self, pin: u32, level: Level, tick: u64) {
        (self.handler)(pin, level, tick, self.context.as_deref());
    }
}

impl fmt::Debug for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alert")
            .field("trigger", &self.trigger)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

/// Primitive operations consumed from the GPIO/SPI access library
///
/// Failures are reported as [`HalError`]; the HAL propagates them unchanged
/// and never retries.
pub trait Platform {
    /// Bring up the facility
    fn initialise(&mut self) -> Result<(), HalError>;

    /// Shut the facility down, releasing all pins, alerts and SPI handles
    fn terminate(&mut self);

    /// Set the direction of a pin
    fn set_mode(&mut self, pin: u32, mode: PinMode) -> Result<(), HalError>;

    /// Drive a pin to the given level
    fn write(&mut self, pin: u32, level: Level) -> Result<(), HalError>;

    /// Sample the level of a pin
    fn read(&mut self, pin: u32) -> Result<Level, HalError>;

    /// Open an SPI channel at the given clock speed
    fn spi_open(&mut self, channel: u8, speed: u32, flags: u32) -> Result<SpiHandle, HalError>;

    /// Close a handle returned by [`Platform::spi_open`]
    fn spi_close(&mut self, handle: SpiHandle) -> Result<(), HalError>;

    /// One synchronous full-duplex exchange; `tx` and `rx` have equal length
    fn spi_xfer(&mut self, handle: SpiHandle, tx: &[u8], rx: &mut [u8]) -> Result<usize, HalError>;

    /// Register (`Some`) or cancel (`None`) the edge alert for a pin
    fn set_alert(&mut self, pin: u32, alert: Option<Alert>) -> Result<(), HalError>;

    /// Monotonic microsecond tick counter
    fn tick(&self) -> u64;

    /// Block the caller for at least `micros` microseconds
    fn delay_us(&self, micros: u64);
}

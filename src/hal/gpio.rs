//! GPIO pass-through with not-connected handling
//!
//! Each operation checks for the [`NC`] sentinel first and becomes a no-op
//! (or reads low) for it. Any other pin number is forwarded unchanged; range
//! errors are for the facility to report.

use crate::constants::NC;
use crate::error::HalError;
use crate::platform::Platform;

pub use crate::platform::{Level, PinMode};

/// Whether `pin` is the not-connected sentinel
#[inline]
pub fn is_nc(pin: u32) -> bool {
    pin == NC
}

/// Set the direction of `pin`
pub fn set_mode<P: Platform + ?Sized>(
    platform: &mut P,
    pin: u32,
    mode: PinMode,
) -> Result<(), HalError> {
    if is_nc(pin) {
        return Ok(());
    }
    platform.set_mode(pin, mode)
}

/// Drive `pin` to `level`
pub fn write<P: Platform + ?Sized>(
    platform: &mut P,
    pin: u32,
    level: Level,
) -> Result<(), HalError> {
    if is_nc(pin) {
        return Ok(());
    }
    platform.write(pin, level)
}

/// Sample `pin`; the sentinel always reads low
pub fn read<P: Platform + ?Sized>(platform: &mut P, pin: u32) -> Result<Level, HalError> {
    if is_nc(pin) {
        return Ok(Level::Low);
    }
    platform.read(pin)
}

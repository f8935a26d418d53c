//! Timing primitives
//!
//! Everything in the HAL measures time through the facility's monotonic
//! microsecond tick counter. The counter wraps at its native width; that is
//! accepted, not reported.

use crate::error::HalError;
use crate::hal::gpio::{self, Level, PinMode};
use crate::platform::Platform;

/// Monotonic clock and blocking delays
///
/// Implemented for every [`Platform`]; only `now_micros` and
/// `sleep_micros` touch the facility.
pub trait Clock {
    /// Microseconds since an arbitrary epoch
    fn now_micros(&self) -> u64;

    /// Block for at least `micros` microseconds
    fn sleep_micros(&self, micros: u64);

    /// `now_micros() / 1000`, truncated
    fn now_millis(&self) -> u64 {
        self.now_micros() / 1000
    }

    /// Block for at least `millis` milliseconds
    fn sleep_millis(&self, millis: u64) {
        self.sleep_micros(millis.saturating_mul(1000));
    }
}

impl<P: Platform + ?Sized> Clock for P {
    #[inline]
    fn now_micros(&self) -> u64 {
        self.tick()
    }

    fn sleep_micros(&self, micros: u64) {
        self.delay_us(micros);
    }
}

/// Measure how long `pin` stays at `level`
///
/// Switches the pin to input, then busy-polls it. Returns 0 if the level
/// persists for more than `timeout_micros`, otherwise the microseconds elapsed
/// from the start of the measurement until the level changed. A return of 0
/// is therefore ambiguous with a pulse that had already ended. The sentinel
/// pin returns 0 without touching the clock.
///
/// Never yields; the caller is held for up to the full timeout.
pub fn measure_pulse<P: Platform + ?Sized>(
    platform: &mut P,
    pin: u32,
    level: Level,
    timeout_micros: u64,
) -> Result<u64, HalError> {
    if gpio::is_nc(pin) {
        return Ok(0);
    }

    gpio::set_mode(platform, pin, PinMode::Input)?;
    let start = platform.now_micros();
    let poll_start = platform.now_micros();

    while gpio::read(platform, pin)? == level {
        if platform.now_micros().wrapping_sub(poll_start) > timeout_micros {
            return Ok(0);
        }
    }

    Ok(platform.now_micros().wrapping_sub(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NC;
    use crate::platform::mock::MockPlatform;

    #[test]
    fn test_millis_truncates() {
        let mock = MockPlatform::new();
        mock.set_tick(1_999);
        assert_eq!(mock.now_millis(), 1);
        mock.set_tick(2_000);
        assert_eq!(mock.now_millis(), 2);
    }

    #[test]
    fn test_sleep_millis_is_scaled_micros() {
        let mock = MockPlatform::new();
        mock.sleep_millis(3);
        assert_eq!(mock.now_micros(), 3_000);
    }

    #[test]
    fn test_pulse_on_sentinel() {
        let mut mock = MockPlatform::initialised();
        mock.set_auto_advance(1);
        assert_eq!(measure_pulse(&mut mock, NC, Level::High, 100).unwrap(), 0);
        // Clock untouched
        assert_eq!(mock.now_micros(), 0);
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_pulse_forces_input_mode() {
        let mut mock = MockPlatform::initialised();
        mock.set_auto_advance(1);
        measure_pulse(&mut mock, 12, Level::High, 10).unwrap();
        assert_eq!(mock.mode(12), Some(PinMode::Input));
    }

    #[test]
    fn test_pulse_timeout_returns_zero() {
        let mut mock = MockPlatform::initialised();
        mock.set_level(12, Level::High);
        mock.set_auto_advance(1);
        assert_eq!(measure_pulse(&mut mock, 12, Level::High, 500).unwrap(), 0);
    }

    #[test]
    fn test_pulse_width() {
        let mut mock = MockPlatform::initialised();
        mock.set_level(12, Level::High);
        mock.schedule_level(12, 250, Level::Low);
        mock.set_auto_advance(1);

        let width = measure_pulse(&mut mock, 12, Level::High, 1_000).unwrap();
        assert!((250..=255).contains(&width), "width {}", width);
    }

    #[test]
    fn test_pulse_already_ended() {
        let mut mock = MockPlatform::initialised();
        mock.set_level(12, Level::Low);
        mock.set_auto_advance(1);
        let width = measure_pulse(&mut mock, 12, Level::High, 1_000).unwrap();
        assert!(width <= 2);
    }
}

//! Mock GPIO/SPI facility for testing
//!
//! This module provides a simulated platform facility that can be used to
//! test the HAL and radio drivers without Raspberry Pi hardware. It records
//! every facility call, simulates pin levels and a microsecond clock, loops
//! SPI traffic back (or replays scripted responses) and can fire edge alerts
//! exactly the way the real facility's notification thread would.
//!
//! Like the rppal facility, pin access, SPI open and alert registration fail
//! with [`HalError::NotInitialised`] outside `initialise()`/`terminate()`.
//! Cancelling an alert, closing a handle, the clock and delays work in any
//! state.

use crate::error::HalError;
use crate::platform::{Alert, Level, PinMode, Platform, SpiHandle, Trigger};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A facility call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Initialise,
    Terminate,
    SetMode { pin: u32, mode: PinMode },
    Write { pin: u32, level: Level },
    Read { pin: u32 },
    SpiOpen { channel: u8, speed: u32, flags: u32 },
    SpiClose { handle: SpiHandle },
    SpiXfer { handle: SpiHandle, tx: Vec<u8> },
    SetAlert { pin: u32, trigger: Option<Trigger> },
    Delay { micros: u64 },
}

/// Level change that takes effect once the clock reaches `at_tick`
#[derive(Debug, Clone, Copy)]
struct ScheduledLevel {
    pin: u32,
    at_tick: u64,
    level: Level,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<PlatformCall>,
    initialised: bool,
    levels: HashMap<u32, Level>,
    modes: HashMap<u32, PinMode>,
    schedule: Vec<ScheduledLevel>,
    now: u64,
    auto_advance: u64,
    next_handle: u32,
    open_handles: HashSet<SpiHandle>,
    spi_responses: VecDeque<Vec<u8>>,
    alerts: HashMap<u32, Alert>,
    fail_init: Option<String>,
    fail_spi_open: Option<String>,
    fail_spi_xfer: Option<String>,
    fail_alert: Option<String>,
}

impl MockState {
    /// GPIO, SPI open and alert registration need a running facility
    fn require_initialised(&self) -> Result<(), HalError> {
        if self.initialised {
            Ok(())
        } else {
            Err(HalError::NotInitialised)
        }
    }

    fn level_at(&self, pin: u32, tick: u64) -> Level {
        self.schedule
            .iter()
            .filter(|change| change.pin == pin && change.at_tick <= tick)
            .max_by_key(|change| change.at_tick)
            .map(|change| change.level)
            .unwrap_or_else(|| self.levels.get(&pin).copied().unwrap_or_default())
    }
}

/// Simulated platform facility
///
/// Cloning yields another handle onto the same simulated board, so a test
/// can keep one clone while the HAL owns the other.
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A facility that is already up, as if `initialise()` had succeeded
    ///
    /// No call is recorded for the bring-up.
    pub fn initialised() -> Self {
        let mock = Self::default();
        mock.state().initialised = true;
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every facility call made so far, in order
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn is_initialised(&self) -> bool {
        self.state().initialised
    }

    /// Current level of `pin` at the current tick
    pub fn level(&self, pin: u32) -> Level {
        let state = self.state();
        state.level_at(pin, state.now)
    }

    /// Last mode set on `pin`
    pub fn mode(&self, pin: u32) -> Option<PinMode> {
        self.state().modes.get(&pin).copied()
    }

    /// Drive `pin` externally, as the radio would
    pub fn set_level(&self, pin: u32, level: Level) {
        let mut state = self.state();
        state.schedule.retain(|change| change.pin != pin);
        state.levels.insert(pin, level);
    }

    /// Make `pin` read as `level` from tick `at_tick` onwards
    pub fn schedule_level(&self, pin: u32, at_tick: u64, level: Level) {
        self.state().schedule.push(ScheduledLevel {
            pin,
            at_tick,
            level,
        });
    }

    /// Set the simulated clock
    pub fn set_tick(&self, tick: u64) {
        self.state().now = tick;
    }

    /// Advance the clock by `step` microseconds on every tick read
    pub fn set_auto_advance(&self, step: u64) {
        self.state().auto_advance = step;
    }

    /// Trigger currently registered for `pin`
    pub fn alert_trigger(&self, pin: u32) -> Option<Trigger> {
        self.state().alerts.get(&pin).map(|alert| alert.trigger)
    }

    /// Whether the alert registered for `pin` carries a context
    pub fn alert_has_context(&self, pin: u32) -> bool {
        self.state()
            .alerts
            .get(&pin)
            .is_some_and(|alert| alert.context.is_some())
    }

    /// Number of registered alerts
    pub fn alert_count(&self) -> usize {
        self.state().alerts.len()
    }

    /// Number of SPI handles currently open
    pub fn open_spi_handles(&self) -> usize {
        self.state().open_handles.len()
    }

    /// Bytes returned by the next SPI exchange instead of the loopback
    pub fn queue_spi_response(&self, bytes: &[u8]) {
        self.state().spi_responses.push_back(bytes.to_vec());
    }

    pub fn fail_next_init(&self, reason: &str) {
        self.state().fail_init = Some(reason.to_string());
    }

    pub fn fail_next_spi_open(&self, reason: &str) {
        self.state().fail_spi_open = Some(reason.to_string());
    }

    pub fn fail_next_spi_xfer(&self, reason: &str) {
        self.state().fail_spi_xfer = Some(reason.to_string());
    }

    pub fn fail_next_alert(&self, reason: &str) {
        self.state().fail_alert = Some(reason.to_string());
    }

    /// Simulate an edge on `pin` settling at `level`
    ///
    /// Updates the pin level and, if an alert is registered, invokes its
    /// handler on the calling thread with the current tick. Returns whether
    /// an alert was registered. The state lock is released before the
    /// handler runs.
    pub fn fire_alert(&self, pin: u32, level: Level) -> bool {
        let (alert, tick) = {
            let mut state = self.state();
            state.schedule.retain(|change| change.pin != pin);
            state.levels.insert(pin, level);
            (state.alerts.get(&pin).cloned(), state.now)
        };

        match alert {
            Some(alert) => {
                alert.notify(pin, level, tick);
                true
            }
            None => false,
        }
    }
}

impl Platform for MockPlatform {
    fn initialise(&mut self) -> Result<(), HalError> {
        let mut state = self.state();
        state.calls.push(PlatformCall::Initialise);
        if let Some(reason) = state.fail_init.take() {
            return Err(HalError::Initialisation(reason));
        }
        state.initialised = true;
        Ok(())
    }

    fn terminate(&mut self) {
        let mut state = self.state();
        state.calls.push(PlatformCall::Terminate);
        state.initialised = false;
        state.alerts.clear();
        state.open_handles.clear();
    }

    fn set_mode(&mut self, pin: u32, mode: PinMode) -> Result<(), HalError> {
        let mut state = self.state();
        state.calls.push(PlatformCall::SetMode { pin, mode });
        state.require_initialised()?;
        state.modes.insert(pin, mode);
        Ok(())
    }

    fn write(&mut self, pin: u32, level: Level) -> Result<(), HalError> {
        let mut state = self.state();
        state.calls.push(PlatformCall::Write { pin, level });
        state.require_initialised()?;
        state.schedule.retain(|change| change.pin != pin);
        state.levels.insert(pin, level);
        Ok(())
    }

    fn read(&mut self, pin: u32) -> Result<Level, HalError> {
        let mut state = self.state();
        state.calls.push(PlatformCall::Read { pin });
        state.require_initialised()?;
        Ok(state.level_at(pin, state.now))
    }

    fn spi_open(&mut self, channel: u8, speed: u32, flags: u32) -> Result<SpiHandle, HalError> {
        let mut state = self.state();
        state.calls.push(PlatformCall::SpiOpen {
            channel,
            speed,
            flags,
        });
        state.require_initialised()?;
        if let Some(reason) = state.fail_spi_open.take() {
            return Err(HalError::SpiOpen { channel, reason });
        }
        let handle = SpiHandle(state.next_handle);
        state.next_handle += 1;
        state.open_handles.insert(handle);
        Ok(handle)
    }

    fn spi_close(&mut self, handle: SpiHandle) -> Result<(), HalError> {
        let mut state = self.state();
        state.calls.push(PlatformCall::SpiClose { handle });
        if state.open_handles.remove(&handle) {
            Ok(())
        } else {
            Err(HalError::SpiClose(format!("bad handle {}", handle.0)))
        }
    }

    fn spi_xfer(
        &mut self,
        handle: SpiHandle,
        tx: &[u8],
        rx: &mut [u8],
    ) -> Result<usize, HalError> {
        let mut state = self.state();
        state.calls.push(PlatformCall::SpiXfer {
            handle,
            tx: tx.to_vec(),
        });
        if let Some(reason) = state.fail_spi_xfer.take() {
            return Err(HalError::SpiTransfer(reason));
        }
        if !state.open_handles.contains(&handle) {
            return Err(HalError::SpiTransfer(format!("bad handle {}", handle.0)));
        }

        match state.spi_responses.pop_front() {
            Some(response) => {
                rx.fill(0);
                let n = response.len().min(rx.len());
                rx[..n].copy_from_slice(&response[..n]);
            }
            None => rx.copy_from_slice(tx),
        }
        Ok(tx.len())
    }

    fn set_alert(&mut self, pin: u32, alert: Option<Alert>) -> Result<(), HalError> {
        let mut state = self.state();
        state.calls.push(PlatformCall::SetAlert {
            pin,
            trigger: alert.as_ref().map(|alert| alert.trigger),
        });
        if alert.is_some() {
            state.require_initialised()?;
        }
        if let Some(reason) = state.fail_alert.take() {
            return Err(HalError::Alert { pin, reason });
        }
        match alert {
            Some(alert) => {
                state.alerts.insert(pin, alert);
            }
            None => {
                state.alerts.remove(&pin);
            }
        }
        Ok(())
    }

    fn tick(&self) -> u64 {
        let mut state = self.state();
        let now = state.now;
        state.now = now.wrapping_add(state.auto_advance);
        now
    }

    fn delay_us(&self, micros: u64) {
        let mut state = self.state();
        state.calls.push(PlatformCall::Delay { micros });
        state.now = state.now.wrapping_add(micros);
    }
}

//! # Raspberry Pi Platform Facility
//!
//! [`Platform`] implementation for Raspberry Pi 4 and 5 using the rppal
//! crate for GPIO and SPI access.
//!
//! ## Supported Platforms
//!
//! - **Raspberry Pi 4**: BCM2711 SoC with quad-core ARM Cortex-A72
//! - **Raspberry Pi 5**: BCM2712 SoC with quad-core ARM Cortex-A76
//!
//! ## Hardware Requirements
//!
//! - SPI enabled in `/boot/config.txt` (add `dtparam=spi=on`)
//! - User in the `gpio` and `spi` groups (or run as root)
//!
//! ## Alerts
//!
//! Pins with a registered alert are claimed as rppal `InputPin`s with an
//! asynchronous interrupt. rppal runs the callback on its own interrupt
//! thread; that thread is the notification context in which the HAL's
//! dispatcher runs. Ticks are microseconds since [`Platform::initialise`].

use crate::constants::MAX_SPI_CHANNEL;
use crate::error::HalError;
use crate::platform::{Alert, Level, PinMode, Platform, SpiHandle, Trigger};
use rppal::gpio::{
    Gpio, InputPin, IoPin, Level as RppalLevel, Mode as GpioMode, Trigger as RppalTrigger,
};
use rppal::spi::{BitOrder, Bus, Error as SpiError, Mode as SpiMode, SlaveSelect, Spi};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors specific to the rppal facility
#[derive(Error, Debug)]
pub enum RpiHalError {
    /// GPIO initialization failed
    #[error("GPIO initialization failed: {0}")]
    GpioInit(#[from] rppal::gpio::Error),
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<RpiHalError> for HalError {
    fn from(err: RpiHalError) -> Self {
        match err {
            RpiHalError::GpioInit(e) => HalError::Initialisation(e.to_string()),
            RpiHalError::InvalidConfig(msg) => HalError::InvalidConfig(msg),
        }
    }
}

impl From<RppalLevel> for Level {
    fn from(level: RppalLevel) -> Self {
        match level {
            RppalLevel::Low => Level::Low,
            RppalLevel::High => Level::High,
        }
    }
}

impl From<Level> for RppalLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => RppalLevel::Low,
            Level::High => RppalLevel::High,
        }
    }
}

impl From<Trigger> for RppalTrigger {
    fn from(trigger: Trigger) -> Self {
        match trigger {
            Trigger::RisingEdge => RppalTrigger::RisingEdge,
            Trigger::FallingEdge => RppalTrigger::FallingEdge,
            Trigger::Both => RppalTrigger::Both,
        }
    }
}

fn gpio_mode(mode: PinMode) -> GpioMode {
    match mode {
        PinMode::Input => GpioMode::Input,
        PinMode::Output => GpioMode::Output,
    }
}

/// Chip select line for a channel on the main SPI bus
fn slave_select(channel: u8) -> Result<SlaveSelect, RpiHalError> {
    match channel {
        0 => Ok(SlaveSelect::Ss0),
        1 => Ok(SlaveSelect::Ss1),
        _ => Err(RpiHalError::InvalidConfig(format!(
            "Invalid SPI channel {}, only 0-{} supported",
            channel, MAX_SPI_CHANNEL
        ))),
    }
}

/// BCM pin number as rppal expects it
fn bcm_pin(pin: u32) -> Result<u8, HalError> {
    u8::try_from(pin).map_err(|_| HalError::Gpio {
        pin,
        reason: "pin number out of range".to_string(),
    })
}

fn gpio_error(pin: u32, err: rppal::gpio::Error) -> HalError {
    HalError::Gpio {
        pin,
        reason: err.to_string(),
    }
}

fn micros_since(epoch: Instant) -> u64 {
    epoch.elapsed().as_micros() as u64
}

/// rppal-backed GPIO/SPI facility
pub struct RppalPlatform {
    /// GPIO controller, present between initialise and terminate
    gpio: Option<Gpio>,
    /// Pins claimed for mode/read/write
    pins: HashMap<u32, IoPin>,
    /// Pins claimed for edge alerts
    alert_pins: HashMap<u32, InputPin>,
    /// Open SPI devices by handle
    spi: HashMap<SpiHandle, Spi>,
    next_handle: u32,
    epoch: Instant,
}

impl Default for RppalPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl RppalPlatform {
    /// Create an uninitialised facility
    pub fn new() -> Self {
        Self {
            gpio: None,
            pins: HashMap::new(),
            alert_pins: HashMap::new(),
            spi: HashMap::new(),
            next_handle: 0,
            epoch: Instant::now(),
        }
    }

    /// Claim `pin` as an IoPin, configuring new claims with `mode`
    fn io_pin(&mut self, pin: u32, mode: GpioMode) -> Result<&mut IoPin, HalError> {
        let bcm = bcm_pin(pin)?;
        if self.alert_pins.contains_key(&pin) {
            return Err(HalError::Gpio {
                pin,
                reason: "pin is claimed by an edge alert".to_string(),
            });
        }
        let gpio = self.gpio.as_ref().ok_or(HalError::NotInitialised)?;

        match self.pins.entry(pin) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let mut io = gpio.get(bcm).map_err(|e| gpio_error(pin, e))?.into_io(mode);
                // Keep the level we drove after the facility shuts down
                io.set_reset_on_drop(false);
                Ok(entry.insert(io))
            }
        }
    }
}

impl Platform for RppalPlatform {
    fn initialise(&mut self) -> Result<(), HalError> {
        if self.gpio.is_some() {
            return Ok(());
        }
        let gpio = Gpio::new().map_err(RpiHalError::GpioInit)?;
        self.gpio = Some(gpio);
        self.epoch = Instant::now();
        log::debug!("rppal GPIO facility initialised");
        Ok(())
    }

    fn terminate(&mut self) {
        // Dropping an InputPin stops its interrupt thread
        self.alert_pins.clear();
        self.pins.clear();
        self.spi.clear();
        self.gpio = None;
        log::debug!("rppal GPIO facility terminated");
    }

    fn set_mode(&mut self, pin: u32, mode: PinMode) -> Result<(), HalError> {
        if self.alert_pins.contains_key(&pin) && mode == PinMode::Input {
            return Ok(());
        }
        let io = self.io_pin(pin, gpio_mode(mode))?;
        io.set_mode(gpio_mode(mode));
        Ok(())
    }

    fn write(&mut self, pin: u32, level: Level) -> Result<(), HalError> {
        let io = self.io_pin(pin, GpioMode::Output)?;
        io.write(level.into());
        Ok(())
    }

    fn read(&mut self, pin: u32) -> Result<Level, HalError> {
        if let Some(input) = self.alert_pins.get(&pin) {
            return Ok(input.read().into());
        }
        let io = self.io_pin(pin, GpioMode::Input)?;
        Ok(io.read().into())
    }

    fn spi_open(&mut self, channel: u8, speed: u32, _flags: u32) -> Result<SpiHandle, HalError> {
        if self.gpio.is_none() {
            return Err(HalError::NotInitialised);
        }

        let ss = slave_select(channel)?;
        let open_error = |e: SpiError| HalError::SpiOpen {
            channel,
            reason: e.to_string(),
        };
        let spi = Spi::new(Bus::Spi0, ss, speed, SpiMode::Mode0).map_err(open_error)?;
        spi.set_bit_order(BitOrder::MsbFirst).map_err(open_error)?;

        let handle = SpiHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.spi.insert(handle, spi);

        log::info!("SPI0.{} opened: {} Hz, Mode 0, MSB first", channel, speed);
        Ok(handle)
    }

    fn spi_close(&mut self, handle: SpiHandle) -> Result<(), HalError> {
        self.spi
            .remove(&handle)
            .map(drop)
            .ok_or_else(|| HalError::SpiClose(format!("unknown handle {}", handle.0)))
    }

    fn spi_xfer(
        &mut self,
        handle: SpiHandle,
        tx: &[u8],
        rx: &mut [u8],
    ) -> Result<usize, HalError> {
        let spi = self
            .spi
            .get_mut(&handle)
            .ok_or_else(|| HalError::SpiTransfer(format!("unknown handle {}", handle.0)))?;

        spi.transfer(rx, tx).map_err(|e| {
            log::error!("SPI transfer failed: {}", e);
            HalError::SpiTransfer(e.to_string())
        })
    }

    fn set_alert(&mut self, pin: u32, alert: Option<Alert>) -> Result<(), HalError> {
        let Some(alert) = alert else {
            if let Some(mut input) = self.alert_pins.remove(&pin) {
                input.clear_async_interrupt().map_err(|e| HalError::Alert {
                    pin,
                    reason: e.to_string(),
                })?;
            }
            return Ok(());
        };

        let bcm = bcm_pin(pin)?;
        let gpio = self.gpio.as_ref().ok_or(HalError::NotInitialised)?;

        let mut input = match self.alert_pins.remove(&pin) {
            Some(mut input) => {
                input.clear_async_interrupt().map_err(|e| HalError::Alert {
                    pin,
                    reason: e.to_string(),
                })?;
                input
            }
            None => {
                // Release any IoPin claim before re-claiming as input
                self.pins.remove(&pin);
                let mut input = gpio.get(bcm).map_err(|e| gpio_error(pin, e))?.into_input();
                input.set_reset_on_drop(false);
                input
            }
        };

        let epoch = self.epoch;
        let trigger = alert.trigger;
        input
            .set_async_interrupt(trigger.into(), move |level: RppalLevel| {
                alert.notify(pin, level.into(), micros_since(epoch));
            })
            .map_err(|e| HalError::Alert {
                pin,
                reason: e.to_string(),
            })?;

        log::debug!("Edge alert on GPIO {} ({:?})", pin, trigger);
        self.alert_pins.insert(pin, input);
        Ok(())
    }

    fn tick(&self) -> u64 {
        micros_since(self.epoch)
    }

    fn delay_us(&self, micros: u64) {
        thread::sleep(Duration::from_micros(micros));
    }
}

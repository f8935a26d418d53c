//! # Raspberry Pi Radio HAL
//!
//! [`PiHal`] implements [`RadioHal`] on top of any [`Platform`] facility,
//! owning one SPI channel and one interrupt emulation table.
//!
//! ## Hardware Setup
//!
//! The adapter targets SX126x/SX127x HATs on the main SPI bus. The channel
//! number selects the chip select line:
//!
//! ```text
//! Channel │ Device            │ Chip select
//! ────────┼───────────────────┼─────────────
//! 0       │ /dev/spidev0.0    │ GPIO 8 (CE0)
//! 1       │ /dev/spidev0.1    │ GPIO 7 (CE1)
//! ```
//!
//! GPIO 18 powers the radio on the Waveshare LoRaWAN HAT. `init()` drives it
//! high once SPI is up; `term()` drives it low before the facility goes down.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pihal_rs::hal::{EdgeMode, PiHalBuilder, RadioHal};
//! use pihal_rs::platform::mock::MockPlatform;
//!
//! fn on_dio1() {
//!     // packet received
//! }
//!
//! let mut hal = PiHalBuilder::new()
//!     .spi_channel(0)
//!     .spi_speed(2_000_000)
//!     .build(MockPlatform::new())?;
//!
//! hal.init()?;
//! hal.attach_interrupt(24, on_dio1, EdgeMode::Rising)?;
//! # Ok::<(), pihal_rs::HalError>(())
//! ```

use crate::constants::{
    DEFAULT_SPI_CHANNEL, DEFAULT_SPI_SPEED, ENABLE_PIN, MAX_SPI_CHANNEL, MAX_SPI_SPEED,
};
use crate::error::HalError;
use crate::hal::clock::{self, Clock};
use crate::hal::gpio::{self, Level, PinMode};
use crate::hal::interrupt::{EdgeMode, InterruptCallback, InterruptEntry, InterruptTable};
use crate::hal::spi::SpiChannel;
use crate::hal::RadioHal;
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// SPI settings fixed for the lifetime of a [`PiHal`]
///
/// # Examples
///
/// ```rust
/// use pihal_rs::hal::PiHalConfig;
///
/// let config = PiHalConfig::from_json_str(r#"{ "spi_channel": 1, "spi_speed": 8000000 }"#)?;
/// assert_eq!(config.spi_channel, 1);
/// # Ok::<(), pihal_rs::HalError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PiHalConfig {
    /// SPI channel (chip select) on the main bus
    pub spi_channel: u8,
    /// SPI clock speed in Hz
    pub spi_speed: u32,
}

impl Default for PiHalConfig {
    fn default() -> Self {
        Self {
            spi_channel: DEFAULT_SPI_CHANNEL,
            spi_speed: DEFAULT_SPI_SPEED,
        }
    }
}

impl PiHalConfig {
    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, HalError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| HalError::InvalidConfig(format!("JSON parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HalError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            HalError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Check channel and clock speed ranges
    pub fn validate(&self) -> Result<(), HalError> {
        if self.spi_channel > MAX_SPI_CHANNEL {
            return Err(HalError::InvalidConfig(format!(
                "Invalid SPI channel {}, only 0-{} supported",
                self.spi_channel, MAX_SPI_CHANNEL
            )));
        }

        if self.spi_speed == 0 || self.spi_speed > MAX_SPI_SPEED {
            return Err(HalError::InvalidConfig(format!(
                "Invalid SPI speed {} Hz, must be 1-{}",
                self.spi_speed, MAX_SPI_SPEED
            )));
        }

        Ok(())
    }
}

/// Raspberry Pi HAL for radio transceiver drivers
///
/// Exactly one instance is expected per radio wired to the board. The
/// interrupt table and SPI channel are per instance, so several adapters on
/// separate facilities stay independent.
pub struct PiHal<P: Platform> {
    platform: P,
    spi: SpiChannel,
    interrupts: Arc<InterruptTable>,
}

impl<P: Platform> PiHal<P> {
    /// Create an adapter; nothing touches the facility until `init()`
    pub fn new(platform: P, spi_channel: u8, spi_speed: u32) -> Self {
        Self {
            platform,
            spi: SpiChannel::new(spi_channel, spi_speed),
            interrupts: Arc::new(InterruptTable::new()),
        }
    }

    /// Create an adapter from a validated configuration
    pub fn from_config(platform: P, config: &PiHalConfig) -> Result<Self, HalError> {
        config.validate()?;
        Ok(Self::new(platform, config.spi_channel, config.spi_speed))
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn config(&self) -> PiHalConfig {
        PiHalConfig {
            spi_channel: self.spi.channel(),
            spi_speed: self.spi.speed(),
        }
    }

    pub fn is_spi_open(&self) -> bool {
        self.spi.is_open()
    }

    /// Snapshot of the interrupt entry for `pin`
    pub fn interrupt_entry(&self, pin: u32) -> Option<InterruptEntry> {
        self.interrupts.entry(pin)
    }
}

impl<P: Platform> RadioHal for PiHal<P> {
    fn init(&mut self) -> Result<(), HalError> {
        self.platform.initialise()?;
        self.spi.open(&mut self.platform)?;

        gpio::set_mode(&mut self.platform, ENABLE_PIN, PinMode::Output)?;
        gpio::write(&mut self.platform, ENABLE_PIN, Level::High)?;

        log::info!(
            "Radio HAL initialized: SPI channel {} at {} Hz, enable GPIO {}",
            self.spi.channel(),
            self.spi.speed(),
            ENABLE_PIN
        );
        Ok(())
    }

    fn term(&mut self) -> Result<(), HalError> {
        // Every step runs even if an earlier one fails; the first error wins.
        let spi = self.spi.close(&mut self.platform);
        if let Err(ref e) = spi {
            log::warn!("SPI close failed during teardown: {}", e);
        }

        let enable = gpio::set_mode(&mut self.platform, ENABLE_PIN, PinMode::Output)
            .and_then(|()| gpio::write(&mut self.platform, ENABLE_PIN, Level::Low));
        if let Err(ref e) = enable {
            log::warn!("Failed to pull enable GPIO {} low: {}", ENABLE_PIN, e);
        }

        self.platform.terminate();
        log::info!("Radio HAL terminated");

        spi.and(enable)
    }

    fn pin_mode(&mut self, pin: u32, mode: PinMode) -> Result<(), HalError> {
        gpio::set_mode(&mut self.platform, pin, mode)
    }

    fn digital_write(&mut self, pin: u32, level: Level) -> Result<(), HalError> {
        gpio::write(&mut self.platform, pin, level)
    }

    fn digital_read(&mut self, pin: u32) -> Result<Level, HalError> {
        gpio::read(&mut self.platform, pin)
    }

    fn attach_interrupt(
        &mut self,
        pin: u32,
        callback: InterruptCallback,
        mode: EdgeMode,
    ) -> Result<(), HalError> {
        self.interrupts.attach(&mut self.platform, pin, callback, mode)
    }

    fn detach_interrupt(&mut self, pin: u32) -> Result<(), HalError> {
        self.interrupts.detach(&mut self.platform, pin)
    }

    fn delay_ms(&self, ms: u64) {
        self.platform.sleep_millis(ms);
    }

    fn delay_us(&self, us: u64) {
        self.platform.sleep_micros(us);
    }

    fn millis(&self) -> u64 {
        self.platform.now_millis()
    }

    fn micros(&self) -> u64 {
        self.platform.now_micros()
    }

    fn pulse_in(&mut self, pin: u32, level: Level, timeout_us: u64) -> Result<u64, HalError> {
        clock::measure_pulse(&mut self.platform, pin, level, timeout_us)
    }

    fn spi_begin(&mut self) -> Result<(), HalError> {
        self.spi.open(&mut self.platform)
    }

    fn spi_begin_transaction(&mut self) {
        self.spi.begin_transaction();
    }

    fn spi_transfer(&mut self, out: &[u8], len: usize, input: &mut [u8]) -> Result<(), HalError> {
        self.spi.transfer(&mut self.platform, out, len, input)
    }

    fn spi_end_transaction(&mut self) {
        self.spi.end_transaction();
    }

    fn spi_end(&mut self) -> Result<(), HalError> {
        self.spi.close(&mut self.platform)
    }
}

impl<P: Platform> Drop for PiHal<P> {
    /// Cancel outstanding alerts and release the SPI handle so the facility
    /// never dispatches into a table nobody owns.
    fn drop(&mut self) {
        for pin in self.interrupts.armed_pins() {
            if let Err(e) = self.interrupts.detach(&mut self.platform, pin) {
                log::warn!("Failed to detach GPIO {} on drop: {}", pin, e);
            }
        }
        if let Err(e) = self.spi.close(&mut self.platform) {
            log::warn!("Failed to close SPI on drop: {}", e);
        }
    }
}

/// Builder for Raspberry Pi HAL configuration
///
/// # Examples
///
/// ```rust
/// use pihal_rs::hal::PiHalBuilder;
/// use pihal_rs::platform::mock::MockPlatform;
///
/// let hal = PiHalBuilder::new()
///     .spi_channel(1)
///     .spi_speed(8_000_000)
///     .build(MockPlatform::new())?;
/// assert_eq!(hal.config().spi_channel, 1);
/// # Ok::<(), pihal_rs::HalError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PiHalBuilder {
    config: PiHalConfig,
}

impl PiHalBuilder {
    /// Create a new HAL builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: PiHalConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the SPI channel (0 or 1)
    pub fn spi_channel(mut self, channel: u8) -> Self {
        self.config.spi_channel = channel;
        self
    }

    /// Set the SPI clock speed in Hz
    pub fn spi_speed(mut self, speed: u32) -> Self {
        self.config.spi_speed = speed;
        self
    }

    /// Validate and build the HAL on `platform`
    pub fn build<P: Platform>(self, platform: P) -> Result<PiHal<P>, HalError> {
        PiHal::from_config(platform, &self.config)
    }
}

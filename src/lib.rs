//! # pihal-rs - Raspberry Pi GPIO/SPI HAL for Radio Transceiver Drivers
//!
//! The pihal-rs crate lets a generic radio driver (SX126x, SX127x, RFM9x and
//! friends) run on a Raspberry Pi's GPIO header and SPI bus. It translates the
//! driver's Arduino-style hardware calls into calls against a GPIO/SPI access
//! facility.
//!
//! ## Features
//!
//! - Pin mode/read/write with a "not connected" sentinel that turns any pin
//!   operation into a no-op
//! - One SPI channel per adapter with idempotent open/close and synchronous
//!   full-duplex transfers
//! - Emulated edge interrupts: `attach_interrupt`/`detach_interrupt` on top of
//!   the facility's per-pin alert callbacks
//! - Microsecond clock, delays and busy-wait pulse measurement
//! - A simulated facility ([`platform::mock::MockPlatform`]) for testing
//!   drivers without hardware
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! pihal-rs = { version = "0.1.0", features = ["raspberry-pi"] }
//! ```
//!
//! ```rust,ignore
//! use pihal_rs::hal::{EdgeMode, PiHalBuilder, RadioHal};
//! use pihal_rs::platform::raspberry_pi::RppalPlatform;
//!
//! let mut hal = PiHalBuilder::new().spi_channel(0).build(RppalPlatform::new())?;
//! hal.init()?;
//! ```

pub mod constants;
pub mod error;
pub mod hal;
pub mod logging;
pub mod platform;

pub use crate::constants::NC;
pub use crate::error::HalError;
pub use crate::hal::{
    EdgeMode, InterruptCallback, Level, PiHal, PiHalBuilder, PiHalConfig, PinMode, RadioHal,
};
pub use crate::logging::{init_logger, log_info};
pub use crate::platform::Platform;

//! # HAL Error Handling
//!
//! This module defines the HalError enum, which represents the platform
//! failures the adapter propagates to the radio driver. Operations on
//! not-connected or out-of-range pins never produce an error; they succeed
//! trivially by convention.

use thiserror::Error;

/// Represents the different error types that can occur in the HAL.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HalError {
    /// The platform facility has not been initialised (or was terminated).
    #[error("GPIO facility not initialised")]
    NotInitialised,

    /// The platform facility failed to start.
    #[error("GPIO facility initialisation failed: {0}")]
    Initialisation(String),

    /// A GPIO operation failed on the given pin.
    #[error("GPIO operation failed on pin {pin}: {reason}")]
    Gpio { pin: u32, reason: String },

    /// Registering or clearing an edge alert failed.
    #[error("Alert registration failed on pin {pin}: {reason}")]
    Alert { pin: u32, reason: String },

    /// Opening the SPI channel failed.
    #[error("SPI open failed on channel {channel}: {reason}")]
    SpiOpen { channel: u8, reason: String },

    /// Closing the SPI handle failed.
    #[error("SPI close failed: {0}")]
    SpiClose(String),

    /// A full-duplex SPI exchange failed.
    #[error("SPI transfer failed: {0}")]
    SpiTransfer(String),

    /// `spi_transfer` was called without an open SPI handle.
    #[error("SPI channel is not open")]
    SpiClosed,

    /// One of the transfer buffers is shorter than the requested length.
    #[error("SPI transfer of {len} bytes with buffers of {out_len} (out) and {in_len} (in) bytes")]
    BufferTooShort {
        len: usize,
        out_len: usize,
        in_len: usize,
    },

    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HalError::Gpio {
            pin: 24,
            reason: "pin busy".to_string(),
        };
        assert_eq!(err.to_string(), "GPIO operation failed on pin 24: pin busy");

        let err = HalError::BufferTooShort {
            len: 8,
            out_len: 4,
            in_len: 8,
        };
        assert!(err.to_string().contains("8 bytes"));
        assert_eq!(HalError::SpiClosed.to_string(), "SPI channel is not open");
    }
}

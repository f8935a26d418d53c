//! SPI channel lifecycle and transfers
//!
//! One adapter owns at most one SPI handle, bound to the channel and clock
//! speed chosen at construction. Opening and closing are idempotent; a
//! transfer never opens the channel on its own.

use crate::constants::SPI_FLAGS;
use crate::error::HalError;
use crate::platform::{Platform, SpiHandle};

/// Single SPI channel owned by a HAL instance
#[derive(Debug)]
pub struct SpiChannel {
    channel: u8,
    speed: u32,
    handle: Option<SpiHandle>,
}

impl SpiChannel {
    /// Create a closed channel
    pub fn new(channel: u8, speed: u32) -> Self {
        Self {
            channel,
            speed,
            handle: None,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Acquire a handle from the facility unless one is already open
    pub fn open<P: Platform + ?Sized>(&mut self, platform: &mut P) -> Result<(), HalError> {
        if self.handle.is_some() {
            return Ok(());
        }

        let handle = platform.spi_open(self.channel, self.speed, SPI_FLAGS)?;
        log::debug!(
            "SPI channel {} opened at {} Hz (handle {})",
            self.channel,
            self.speed,
            handle.0
        );
        self.handle = Some(handle);
        Ok(())
    }

    /// Release the handle if one is open
    ///
    /// The channel is marked closed even when the facility reports an error
    /// releasing it; the error is still returned.
    pub fn close<P: Platform + ?Sized>(&mut self, platform: &mut P) -> Result<(), HalError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        platform.spi_close(handle)?;
        log::debug!("SPI channel {} closed", self.channel);
        Ok(())
    }

    /// The facility serialises bus access; nothing to do
    pub fn begin_transaction(&mut self) {}

    /// Counterpart of [`SpiChannel::begin_transaction`]; nothing to do
    pub fn end_transaction(&mut self) {}

    /// Exchange exactly `len` bytes: clock out `out[..len]`, fill `input[..len]`
    pub fn transfer<P: Platform + ?Sized>(
        &self,
        platform: &mut P,
        out: &[u8],
        len: usize,
        input: &mut [u8],
    ) -> Result<(), HalError> {
        let handle = self.handle.ok_or(HalError::SpiClosed)?;

        if out.len() < len || input.len() < len {
            return Err(HalError::BufferTooShort {
                len,
                out_len: out.len(),
                in_len: input.len(),
            });
        }

        let transferred = platform.spi_xfer(handle, &out[..len], &mut input[..len])?;
        if transferred != len {
            return Err(HalError::SpiTransfer(format!(
                "short transfer: {} of {} bytes",
                transferred, len
            )));
        }

        log::trace!("SPI transfer {} bytes", len);
        Ok(())
    }
}

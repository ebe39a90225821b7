use crate::consts;

/// Parity setting of the serial frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Fixed line configuration for the receive-only serial channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    pub clock_hz: u32,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl SerialConfig {
    /// 57600 8N1 off the 16 MHz reference clock.
    pub const BENCH: Self = Self {
        clock_hz: consts::CPU_CLOCK_HZ,
        baud_rate: consts::BAUD_RATE,
        data_bits: 8,
        parity: Parity::None,
        stop_bits: 1,
    };

    /// Baud rate register value for asynchronous normal-speed mode:
    /// `clock / (16 * baud) - 1`.
    pub const fn baud_prescale(&self) -> u16 {
        (self.clock_hz / (16 * self.baud_rate)).wrapping_sub(1) as u16
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::BENCH
    }
}

/// A receive-only serial channel delivering one command byte at a time.
///
/// Backends are configured when they are constructed and must be built once,
/// before the first read.
pub trait SerialInput {
    type Error;

    /// Block until a full byte has arrived and return it.
    ///
    /// There is no timeout. Framing and overrun conditions are not reported;
    /// `Err` only signals that the backend itself can no longer deliver bytes.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;
}

impl<S: SerialInput + ?Sized> SerialInput for &mut S {
    type Error = S::Error;

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        (**self).read_byte()
    }
}

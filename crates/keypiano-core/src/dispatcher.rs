use core::convert::Infallible;

use embedded_hal::delay::DelayNs;

use crate::buzzer::ToneGenerator;
use crate::consts;
use crate::error::DispatchError;
use crate::input::SerialInput;
use crate::keymap::{self, ToneTableEntry};

/// The read / play / wait / stop loop.
///
/// Owns one serial input, one tone generator and a delay. Exactly one key
/// sounds at a time: the next byte is only read after the current window
/// has elapsed and the generator has been stopped.
pub struct Dispatcher<S, T, D> {
    serial: S,
    tone: T,
    delay: D,
    window_ms: u32,
}

impl<S, T, D> Dispatcher<S, T, D>
where
    S: SerialInput,
    T: ToneGenerator,
    D: DelayNs,
{
    pub fn new(serial: S, tone: T, delay: D) -> Self {
        Self {
            serial,
            tone,
            delay,
            window_ms: consts::TONE_WINDOW_MS,
        }
    }

    pub fn window_ms(&self) -> u32 {
        self.window_ms
    }

    pub fn tone(&self) -> &T {
        &self.tone
    }

    pub fn into_parts(self) -> (S, T, D) {
        (self.serial, self.tone, self.delay)
    }

    /// Play one received key.
    ///
    /// Blocks on the serial input, starts the mapped tone (if any), waits
    /// the tone window and stops the generator. Returns the entry that
    /// played, `None` for an unmapped byte.
    pub fn step(
        &mut self,
    ) -> Result<Option<&'static ToneTableEntry>, DispatchError<S::Error, T::Error>> {
        let symbol = self.serial.read_byte().map_err(DispatchError::Serial)?;

        let entry = keymap::lookup_entry(symbol);
        match entry {
            Some(entry) => {
                log::debug!(
                    "key {:?} -> {} ({} dHz)",
                    symbol as char,
                    entry.note,
                    entry.frequency
                );
                self.tone
                    .set_frequency_and_start(entry.frequency)
                    .map_err(DispatchError::Tone)?;
            }
            None => log::debug!("key {:?} unmapped", symbol as char),
        }

        self.delay.delay_ms(self.window_ms);
        self.tone.stop().map_err(DispatchError::Tone)?;

        Ok(entry)
    }

    /// Run forever. Only returns when a backend fails.
    pub fn run(&mut self) -> Result<Infallible, DispatchError<S::Error, T::Error>> {
        log::info!("dispatcher running, {} ms per key", self.window_ms);
        loop {
            self.step()?;
        }
    }
}

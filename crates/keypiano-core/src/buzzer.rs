/// What the square-wave output is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GeneratorState {
    #[default]
    Stopped,
    /// Playing the given table frequency (tenths of a hertz).
    Running(u32),
}

impl GeneratorState {
    pub fn is_running(&self) -> bool {
        matches!(self, GeneratorState::Running(_))
    }
}

// Platform-agnostic square-wave generator.
//
// Monophonic: starting while running retriggers at the new frequency.
pub trait ToneGenerator {
    type Error;

    /// Restart the wave at `frequency` (tenths of a hertz, must be non-zero).
    ///
    /// Frequencies whose compare value does not fit the 8-bit timer are not
    /// rejected; the threshold wraps like the register write it models.
    fn set_frequency_and_start(&mut self, frequency: u32) -> Result<(), Self::Error>;

    /// Halt the wave. The output keeps its last level. No-op when stopped.
    fn stop(&mut self) -> Result<(), Self::Error>;

    fn state(&self) -> GeneratorState;
}

impl<T: ToneGenerator + ?Sized> ToneGenerator for &mut T {
    type Error = T::Error;

    fn set_frequency_and_start(&mut self, frequency: u32) -> Result<(), Self::Error> {
        (**self).set_frequency_and_start(frequency)
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        (**self).stop()
    }

    fn state(&self) -> GeneratorState {
        (**self).state()
    }
}

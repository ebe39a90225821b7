//! Build-time bench configuration.

/// Reference clock of the original board (ATmega2560 at 16 MHz).
pub const CPU_CLOCK_HZ: u32 = 16_000_000;

/// Serial line speed.
pub const BAUD_RATE: u32 = 57_600;

/// Clock divider selected while a tone plays.
pub const TIMER_PRESCALER: u32 = 256;

/// How long each received key sounds before the generator is stopped.
pub const TONE_WINDOW_MS: u32 = 1000;

/// Table frequencies are stored in tenths of a hertz.
pub const FREQUENCY_SCALE: u32 = 10;

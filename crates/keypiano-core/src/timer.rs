//! 8-bit compare/toggle timer
//!
//! Pitch math for a timer running in clear-on-compare (CTC) mode with the
//! compare output toggling on every match, plus a bit-level model of that
//! timer block. The model is the reference `ToneGenerator`: host backends
//! derive their audible pitch from it and the tests check register state
//! against it.

use core::convert::Infallible;

use crate::buzzer::{GeneratorState, ToneGenerator};
use crate::consts::{CPU_CLOCK_HZ, FREQUENCY_SCALE, TIMER_PRESCALER};

/// Control bits of the timer block.
pub mod bits {
    // control register A
    pub const COMA1: u8 = 1 << 7;
    pub const COMA0: u8 = 1 << 6;
    pub const WGM1: u8 = 1 << 1;
    pub const WGM0: u8 = 1 << 0;

    // control register B
    pub const WGM2: u8 = 1 << 3;
    pub const CS2: u8 = 1 << 2;
    pub const CS1: u8 = 1 << 1;
    pub const CS0: u8 = 1 << 0;
    pub const CS_MASK: u8 = CS2 | CS1 | CS0;

    /// Clock select for clk/256.
    pub const CS_DIV256: u8 = CS2;
}

/// Compare value for `frequency` (tenths of a hertz) at `clock_hz`.
///
/// `floor(floor(clock / (freq * 2 * 256)) / 2) - 1`, each division
/// truncating. The result is written to an 8-bit register, so anything
/// outside 0..=255 wraps.
///
/// # Panics
///
/// If `frequency` is zero.
pub fn compute_threshold_at(clock_hz: u32, frequency: u32) -> u8 {
    let scaled_clock = clock_hz as u64 * FREQUENCY_SCALE as u64;
    let ticks = scaled_clock / (frequency as u64 * 2 * TIMER_PRESCALER as u64);
    (ticks / 2).wrapping_sub(1) as u8
}

/// [`compute_threshold_at`] for the reference clock.
pub fn compute_threshold(frequency: u32) -> u8 {
    compute_threshold_at(CPU_CLOCK_HZ, frequency)
}

/// Pitch the compare output produces for `threshold`, in tenths of a hertz:
/// `clock / (2 * 256 * (threshold + 1))`.
pub fn toggle_frequency_at(clock_hz: u32, threshold: u8) -> u32 {
    let scaled_clock = clock_hz as u64 * FREQUENCY_SCALE as u64;
    (scaled_clock / (2 * TIMER_PRESCALER as u64 * (threshold as u64 + 1))) as u32
}

pub fn toggle_frequency(threshold: u8) -> u32 {
    toggle_frequency_at(CPU_CLOCK_HZ, threshold)
}

/// Register file of the timer block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Registers {
    pub tccra: u8,
    pub tccrb: u8,
    pub tcnt: u8,
    pub ocra: u8,
}

/// Bit-level model of the 8-bit tone timer and its output pin.
#[derive(Debug, Clone)]
pub struct CompareTimer {
    regs: Registers,
    clock_hz: u32,
    output_high: bool,
    state: GeneratorState,
}

impl Default for CompareTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl CompareTimer {
    pub fn new() -> Self {
        Self::with_clock(CPU_CLOCK_HZ)
    }

    /// Bring the timer up stopped, in CTC mode with toggle-on-match output.
    pub fn with_clock(clock_hz: u32) -> Self {
        let mut regs = Registers::default();
        regs.tccra |= bits::COMA0 | bits::WGM1;
        regs.tccrb &= !bits::CS_MASK;
        regs.tcnt = 0;

        Self {
            regs,
            clock_hz,
            output_high: false,
            state: GeneratorState::Stopped,
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Whether a clock source is selected.
    pub fn is_clocked(&self) -> bool {
        self.regs.tccrb & bits::CS_MASK != 0
    }

    pub fn output_high(&self) -> bool {
        self.output_high
    }

    /// Pitch currently on the pin, in tenths of a hertz.
    pub fn output_frequency(&self) -> Option<u32> {
        self.is_clocked()
            .then(|| toggle_frequency_at(self.clock_hz, self.regs.ocra))
    }

    /// Feed `ticks` prescaled clock edges through the counter.
    ///
    /// Returns how many times the output toggled. Does nothing while no
    /// clock source is selected.
    pub fn advance(&mut self, ticks: u32) -> u32 {
        if !self.is_clocked() {
            return 0;
        }

        let mut toggles = 0;
        for _ in 0..ticks {
            if self.regs.tcnt == self.regs.ocra {
                self.regs.tcnt = 0;
                self.output_high = !self.output_high;
                toggles += 1;
            } else {
                self.regs.tcnt = self.regs.tcnt.wrapping_add(1);
            }
        }
        toggles
    }
}

impl ToneGenerator for CompareTimer {
    type Error = Infallible;

    fn set_frequency_and_start(&mut self, frequency: u32) -> Result<(), Self::Error> {
        self.regs.tcnt = 0;
        self.regs.ocra = compute_threshold_at(self.clock_hz, frequency);
        self.regs.tccrb |= bits::CS_DIV256;
        log::trace!(
            "timer: OCRA={} TCCRB={:#04x}",
            self.regs.ocra,
            self.regs.tccrb
        );

        self.state = GeneratorState::Running(frequency);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.regs.tccrb &= !bits::CS_MASK;
        self.state = GeneratorState::Stopped;
        Ok(())
    }

    fn state(&self) -> GeneratorState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_clock() {
        assert_eq!(CompareTimer::new().clock_hz(), CPU_CLOCK_HZ);
        assert_eq!(CompareTimer::with_clock(8_000_000).clock_hz(), 8_000_000);
    }

    #[test]
    fn test_golden_thresholds() {
        assert_eq!(compute_threshold(4400), 34);
        assert_eq!(compute_threshold(2616), 58);
        assert_eq!(compute_threshold(4939), 30);
    }

    #[test]
    fn test_threshold_wraps_out_of_range() {
        // too high: ticks truncate to 0, 0 - 1 lands on 0xFF
        assert_eq!(compute_threshold(1_000_000), 255);
        // too low: 160e6 / (100 * 512) = 3125 -> 1562 - 1 = 1561 = 0x619
        assert_eq!(compute_threshold(100), 0x19);
    }

    #[test]
    fn test_toggle_frequency() {
        // 160e6 / (512 * 35)
        assert_eq!(toggle_frequency(34), 8928);
        assert_eq!(toggle_frequency(58), 5296);
    }

    #[test]
    fn test_init_registers() {
        let timer = CompareTimer::new();
        let regs = timer.registers();
        assert_eq!(regs.tccra, bits::COMA0 | bits::WGM1);
        assert_eq!(regs.tccrb & bits::CS_MASK, 0);
        assert_eq!(regs.tcnt, 0);
        assert_eq!(timer.state(), GeneratorState::Stopped);
        assert_eq!(timer.output_frequency(), None);
    }

    #[test]
    fn test_start_selects_div256() {
        let mut timer = CompareTimer::new();
        timer.advance(10);
        timer.set_frequency_and_start(4400).unwrap();

        let regs = timer.registers();
        assert_eq!(regs.ocra, 34);
        assert_eq!(regs.tcnt, 0);
        assert_eq!(regs.tccrb & bits::CS_MASK, bits::CS_DIV256);
        assert_eq!(timer.state(), GeneratorState::Running(4400));
        assert_eq!(timer.output_frequency(), Some(8928));
    }

    #[test]
    fn test_retrigger_resets_counter() {
        let mut timer = CompareTimer::new();
        timer.set_frequency_and_start(2616).unwrap();
        timer.advance(20);
        assert_eq!(timer.registers().tcnt, 20);

        timer.set_frequency_and_start(4400).unwrap();
        assert_eq!(timer.registers().tcnt, 0);
        assert_eq!(timer.registers().ocra, 34);
        assert_eq!(timer.state(), GeneratorState::Running(4400));
    }

    #[test]
    fn test_output_toggles_every_threshold_plus_one() {
        let mut timer = CompareTimer::new();
        timer.set_frequency_and_start(4400).unwrap();

        // compare at 34: toggle on the 35th edge, then every 35
        assert_eq!(timer.advance(34), 0);
        assert_eq!(timer.advance(1), 1);
        assert!(timer.output_high());
        assert_eq!(timer.advance(35 * 4), 4);
        assert!(timer.output_high());
    }

    #[test]
    fn test_stop_freezes_output() {
        let mut timer = CompareTimer::new();
        timer.set_frequency_and_start(4400).unwrap();
        timer.advance(35);
        assert!(timer.output_high());

        timer.stop().unwrap();
        assert_eq!(timer.registers().tccrb & bits::CS_MASK, 0);
        assert_eq!(timer.advance(1000), 0);
        assert!(timer.output_high());
        assert_eq!(timer.state(), GeneratorState::Stopped);
    }

    #[test]
    fn test_stop_keeps_mode_bits() {
        let mut timer = CompareTimer::new();
        timer.set_frequency_and_start(3920).unwrap();
        timer.stop().unwrap();
        assert_eq!(timer.registers().tccra, bits::COMA0 | bits::WGM1);
    }

    #[test]
    fn test_start_then_stop_is_stopped_for_any_frequency() {
        for frequency in [1, 100, 2616, 4939, 65_535, 1_000_000] {
            let mut timer = CompareTimer::new();
            timer.set_frequency_and_start(frequency).unwrap();
            timer.stop().unwrap();
            assert_eq!(timer.state(), GeneratorState::Stopped);
            assert!(!timer.is_clocked());
        }
    }

    #[test]
    fn test_stop_when_stopped_is_noop() {
        let mut timer = CompareTimer::new();
        let before = *timer.registers();
        timer.stop().unwrap();
        assert_eq!(*timer.registers(), before);
        assert_eq!(timer.state(), GeneratorState::Stopped);
    }
}

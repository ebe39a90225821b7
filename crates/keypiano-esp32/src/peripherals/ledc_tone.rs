//! LEDC square-wave tone output
//!
//! The LEDC block has no toggle-on-compare mode, so the pitch is taken from
//! the compare-timer model: the channel runs at 50% duty on a timer set to
//! the frequency the 8-bit compare output would toggle at. Stopping pauses
//! the timer, which holds the pin at its current level.

use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::ledc::{
    config::TimerConfig, LedcChannel, LedcDriver, LedcTimer, LedcTimerDriver, LowSpeed,
    Resolution,
};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;
use esp_idf_hal::sys::EspError;

use keypiano_core::timer::CompareTimer;
use keypiano_core::{GeneratorState, ToneGenerator};

/// Raw LEDC timer, channel and buzzer pin.
pub struct TonePeripherals<T, C, P> {
    pub timer: T,
    pub channel: C,
    pub pin: P,
}

pub struct LedcTone<T>
where
    T: LedcTimer<SpeedMode = LowSpeed> + 'static,
{
    timer_driver: LedcTimerDriver<'static, T>,
    channel: LedcDriver<'static>,
    model: CompareTimer,
}

impl<T> LedcTone<T>
where
    T: LedcTimer<SpeedMode = LowSpeed> + Peripheral<P = T> + 'static,
{
    /// Bring the output up silent: 50% duty configured, timer paused.
    pub fn new<C, P>(peripherals: TonePeripherals<T, C, P>) -> Result<Self, EspError>
    where
        C: LedcChannel<SpeedMode = LowSpeed> + Peripheral<P = C> + 'static,
        P: OutputPin + 'static,
    {
        log::info!("Initializing tone output...");

        let mut timer_driver = LedcTimerDriver::new(
            peripherals.timer,
            &TimerConfig::new()
                .frequency(1.kHz().into())
                .resolution(Resolution::Bits10),
        )?;

        // no clock on the pin until the first key
        timer_driver.pause()?;

        let mut channel = LedcDriver::new(peripherals.channel, &timer_driver, peripherals.pin)?;

        let max_duty = channel.get_max_duty();
        channel.set_duty(max_duty / 2)?;

        log::info!("Tone output initialized (max duty: {})", max_duty);

        Ok(Self {
            timer_driver,
            channel,
            model: CompareTimer::new(),
        })
    }
}

impl<T> ToneGenerator for LedcTone<T>
where
    T: LedcTimer<SpeedMode = LowSpeed> + 'static,
{
    type Error = EspError;

    fn set_frequency_and_start(&mut self, frequency: u32) -> Result<(), Self::Error> {
        let Ok(()) = self.model.set_frequency_and_start(frequency);
        let Some(output) = self.model.output_frequency() else {
            return Ok(());
        };

        // tenths of a hertz, rounded
        let hz = (output + 5) / 10;
        self.timer_driver.pause()?;
        self.timer_driver.set_frequency(Hertz(hz))?;
        self.channel.set_duty(self.channel.get_max_duty() / 2)?;
        self.timer_driver.resume()?;

        log::debug!(
            "Tone: OCR={} -> {} Hz",
            self.model.registers().ocra,
            hz
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        if self.model.state().is_running() {
            self.timer_driver.pause()?;
        }
        let Ok(()) = self.model.stop();
        Ok(())
    }

    fn state(&self) -> GeneratorState {
        self.model.state()
    }
}

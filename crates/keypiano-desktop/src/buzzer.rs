use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use keypiano_core::consts::TIMER_PRESCALER;
use keypiano_core::timer::CompareTimer;
use keypiano_core::{GeneratorState, ToneGenerator};

#[cfg(feature = "audio")]
use audio::AudioOut;

/// Timer model shared between the buzzer and whoever displays it.
pub type SharedTimer = Arc<Mutex<CompareTimer>>;

/// Prescaled timer ticks that fit into `elapsed` at `clock_hz`.
fn elapsed_ticks(clock_hz: u32, elapsed: Duration) -> u32 {
    let ticks = elapsed.as_micros() * clock_hz as u128 / (TIMER_PRESCALER as u128 * 1_000_000);
    ticks.min(u32::MAX as u128) as u32
}

/// Host buzzer: the timer register model decides the pitch, the sound card
/// plays it.
///
/// The audible frequency is what the compare output would toggle at, so the
/// bench sounds like the board.
pub struct DesktopBuzzer {
    timer: SharedTimer,
    // when the model's clock was last selected
    started: Option<Instant>,
    #[cfg(feature = "audio")]
    audio: Option<AudioOut>,
}

impl DesktopBuzzer {
    pub fn new(timer: SharedTimer) -> Self {
        Self {
            timer,
            started: None,
            #[cfg(feature = "audio")]
            audio: AudioOut::spawn(),
        }
    }

    /// A buzzer that only drives the model.
    #[cfg(test)]
    pub fn silent(timer: SharedTimer) -> Self {
        Self {
            timer,
            started: None,
            #[cfg(feature = "audio")]
            audio: None,
        }
    }

    fn timer(&self) -> MutexGuard<'_, CompareTimer> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the counter for the time spent playing, so the pin ends up at
    /// the level the board would leave it at.
    fn settle(&mut self) {
        if let Some(started) = self.started.take() {
            self.advance_model(started.elapsed());
        }
    }

    fn advance_model(&self, elapsed: Duration) {
        let mut timer = self.timer();
        let ticks = elapsed_ticks(timer.clock_hz(), elapsed);
        let toggles = timer.advance(ticks);
        log::trace!("timer: {} ticks, {} toggles", ticks, toggles);
    }

    #[cfg(feature = "audio")]
    fn audio_start(&self, frequency_hz: f32) {
        if let Some(audio) = &self.audio {
            audio.start(frequency_hz);
        }
    }

    #[cfg(not(feature = "audio"))]
    fn audio_start(&self, _frequency_hz: f32) {}

    #[cfg(feature = "audio")]
    fn audio_stop(&self) {
        if let Some(audio) = &self.audio {
            audio.stop();
        }
    }

    #[cfg(not(feature = "audio"))]
    fn audio_stop(&self) {}
}

impl ToneGenerator for DesktopBuzzer {
    type Error = Infallible;

    fn set_frequency_and_start(&mut self, frequency: u32) -> Result<(), Self::Error> {
        self.settle();
        let output = {
            let mut timer = self.timer();
            timer.set_frequency_and_start(frequency)?;
            timer.output_frequency()
        };
        self.started = Some(Instant::now());

        if let Some(output) = output {
            log::info!(
                "tone on: {}.{} Hz requested, {}.{} Hz on pin",
                frequency / 10,
                frequency % 10,
                output / 10,
                output % 10
            );
            self.audio_start(output as f32 / 10.0);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.settle();
        let was_running = {
            let mut timer = self.timer();
            let was_running = timer.state().is_running();
            timer.stop()?;
            was_running
        };

        if was_running {
            log::info!("tone off");
        }
        self.audio_stop();
        Ok(())
    }

    fn state(&self) -> GeneratorState {
        self.timer().state()
    }
}

#[cfg(feature = "audio")]
mod audio {
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::thread;
    use std::time::Duration;

    use rodio::{OutputStream, Sink, Source};

    const SAMPLE_RATE: u32 = 48_000;
    const AMPLITUDE: f32 = 0.15;

    // Endless 50% duty square wave
    pub(super) struct SquareWave {
        frequency: f32,
        sample_rate: u32,
        current_sample: u64,
    }

    impl SquareWave {
        pub(super) fn new(frequency: f32, sample_rate: u32) -> Self {
            Self {
                frequency,
                sample_rate,
                current_sample: 0,
            }
        }
    }

    impl Iterator for SquareWave {
        type Item = f32;

        fn next(&mut self) -> Option<Self::Item> {
            let cycles =
                self.current_sample as f64 * self.frequency as f64 / self.sample_rate as f64;
            let cycle_position = cycles % 1.0;

            self.current_sample += 1;

            if cycle_position < 0.5 {
                Some(AMPLITUDE)
            } else {
                Some(-AMPLITUDE)
            }
        }
    }

    impl Source for SquareWave {
        fn current_frame_len(&self) -> Option<usize> {
            None
        }

        fn channels(&self) -> u16 {
            1
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn total_duration(&self) -> Option<Duration> {
            None
        }
    }

    enum AudioCommand {
        Start(f32),
        Stop,
    }

    pub(super) struct AudioOut {
        command_tx: Sender<AudioCommand>,
    }

    impl AudioOut {
        /// Start the playback thread. `None` when it could not be spawned.
        pub(super) fn spawn() -> Option<Self> {
            let (tx, rx) = channel();

            thread::Builder::new()
                .name("buzzer".to_string())
                .spawn(move || audio_thread(rx))
                .map_err(|e| log::warn!("buzzer thread not started: {}", e))
                .ok()?;

            Some(Self { command_tx: tx })
        }

        pub(super) fn start(&self, frequency_hz: f32) {
            // thread gone means no audio device; the model still runs
            let _ = self.command_tx.send(AudioCommand::Start(frequency_hz));
        }

        pub(super) fn stop(&self) {
            let _ = self.command_tx.send(AudioCommand::Stop);
        }
    }

    fn audio_thread(rx: Receiver<AudioCommand>) {
        let Ok((_stream, stream_handle)) = OutputStream::try_default() else {
            log::warn!("no audio output, running silent");
            return;
        };

        // dropping a sink silences it
        let mut sink: Option<Sink> = None;

        while let Ok(command) = rx.recv() {
            match command {
                AudioCommand::Start(frequency_hz) => {
                    sink = None;
                    match Sink::try_new(&stream_handle) {
                        Ok(new_sink) => {
                            new_sink.append(SquareWave::new(frequency_hz, SAMPLE_RATE));
                            sink = Some(new_sink);
                        }
                        Err(e) => log::error!("failed to open sink: {}", e),
                    }
                }
                AudioCommand::Stop => sink = None,
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use keypiano_core::timer::bits;

    #[test]
    fn test_buzzer_drives_shared_model() {
        let timer = SharedTimer::default();
        let mut buzzer = DesktopBuzzer::silent(timer.clone());

        buzzer.set_frequency_and_start(4400).unwrap();
        {
            let model = timer.lock().unwrap();
            assert_eq!(model.registers().ocra, 34);
            assert_eq!(model.output_frequency(), Some(8928));
        }
        assert_eq!(buzzer.state(), GeneratorState::Running(4400));

        buzzer.stop().unwrap();
        assert_eq!(timer.lock().unwrap().registers().tccrb & bits::CS_MASK, 0);
        assert_eq!(buzzer.state(), GeneratorState::Stopped);
    }

    #[test]
    fn test_elapsed_ticks() {
        assert_eq!(elapsed_ticks(16_000_000, Duration::from_secs(1)), 62_500);
        // one compare period at OCRA = 34
        assert_eq!(elapsed_ticks(16_000_000, Duration::from_micros(560)), 35);
        assert_eq!(elapsed_ticks(16_000_000, Duration::ZERO), 0);
    }

    #[test]
    fn test_pin_level_held_after_stop() {
        let timer = SharedTimer::default();
        let mut buzzer = DesktopBuzzer::silent(timer.clone());

        buzzer.set_frequency_and_start(4400).unwrap();
        buzzer.advance_model(Duration::from_micros(560));
        assert!(timer.lock().unwrap().output_high());

        // drop the wall-clock start so stop() adds no ticks of its own
        buzzer.started = None;
        buzzer.stop().unwrap();
        let model = timer.lock().unwrap();
        assert_eq!(model.output_frequency(), None);
        assert!(model.output_high());
    }

    #[test]
    fn test_stop_twice() {
        let mut buzzer = DesktopBuzzer::silent(SharedTimer::default());
        buzzer.stop().unwrap();
        buzzer.stop().unwrap();
        assert_eq!(buzzer.state(), GeneratorState::Stopped);
    }
}

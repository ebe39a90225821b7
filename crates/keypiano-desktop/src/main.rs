use std::io::{self, IsTerminal};

use keypiano_core::{DispatchError, Dispatcher, SerialConfig, SerialInput};
use log::LevelFilter;

use crate::bench_tui::BenchTui;
use crate::buzzer::{DesktopBuzzer, SharedTimer};
use crate::delay::StdDelay;
use crate::serial::{ChannelSerial, ReaderSerial, SerialError};

mod bench_tui;
mod buzzer;
mod delay;
mod log_capture;
mod serial;

fn main() -> anyhow::Result<()> {
    let timer = SharedTimer::default();

    if io::stdin().is_terminal() {
        let (line, serial) = serial::channel_serial();
        let mut tui = BenchTui::new(timer.clone(), line)?;
        let result = run::<ChannelSerial>(serial, DesktopBuzzer::new(timer));
        tui.shutdown();
        result
    } else {
        // piped: `printf 'asdf' | keypiano-desktop`
        log_capture::init(LevelFilter::Debug);
        let serial = ReaderSerial::new(io::stdin().lock());
        run(serial, DesktopBuzzer::new(timer))
    }
}

fn run<S>(serial: S, buzzer: DesktopBuzzer) -> anyhow::Result<()>
where
    S: SerialInput<Error = SerialError>,
{
    let config = SerialConfig::BENCH;
    log::info!(
        "serial {} baud {}N{} (UBRR {}), {} Hz clock",
        config.baud_rate,
        config.data_bits,
        config.stop_bits,
        config.baud_prescale(),
        config.clock_hz
    );

    let mut dispatcher = Dispatcher::new(serial, buzzer, StdDelay);
    match dispatcher.run() {
        Ok(never) => match never {},
        Err(DispatchError::Serial(SerialError::Closed)) => {
            log::info!("serial line closed");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use keypiano_core::{GeneratorState, ToneGenerator};

    use super::*;

    #[test]
    fn test_run_ends_cleanly_at_eof() {
        let timer = SharedTimer::default();
        let serial = ReaderSerial::new(Cursor::new(Vec::new()));

        run(serial, DesktopBuzzer::silent(timer.clone())).unwrap();
        assert_eq!(timer.lock().unwrap().state(), GeneratorState::Stopped);
    }

    struct Unplugged;

    impl io::Read for Unplugged {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }
    }

    #[test]
    fn test_run_reports_read_failure() {
        let serial = ReaderSerial::new(Unplugged);
        let err = run(serial, DesktopBuzzer::silent(SharedTimer::default())).unwrap_err();
        assert!(err.to_string().contains("unplugged"));
    }
}

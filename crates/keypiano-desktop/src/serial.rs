//! Host stand-ins for the serial receiver.

use std::fmt;
use std::io::{self, Read};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};

use keypiano_core::SerialInput;

/// Bytes the receiver holds before further bytes are lost (the AVR USART
/// keeps two).
pub const RX_FIFO_DEPTH: usize = 2;

#[derive(Debug)]
pub enum SerialError {
    /// Nothing will ever arrive again (EOF or the sending side went away).
    Closed,
    Io(io::Error),
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerialError::Closed => f.write_str("line closed"),
            SerialError::Io(e) => write!(f, "read failed: {}", e),
        }
    }
}

impl std::error::Error for SerialError {}

/// Receiver fed from another thread, one byte per keypress.
pub struct ChannelSerial {
    rx: Receiver<u8>,
}

/// Sending half handed to whatever produces keypresses.
#[derive(Clone)]
pub struct ChannelLine {
    tx: SyncSender<u8>,
}

/// Create a connected line/receiver pair with the hardware FIFO depth.
pub fn channel_serial() -> (ChannelLine, ChannelSerial) {
    let (tx, rx) = sync_channel(RX_FIFO_DEPTH);
    (ChannelLine { tx }, ChannelSerial { rx })
}

impl ChannelLine {
    /// Push a byte onto the line. Returns `false` when it was dropped
    /// because the receive FIFO is full or the receiver is gone.
    pub fn send(&self, byte: u8) -> bool {
        match self.tx.try_send(byte) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("rx overrun, dropped {:?}", byte as char);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl SerialInput for ChannelSerial {
    type Error = SerialError;

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        self.rx.recv().map_err(|_| SerialError::Closed)
    }
}

/// Receiver reading raw bytes from any `Read`, e.g. piped stdin.
pub struct ReaderSerial<R> {
    reader: R,
}

impl<R: Read> ReaderSerial<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> SerialInput for ReaderSerial<R> {
    type Error = SerialError;

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Err(SerialError::Closed),
                Ok(_) => return Ok(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SerialError::Io(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::thread;

    #[test]
    fn test_reader_bytes_in_order_then_closed() {
        let mut serial = ReaderSerial::new(Cursor::new(b"k;q".to_vec()));
        assert_eq!(serial.read_byte().unwrap(), b'k');
        assert_eq!(serial.read_byte().unwrap(), b';');
        assert_eq!(serial.read_byte().unwrap(), b'q');
        assert!(matches!(serial.read_byte(), Err(SerialError::Closed)));
    }

    #[test]
    fn test_channel_delivers_across_threads() {
        let (line, mut serial) = channel_serial();
        let producer = thread::spawn(move || {
            for &byte in b"asd" {
                // wait for room instead of overrunning
                while !line.send(byte) {
                    thread::yield_now();
                }
            }
        });

        assert_eq!(serial.read_byte().unwrap(), b'a');
        assert_eq!(serial.read_byte().unwrap(), b's');
        assert_eq!(serial.read_byte().unwrap(), b'd');
        producer.join().unwrap();
        assert!(matches!(serial.read_byte(), Err(SerialError::Closed)));
    }

    #[test]
    fn test_channel_overrun_drops_bytes() {
        let (line, mut serial) = channel_serial();
        assert!(line.send(b'a'));
        assert!(line.send(b's'));
        assert!(!line.send(b'd'));

        assert_eq!(serial.read_byte().unwrap(), b'a');
        assert_eq!(serial.read_byte().unwrap(), b's');
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (line, serial) = channel_serial();
        drop(serial);
        assert!(!line.send(b'k'));
    }
}

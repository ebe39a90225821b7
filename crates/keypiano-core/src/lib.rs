//! Serial keyboard piano
//!
//! One byte in, one tone out: each byte received on the serial line is
//! looked up in a fixed home-row table and played on a square-wave timer for
//! a fixed window, one key at a time.
#![cfg_attr(not(test), no_std)]

pub mod buzzer;
pub mod consts;
pub mod dispatcher;
pub mod error;
pub mod input;
pub mod keymap;
pub mod timer;

pub use buzzer::{GeneratorState, ToneGenerator};
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use input::{SerialConfig, SerialInput};
pub use keymap::{ToneTableEntry, TONE_TABLE};
pub use timer::CompareTimer;

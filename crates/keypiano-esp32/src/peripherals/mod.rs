mod ledc_tone;
mod uart_input;

pub use ledc_tone::{LedcTone, TonePeripherals};
pub use uart_input::{SerialPeripherals, UartInput};

use esp_idf_hal::gpio::Gpio9;
use esp_idf_hal::ledc::{CHANNEL0, TIMER0};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::sys::EspError;
use esp_idf_hal::uart::UART1;

pub struct SystemPeripherals {
    pub serial: SerialPeripherals<UART1>,
    pub tone: TonePeripherals<TIMER0, CHANNEL0, Gpio9>,
}

impl SystemPeripherals {
    pub fn take() -> Result<Self, EspError> {
        let peripherals = Peripherals::take()?;

        Ok(SystemPeripherals {
            serial: SerialPeripherals {
                uart: peripherals.uart1,
                rx: peripherals.pins.gpio16.into(), // GPIO16 - keyboard RX
            },
            tone: TonePeripherals {
                timer: peripherals.ledc.timer0,
                channel: peripherals.ledc.channel0,
                pin: peripherals.pins.gpio9, // GPIO9 - piezo buzzer
            },
        })
    }
}

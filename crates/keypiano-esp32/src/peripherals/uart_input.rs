//! Receive-only UART feeding the dispatcher.

use esp_idf_hal::delay::BLOCK;
use esp_idf_hal::gpio::{AnyIOPin, AnyInputPin};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;
use esp_idf_hal::uart::{config, Uart, UartRxDriver};
use esp_idf_hal::units::Hertz;

use keypiano_core::input::{Parity, SerialConfig};
use keypiano_core::SerialInput;

pub struct SerialPeripherals<UART> {
    pub uart: UART,
    pub rx: AnyInputPin,
}

pub struct UartInput {
    driver: UartRxDriver<'static>,
}

fn driver_config(config: &SerialConfig) -> config::Config {
    let data_bits = match config.data_bits {
        5 => config::DataBits::DataBits5,
        6 => config::DataBits::DataBits6,
        7 => config::DataBits::DataBits7,
        _ => config::DataBits::DataBits8,
    };
    let stop_bits = match config.stop_bits {
        2 => config::StopBits::STOP2,
        _ => config::StopBits::STOP1,
    };

    let driver = config::Config::new()
        .baudrate(Hertz(config.baud_rate))
        .data_bits(data_bits)
        .stop_bits(stop_bits);

    match config.parity {
        Parity::None => driver.parity_none(),
        Parity::Even => driver.parity_even(),
        Parity::Odd => driver.parity_odd(),
    }
}

impl UartInput {
    /// Configure the receiver. Takes the peripheral, so it can only happen
    /// once.
    pub fn new<UART>(
        peripherals: SerialPeripherals<UART>,
        config: &SerialConfig,
    ) -> Result<Self, EspError>
    where
        UART: Uart + Peripheral<P = UART> + 'static,
    {
        let driver = UartRxDriver::new(
            peripherals.uart,
            peripherals.rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &driver_config(config),
        )?;

        log::info!(
            "UART RX ready: {} baud, {} data bits, {:?} parity, {} stop bit(s)",
            config.baud_rate,
            config.data_bits,
            config.parity,
            config.stop_bits
        );

        Ok(Self { driver })
    }
}

impl SerialInput for UartInput {
    type Error = EspError;

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut byte = [0u8; 1];
        // BLOCK never times out, but the driver reports 0 bytes if woken early
        while self.driver.read(&mut byte, BLOCK)? == 0 {}
        Ok(byte[0])
    }
}

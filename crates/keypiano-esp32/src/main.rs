use esp_idf_hal::delay::FreeRtos;
use keypiano_core::{Dispatcher, SerialConfig};

use crate::peripherals::{LedcTone, SystemPeripherals, UartInput};

mod peripherals;

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise, some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("keypiano starting...");

    let peripherals = SystemPeripherals::take()?;

    let config = SerialConfig::BENCH;
    let serial = UartInput::new(peripherals.serial, &config)?;
    let tone = LedcTone::new(peripherals.tone)?;

    let mut dispatcher = Dispatcher::new(serial, tone, FreeRtos);
    match dispatcher.run() {
        Ok(never) => match never {},
        Err(e) => {
            log::error!("dispatcher stopped: {}", e);
            Err(e.into())
        }
    }
}

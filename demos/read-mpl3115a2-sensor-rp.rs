#![no_std]
#![no_main]

use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_mpl3115a2_sensor::{registers, MPL3115A2Error, MPL3115A2Sensor};
use embassy_rp::peripherals::I2C0;
use embassy_rp::{bind_interrupts, i2c};
use embassy_time::{Duration, Timer};
use panic_probe as _;

bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    let sda = p.PIN_0;
    let scl = p.PIN_1;

    // Configure I2C
    let mut i2c = i2c::I2c::new_async(p.I2C0, scl, sda, Irqs, Default::default());

    // Create sensor instance
    let mut sensor = MPL3115A2Sensor::new(&mut i2c, registers::DEFAULT_ADDRESS);

    loop {
        match sensor.begin().await {
            Ok(()) => break,
            Err(e) => {
                error!("Couldn't find sensor: {}", e);
                Timer::after(Duration::from_secs(1)).await;
            }
        }
    }

    // Local sea-level baseline for the device's internal altitude output
    if let Err(e) = sensor.set_sea_level_pressure(101_325.0).await {
        error!("Failed to set sea-level baseline: {}", e);
    }

    // Read sensor data
    loop {
        match sensor.read().await {
            Ok(data) => {
                info!(
                    "Pressure: {} Pa, Altitude: {} m, Temperature: {}°C",
                    data.pressure, data.altitude, data.temperature
                );
            }
            Err(e) => match e {
                MPL3115A2Error::InvalidDeviceId(_) => error!("Unexpected device identity"),
                MPL3115A2Error::I2c(_) => error!("I2C communication error"),
                MPL3115A2Error::Timeout => error!("Operation timed out"),
            },
        }

        Timer::after(Duration::from_millis(250)).await;
    }
}

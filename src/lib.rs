#![cfg_attr(not(test), no_std)]

mod mpl3115a2;
pub mod registers;

pub use mpl3115a2::MPL3115A2Sensor;

use embedded_hal_async::i2c::ErrorKind;

/// One full set of calibrated samples from the sensor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MPL3115A2Response {
    /// Barometric pressure in pascals.
    pub pressure: f32,
    /// Altitude in meters, relative to the configured sea-level baseline.
    pub altitude: f32,
    /// Temperature in degrees Celsius.
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MPL3115A2Error {
    /// The identity register answered with something other than the
    /// MPL3115A2 id (0xC4). Carries the byte that was read back.
    InvalidDeviceId(u8),
    /// A bus transaction failed; the kind separates a missing acknowledge
    /// from bus-level faults.
    I2c(ErrorKind),
    /// A status poll exhausted its retry budget.
    Timeout,
}

#[cfg(feature = "defmt")]
impl defmt::Format for MPL3115A2Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            MPL3115A2Error::InvalidDeviceId(id) => {
                defmt::write!(f, "InvalidDeviceId(0x{:02X})", id)
            }
            MPL3115A2Error::I2c(kind) => defmt::write!(f, "I2c({})", defmt::Debug2Format(kind)),
            MPL3115A2Error::Timeout => defmt::write!(f, "Timeout"),
        }
    }
}

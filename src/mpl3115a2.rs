use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::{Error as _, I2c};

use crate::registers::{self, CtrlReg1, Oversample, Register};
use crate::{MPL3115A2Error, MPL3115A2Response};

/// Interval between status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Retry budget per poll loop. A 128x oversampled conversion runs roughly
/// half a second; 300 attempts at 10 ms gives it a 3 s ceiling.
const MAX_POLL_ATTEMPTS: u32 = 300;
/// Settle time after requesting a soft reset, before the completion poll.
const RESET_SETTLE: Duration = Duration::from_millis(10);

/// MPL3115A2 pressure/altitude/temperature sensor on an I2C bus.
///
/// The bus is borrowed for the lifetime of the handle; the driver does not
/// manage the transport's lifecycle and performs no locking of its own, so
/// concurrent users of the same bus must be serialized by the caller.
pub struct MPL3115A2Sensor<'a, T: I2c> {
    i2c: &'a mut T,
    address: u8,
    ctrl_reg1: CtrlReg1,
}

impl<'a, T: I2c> MPL3115A2Sensor<'a, T> {
    pub fn new(i2c: &'a mut T, address: u8) -> Self {
        Self {
            i2c,
            address,
            ctrl_reg1: CtrlReg1::default(),
        }
    }

    /// Probes the identity register, soft-resets the device and brings it
    /// into its operating configuration: 128x oversampling, altimeter
    /// output encoding, data-ready event flags enabled.
    ///
    /// On an identity mismatch the device is left untouched. Calling this
    /// again re-derives the same configuration.
    pub async fn begin(&mut self) -> Result<(), MPL3115A2Error> {
        let id = self.register_read(Register::WhoAmI).await?;
        if id != registers::DEVICE_ID {
            return Err(MPL3115A2Error::InvalidDeviceId(id));
        }

        self.register_write(Register::CtrlReg1, CtrlReg1::RST).await?;
        Timer::after(RESET_SETTLE).await;
        self.wait_register_clear(Register::CtrlReg1, CtrlReg1::RST)
            .await?;

        let mut ctrl = CtrlReg1::default();
        ctrl.set_oversample(Oversample::X128);
        ctrl.set_altimeter(true);
        self.ctrl_reg1 = ctrl;
        self.register_write(Register::CtrlReg1, ctrl.bits()).await?;

        self.register_write(
            Register::PtDataCfg,
            registers::PT_DATA_CFG_TDEFE | registers::PT_DATA_CFG_PDEFE | registers::PT_DATA_CFG_DREM,
        )
        .await?;

        Ok(())
    }

    /// Reads pressure, altitude and temperature in sequence.
    pub async fn read(&mut self) -> Result<MPL3115A2Response, MPL3115A2Error> {
        let pressure = self.read_pressure().await?;
        let altitude = self.read_altitude().await?;
        let temperature = self.read_temperature().await?;
        Ok(MPL3115A2Response {
            pressure,
            altitude,
            temperature,
        })
    }

    /// Triggers a one-shot barometer conversion and returns pascals.
    pub async fn read_pressure(&mut self) -> Result<f32, MPL3115A2Error> {
        self.trigger_one_shot(false).await?;
        self.wait_register_set(Register::Status, registers::STATUS_PDR)
            .await?;

        let mut raw = [0u8; 3];
        self.i2c_write_read(&[Register::PressureMsb as u8], &mut raw)
            .await?;
        Ok(decode_pressure(raw))
    }

    /// Triggers a one-shot altimeter conversion and returns meters,
    /// relative to the sea-level baseline the device was given.
    pub async fn read_altitude(&mut self) -> Result<f32, MPL3115A2Error> {
        self.trigger_one_shot(true).await?;
        self.wait_register_set(Register::Status, registers::STATUS_PDR)
            .await?;

        let mut raw = [0u8; 3];
        self.i2c_write_read(&[Register::PressureMsb as u8], &mut raw)
            .await?;
        Ok(decode_altitude(raw))
    }

    /// Triggers a one-shot conversion and returns degrees Celsius.
    ///
    /// Unlike the pressure and altitude paths this does not wait out a
    /// conversion that is still in flight, and it leaves the output
    /// encoding mode alone.
    pub async fn read_temperature(&mut self) -> Result<f32, MPL3115A2Error> {
        self.ctrl_reg1.set_one_shot(true);
        self.register_write(Register::CtrlReg1, self.ctrl_reg1.bits())
            .await?;
        self.wait_register_set(Register::Status, registers::STATUS_TDR)
            .await?;

        let mut raw = [0u8; 2];
        self.i2c_write_read(&[Register::TempMsb as u8], &mut raw)
            .await?;
        Ok(decode_temperature(raw))
    }

    /// Writes the local sea-level pressure (pascals) the device uses for
    /// its internal altitude computation. Fire-and-forget; there is no
    /// readback.
    pub async fn set_sea_level_pressure(&mut self, pascal: f32) -> Result<(), MPL3115A2Error> {
        let half = (pascal / 2.0) as u16;
        let bar = half.to_be_bytes();
        self.i2c_write(&[Register::BarInMsb as u8, bar[0], bar[1]])
            .await
    }

    /// Waits for a previous one-shot to finish, selects the output
    /// encoding, then starts a new conversion. The one-shot bit stays set
    /// in the mirror; the device clears the hardware bit on completion.
    async fn trigger_one_shot(&mut self, altimeter: bool) -> Result<(), MPL3115A2Error> {
        self.wait_register_clear(Register::CtrlReg1, CtrlReg1::OST)
            .await?;

        self.ctrl_reg1.set_altimeter(altimeter);
        self.register_write(Register::CtrlReg1, self.ctrl_reg1.bits())
            .await?;

        self.ctrl_reg1.set_one_shot(true);
        self.register_write(Register::CtrlReg1, self.ctrl_reg1.bits())
            .await
    }

    async fn wait_register_clear(&mut self, register: Register, mask: u8) -> Result<(), MPL3115A2Error> {
        self.wait_register(register, mask, false).await
    }

    async fn wait_register_set(&mut self, register: Register, mask: u8) -> Result<(), MPL3115A2Error> {
        self.wait_register(register, mask, true).await
    }

    async fn wait_register(
        &mut self,
        register: Register,
        mask: u8,
        until_set: bool,
    ) -> Result<(), MPL3115A2Error> {
        for _ in 0..MAX_POLL_ATTEMPTS {
            let value = self.register_read(register).await?;
            if ((value & mask) != 0) == until_set {
                return Ok(());
            }
            Timer::after(POLL_INTERVAL).await;
        }
        Err(MPL3115A2Error::Timeout)
    }

    async fn register_read(&mut self, register: Register) -> Result<u8, MPL3115A2Error> {
        let mut value = [0u8; 1];
        self.i2c_write_read(&[register as u8], &mut value).await?;
        Ok(value[0])
    }

    async fn register_write(&mut self, register: Register, value: u8) -> Result<(), MPL3115A2Error> {
        self.i2c_write(&[register as u8, value]).await
    }

    async fn i2c_write_read(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), MPL3115A2Error> {
        self.i2c
            .write_read(self.address, write, read)
            .await
            .map_err(|e| MPL3115A2Error::I2c(e.kind()))
    }

    async fn i2c_write(&mut self, write: &[u8]) -> Result<(), MPL3115A2Error> {
        self.i2c
            .write(self.address, write)
            .await
            .map_err(|e| MPL3115A2Error::I2c(e.kind()))
    }
}

/// 20-bit unsigned barometer sample: bytes combine big-endian, the low
/// nibble of the LSB is dropped, and the remaining count is quarter
/// pascals.
fn decode_pressure(raw: [u8; 3]) -> f32 {
    let counts = u32::from_be_bytes([0, raw[0], raw[1], raw[2]]) >> 4;
    counts as f32 / 4.0
}

/// Altimeter sample: the three bytes occupy bits 31..8 of a signed 32-bit
/// word, giving meters with 16 fractional bits. Sign falls out of the
/// two's-complement interpretation.
fn decode_altitude(raw: [u8; 3]) -> f32 {
    let packed = i32::from_be_bytes([raw[0], raw[1], raw[2], 0x00]);
    packed as f32 / 65536.0
}

/// 12-bit signed temperature sample in sixteenths of a degree. Bit 11 is
/// the sign bit and gets extended through the upper nibble.
fn decode_temperature(raw: [u8; 2]) -> f32 {
    let mut value = u16::from_be_bytes(raw) >> 4;
    if value & 0x0800 != 0 {
        value |= 0xF000;
    }
    (value as i16) as f32 / 16.0
}

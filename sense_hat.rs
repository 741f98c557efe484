use rppal::i2c::I2c;

use crate::error::SensorError;
use crate::structs::HumidityCalibration;

// Sense HAT I2C slave addresses.
const ADDR_HTS221: u16 = 0x5F;
const ADDR_LPS25H: u16 = 0x5C;

const REG_WHO_AM_I: u8 = 0x0F;
const WHO_AM_I_HTS221: u8 = 0xBC;
const WHO_AM_I_LPS25H: u8 = 0xBD;

// HTS221 register addresses.
// cf. https://www.st.com/resource/en/datasheet/hts221.pdf
const REG_HTS221_AV_CONF: u8 = 0x10;
const REG_HTS221_CTRL_REG1: u8 = 0x20;
const REG_HTS221_HUMIDITY_OUT: u8 = 0x28;
const REG_HTS221_TEMP_OUT: u8 = 0x2A;
const REG_HTS221_CALIB: u8 = 0x30;
const REG_HTS221_CALIB_LEN: usize = 16;

// LPS25H register addresses.
// cf. https://www.st.com/resource/en/datasheet/lps25h.pdf
const REG_LPS25H_RES_CONF: u8 = 0x10;
const REG_LPS25H_CTRL_REG1: u8 = 0x20;
const REG_LPS25H_PRESS_OUT: u8 = 0x28;
const REG_LPS25H_PRESS_OUT_LEN: usize = 3;
const REG_LPS25H_TEMP_OUT: u8 = 0x2B;

/// Raw environmental readings. Temperatures in Celsius, humidity in percent,
/// pressure in millibar.
pub trait EnvironmentSensor {
    fn humidity_derived_temperature(&mut self) -> Result<f64, SensorError>;
    fn pressure_derived_temperature(&mut self) -> Result<f64, SensorError>;
    fn humidity(&mut self) -> Result<f64, SensorError>;
    fn pressure(&mut self) -> Result<f64, SensorError>;
}

/// HTS221 and LPS25H on the Sense HAT, sharing one I2C bus.
pub struct SenseHat {
    i2c: I2c,
    calib: HumidityCalibration,
}

impl SenseHat {
    pub fn new(bus: u8) -> Result<Self, SensorError> {
        let mut i2c = I2c::with_bus(bus)?;

        select(&mut i2c, ADDR_HTS221, WHO_AM_I_HTS221)?;
        let av_samples: u8 = 0x1B; // 16 temperature, 32 humidity samples averaged
        let pd: u8 = 1; // Power on
        let bdu: u8 = 1; // Block data update
        let odr: u8 = 3; // 12.5 Hz
        i2c.smbus_write_byte(REG_HTS221_AV_CONF, av_samples)?;
        i2c.smbus_write_byte(REG_HTS221_CTRL_REG1, (pd << 7) | (bdu << 2) | odr)?;
        let calib = read_calib(&i2c)?;

        select(&mut i2c, ADDR_LPS25H, WHO_AM_I_LPS25H)?;
        let avg_t: u8 = 1; // 16 internal temperature samples
        let avg_p: u8 = 1; // 32 internal pressure samples
        let odr: u8 = 4; // 25 Hz
        i2c.smbus_write_byte(REG_LPS25H_RES_CONF, (avg_t << 2) | avg_p)?;
        i2c.smbus_write_byte(REG_LPS25H_CTRL_REG1, (pd << 7) | (odr << 4) | (bdu << 2))?;

        log::debug!("Sense HAT ready on /dev/i2c-{}: {:?}", bus, calib);
        Ok(Self { i2c, calib })
    }
}

impl EnvironmentSensor for SenseHat {
    fn humidity_derived_temperature(&mut self) -> Result<f64, SensorError> {
        self.i2c.set_slave_address(ADDR_HTS221)?;
        let raw = read_i16(&self.i2c, REG_HTS221_TEMP_OUT)?;
        Ok(compute_hts221_temperature(&self.calib, raw))
    }

    fn pressure_derived_temperature(&mut self) -> Result<f64, SensorError> {
        self.i2c.set_slave_address(ADDR_LPS25H)?;
        let raw = read_i16(&self.i2c, REG_LPS25H_TEMP_OUT)?;
        Ok(compute_lps25h_temperature(raw))
    }

    fn humidity(&mut self) -> Result<f64, SensorError> {
        self.i2c.set_slave_address(ADDR_HTS221)?;
        let raw = read_i16(&self.i2c, REG_HTS221_HUMIDITY_OUT)?;
        Ok(compute_hts221_humidity(&self.calib, raw))
    }

    fn pressure(&mut self) -> Result<f64, SensorError> {
        self.i2c.set_slave_address(ADDR_LPS25H)?;
        let mut data = [0u8; REG_LPS25H_PRESS_OUT_LEN];
        // 0x28 - 0x2A
        for (n, byte) in data.iter_mut().enumerate() {
            *byte = self.i2c.smbus_read_byte(REG_LPS25H_PRESS_OUT + n as u8)?;
        }
        Ok(compute_lps25h_pressure(data))
    }
}

fn select(i2c: &mut I2c, address: u16, expected: u8) -> Result<(), SensorError> {
    i2c.set_slave_address(address)?;
    let found = i2c.smbus_read_byte(REG_WHO_AM_I)?;
    if found != expected {
        return Err(SensorError::WrongDevice { address, expected, found });
    }
    Ok(())
}

fn read_i16(i2c: &I2c, reg_low: u8) -> Result<i16, rppal::i2c::Error> {
    let low = i2c.smbus_read_byte(reg_low)?;
    let high = i2c.smbus_read_byte(reg_low + 1)?;
    Ok(i16::from_le_bytes([low, high]))
}

fn read_calib(i2c: &I2c) -> Result<HumidityCalibration, rppal::i2c::Error> {
    let mut calib = [0u8; REG_HTS221_CALIB_LEN];
    // 0x30 - 0x3F
    for (n, byte) in calib.iter_mut().enumerate() {
        *byte = i2c.smbus_read_byte(REG_HTS221_CALIB + n as u8)?;
    }
    Ok(decode_calib(&calib))
}

fn decode_calib(calib: &[u8; REG_HTS221_CALIB_LEN]) -> HumidityCalibration {
    // T0/T1 are 10-bit values; their two top bits live in 0x35.
    let msb = calib[5];
    let t0_x8 = (u16::from(msb & 0x03) << 8) | u16::from(calib[2]);
    let t1_x8 = (u16::from((msb & 0x0C) >> 2) << 8) | u16::from(calib[3]);

    HumidityCalibration {
        h0_rh: f64::from(calib[0]) / 2.0,
        h1_rh: f64::from(calib[1]) / 2.0,
        h0_t0_out: i16::from_le_bytes([calib[6], calib[7]]),
        h1_t0_out: i16::from_le_bytes([calib[10], calib[11]]),
        t0_deg_c: f64::from(t0_x8) / 8.0,
        t1_deg_c: f64::from(t1_x8) / 8.0,
        t0_out: i16::from_le_bytes([calib[12], calib[13]]),
        t1_out: i16::from_le_bytes([calib[14], calib[15]]),
    }
}

fn interpolate(x: i16, x0: i16, x1: i16, y0: f64, y1: f64) -> f64 {
    let span = f64::from(x1) - f64::from(x0);
    if span == 0.0 {
        return y0;
    }
    y0 + (f64::from(x) - f64::from(x0)) * (y1 - y0) / span
}

fn compute_hts221_temperature(calib: &HumidityCalibration, raw: i16) -> f64 {
    interpolate(raw, calib.t0_out, calib.t1_out, calib.t0_deg_c, calib.t1_deg_c)
}

fn compute_hts221_humidity(calib: &HumidityCalibration, raw: i16) -> f64 {
    let h = interpolate(raw, calib.h0_t0_out, calib.h1_t0_out, calib.h0_rh, calib.h1_rh);
    h.clamp(0.0, 100.0)
}

fn compute_lps25h_pressure(data: [u8; REG_LPS25H_PRESS_OUT_LEN]) -> f64 {
    // 24-bit two's complement, sign-extended through the top byte
    let raw = i32::from_le_bytes([data[0], data[1], data[2], 0]) << 8 >> 8;
    f64::from(raw) / 4096.0
}

fn compute_lps25h_temperature(raw: i16) -> f64 {
    42.5 + f64::from(raw) / 480.0
}

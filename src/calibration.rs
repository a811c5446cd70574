//! Factory trim coefficients and the compensation formulas that turn raw ADC
//! counts into physical units.
//!
//! Temperature compensation yields a [`FineTemperature`] that pressure and
//! humidity compensation take as an explicit argument, so a reading cycle can
//! only ever combine values from the same raw sample.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Measurements, BME280_CALIB_DATA_LEN, BME280_P_T_H_DATA_LEN};

const BME280_HUMIDITY_MAX_Q22_10: i32 = 419_430_400;

/// Reinterprets a little-endian byte pair as a two's-complement 16-bit value.
pub(crate) fn decode_s16(lsb: u8, msb: u8) -> i16 {
    let value = ((msb as i32) << 8) | lsb as i32;
    let value = if value & 0x8000 != 0 {
        value - 65536
    } else {
        value
    };
    value as i16
}

fn decode_u16(lsb: u8, msb: u8) -> u16 {
    ((msb as u16) << 8) | lsb as u16
}

/// Temperature trim coefficients (`dig_T1` .. `dig_T3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureCalibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
}

/// Pressure trim coefficients (`dig_P1` .. `dig_P9`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PressureCalibration {
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

/// Humidity trim coefficients (`dig_H1` .. `dig_H6`).
///
/// `dig_h4` and `dig_h5` are 12-bit values sharing the nibbles of one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HumidityCalibration {
    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    pub dig_h4: u16,
    pub dig_h5: u16,
    pub dig_h6: i8,
}

/// All trim coefficients of one sensor, read once when the device is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationData {
    pub temperature: TemperatureCalibration,
    pub pressure: PressureCalibration,
    pub humidity: HumidityCalibration,
}

impl CalibrationData {
    /// Decodes the concatenation of the 0x88 (24 bytes), 0xA1 (1 byte) and
    /// 0xE1 (7 bytes) register blocks.
    pub fn parse(data: &[u8; BME280_CALIB_DATA_LEN]) -> Self {
        let s16 = |offset: usize| decode_s16(data[offset], data[offset + 1]);

        let temperature = TemperatureCalibration {
            dig_t1: decode_u16(data[0], data[1]),
            dig_t2: s16(2),
            dig_t3: s16(4),
        };

        let pressure = PressureCalibration {
            dig_p1: decode_u16(data[6], data[7]),
            dig_p2: s16(8),
            dig_p3: s16(10),
            dig_p4: s16(12),
            dig_p5: s16(14),
            dig_p6: s16(16),
            dig_p7: s16(18),
            dig_p8: s16(20),
            dig_p9: s16(22),
        };

        // 0xE4..0xE6 hold H4 [11:4], H5 [3:0] | H4 [3:0], H5 [11:4]
        let humidity = HumidityCalibration {
            dig_h1: data[24],
            dig_h2: s16(25),
            dig_h3: data[27],
            dig_h4: ((data[28] as u16) << 4) | (data[29] & 0x0F) as u16,
            dig_h5: ((data[30] as u16) << 4) | ((data[29] >> 4) & 0x0F) as u16,
            dig_h6: data[31] as i8,
        };

        CalibrationData {
            temperature,
            pressure,
            humidity,
        }
    }
}

/// Intermediate temperature value shared by the pressure and humidity formulas.
///
/// Only [`TemperatureCalibration::compensate`] produces one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FineTemperature(f64);

impl FineTemperature {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TemperatureCalibration {
    /// Returns the temperature in hundredths of a degree Celsius together with
    /// the fine temperature of this cycle.
    pub fn compensate(&self, uncompensated: u32) -> (f64, FineTemperature) {
        let adc_t = uncompensated as f64;
        let t1 = self.dig_t1 as f64;

        let var1 = (adc_t / 16384.0 - t1 / 1024.0) * self.dig_t2 as f64;
        let delta = adc_t / 131072.0 - t1 / 8192.0;
        let var2 = delta * delta * self.dig_t3 as f64;

        let t_fine = var1 + var2;
        ((var1 + var2) / 5120.0 * 100.0, FineTemperature(t_fine))
    }
}

impl PressureCalibration {
    /// Returns the pressure in pascals, or exactly 0.0 when the trim values
    /// drive the divisor to zero.
    pub fn compensate(&self, uncompensated: u32, t_fine: &FineTemperature) -> f64 {
        let var1 = t_fine.value() / 2.0 - 64000.0;
        let var2 = var1 * var1 * self.dig_p6 as f64 / 32768.0;
        let var2 = var2 + var1 * self.dig_p5 as f64 * 2.0;
        let var2 = var2 / 4.0 + self.dig_p4 as f64 * 65536.0;
        let var1 = (self.dig_p3 as f64 * var1 * var1 / 524288.0 + self.dig_p2 as f64 * var1)
            / 524288.0;
        let var1 = (1.0 + var1 / 32768.0) * self.dig_p1 as f64;

        if var1 == 0.0 {
            warn!("pressure compensation divisor is zero");
            return 0.0;
        }

        let pressure = 1048576.0 - uncompensated as f64;
        let pressure = (pressure - var2 / 4096.0) * 6250.0 / var1;
        let var1 = self.dig_p9 as f64 * pressure * pressure / 2147483648.0;
        let var2 = pressure * self.dig_p8 as f64 / 32768.0;
        pressure + (var1 + var2 + self.dig_p7 as f64) / 16.0
    }
}

impl HumidityCalibration {
    /// Returns relative humidity in Q22.10 fixed point (divide by 1024 for %RH).
    ///
    /// Runs in 32-bit two's-complement arithmetic; right shifts are arithmetic.
    pub fn compensate(&self, uncompensated: u32, t_fine: &FineTemperature) -> u32 {
        let h1 = self.dig_h1 as i32;
        let h2 = self.dig_h2 as i32;
        let h3 = self.dig_h3 as i32;
        let h4 = self.dig_h4 as i32;
        let h5 = self.dig_h5 as i32;
        let h6 = self.dig_h6 as i32;

        let v_x1 = (t_fine.value() as i32).wrapping_sub(76800);

        let scaled = ((uncompensated as i32) << 14)
            .wrapping_sub(h4 << 20)
            .wrapping_sub(h5.wrapping_mul(v_x1))
            .wrapping_add(16384)
            >> 15;
        let inner = (v_x1.wrapping_mul(h6) >> 10)
            .wrapping_mul((v_x1.wrapping_mul(h3) >> 11) + 32768)
            >> 10;
        let outer = inner
            .wrapping_add(2097152)
            .wrapping_mul(h2)
            .wrapping_add(8192)
            >> 14;
        let v_x1 = scaled.wrapping_mul(outer);

        let square = (v_x1 >> 15).wrapping_mul(v_x1 >> 15) >> 7;
        let v_x1 = v_x1.wrapping_sub(square.wrapping_mul(h1) >> 4);

        let v_x1 = v_x1.max(0).min(BME280_HUMIDITY_MAX_Q22_10);
        (v_x1 >> 12) as u32
    }
}

/// Uncompensated ADC counts captured by one burst read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    pub pressure: u32,
    pub temperature: u32,
    pub humidity: u32,
}

impl RawSample {
    /// Decodes the eight data registers starting at 0xF7.
    pub fn parse(data: &[u8; BME280_P_T_H_DATA_LEN]) -> Self {
        let data_msb: u32 = (data[0] as u32) << 12;
        let data_lsb: u32 = (data[1] as u32) << 4;
        let data_xlsb: u32 = (data[2] as u32) >> 4;
        let pressure = data_msb | data_lsb | data_xlsb;

        let data_msb: u32 = (data[3] as u32) << 12;
        let data_lsb: u32 = (data[4] as u32) << 4;
        let data_xlsb: u32 = (data[5] as u32) >> 4;
        let temperature = data_msb | data_lsb | data_xlsb;

        let data_msb: u32 = (data[6] as u32) << 8;
        let data_lsb: u32 = data[7] as u32;
        let humidity = data_msb | data_lsb;

        RawSample {
            pressure,
            temperature,
            humidity,
        }
    }

    /// Runs temperature, pressure and humidity compensation, in that order.
    pub fn compensate(&self, calibration: &CalibrationData) -> Measurements {
        let (centidegrees, t_fine) = calibration.temperature.compensate(self.temperature);
        let pressure = calibration.pressure.compensate(self.pressure, &t_fine);
        let humidity = calibration.humidity.compensate(self.humidity, &t_fine);

        Measurements {
            temperature: centidegrees / 100.0,
            pressure: pressure / 100.0,
            humidity: humidity as f64 / 1024.0,
        }
    }
}

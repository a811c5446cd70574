//! A platform agnostic Rust driver for BME280-compatible environmental
//! sensors, based on the [`embedded-hal`](https://github.com/japaric/embedded-hal)
//! traits, with a companion driver for HD44780 character displays behind a
//! PCF8574 I²C backpack.
//!
//! ## The Device
//!
//! The Bosch BME280 is a highly accurate sensor for atmospheric temperature,
//! pressure, and relative humidity. Every unit carries factory trim
//! coefficients which this driver reads once at start-up and uses to
//! compensate each raw sample.
//!
//! - [Details and datasheet](https://www.bosch-sensortec.com/bst/products/all_products/bme280)
//!
//! ## Usage
//!
//! ```no_run
//! extern crate linux_embedded_hal as hal;
//! extern crate envsense;
//!
//! use hal::I2cdev;
//! use envsense::i2c::BME280;
//!
//! // using Linux I2C Bus #1 in this example
//! let i2c_bus = I2cdev::new("/dev/i2c-1").unwrap();
//!
//! // initialize the BME280 using the primary I2C address 0x76
//! let mut bme280 = BME280::new_primary(i2c_bus).unwrap();
//!
//! // measure temperature, pressure, and humidity
//! let measurements = bme280.measure().unwrap();
//!
//! println!("Relative Humidity = {}%", measurements.humidity);
//! println!("Temperature = {} deg C", measurements.temperature);
//! println!("Pressure = {} hPa", measurements.pressure);
//! ```
#![no_std]

mod fmt;

pub mod calibration;
pub mod hd44780;
pub mod i2c;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use calibration::{CalibrationData, RawSample};

const BME280_P_T_CALIB_DATA_ADDR: u8 = 0x88;
const BME280_H1_CALIB_DATA_ADDR: u8 = 0xA1;
const BME280_H_CALIB_DATA_ADDR: u8 = 0xE1;

const BME280_CTRL_HUM_ADDR: u8 = 0xF2;
const BME280_CTRL_MEAS_ADDR: u8 = 0xF4;
const BME280_CONFIG_ADDR: u8 = 0xF5;

const BME280_DATA_ADDR: u8 = 0xF7;

const BME280_SENSOR_MODE_MSK: u8 = 0x03;

pub(crate) const BME280_P_T_CALIB_DATA_LEN: usize = 24;
pub(crate) const BME280_H_CALIB_DATA_LEN: usize = 7;
pub(crate) const BME280_CALIB_DATA_LEN: usize =
    BME280_P_T_CALIB_DATA_LEN + 1 + BME280_H_CALIB_DATA_LEN;

pub(crate) const BME280_P_T_H_DATA_LEN: usize = 8;

/// Driver errors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Bus error
    Bus(E),
    /// Display position outside the panel's address space
    InvalidPosition,
}

#[cfg(feature = "ufmt-impl")]
impl<E> ufmt::uDisplay for Error<E> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            Error::Bus(_) => f.write_str("bus error"),
            Error::InvalidPosition => f.write_str("invalid display position"),
        }
    }
}

/// Compensated temperature, pressure, and humidity
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurements {
    /// temperature in degrees celsius
    pub temperature: f64,
    /// pressure in hectopascals
    pub pressure: f64,
    /// percent relative humidity
    pub humidity: f64,
}

/// Oversampling settings for temperature, pressure, and humidity measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oversampling {
    /// Disables oversampling.
    /// Without IIR filtering, this sets the resolution of temperature and pressure measurements
    /// to 16 bits.
    Oversampling1X,
    /// Configures 2x oversampling.
    Oversampling2X,
    /// Configures 4x oversampling.
    Oversampling4X,
    /// Configures 8x oversampling.
    Oversampling8X,
    /// Configures 16x oversampling.
    Oversampling16X,
    /// Skips the measurement entirely; the data register keeps `0x80000`.
    Skipped,
}

impl Oversampling {
    fn bits(self) -> u8 {
        match self {
            Oversampling::Skipped => 0,
            Oversampling::Oversampling1X => 1,
            Oversampling::Oversampling2X => 2,
            Oversampling::Oversampling4X => 3,
            Oversampling::Oversampling8X => 4,
            Oversampling::Oversampling16X => 5,
        }
    }
}

/// Operating mode of the measurement state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    /// No measurements; registers stay accessible.
    Sleep,
    /// One measurement, then back to sleep.
    Forced,
    /// Continuous measurements separated by the standby time.
    Normal,
}

impl PowerMode {
    fn bits(self) -> u8 {
        match self {
            PowerMode::Sleep => 0,
            PowerMode::Forced => 1,
            PowerMode::Normal => 3,
        }
    }
}

/// Inactive duration between measurements in normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Standby {
    Millis0_5,
    Millis62_5,
    Millis125,
    Millis250,
    Millis500,
    Millis1000,
    Millis10,
    Millis20,
}

impl Standby {
    fn bits(self) -> u8 {
        match self {
            Standby::Millis0_5 => 0,
            Standby::Millis62_5 => 1,
            Standby::Millis125 => 2,
            Standby::Millis250 => 3,
            Standby::Millis500 => 4,
            Standby::Millis1000 => 5,
            Standby::Millis10 => 6,
            Standby::Millis20 => 7,
        }
    }
}

/// Lowpass filter settings for pressure and temperature values.
/// See datasheet section 3.4.4 for more information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IIRFilter {
    Off,
    Coefficient2,
    Coefficient4,
    Coefficient8,
    Coefficient16,
}

impl IIRFilter {
    fn bits(self) -> u8 {
        match self {
            IIRFilter::Off => 0,
            IIRFilter::Coefficient2 => 1,
            IIRFilter::Coefficient4 => 2,
            IIRFilter::Coefficient8 => 3,
            IIRFilter::Coefficient16 => 4,
        }
    }
}

/// Operating parameters programmed into the control registers on initialization.
///
/// The default is the only configuration the driver writes: x1 oversampling
/// everywhere, normal mode, 1000 ms standby, filter off, 3-wire SPI off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Configuration {
    humidity_oversampling: Oversampling,
    temperature_oversampling: Oversampling,
    pressure_oversampling: Oversampling,
    mode: PowerMode,
    standby: Standby,
    iir_filter: IIRFilter,
    spi3w: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            humidity_oversampling: Oversampling::Oversampling1X,
            temperature_oversampling: Oversampling::Oversampling1X,
            pressure_oversampling: Oversampling::Oversampling1X,
            mode: PowerMode::Normal,
            standby: Standby::Millis1000,
            iir_filter: IIRFilter::Off,
            spi3w: false,
        }
    }
}

impl Configuration {
    /// Value of the `ctrl_hum` register (0xF2).
    pub fn ctrl_hum(&self) -> u8 {
        self.humidity_oversampling.bits()
    }

    /// Value of the `ctrl_meas` register (0xF4).
    pub fn ctrl_meas(&self) -> u8 {
        (self.temperature_oversampling.bits() << 5)
            | (self.pressure_oversampling.bits() << 2)
            | self.mode.bits()
    }

    /// Value of the `config` register (0xF5).
    pub fn config(&self) -> u8 {
        (self.standby.bits() << 5) | (self.iir_filter.bits() << 2) | self.spi3w as u8
    }
}

/// Register access to a BME280, independent of the bus it sits on.
pub trait Interface {
    type Error;

    /// Reads `data.len()` consecutive registers starting at `register`.
    fn read_registers(&mut self, register: u8, data: &mut [u8]) -> Result<(), Error<Self::Error>>;

    fn write_register(&mut self, register: u8, payload: u8) -> Result<(), Error<Self::Error>>;
}

/// Common driver code for a BME280 reached through any [`Interface`]
#[derive(Debug)]
pub struct BME280Common<I> {
    interface: I,
    calibration: CalibrationData,
}

impl<I> BME280Common<I>
where
    I: Interface,
{
    /// Programs the operating configuration and reads the trim coefficients.
    pub fn new(mut interface: I) -> Result<Self, Error<I::Error>> {
        let calibration = Self::configure(&mut interface)?;
        Ok(Self {
            interface,
            calibration,
        })
    }

    /// Re-programs the operating configuration and re-reads the trim coefficients.
    pub fn init(&mut self) -> Result<(), Error<I::Error>> {
        self.calibration = Self::configure(&mut self.interface)?;
        Ok(())
    }

    fn configure(interface: &mut I) -> Result<CalibrationData, Error<I::Error>> {
        let config = Configuration::default();
        debug!(
            "configuring: ctrl_hum={:#x} ctrl_meas={:#x} config={:#x}",
            config.ctrl_hum(),
            config.ctrl_meas(),
            config.config()
        );
        // ctrl_hum only takes effect after the following ctrl_meas write
        interface.write_register(BME280_CTRL_HUM_ADDR, config.ctrl_hum())?;
        interface.write_register(BME280_CTRL_MEAS_ADDR, config.ctrl_meas())?;
        interface.write_register(BME280_CONFIG_ADDR, config.config())?;
        Self::read_calibration(interface)
    }

    fn read_calibration(interface: &mut I) -> Result<CalibrationData, Error<I::Error>> {
        let mut data = [0; BME280_CALIB_DATA_LEN];
        let (pt, h) = data.split_at_mut(BME280_P_T_CALIB_DATA_LEN);
        let (h1, h) = h.split_at_mut(1);
        interface.read_registers(BME280_P_T_CALIB_DATA_ADDR, pt)?;
        interface.read_registers(BME280_H1_CALIB_DATA_ADDR, h1)?;
        interface.read_registers(BME280_H_CALIB_DATA_ADDR, h)?;

        let calibration = CalibrationData::parse(&data);
        debug!("calibration: {:?}", calibration);
        Ok(calibration)
    }

    /// Trim coefficients read during the last initialization
    pub fn calibration(&self) -> &CalibrationData {
        &self.calibration
    }

    /// Captures and processes sensor data for temperature, pressure, and humidity
    pub fn measure(&mut self) -> Result<Measurements, Error<I::Error>> {
        let mut data = [0; BME280_P_T_H_DATA_LEN];
        self.interface.read_registers(BME280_DATA_ADDR, &mut data)?;
        let sample = RawSample::parse(&data);
        trace!("raw sample: {:?}", sample);
        Ok(sample.compensate(&self.calibration))
    }

    /// Switches between continuous measurements (`true`) and sleep (`false`).
    pub fn set_power(&mut self, on: bool) -> Result<(), Error<I::Error>> {
        let mut ctrl_meas = [0];
        self.interface
            .read_registers(BME280_CTRL_MEAS_ADDR, &mut ctrl_meas)?;
        let mode = if on {
            PowerMode::Normal
        } else {
            PowerMode::Sleep
        };
        debug!("setting power mode {:?}", mode);
        let ctrl_meas = (ctrl_meas[0] & !BME280_SENSOR_MODE_MSK) | mode.bits();
        self.interface
            .write_register(BME280_CTRL_MEAS_ADDR, ctrl_meas)
    }

    /// Destroys the driver, returning the underlying interface
    pub fn free(self) -> I {
        self.interface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_registers() {
        let config = Configuration::default();
        assert_eq!(config.ctrl_hum(), 0x01);
        assert_eq!(config.ctrl_meas(), 0x27);
        assert_eq!(config.config(), 0xA0);
    }

    #[test]
    fn calibration_block_layout() {
        assert_eq!(BME280_CALIB_DATA_LEN, 32);
    }
}

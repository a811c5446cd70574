//! BME280 driver for sensors attached via I2C.

use embedded_hal::blocking::i2c::{Write, WriteRead};

use super::{calibration::CalibrationData, BME280Common, Error, Interface, Measurements};

const BME280_I2C_ADDR_PRIMARY: u8 = 0x76;
const BME280_I2C_ADDR_SECONDARY: u8 = 0x77;

/// Representation of a BME280
#[derive(Debug)]
pub struct BME280<I2C> {
    common: BME280Common<I2CInterface<I2C>>,
}

impl<I2C, E> BME280<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    /// Create and initialize a BME280 at the primary I²C address `0x76`
    pub fn new_primary(i2c: I2C) -> Result<Self, Error<E>> {
        Self::new(i2c, BME280_I2C_ADDR_PRIMARY)
    }

    /// Create and initialize a BME280 at the secondary I²C address `0x77`
    pub fn new_secondary(i2c: I2C) -> Result<Self, Error<E>> {
        Self::new(i2c, BME280_I2C_ADDR_SECONDARY)
    }

    /// Create and initialize a BME280 at a custom I²C address
    pub fn new(i2c: I2C, address: u8) -> Result<Self, Error<E>> {
        debug!("initializing BME280 at {:#x}", address);
        Ok(BME280 {
            common: BME280Common::new(I2CInterface { i2c, address })?,
        })
    }

    /// Re-initializes the BME280, re-reading its trim coefficients
    pub fn init(&mut self) -> Result<(), Error<E>> {
        self.common.init()
    }

    /// Captures and processes sensor data for temperature, pressure, and humidity
    pub fn measure(&mut self) -> Result<Measurements, Error<E>> {
        self.common.measure()
    }

    /// Switches between continuous measurements (`true`) and sleep (`false`)
    pub fn set_power(&mut self, on: bool) -> Result<(), Error<E>> {
        self.common.set_power(on)
    }

    /// Trim coefficients read from the sensor
    pub fn calibration(&self) -> &CalibrationData {
        self.common.calibration()
    }

    /// Destroys the driver, returning the I²C bus
    pub fn free(self) -> I2C {
        self.common.free().i2c
    }
}

/// Register access functions for I2C
#[derive(Debug)]
struct I2CInterface<I2C> {
    /// concrete I²C device implementation
    i2c: I2C,
    /// I²C device address
    address: u8,
}

impl<I2C, E> Interface for I2CInterface<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    type Error = E;

    fn read_registers(&mut self, register: u8, data: &mut [u8]) -> Result<(), Error<E>> {
        self.i2c
            .write_read(self.address, &[register], data)
            .map_err(Error::Bus)
    }

    fn write_register(&mut self, register: u8, payload: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[register, payload])
            .map_err(Error::Bus)
    }
}

//! Polls a BME280 and shows the readings on an HD44780 panel, both on Linux
//! I2C bus #1.
//!
//! $ cargo run --example linux

extern crate envsense;
extern crate linux_embedded_hal as hal;

use core::fmt::Write;
use envsense::hd44780::Hd44780;
use envsense::i2c::BME280;
use hal::{Delay, I2cdev};
use std::thread;
use std::time::Duration;

fn main() {
    let sensor_bus = I2cdev::new("/dev/i2c-1").unwrap();
    let display_bus = I2cdev::new("/dev/i2c-1").unwrap();

    let mut bme280 = BME280::new_primary(sensor_bus).unwrap();
    let mut lcd = Hd44780::new_default(display_bus, Delay).unwrap();

    loop {
        let measurements = bme280.measure().unwrap();
        lcd.clear().unwrap();
        write!(
            lcd,
            "T={} P={} H={}",
            measurements.temperature as i32,
            measurements.pressure as i32,
            measurements.humidity as i32
        )
        .unwrap();
        thread::sleep(Duration::from_secs(1));
    }
}

use core::fmt::Write;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use envsense::hd44780::Hd44780;
use envsense::Error;

/// Adds up requested delays instead of sleeping.
#[derive(Debug, Default)]
struct TallyDelay {
    total_ms: u32,
}

impl DelayMs<u8> for TallyDelay {
    fn delay_ms(&mut self, ms: u8) {
        self.total_ms += ms as u32;
    }
}

fn send(address: u8, byte: u8, data: bool) -> I2cTransaction {
    let flags = 0x08 | if data { 0x01 } else { 0x00 };
    let high = (byte & 0xF0) | flags;
    let low = (byte << 4) | flags;
    I2cTransaction::write(
        address,
        vec![
            high,
            high,
            high | 0x04,
            high | 0x04,
            high,
            high,
            low,
            low,
            low | 0x04,
            low | 0x04,
            low,
            low,
        ],
    )
}

fn command(byte: u8) -> I2cTransaction {
    send(0x27, byte, false)
}

fn data(byte: u8) -> I2cTransaction {
    send(0x27, byte, true)
}

fn init_transactions() -> Vec<I2cTransaction> {
    [0x33, 0x32, 0x28, 0x0C, 0x06, 0x01]
        .iter()
        .map(|&c| command(c))
        .collect()
}

#[test]
fn init_sequence_and_clear_delay() {
    let i2c = I2cMock::new(&init_transactions());
    let lcd = Hd44780::new_default(i2c, TallyDelay::default()).unwrap();
    let (mut i2c, delay) = lcd.free();
    i2c.done();
    assert_eq!(delay.total_ms, 2);
}

#[test]
fn custom_address() {
    let expectations: Vec<_> = [0x33, 0x32, 0x28, 0x0C, 0x06, 0x01]
        .iter()
        .map(|&c| send(0x3F, c, false))
        .collect();
    let i2c = I2cMock::new(&expectations);
    let lcd = Hd44780::new(i2c, 0x3F, TallyDelay::default()).unwrap();
    lcd.free().0.done();
}

#[test]
fn print_sends_data_bytes() {
    let mut expectations = init_transactions();
    expectations.extend(b"T=25".iter().map(|&b| data(b)));
    let i2c = I2cMock::new(&expectations);

    let mut lcd = Hd44780::new_default(i2c, TallyDelay::default()).unwrap();
    lcd.print("T=25").unwrap();
    lcd.free().0.done();
}

#[test]
fn formatted_write() {
    let mut expectations = init_transactions();
    expectations.extend(b" H=29".iter().map(|&b| data(b)));
    let i2c = I2cMock::new(&expectations);

    let mut lcd = Hd44780::new_default(i2c, TallyDelay::default()).unwrap();
    write!(lcd, " H={}", 29.62 as i32).unwrap();
    lcd.free().0.done();
}

#[test]
fn cursor_shapes_and_positions() {
    let mut expectations = init_transactions();
    expectations.extend(vec![command(0x0F), command(0x0E), command(0xC3), command(0xE7)]);
    let i2c = I2cMock::new(&expectations);

    let mut lcd = Hd44780::new_default(i2c, TallyDelay::default()).unwrap();
    lcd.cursor(true).unwrap();
    lcd.cursor(false).unwrap();
    lcd.set_cursor(3, 1).unwrap();
    lcd.set_cursor(19, 3).unwrap();
    lcd.free().0.done();
}

#[test]
fn set_cursor_rejects_out_of_range() {
    let i2c = I2cMock::new(&init_transactions());
    let mut lcd = Hd44780::new_default(i2c, TallyDelay::default()).unwrap();
    assert!(matches!(lcd.set_cursor(0, 4), Err(Error::InvalidPosition)));
    assert!(matches!(lcd.set_cursor(40, 0), Err(Error::InvalidPosition)));
    lcd.free().0.done();
}

#[test]
fn create_char_uses_low_slot_bits() {
    let pattern = [0x04, 0x0A, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00];
    let mut expectations = init_transactions();
    expectations.push(command(0x48));
    expectations.extend(pattern.iter().map(|&b| data(b)));
    expectations.push(command(0x80));
    let i2c = I2cMock::new(&expectations);

    let mut lcd = Hd44780::new_default(i2c, TallyDelay::default()).unwrap();
    lcd.create_char(9, pattern).unwrap();
    lcd.free().0.done();
}

#[test]
fn clear_waits_for_controller() {
    let mut expectations = init_transactions();
    expectations.push(command(0x01));
    let i2c = I2cMock::new(&expectations);

    let mut lcd = Hd44780::new_default(i2c, TallyDelay::default()).unwrap();
    lcd.clear().unwrap();
    let (mut i2c, delay) = lcd.free();
    i2c.done();
    assert_eq!(delay.total_ms, 4);
}

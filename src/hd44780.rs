//! HD44780 character LCD behind a PCF8574 I²C backpack, driven in 4-bit mode.
//!
//! The backpack maps its eight outputs to the panel as `D7 D6 D5 D4 BL E RW RS`,
//! so every byte travels as two nibbles, each latched by a pulse on `E`.

use core::fmt;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::Write;

use super::Error;

const HD44780_I2C_ADDR_DEFAULT: u8 = 0x27;

const BACKPACK_BACKLIGHT: u8 = 0x08;
const BACKPACK_ENABLE: u8 = 0x04;
const BACKPACK_RS: u8 = 0x01;

const HD44780_CLEAR: u8 = 0x01;
const HD44780_ENTRY_INCREMENT: u8 = 0x06;
const HD44780_DISPLAY_ON: u8 = 0x0C;
const HD44780_CURSOR_UNDERLINE: u8 = 0x0E;
const HD44780_CURSOR_BLOCK: u8 = 0x0F;
const HD44780_FUNCTION_4BIT_2LINE: u8 = 0x28;
const HD44780_SET_CGRAM_ADDR: u8 = 0x40;
const HD44780_SET_DDRAM_ADDR: u8 = 0x80;

const HD44780_LINE_LEN: u8 = 40;
const HD44780_ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

// clear needs 1.52 ms
const HD44780_CLEAR_DELAY_MS: u8 = 2;

/// Builds the twelve backpack writes that clock one byte into the panel.
pub(crate) fn frame(byte: u8, data: bool) -> [u8; 12] {
    let flags = BACKPACK_BACKLIGHT | if data { BACKPACK_RS } else { 0 };
    let high = (byte & 0xF0) | flags;
    let low = ((byte << 4) & 0xF0) | flags;
    [
        high,
        high,
        high | BACKPACK_ENABLE,
        high | BACKPACK_ENABLE,
        high,
        high,
        low,
        low,
        low | BACKPACK_ENABLE,
        low | BACKPACK_ENABLE,
        low,
        low,
    ]
}

/// Representation of an HD44780 panel
#[derive(Debug)]
pub struct Hd44780<I2C, D> {
    /// concrete I²C device implementation
    i2c: I2C,
    /// I²C address of the backpack
    address: u8,
    /// concrete Delay implementation
    delay: D,
}

impl<I2C, D, E> Hd44780<I2C, D>
where
    I2C: Write<Error = E>,
    D: DelayMs<u8>,
{
    /// Create and initialize a panel at the usual backpack address `0x27`
    pub fn new_default(i2c: I2C, delay: D) -> Result<Self, Error<E>> {
        Self::new(i2c, HD44780_I2C_ADDR_DEFAULT, delay)
    }

    /// Create and initialize a panel at a custom backpack address
    pub fn new(i2c: I2C, address: u8, delay: D) -> Result<Self, Error<E>> {
        let mut lcd = Hd44780 {
            i2c,
            address,
            delay,
        };
        lcd.init()?;
        Ok(lcd)
    }

    /// Switches the controller to 4-bit mode, turns the display on and clears it.
    pub fn init(&mut self) -> Result<(), Error<E>> {
        debug!("initializing HD44780 at {:#x}", self.address);
        // 0x33 then 0x32 resynchronizes the nibble phase from any state
        self.command(0x33)?;
        self.command(0x32)?;
        self.command(HD44780_FUNCTION_4BIT_2LINE)?;
        self.command(HD44780_DISPLAY_ON)?;
        self.command(HD44780_ENTRY_INCREMENT)?;
        self.clear()
    }

    pub fn clear(&mut self) -> Result<(), Error<E>> {
        self.command(HD44780_CLEAR)?;
        self.delay.delay_ms(HD44780_CLEAR_DELAY_MS);
        Ok(())
    }

    /// Writes the bytes of `text` at the cursor; the panel's ROM picks the glyphs.
    pub fn print(&mut self, text: &str) -> Result<(), Error<E>> {
        for byte in text.bytes() {
            self.data(byte)?;
        }
        Ok(())
    }

    /// Shows a blinking block cursor (`true`) or an underline cursor (`false`).
    pub fn cursor(&mut self, block: bool) -> Result<(), Error<E>> {
        self.command(if block {
            HD44780_CURSOR_BLOCK
        } else {
            HD44780_CURSOR_UNDERLINE
        })
    }

    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), Error<E>> {
        if col >= HD44780_LINE_LEN {
            return Err(Error::InvalidPosition);
        }
        let offset = *HD44780_ROW_OFFSETS
            .get(row as usize)
            .ok_or(Error::InvalidPosition)?;
        self.command(HD44780_SET_DDRAM_ADDR | (offset + col))
    }

    /// Defines one of the eight custom glyphs; only the low three bits of `slot` count.
    ///
    /// Leaves the address counter at the start of the first line.
    pub fn create_char(&mut self, slot: u8, pattern: [u8; 8]) -> Result<(), Error<E>> {
        self.command(HD44780_SET_CGRAM_ADDR | ((slot & 7) << 3))?;
        for row in pattern.iter() {
            self.data(*row)?;
        }
        self.command(HD44780_SET_DDRAM_ADDR)
    }

    /// Destroys the driver, returning the I²C bus and the delay
    pub fn free(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn command(&mut self, command: u8) -> Result<(), Error<E>> {
        self.send(frame(command, false))
    }

    fn data(&mut self, byte: u8) -> Result<(), Error<E>> {
        self.send(frame(byte, true))
    }

    fn send(&mut self, frame: [u8; 12]) -> Result<(), Error<E>> {
        self.i2c.write(self.address, &frame).map_err(Error::Bus)
    }
}

impl<I2C, D, E> fmt::Write for Hd44780<I2C, D>
where
    I2C: Write<Error = E>,
    D: DelayMs<u8>,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.print(s).map_err(|_| fmt::Error)
    }
}

#[cfg(feature = "ufmt-impl")]
impl<I2C, D, E> ufmt::uWrite for Hd44780<I2C, D>
where
    I2C: Write<Error = E>,
    D: DelayMs<u8>,
{
    type Error = Error<E>;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.print(s)
    }
}

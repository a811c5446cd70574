use envsense::{BME280Common, Error, Interface};

/// Serves register reads from a 256-byte image and logs every write.
struct RegisterFile {
    registers: [u8; 256],
    writes: Vec<(u8, u8)>,
    reads: Vec<(u8, usize)>,
    fail_after: Option<usize>,
}

impl RegisterFile {
    fn new() -> Self {
        RegisterFile {
            registers: [0; 256],
            writes: Vec::new(),
            reads: Vec::new(),
            fail_after: None,
        }
    }

    fn transaction(&mut self) -> Result<(), Error<&'static str>> {
        let count = self.writes.len() + self.reads.len();
        match self.fail_after {
            Some(limit) if count >= limit => Err(Error::Bus("bus fault")),
            _ => Ok(()),
        }
    }
}

impl Interface for RegisterFile {
    type Error = &'static str;

    fn read_registers(&mut self, register: u8, data: &mut [u8]) -> Result<(), Error<Self::Error>> {
        self.transaction()?;
        self.reads.push((register, data.len()));
        let start = register as usize;
        data.copy_from_slice(&self.registers[start..start + data.len()]);
        Ok(())
    }

    fn write_register(&mut self, register: u8, payload: u8) -> Result<(), Error<Self::Error>> {
        self.transaction()?;
        self.writes.push((register, payload));
        self.registers[register as usize] = payload;
        Ok(())
    }
}

#[test]
fn initialization_order() {
    let bme280 = BME280Common::new(RegisterFile::new()).unwrap();
    let bus = bme280.free();
    assert_eq!(bus.writes, vec![(0xF2, 0x01), (0xF4, 0x27), (0xF5, 0xA0)]);
    assert_eq!(bus.reads, vec![(0x88, 24), (0xA1, 1), (0xE1, 7)]);
}

#[test]
fn decodes_coefficients_across_blocks() {
    let mut bus = RegisterFile::new();
    bus.registers[0x88] = 0x70;
    bus.registers[0x89] = 0x6B;
    bus.registers[0xA1] = 75;
    bus.registers[0xE1] = 0x6A;
    bus.registers[0xE2] = 0x01;
    bus.registers[0xE4] = 0xAB;
    bus.registers[0xE5] = 0x5C;
    bus.registers[0xE6] = 0x3F;
    bus.registers[0xE7] = 0xFF;

    let bme280 = BME280Common::new(bus).unwrap();
    let calibration = bme280.calibration();
    assert_eq!(calibration.temperature.dig_t1, 27504);
    assert_eq!(calibration.humidity.dig_h1, 75);
    assert_eq!(calibration.humidity.dig_h2, 362);
    assert_eq!(calibration.humidity.dig_h4, 0xABC);
    assert_eq!(calibration.humidity.dig_h5, 0x3F5);
    assert_eq!(calibration.humidity.dig_h6, -1);
}

#[test]
fn construction_fails_on_bus_fault() {
    let mut bus = RegisterFile::new();
    bus.fail_after = Some(4);
    match BME280Common::new(bus) {
        Err(Error::Bus(message)) => assert_eq!(message, "bus fault"),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn measure_propagates_bus_fault() {
    // initialization takes six transactions, the burst read is the seventh
    let mut bus = RegisterFile::new();
    bus.fail_after = Some(6);
    let mut bme280 = BME280Common::new(bus).unwrap();
    assert_eq!(bme280.measure(), Err(Error::Bus("bus fault")));
}

#[test]
fn measure_reads_data_block() {
    let mut bus = RegisterFile::new();
    // trim values from the Bosch datasheet worked example
    bus.registers[0x88..0xA0].copy_from_slice(&[
        0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B,
        0x8C, 0x00, 0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17,
    ]);
    bus.registers[0xF7..0xFF].copy_from_slice(&[0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x65, 0x90]);

    let mut bme280 = BME280Common::new(bus).unwrap();
    let measurements = bme280.measure().unwrap();
    assert!((measurements.temperature - 25.08247793081682).abs() < 1e-3);
    assert!((measurements.pressure - 1006.5326677582515).abs() < 1e-3);
    // all humidity trim values are zero
    assert_eq!(measurements.humidity, 0.0);
    assert_eq!(bme280.free().reads.last(), Some(&(0xF7, 8)));
}

#[test]
fn set_power_is_read_modify_write() {
    let mut bme280 = BME280Common::new(RegisterFile::new()).unwrap();
    bme280.set_power(false).unwrap();
    let bus = bme280.free();
    assert_eq!(bus.registers[0xF4], 0x24);
    assert_eq!(bus.reads.last(), Some(&(0xF4, 1)));
    assert_eq!(bus.writes.last(), Some(&(0xF4, 0x24)));
}

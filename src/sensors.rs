//! Sensor drivers over `embedded-hal` I2C, SPI and GPIO.
//!
//! Each driver only moves bytes: it issues the device command, reads the raw sample, and
//! hands it to [`sensor_codec`](crate::sensor_codec). Bus failures are logged and reported as
//! [`Error::HardwareUnavailable`] so a caller can show a status and carry on.

use embedded_hal::digital::{Error as _, InputPin, OutputPin};
use embedded_hal::i2c::{Error as _, I2c};
use embedded_hal::spi::{Error as _, SpiDevice};

use crate::sensor_codec::bmp280::{
    self, Bmp280Calibration, CALIBRATION_LEN, CALIBRATION_REGISTER, CompensatedTemperature,
};
use crate::busy_wait::BusyWaitScheduler;
use crate::clock::{HighResolutionClock, Tick};
use crate::sensor_codec::dht22::{self, DhtReading};
use crate::sensor_codec::{
    ADC_SAMPLE_LEN, AdcResolution, HUMIDITY_SAMPLE_LEN, PhysicalReading, Unit,
};
use crate::{Error, Result, debug, warn};

fn i2c_unavailable<E: embedded_hal::i2c::Error>(err: &E) -> Error {
    warn!("i2c transfer failed: {:?}", err.kind());
    Error::HardwareUnavailable
}

fn spi_unavailable<E: embedded_hal::spi::Error>(err: &E) -> Error {
    warn!("spi transfer failed: {:?}", err.kind());
    Error::HardwareUnavailable
}

// ============================================================================
// HumiditySensor - HTU21D / Si7021
// ============================================================================

/// Default I2C address of HTU21D / Si7021 sensors.
pub const HUMIDITY_SENSOR_ADDRESS: u8 = 0x40;

const MEASURE_HUMIDITY_HOLD: u8 = 0xE5;
const MEASURE_TEMPERATURE_HOLD: u8 = 0xE3;

/// An HTU21D / Si7021 style humidity and temperature sensor.
///
/// Uses hold-master measurements: the sensor stretches the clock until the conversion is
/// done, so each read is a single write-read transaction.
pub struct HumiditySensor<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> HumiditySensor<I2C> {
    /// Create a driver at [`HUMIDITY_SENSOR_ADDRESS`].
    #[must_use]
    pub const fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, HUMIDITY_SENSOR_ADDRESS)
    }

    /// Create a driver at a custom address.
    #[must_use]
    pub const fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Measure relative humidity.
    ///
    /// # Errors
    ///
    /// [`Error::HardwareUnavailable`] if the bus transfer fails.
    pub fn read_humidity(&mut self) -> Result<PhysicalReading> {
        let raw = self.measure(MEASURE_HUMIDITY_HOLD)?;
        PhysicalReading::humidity(&raw)
    }

    /// Measure temperature.
    ///
    /// # Errors
    ///
    /// [`Error::HardwareUnavailable`] if the bus transfer fails.
    pub fn read_temperature(&mut self) -> Result<PhysicalReading> {
        let raw = self.measure(MEASURE_TEMPERATURE_HOLD)?;
        PhysicalReading::temperature(&raw)
    }

    /// Give back the bus.
    pub fn free(self) -> I2C {
        self.i2c
    }

    fn measure(&mut self, command: u8) -> Result<[u8; HUMIDITY_SAMPLE_LEN]> {
        let mut raw = [0u8; HUMIDITY_SAMPLE_LEN];
        self.i2c
            .write_read(self.address, &[command], &mut raw)
            .map_err(|err| i2c_unavailable(&err))?;
        // The two low bits of the LSB are status, not data.
        let [msb, lsb] = raw;
        Ok([msb, lsb & 0xFC])
    }
}

// ============================================================================
// Bmp280 - temperature / pressure
// ============================================================================

/// Default I2C address of BMP280 breakouts with SDO pulled high.
pub const BMP280_ADDRESS: u8 = 0x77;

const BMP280_CHIP_ID_REGISTER: u8 = 0xD0;
const BMP280_CHIP_ID: u8 = 0x58;
const BMP280_CONTROL_REGISTER: u8 = 0xF4;
// osrs_t x1, osrs_p x16, normal mode.
const BMP280_CONTROL_NORMAL: u8 = 0x3F;

/// A Bosch BMP280 temperature and pressure sensor.
///
/// [`init`](Self::init) checks the chip id, reads the calibration table and starts
/// continuous measurement; reads before a successful `init` report
/// [`Error::HardwareUnavailable`].
pub struct Bmp280<I2C> {
    i2c: I2C,
    address: u8,
    calibration: Option<Bmp280Calibration>,
}

impl<I2C: I2c> Bmp280<I2C> {
    /// Create a driver at [`BMP280_ADDRESS`].
    #[must_use]
    pub const fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, BMP280_ADDRESS)
    }

    /// Create a driver at a custom address.
    #[must_use]
    pub const fn with_address(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            calibration: None,
        }
    }

    /// Verify the chip id, load calibration and enable measurement.
    ///
    /// # Errors
    ///
    /// [`Error::HardwareUnavailable`] if the bus fails or the chip id does not match.
    pub fn init(&mut self) -> Result<Bmp280Calibration> {
        let mut chip_id = [0u8; 1];
        self.read_registers(BMP280_CHIP_ID_REGISTER, &mut chip_id)?;
        let [id] = chip_id;
        if id != BMP280_CHIP_ID {
            warn!("bmp280 chip id mismatch: {}", id);
            return Err(Error::HardwareUnavailable);
        }

        let mut table = [0u8; CALIBRATION_LEN];
        self.read_registers(CALIBRATION_REGISTER, &mut table)?;
        let calibration = Bmp280Calibration::from_le_bytes(&table)?;

        self.i2c
            .write(self.address, &[BMP280_CONTROL_REGISTER, BMP280_CONTROL_NORMAL])
            .map_err(|err| i2c_unavailable(&err))?;
        debug!("bmp280 initialized at address {}", self.address);
        self.calibration = Some(calibration);
        Ok(calibration)
    }

    /// Read and compensate the temperature.
    ///
    /// # Errors
    ///
    /// [`Error::HardwareUnavailable`] if not initialized or the bus fails.
    pub fn read_temperature(&mut self) -> Result<PhysicalReading> {
        let temperature = self.compensated_temperature()?;
        Ok(PhysicalReading {
            value: temperature.celsius,
            unit: Unit::Celsius,
        })
    }

    /// Read and compensate the pressure. Reads the temperature first for `t_fine`.
    ///
    /// # Errors
    ///
    /// [`Error::HardwareUnavailable`] if not initialized or the bus fails.
    pub fn read_pressure(&mut self) -> Result<PhysicalReading> {
        let calibration = self.calibration.ok_or(Error::HardwareUnavailable)?;
        let temperature = self.compensated_temperature()?;
        let mut raw = [0u8; 3];
        self.read_registers(bmp280::PRESSURE_REGISTER, &mut raw)?;
        let adc_p = bmp280::raw_20bit(&raw)?;
        Ok(PhysicalReading::pascals(
            calibration.compensate_pressure(adc_p, temperature.t_fine),
        ))
    }

    /// Read the pressure and convert it to altitude against `sea_level_hpa`
    /// (see [`bmp280::altitude_meters`]).
    ///
    /// # Errors
    ///
    /// [`Error::HardwareUnavailable`] if not initialized or the bus fails.
    pub fn read_altitude(&mut self, sea_level_hpa: f32) -> Result<PhysicalReading> {
        let pressure = self.read_pressure()?;
        Ok(PhysicalReading::meters(bmp280::altitude_meters(
            pressure.value,
            sea_level_hpa,
        )))
    }

    /// Give back the bus.
    pub fn free(self) -> I2C {
        self.i2c
    }

    fn compensated_temperature(&mut self) -> Result<CompensatedTemperature> {
        let calibration = self.calibration.ok_or(Error::HardwareUnavailable)?;
        let mut raw = [0u8; 3];
        self.read_registers(bmp280::TEMPERATURE_REGISTER, &mut raw)?;
        Ok(calibration.compensate_temperature(bmp280::raw_20bit(&raw)?))
    }

    fn read_registers(&mut self, register: u8, buffer: &mut [u8]) -> Result<()> {
        self.i2c
            .write_read(self.address, &[register], buffer)
            .map_err(|err| i2c_unavailable(&err))
    }
}

// ============================================================================
// SpiAdc - MCP3008 / MCP3208
// ============================================================================

/// Single-ended inputs on MCP3008 / MCP3208 parts.
pub const ADC_CHANNELS: u8 = 8;

/// An MCP3008 (10-bit) or MCP3208 (12-bit) SPI ADC.
///
/// The part is chosen by the [`AdcResolution`] given at construction.
pub struct SpiAdc<SPI> {
    spi: SPI,
    resolution: AdcResolution,
    reference_volts: f32,
}

impl<SPI: SpiDevice> SpiAdc<SPI> {
    /// Create a driver for an ADC of `resolution` with reference voltage `reference_volts`.
    #[must_use]
    pub const fn new(spi: SPI, resolution: AdcResolution, reference_volts: f32) -> Self {
        Self {
            spi,
            resolution,
            reference_volts,
        }
    }

    /// The configured conversion width.
    #[must_use]
    pub const fn resolution(&self) -> AdcResolution {
        self.resolution
    }

    /// Convert `channel` and return the raw count.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if `channel` is not below [`ADC_CHANNELS`];
    /// [`Error::HardwareUnavailable`] if the SPI transfer fails.
    pub fn read_raw(&mut self, channel: u8) -> Result<u16> {
        if channel >= ADC_CHANNELS {
            return Err(Error::InvalidInput {
                expected: usize::from(ADC_CHANNELS),
                actual: usize::from(channel),
            });
        }
        let command = command_bytes(self.resolution, channel);
        let mut reply = [0u8; ADC_SAMPLE_LEN];
        self.spi
            .transfer(&mut reply, &command)
            .map_err(|err| spi_unavailable(&err))?;
        self.resolution.decode(&reply)
    }

    /// Convert `channel` and scale it to volts.
    ///
    /// # Errors
    ///
    /// As [`read_raw`](Self::read_raw).
    pub fn read_volts(&mut self, channel: u8) -> Result<PhysicalReading> {
        let count = self.read_raw(channel)?;
        Ok(PhysicalReading::volts(
            self.resolution.to_volts(count, self.reference_volts),
        ))
    }

    /// Give back the SPI device.
    pub fn free(self) -> SPI {
        self.spi
    }
}

/// Start bit, single-ended mode and channel select, aligned so the result lands in the low
/// bits of the second and third reply bytes.
const fn command_bytes(resolution: AdcResolution, channel: u8) -> [u8; ADC_SAMPLE_LEN] {
    match resolution {
        AdcResolution::Bits10 => [0x01, 0x80 | (channel << 4), 0x00],
        AdcResolution::Bits12 => [0x06 | (channel >> 2), (channel & 0x03) << 6, 0x00],
    }
}

// ============================================================================
// Dht22 - single-wire humidity / temperature
// ============================================================================

const DHT22_RESPONSE_TIMEOUT_US: u64 = 1_000;
const DHT22_DATA_TIMEOUT_US: u64 = 10_000;

/// A DHT22 (AM2302) read by polling its data line.
///
/// The sensor's single data line is wired to two pins: `output` drives a transistor that
/// pulls the line low (so a high output means a low line), and `input` samples the line.
/// A read busy-waits the start pulse, then spins on `input` timestamping falling edges, so it
/// holds the core for about 23 ms. Run it where that is acceptable.
pub struct Dht22<O, I, C> {
    output: O,
    input: I,
    scheduler: BusyWaitScheduler<C>,
}

impl<O, I, C> Dht22<O, I, C>
where
    O: OutputPin,
    I: InputPin,
    C: HighResolutionClock,
{
    /// Create a driver. Neither pin is touched until the first [`read`](Self::read).
    #[must_use]
    pub const fn new(output: O, input: I, clock: C) -> Self {
        Self {
            output,
            input,
            scheduler: BusyWaitScheduler::new(clock),
        }
    }

    /// Wake the sensor and decode one frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the start pulse overran or the sensor stopped answering.
    /// - [`Error::InvalidInput`] on a checksum mismatch.
    /// - [`Error::WriteFailure`] / [`Error::HardwareUnavailable`] if a pin fails.
    ///
    /// Every error is transient; the sensor can be read again after its 2 s settle time.
    pub fn read(&mut self) -> Result<DhtReading> {
        self.scheduler
            .start_pulse(&mut self.output, dht22::START_PULSE, dht22::START_PULSE_TOLERANCE)?;
        let edges = self.capture_edges()?;
        let bits = dht22::classify_bits(&edges, self.scheduler.clock().frequency())?;
        DhtReading::from_bits(bits).inspect_err(|_| warn!("dht22 checksum mismatch"))
    }

    /// Give back both pins and the clock.
    pub fn free(self) -> (O, I, C) {
        (self.output, self.input, self.scheduler.free())
    }

    fn capture_edges(&mut self) -> Result<[Tick; dht22::EDGE_COUNT]> {
        let clock = self.scheduler.clock();

        // The sensor pulls the line low, then releases it high before the first bit.
        let deadline = clock
            .now()
            .saturating_add(clock.ticks_for_micros(DHT22_RESPONSE_TIMEOUT_US));
        wait_for_level(&mut self.input, clock, false, deadline)?;
        wait_for_level(&mut self.input, clock, true, deadline)?;

        let deadline = clock
            .now()
            .saturating_add(clock.ticks_for_micros(DHT22_DATA_TIMEOUT_US));
        let mut edges = [Tick(0); dht22::EDGE_COUNT];
        for edge in &mut edges {
            wait_for_level(&mut self.input, clock, true, deadline)?;
            *edge = wait_for_level(&mut self.input, clock, false, deadline)?;
        }
        Ok(edges)
    }
}

/// Spin until `input` reads `high`; returns the clock reading taken just before it did.
fn wait_for_level<I: InputPin, C: HighResolutionClock>(
    input: &mut I,
    clock: &C,
    high: bool,
    deadline: Tick,
) -> Result<Tick> {
    loop {
        let now = clock.now();
        let level = input.is_high().map_err(|err| {
            warn!("dht22 input read failed: {:?}", err.kind());
            Error::HardwareUnavailable
        })?;
        if level == high {
            return Ok(now);
        }
        if now > deadline {
            warn!("dht22 timed out waiting for high={}", high);
            return Err(Error::Timeout);
        }
        core::hint::spin_loop();
    }
}

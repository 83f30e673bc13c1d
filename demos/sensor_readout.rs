//! Reads a simulated bench of sensors and shows the humidity on an APA102 bar.
//!
//! The I2C bus answers like an HTU21D at 0x40 and a BMP280 at 0x77; the SPI ADC is an
//! MCP3008 sweeping its input. Run with `RUST_LOG=debug cargo run --bin demo_sensor_readout`
//! to also see bus-level logging.
#![cfg(feature = "host")]

use std::convert::Infallible;
use std::thread;

use embedded_hal::i2c::{self, I2c};
use embedded_hal::spi::{self, SpiBus, SpiDevice};
use log::{info, warn};
use pulse_kit::Result;
use pulse_kit::led_strip::{Apa102Strip, Frame1d, Pixel, PixelBrightness, colors};
use pulse_kit::sensor_codec::{AdcResolution, PhysicalReading, bmp280, pixel_frame_len};
use pulse_kit::sensors::{BMP280_ADDRESS, Bmp280, HUMIDITY_SENSOR_ADDRESS, HumiditySensor, SpiAdc};

const BAR_LEN: usize = 10;
const SAMPLES: u16 = 5;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = inner_main() {
        panic!("{err}");
    }
}

fn inner_main() -> Result<()> {
    let mut humidity = HumiditySensor::new(Bench::default());
    let mut barometer = Bmp280::new(Bench::default());
    let mut adc = SpiAdc::new(SweepAdc::default(), AdcResolution::Bits10, 3.3);
    let mut bar = Apa102Strip::<_, { pixel_frame_len(BAR_LEN) }>::with_brightness(
        PrintBus,
        PixelBrightness::Global(8),
    );

    let calibration = barometer.init()?;
    info!("BMP280 calibration {:?}", calibration);

    for sample in 0..SAMPLES {
        let rh = humidity.read_humidity()?;
        let temperature = humidity.read_temperature()?;
        show(sample, "humidity", &rh);
        show(sample, "temperature", &temperature);

        // A missing barometer is reported, not fatal.
        match barometer.read_pressure() {
            Ok(pressure) => {
                show(sample, "pressure", &pressure);
                let altitude =
                    bmp280::altitude_meters(pressure.value, bmp280::STANDARD_SEA_LEVEL_HPA);
                show(sample, "altitude", &PhysicalReading::meters(altitude));
            }
            Err(err) => warn!("[{}] pressure unavailable: {}", sample, err),
        }

        let volts = adc.read_volts(0)?;
        show(sample, "adc ch0", &volts);

        bar.write_frame(&humidity_bar(rh.value))?;
        thread::sleep(core::time::Duration::from_millis(200));
    }
    Ok(())
}

fn show(sample: u16, label: &str, reading: &PhysicalReading) {
    info!("[{}] {}: {:.2} {:?}", sample, label, reading.value, reading.unit);
}

/// Light one LED per 10 %RH.
fn humidity_bar(percent: f32) -> Frame1d<BAR_LEN> {
    let mut frame = Frame1d::new();
    let lit = (percent / 10.0).clamp(0.0, BAR_LEN as f32) as usize;
    for (index, pixel) in frame.iter_mut().enumerate() {
        *pixel = if index < lit { colors::AQUA } else { Pixel::default() };
    }
    frame
}

// ============================================================================
// Simulated hardware
// ============================================================================

/// I2C bench with an HTU21D and a BMP280 (datasheet calibration) attached.
#[derive(Default)]
struct Bench {
    register: u8,
    humidity_word: u16,
}

impl Bench {
    fn reply(&mut self, address: u8, buffer: &mut [u8]) -> core::result::Result<(), i2c::ErrorKind> {
        let source: Vec<u8> = match (address, self.register) {
            (HUMIDITY_SENSOR_ADDRESS, 0xE5) => {
                // Drifts upward each read; low bits carry status.
                self.humidity_word = self.humidity_word.wrapping_add(0x0800).max(0x6000);
                let [msb, lsb] = self.humidity_word.to_be_bytes();
                vec![msb, lsb | 0x02]
            }
            (HUMIDITY_SENSOR_ADDRESS, 0xE3) => vec![0x66, 0x4C],
            (BMP280_ADDRESS, 0xD0) => vec![0x58],
            (BMP280_ADDRESS, 0x88) => vec![
                0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27,
                0x0B, 0x8C, 0x00, 0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17,
            ],
            (BMP280_ADDRESS, 0xFA) => vec![0x7E, 0xED, 0x00],
            (BMP280_ADDRESS, 0xF7) => vec![0x65, 0x5A, 0xC0],
            _ => return Err(i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)),
        };
        let len = buffer.len().min(source.len());
        buffer[..len].copy_from_slice(&source[..len]);
        Ok(())
    }
}

impl i2c::ErrorType for Bench {
    type Error = i2c::ErrorKind;
}

impl I2c for Bench {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> core::result::Result<(), Self::Error> {
        for operation in operations {
            match operation {
                i2c::Operation::Write(bytes) => {
                    if let Some(&register) = bytes.first() {
                        self.register = register;
                    }
                }
                i2c::Operation::Read(buffer) => self.reply(address, buffer)?,
            }
        }
        Ok(())
    }
}

/// MCP3008 whose input ramps by 100 counts per conversion.
#[derive(Default)]
struct SweepAdc {
    count: u16,
}

impl spi::ErrorType for SweepAdc {
    type Error = Infallible;
}

impl SpiDevice for SweepAdc {
    fn transaction(
        &mut self,
        operations: &mut [spi::Operation<'_, u8>],
    ) -> core::result::Result<(), Self::Error> {
        for operation in operations {
            if let spi::Operation::Transfer(read, _) = operation {
                self.count = (self.count + 100) % 1_024;
                let [high, low] = self.count.to_be_bytes();
                read.copy_from_slice(&[0, high, low]);
            }
        }
        Ok(())
    }
}

/// SPI bus that prints each LED frame.
struct PrintBus;

impl spi::ErrorType for PrintBus {
    type Error = Infallible;
}

impl SpiBus for PrintBus {
    fn read(&mut self, words: &mut [u8]) -> core::result::Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> core::result::Result<(), Self::Error> {
        info!("apa102 frame {:02X?}", words);
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> core::result::Result<(), Self::Error> {
        read.fill(0);
        self.write(write)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> core::result::Result<(), Self::Error> {
        info!("apa102 frame {:02X?}", words);
        Ok(())
    }

    fn flush(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }
}

//! Pure conversions between raw sensor bus bytes and physical units.
//!
//! Every function here is stateless and reentrant: call it from whichever timer callback
//! read the bytes. Inputs are fixed-size; a buffer of any other length is
//! [`Error::InvalidInput`].
//!
//! - I2C humidity/temperature words (HTU21D / Si7021 family): [`decode_humidity`],
//!   [`decode_temperature_celsius`].
//! - SPI ADC words (MCP3008 / MCP3208 family): [`decode_adc_10bit`], [`decode_adc_12bit`],
//!   or [`AdcResolution`] when the width is configuration.
//! - APA102 LED frames: [`apa102`].
//! - BMP280 calibration, compensation and altitude: [`bmp280`].
//! - DHT22 single-wire edge timing and frames: [`dht22`].

use crate::{Error, Result};

// ============================================================================
// Submodules
// ============================================================================

pub mod apa102;
pub mod bmp280;
pub mod dht22;

pub use apa102::{
    Pixel, PixelBrightness, encode_pixel_frame, encode_pixel_frame_with, encode_pixels,
    pixel_frame_len,
};

/// Bytes in one I2C humidity or temperature sample.
pub const HUMIDITY_SAMPLE_LEN: usize = 2;

/// Bytes in one SPI ADC sample.
pub const ADC_SAMPLE_LEN: usize = 3;

// ============================================================================
// PhysicalReading
// ============================================================================

/// Unit of a [`PhysicalReading`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Unit {
    /// Degrees Celsius.
    Celsius,
    /// Relative humidity, percent.
    RelativeHumidityPercent,
    /// Volts.
    Volt,
    /// Raw ADC counts.
    AdcCount,
    /// Pascals.
    Pascal,
    /// Meters above sea level.
    Meter,
}

/// A converted sensor value, ready to display or publish.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalReading {
    /// The value in `unit`.
    pub value: f32,
    /// What `value` measures.
    pub unit: Unit,
}

impl PhysicalReading {
    /// Relative humidity from a 2-byte I2C sample.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] unless `raw` is exactly two bytes.
    pub fn humidity(raw: &[u8]) -> Result<Self> {
        Ok(Self {
            value: decode_humidity(raw)?,
            unit: Unit::RelativeHumidityPercent,
        })
    }

    /// Temperature from a 2-byte I2C sample.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] unless `raw` is exactly two bytes.
    pub fn temperature(raw: &[u8]) -> Result<Self> {
        Ok(Self {
            value: decode_temperature_celsius(raw)?,
            unit: Unit::Celsius,
        })
    }

    /// Raw ADC counts.
    #[must_use]
    pub fn adc_count(count: u16) -> Self {
        Self {
            value: f32::from(count),
            unit: Unit::AdcCount,
        }
    }

    /// A voltage.
    #[must_use]
    pub const fn volts(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Volt,
        }
    }

    /// A pressure.
    #[must_use]
    pub const fn pascals(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Pascal,
        }
    }

    /// An altitude.
    #[must_use]
    pub const fn meters(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Meter,
        }
    }
}

// ============================================================================
// I2C humidity / temperature
// ============================================================================

/// Relative humidity (%RH) from a big-endian 16-bit sample: `-6 + 125 * word / 65536`.
///
/// Not clamped: out-of-spec sensor words give values outside 0..=100, as the sensor does.
///
/// ```rust
/// use pulse_kit::sensor_codec::decode_humidity;
///
/// assert_eq!(decode_humidity(&[0x00, 0x00]), Ok(-6.0));
/// ```
///
/// # Errors
///
/// [`Error::InvalidInput`] unless `raw` is exactly two bytes.
pub fn decode_humidity(raw: &[u8]) -> Result<f32> {
    Ok(-6.0 + 125.0 * word_ratio(raw)?)
}

/// Temperature (°C) from a big-endian 16-bit sample: `-46.85 + 175.72 * word / 65536`.
///
/// # Errors
///
/// [`Error::InvalidInput`] unless `raw` is exactly two bytes.
pub fn decode_temperature_celsius(raw: &[u8]) -> Result<f32> {
    Ok(-46.85 + 175.72 * word_ratio(raw)?)
}

fn word_ratio(raw: &[u8]) -> Result<f32> {
    let word = u16::from_be_bytes(fixed::<HUMIDITY_SAMPLE_LEN>(raw)?);
    Ok(f32::from(word) / 65536.0)
}

// ============================================================================
// SPI ADC
// ============================================================================

/// 12-bit conversion result from a 3-byte SPI reply: `((raw[1] & 0x0F) << 8) | raw[2]`.
///
/// # Errors
///
/// [`Error::InvalidInput`] unless `raw` is exactly three bytes.
pub fn decode_adc_12bit(raw: &[u8]) -> Result<u16> {
    let [_, high, low] = fixed::<ADC_SAMPLE_LEN>(raw)?;
    Ok((u16::from(high & 0x0F) << 8) | u16::from(low))
}

/// 10-bit conversion result from a 3-byte SPI reply: `((raw[1] & 0x03) << 8) | raw[2]`.
///
/// # Errors
///
/// [`Error::InvalidInput`] unless `raw` is exactly three bytes.
pub fn decode_adc_10bit(raw: &[u8]) -> Result<u16> {
    let [_, high, low] = fixed::<ADC_SAMPLE_LEN>(raw)?;
    Ok((u16::from(high & 0x03) << 8) | u16::from(low))
}

/// Conversion width of the attached ADC.
///
/// Chosen once when the device is wired up; the width is never detected at runtime.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcResolution {
    /// 10-bit parts such as the MCP3008.
    Bits10,
    /// 12-bit parts such as the MCP3208.
    Bits12,
}

impl AdcResolution {
    /// Decode a 3-byte SPI reply at this width.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] unless `raw` is exactly three bytes.
    pub fn decode(self, raw: &[u8]) -> Result<u16> {
        match self {
            Self::Bits10 => decode_adc_10bit(raw),
            Self::Bits12 => decode_adc_12bit(raw),
        }
    }

    /// Largest count this width produces.
    #[must_use]
    pub const fn max_count(self) -> u16 {
        match self {
            Self::Bits10 => 0x03FF,
            Self::Bits12 => 0x0FFF,
        }
    }

    /// Input voltage for `count` against `reference_volts`: `count * vref / 2^bits`.
    #[must_use]
    pub fn to_volts(self, count: u16, reference_volts: f32) -> f32 {
        let steps = f32::from(self.max_count()) + 1.0;
        f32::from(count.min(self.max_count())) * reference_volts / steps
    }
}

pub(crate) fn fixed<const N: usize>(raw: &[u8]) -> Result<[u8; N]> {
    <[u8; N]>::try_from(raw).map_err(|_| Error::InvalidInput {
        expected: N,
        actual: raw.len(),
    })
}

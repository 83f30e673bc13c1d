//! BMP280 calibration parsing and temperature/pressure compensation.
//!
//! The BMP280 reports uncompensated 20-bit readings; turning them into °C and Pa needs the
//! factory trimming table stored at registers `0x88..=0x9F`. Formulas follow the Bosch
//! datasheet (double-precision temperature, 64-bit integer pressure); altitude uses the
//! international barometric formula.

use crate::Result;
use crate::sensor_codec::fixed;

/// Register address of the first calibration word (`dig_T1`).
pub const CALIBRATION_REGISTER: u8 = 0x88;

/// Bytes in the calibration table.
pub const CALIBRATION_LEN: usize = 24;

/// Register address of the pressure MSB; pressure then temperature follow in 6 bytes.
pub const PRESSURE_REGISTER: u8 = 0xF7;

/// Register address of the temperature MSB.
pub const TEMPERATURE_REGISTER: u8 = 0xFA;

/// ISA standard sea-level pressure, hPa.
pub const STANDARD_SEA_LEVEL_HPA: f32 = 1_013.25;

/// Factory trimming parameters read from a BMP280.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs, reason = "field names match the datasheet")]
pub struct Bmp280Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
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

/// Compensated temperature, plus the fine value pressure compensation needs.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompensatedTemperature {
    /// Degrees Celsius.
    pub celsius: f32,
    /// `t_fine`, carried into [`Bmp280Calibration::compensate_pressure`].
    pub t_fine: i32,
}

impl Bmp280Calibration {
    /// Parse the 24-byte little-endian table read from [`CALIBRATION_REGISTER`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`](crate::Error::InvalidInput) unless `raw` is exactly
    /// [`CALIBRATION_LEN`] bytes.
    pub fn from_le_bytes(raw: &[u8]) -> Result<Self> {
        let bytes = fixed::<CALIBRATION_LEN>(raw)?;
        let mut words = [[0u8; 2]; CALIBRATION_LEN / 2];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(2)) {
            word.copy_from_slice(chunk);
        }
        let [t1, t2, t3, p1, p2, p3, p4, p5, p6, p7, p8, p9] = words;
        Ok(Self {
            dig_t1: u16::from_le_bytes(t1),
            dig_t2: i16::from_le_bytes(t2),
            dig_t3: i16::from_le_bytes(t3),
            dig_p1: u16::from_le_bytes(p1),
            dig_p2: i16::from_le_bytes(p2),
            dig_p3: i16::from_le_bytes(p3),
            dig_p4: i16::from_le_bytes(p4),
            dig_p5: i16::from_le_bytes(p5),
            dig_p6: i16::from_le_bytes(p6),
            dig_p7: i16::from_le_bytes(p7),
            dig_p8: i16::from_le_bytes(p8),
            dig_p9: i16::from_le_bytes(p9),
        })
    }

    /// Temperature from an uncompensated 20-bit reading.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, reason = "t_fine fits in i32 for any 20-bit reading")]
    pub fn compensate_temperature(&self, adc_t: i32) -> CompensatedTemperature {
        let adc = f64::from(adc_t);
        let t1 = f64::from(self.dig_t1);
        let var1 = (adc / 16_384.0 - t1 / 1_024.0) * f64::from(self.dig_t2);
        let delta = adc / 131_072.0 - t1 / 8_192.0;
        let var2 = delta * delta * f64::from(self.dig_t3);
        let fine = var1 + var2;
        CompensatedTemperature {
            celsius: (fine / 5_120.0) as f32,
            t_fine: fine as i32,
        }
    }

    /// Pressure in pascals from an uncompensated 20-bit reading and the `t_fine` of a
    /// temperature read just before it.
    ///
    /// Returns 0 when the calibration makes the divisor zero. Intermediate values wrap on
    /// overflow, so a corrupted table gives a meaningless pressure but never panics.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "pressure * 256 fits well inside f32 range")]
    pub fn compensate_pressure(&self, adc_p: i32, t_fine: i32) -> f32 {
        let mut var1 = i64::from(t_fine).wrapping_sub(128_000);
        let mut var2 = var1.wrapping_mul(var1).wrapping_mul(i64::from(self.dig_p6));
        var2 = var2.wrapping_add(var1.wrapping_mul(i64::from(self.dig_p5)).wrapping_shl(17));
        var2 = var2.wrapping_add(i64::from(self.dig_p4).wrapping_shl(35));
        var1 = (var1.wrapping_mul(var1).wrapping_mul(i64::from(self.dig_p3)) >> 8)
            .wrapping_add(var1.wrapping_mul(i64::from(self.dig_p2)).wrapping_shl(12));
        var1 = (1_i64 << 47).wrapping_add(var1).wrapping_mul(i64::from(self.dig_p1)) >> 33;
        if var1 == 0 {
            return 0.0;
        }

        let mut pressure = 1_048_576_i64.wrapping_sub(i64::from(adc_p));
        pressure = pressure
            .wrapping_shl(31)
            .wrapping_sub(var2)
            .wrapping_mul(3_125)
            .wrapping_div(var1);
        var1 = i64::from(self.dig_p9)
            .wrapping_mul(pressure >> 13)
            .wrapping_mul(pressure >> 13)
            >> 25;
        var2 = i64::from(self.dig_p8).wrapping_mul(pressure) >> 19;
        pressure = (pressure.wrapping_add(var1).wrapping_add(var2) >> 8)
            .wrapping_add(i64::from(self.dig_p7).wrapping_shl(4));

        pressure as f32 / 256.0
    }
}

/// Barometric altitude in meters: `44330 * (1 - (hPa / sea_level_hpa)^0.1903)`.
///
/// `pascals` is a compensated pressure; `sea_level_hpa` is the local pressure reduced to
/// sea level, or [`STANDARD_SEA_LEVEL_HPA`] when unknown.
///
/// ```rust
/// use pulse_kit::sensor_codec::bmp280::{STANDARD_SEA_LEVEL_HPA, altitude_meters};
///
/// assert!(altitude_meters(101_325.0, STANDARD_SEA_LEVEL_HPA).abs() < 0.01);
/// ```
#[must_use]
pub fn altitude_meters(pascals: f32, sea_level_hpa: f32) -> f32 {
    let hpa = pascals / 100.0;
    44_330.0 * (1.0 - libm::powf(hpa / sea_level_hpa, 0.1903))
}

/// Assemble an uncompensated 20-bit reading from its MSB, LSB and XLSB (bits 7:4) registers.
///
/// # Errors
///
/// [`Error::InvalidInput`](crate::Error::InvalidInput) unless `raw` is exactly three bytes.
pub fn raw_20bit(raw: &[u8]) -> Result<i32> {
    let [msb, lsb, xlsb] = fixed::<3>(raw)?;
    Ok((i32::from(msb) << 12) | (i32::from(lsb) << 4) | (i32::from(xlsb) >> 4))
}

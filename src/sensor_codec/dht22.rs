//! DHT22 (AM2302) single-wire frames.
//!
//! After a start pulse the sensor answers with 40 bits, each a ~50 µs low followed by a high
//! whose length encodes the bit: ~26 µs for a 0, ~70 µs for a 1. Timing the gap between
//! consecutive falling edges (76 µs vs 120 µs) is enough to tell them apart, so a reader only
//! needs the 41 falling-edge timestamps: one reference edge that opens the first bit, then
//! one per bit.
//!
//! The frame is humidity (16 bits, tenths of %RH), temperature (16 bits, tenths of °C with
//! the top bit as sign) and a checksum byte, most significant bit first.

use embassy_time::Duration;

use crate::clock::Tick;
use crate::sensor_codec::{PhysicalReading, Unit, fixed};
use crate::{Error, Result};

/// Data bits in one frame.
pub const DATA_BITS: usize = 40;

/// Falling edges a reader captures: the reference edge plus one per bit.
pub const EDGE_COUNT: usize = DATA_BITS + 1;

/// Bytes in one frame: four data bytes and the checksum.
pub const FRAME_LEN: usize = 5;

/// Falling-edge gaps longer than this are 1 bits.
pub const ONE_THRESHOLD_US: u64 = 110;

/// How long the host holds the data line low to wake the sensor.
pub const START_PULSE: Duration = Duration::from_millis(18);

/// How late the end of the start pulse may be before the sensor stops answering reliably.
pub const START_PULSE_TOLERANCE: Duration = Duration::from_millis(10);

/// Ticks in [`ONE_THRESHOLD_US`] at `frequency`, rounded down.
#[must_use]
pub fn one_threshold_ticks(frequency: u64) -> u64 {
    let ticks = u128::from(ONE_THRESHOLD_US)
        .saturating_mul(u128::from(frequency))
        .checked_div(1_000_000)
        .unwrap_or(0);
    u64::try_from(ticks).unwrap_or(u64::MAX)
}

/// Turn [`EDGE_COUNT`] falling-edge timestamps into the 40-bit frame, first bit in bit 39.
///
/// A gap strictly longer than [`ONE_THRESHOLD_US`] is a 1.
///
/// # Errors
///
/// [`Error::InvalidInput`] unless exactly [`EDGE_COUNT`] timestamps are given.
pub fn classify_bits(edges: &[Tick], frequency: u64) -> Result<u64> {
    if edges.len() != EDGE_COUNT {
        return Err(Error::InvalidInput {
            expected: EDGE_COUNT,
            actual: edges.len(),
        });
    }
    let threshold = one_threshold_ticks(frequency);
    Ok(edges
        .iter()
        .zip(edges.iter().skip(1))
        .fold(0, |bits, (earlier, later)| {
            (bits << 1) | u64::from(later.saturating_since(*earlier) > threshold)
        }))
}

/// A checksum-verified DHT22 frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DhtReading {
    humidity_tenths: u16,
    temperature_word: u16,
}

impl DhtReading {
    /// Verify and split a 40-bit frame from [`classify_bits`]. Bits above 39 are ignored.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] with the computed checksum as `expected` and the received one
    /// as `actual` when they differ.
    pub fn from_bits(bits: u64) -> Result<Self> {
        let [_, _, _, frame @ ..] = bits.to_be_bytes();
        Self::from_bytes(&frame)
    }

    /// Verify and split a 5-byte frame.
    ///
    /// ```rust
    /// use pulse_kit::sensor_codec::dht22::DhtReading;
    ///
    /// let reading = DhtReading::from_bytes(&[0x02, 0x8C, 0x01, 0x5F, 0xEE]).expect("valid frame");
    /// assert_eq!(reading.humidity_percent(), 65.2);
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] unless `raw` is [`FRAME_LEN`] bytes whose checksum matches.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let [humidity_high, humidity_low, temperature_high, temperature_low, checksum] =
            fixed::<FRAME_LEN>(raw)?;
        let sum = humidity_high
            .wrapping_add(humidity_low)
            .wrapping_add(temperature_high)
            .wrapping_add(temperature_low);
        if sum != checksum {
            return Err(Error::InvalidInput {
                expected: usize::from(sum),
                actual: usize::from(checksum),
            });
        }
        Ok(Self {
            humidity_tenths: u16::from_be_bytes([humidity_high, humidity_low]),
            temperature_word: u16::from_be_bytes([temperature_high, temperature_low]),
        })
    }

    /// Relative humidity, percent.
    #[must_use]
    pub fn humidity_percent(self) -> f32 {
        f32::from(self.humidity_tenths) / 10.0
    }

    /// Temperature, °C. Sign-magnitude on the wire, not two's complement.
    #[must_use]
    pub fn temperature_celsius(self) -> f32 {
        let magnitude = f32::from(self.temperature_word & 0x7FFF) / 10.0;
        if self.temperature_word & 0x8000 == 0 {
            magnitude
        } else {
            -magnitude
        }
    }

    /// Humidity as a [`PhysicalReading`].
    #[must_use]
    pub fn humidity(self) -> PhysicalReading {
        PhysicalReading {
            value: self.humidity_percent(),
            unit: Unit::RelativeHumidityPercent,
        }
    }

    /// Temperature as a [`PhysicalReading`].
    #[must_use]
    pub fn temperature(self) -> PhysicalReading {
        PhysicalReading {
            value: self.temperature_celsius(),
            unit: Unit::Celsius,
        }
    }
}

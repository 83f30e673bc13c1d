//! APA102 (DotStar) SPI frame packing.
//!
//! A frame is four zero bytes, then one 4-byte record per pixel (brightness, blue, green,
//! red), then enough zero bytes to clock the data through every LED in the chain.

use heapless::Vec;
use smart_leds::RGB8;

use crate::{Error, Result};

/// RGB color of one LED, re-exported from the `smart_leds` crate.
pub type Pixel = RGB8;

/// Zero bytes that open every frame.
pub const START_FRAME_LEN: usize = 4;

/// Bytes per pixel record.
pub const PIXEL_RECORD_LEN: usize = 4;

/// Per-pixel brightness byte written in front of each color.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelBrightness {
    /// `0xFF`: full brightness. Color channels carry all dimming.
    #[default]
    Full,
    /// `0xE0 | level` with a 5-bit global level (0..=31, larger values saturate).
    Global(u8),
}

impl PixelBrightness {
    /// The record header byte for this brightness.
    #[must_use]
    pub const fn header_byte(self) -> u8 {
        match self {
            Self::Full => 0xFF,
            Self::Global(level) => 0xE0 | if level > 0x1F { 0x1F } else { level },
        }
    }
}

/// Zero bytes closing a frame of `pixel_count` pixels: `ceil((pixel_count + 14) / 16)`.
#[must_use]
pub const fn end_frame_len(pixel_count: usize) -> usize {
    pixel_count.saturating_add(14).div_ceil(16)
}

/// Total encoded length of a frame of `pixel_count` pixels.
#[must_use]
pub const fn pixel_frame_len(pixel_count: usize) -> usize {
    START_FRAME_LEN
        .saturating_add(pixel_count.saturating_mul(PIXEL_RECORD_LEN))
        .saturating_add(end_frame_len(pixel_count))
}

/// Encode `pixels` at full brightness.
///
/// Each color channel is shifted right by one bit, halving its range.
///
/// ```rust
/// use pulse_kit::sensor_codec::{Pixel, encode_pixel_frame};
///
/// let frame = encode_pixel_frame::<16>(&[Pixel::new(255, 128, 0)])?;
/// assert_eq!(frame.as_slice(), &[0, 0, 0, 0, 0xFF, 0, 64, 127, 0]);
/// # Ok::<(), pulse_kit::Error>(())
/// ```
///
/// # Errors
///
/// [`Error::BufferTooSmall`] if `N` is less than [`pixel_frame_len`]`(pixels.len())`.
pub fn encode_pixel_frame<const N: usize>(pixels: &[Pixel]) -> Result<Vec<u8, N>> {
    encode_pixel_frame_with(pixels, PixelBrightness::Full)
}

/// Encode `pixels` with an explicit per-pixel brightness byte.
///
/// # Errors
///
/// [`Error::BufferTooSmall`] if `N` is less than [`pixel_frame_len`]`(pixels.len())`.
pub fn encode_pixel_frame_with<const N: usize>(
    pixels: &[Pixel],
    brightness: PixelBrightness,
) -> Result<Vec<u8, N>> {
    encode_pixels(pixels.iter().copied(), brightness)
}

/// Encode any sequence of colors convertible to [`Pixel`].
///
/// The pixel count is only known once the sequence is exhausted, so an undersized buffer
/// is detected after the whole sequence has been consumed.
///
/// # Errors
///
/// [`Error::BufferTooSmall`] if `N` cannot hold the frame.
pub fn encode_pixels<const N: usize, I>(pixels: I, brightness: PixelBrightness) -> Result<Vec<u8, N>>
where
    I: IntoIterator,
    I::Item: Into<Pixel>,
{
    let header = brightness.header_byte();
    let mut frame: Vec<u8, N> = Vec::new();
    let mut overflow = frame.extend_from_slice(&[0; START_FRAME_LEN]).is_err();
    let mut count = 0usize;
    for pixel in pixels {
        let pixel: Pixel = pixel.into();
        count = count.saturating_add(1);
        overflow = overflow
            || frame
                .extend_from_slice(&[header, pixel.b >> 1, pixel.g >> 1, pixel.r >> 1])
                .is_err();
    }

    let needed = pixel_frame_len(count);
    if overflow || frame.resize(needed, 0).is_err() {
        return Err(Error::BufferTooSmall {
            needed,
            capacity: N,
        });
    }
    Ok(frame)
}

//! An APA102 (DotStar) LED strip on an SPI bus.
//!
//! See [`Apa102Strip`] for usage. Frames are packed by
//! [`sensor_codec::apa102`](crate::sensor_codec::apa102).

use core::ops::{Deref, DerefMut};

use embedded_hal::spi::{Error as _, SpiBus};
use smart_leds::SmartLedsWrite;

pub use crate::sensor_codec::apa102::{Pixel, PixelBrightness};
use crate::sensor_codec::apa102::encode_pixels;
use crate::{Error, Result, warn};

/// Predefined RGB color constants from the `smart_leds` crate.
#[doc(inline)]
pub use smart_leds::colors;

// ============================================================================
// Frame1d
// ============================================================================

/// Fixed-size [`Pixel`] data for an LED strip.
///
/// Frames deref to `[Pixel; N]`, so you can mutate pixels directly before passing them to
/// [`Apa102Strip::write_frame`].
#[derive(Clone, Copy, Debug)]
pub struct Frame1d<const N: usize>(pub [Pixel; N]);

impl<const N: usize> Frame1d<N> {
    /// Number of LEDs in this frame.
    pub const LEN: usize = N;

    /// Create a new blank (all black) frame.
    #[must_use]
    pub const fn new() -> Self {
        Self([Pixel::new(0, 0, 0); N])
    }

    /// Create a frame filled with a single color.
    #[must_use]
    pub const fn filled(color: Pixel) -> Self {
        Self([color; N])
    }
}

impl<const N: usize> Deref for Frame1d<N> {
    type Target = [Pixel; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> DerefMut for Frame1d<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const N: usize> From<[Pixel; N]> for Frame1d<N> {
    fn from(array: [Pixel; N]) -> Self {
        Self(array)
    }
}

impl<const N: usize> Default for Frame1d<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Apa102Strip
// ============================================================================

/// An APA102 strip driven through an [`SpiBus`].
///
/// `BYTES` is the frame buffer capacity; size it with
/// [`pixel_frame_len`](crate::sensor_codec::pixel_frame_len) for the longest strip you
/// write. The strip is rebuilt and sent in one SPI write per update.
///
/// # Example
///
/// ```rust,no_run
/// use embedded_hal::spi::SpiBus;
/// use pulse_kit::led_strip::{Apa102Strip, Frame1d, colors};
/// use pulse_kit::sensor_codec::pixel_frame_len;
///
/// const LEN: usize = 8;
///
/// fn show<SPI: SpiBus>(spi: SPI) -> pulse_kit::Result<()> {
///     let mut strip = Apa102Strip::<_, { pixel_frame_len(LEN) }>::new(spi);
///     let mut frame = Frame1d::<LEN>::filled(colors::BLUE);
///     frame[0] = colors::WHITE;
///     strip.write_frame(&frame)
/// }
/// ```
pub struct Apa102Strip<SPI, const BYTES: usize> {
    spi: SPI,
    brightness: PixelBrightness,
}

impl<SPI: SpiBus, const BYTES: usize> Apa102Strip<SPI, BYTES> {
    /// Create a strip at full per-pixel brightness.
    #[must_use]
    pub const fn new(spi: SPI) -> Self {
        Self::with_brightness(spi, PixelBrightness::Full)
    }

    /// Create a strip with an explicit per-pixel brightness byte.
    #[must_use]
    pub const fn with_brightness(spi: SPI, brightness: PixelBrightness) -> Self {
        Self { spi, brightness }
    }

    /// Change the per-pixel brightness used from the next update on.
    pub fn set_brightness(&mut self, brightness: PixelBrightness) {
        self.brightness = brightness;
    }

    /// Send `pixels` to the strip.
    ///
    /// # Errors
    ///
    /// [`Error::BufferTooSmall`] if the frame does not fit in `BYTES`;
    /// [`Error::WriteFailure`] if the SPI write fails.
    pub fn write_pixels(&mut self, pixels: &[Pixel]) -> Result<()> {
        self.send(pixels.iter().copied())
    }

    /// Send a whole [`Frame1d`] to the strip.
    ///
    /// # Errors
    ///
    /// As [`write_pixels`](Self::write_pixels).
    pub fn write_frame<const N: usize>(&mut self, frame: &Frame1d<N>) -> Result<()> {
        self.write_pixels(frame.as_slice())
    }

    /// Give back the bus.
    pub fn free(self) -> SPI {
        self.spi
    }

    fn send<I>(&mut self, pixels: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Pixel>,
    {
        let frame = encode_pixels::<BYTES, _>(pixels, self.brightness)?;
        self.spi
            .write(&frame)
            .and_then(|()| self.spi.flush())
            .map_err(|err| {
                warn!("apa102 spi write failed: {:?}", err.kind());
                Error::WriteFailure
            })
    }
}

impl<SPI: SpiBus, const BYTES: usize> SmartLedsWrite for Apa102Strip<SPI, BYTES> {
    type Error = Error;
    type Color = Pixel;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        self.send(iterator)
    }
}

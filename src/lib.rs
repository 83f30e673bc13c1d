//! Timing-critical building blocks for hobby servos and small sensors.
//!
//! - [`pulse_generator`]: a software PWM pulse train for servo framing, timed by a
//!   [`busy_wait`] scheduler over a [`clock`].
//! - [`direction_latch`]: turns forward/backward button edges into the pulse width the
//!   generator emits.
//! - [`sensor_codec`]: pure conversions from raw I2C, SPI and single-wire sensor data into
//!   physical units, and APA102 (DotStar) SPI frame packing.
//! - [`sensors`] and [`led_strip`]: thin `embedded-hal` transports that feed the codecs.
//!
//! # Glossary
//!
//! - **Pulse width (on-width):** the part of each frame period during which the output is
//!   held high. For a continuous-rotation servo it selects direction and speed.
//! - **Busy-wait:** a delay that polls a clock instead of yielding the core. Sleep-based
//!   delays on most platforms are far too coarse for sub-5 ms pulses.
//! - **APA102 / DotStar:** addressable LEDs clocked over SPI, framed by start and end markers.
#![cfg_attr(not(feature = "host"), no_std)]

#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, info, warn};
#[cfg(not(feature = "defmt"))]
pub(crate) use log::{debug, info, warn};

pub mod busy_wait;
pub mod clock;
pub mod direction_latch;
mod error;
pub mod led_strip;
pub mod pulse_config;
pub mod pulse_generator;
pub mod sensor_codec;
pub mod sensors;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};

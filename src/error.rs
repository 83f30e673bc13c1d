//! Crate-wide error type.

use derive_more::{Display, Error};

/// Errors reported by pulse-kit.
///
/// The pulse loop itself never returns these; pin failures inside a cycle are counted
/// instead (see [`PulseGenerator::write_failures`](crate::pulse_generator::PulseGenerator::write_failures)).
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No controller answered on the bus, or the transport rejected the transfer.
    #[display("hardware unavailable")]
    HardwareUnavailable,

    /// A codec was handed a buffer of the wrong length, or a driver an out-of-range argument.
    #[display("invalid input: expected {expected}, got {actual}")]
    InvalidInput {
        /// Length (or upper bound) the call requires.
        expected: usize,
        /// Length (or value) that was supplied.
        actual: usize,
    },

    /// A timed exchange missed its window: the device did not answer in time, or a
    /// busy-waited pulse ran too long to be trusted.
    #[display("timed out")]
    Timeout,

    /// A pin or bus write was rejected by the hardware layer.
    #[display("write failure")]
    WriteFailure,

    /// The output buffer cannot hold the encoded frame.
    #[display("buffer too small: need {needed} bytes, capacity {capacity}")]
    BufferTooSmall {
        /// Bytes the encoded frame needs.
        needed: usize,
        /// Bytes the buffer can hold.
        capacity: usize,
    },
}

/// Result alias defaulting to [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

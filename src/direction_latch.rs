//! Forward/backward button edges to a servo pulse-width setpoint.
//!
//! See [`DirectionInputLatch`] for the latch itself and [`DirectionButtons`] for a debounced
//! GPIO poller that feeds it.

use embassy_time::Duration;

use crate::pulse_config::PulseConfig;
use crate::pulse_generator::PulseFrame;

// ============================================================================
// Submodules
// ============================================================================

mod direction_buttons;

pub use direction_buttons::{ButtonEdges, DirectionButtons, PressedTo};

// ============================================================================
// DirectionInputLatch
// ============================================================================

/// Turns two edge-triggered button inputs into the on-width of a [`PulseFrame`].
///
/// An active forward edge sets the on-width to the forward width, an inactive one sets it
/// to zero; the backward button works the same with the backward width. Each call is a
/// single atomic store, so edges may arrive from an interrupt handler while a
/// [`PulseGenerator`](crate::pulse_generator::PulseGenerator) reads the frame elsewhere.
///
/// There is no interlock between the buttons: with both held, whichever edge arrived last
/// decides the setpoint, and releasing either one stops the servo.
///
/// # Example
///
/// ```rust
/// use embassy_time::Duration;
/// use pulse_kit::direction_latch::DirectionInputLatch;
/// use pulse_kit::pulse_config::PulseConfig;
/// use pulse_kit::pulse_generator::PulseFrame;
///
/// static FRAME: PulseFrame = PulseFrame::new(Duration::from_millis(20));
/// let latch = DirectionInputLatch::from_config(&FRAME, &PulseConfig::DEFAULT);
///
/// latch.on_forward_edge(true);
/// assert_eq!(FRAME.on_width(), Duration::from_millis(2));
/// latch.on_forward_edge(false);
/// assert_eq!(FRAME.on_width(), Duration::from_ticks(0));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct DirectionInputLatch<'a> {
    frame: &'a PulseFrame,
    forward_width: Duration,
    backward_width: Duration,
}

impl<'a> DirectionInputLatch<'a> {
    /// Create a latch writing `forward_width`/`backward_width` into `frame`.
    #[must_use]
    pub const fn new(frame: &'a PulseFrame, forward_width: Duration, backward_width: Duration) -> Self {
        Self {
            frame,
            forward_width,
            backward_width,
        }
    }

    /// Create a latch using the direction widths of `config`.
    #[must_use]
    pub const fn from_config(frame: &'a PulseFrame, config: &PulseConfig) -> Self {
        Self::new(frame, config.forward_width, config.backward_width)
    }

    /// Forward button changed to `is_active`. Returns the stored on-width.
    pub fn on_forward_edge(&self, is_active: bool) -> Duration {
        self.latch(is_active, self.forward_width)
    }

    /// Backward button changed to `is_active`. Returns the stored on-width.
    pub fn on_backward_edge(&self, is_active: bool) -> Duration {
        self.latch(is_active, self.backward_width)
    }

    /// The on-width currently stored in the frame.
    #[must_use]
    pub fn current_width(&self) -> Duration {
        self.frame.on_width()
    }

    /// The frame this latch writes.
    #[must_use]
    pub const fn frame(&self) -> &'a PulseFrame {
        self.frame
    }

    fn latch(&self, is_active: bool, width: Duration) -> Duration {
        self.frame.set_on_width(if is_active {
            width
        } else {
            Duration::from_ticks(0)
        })
    }
}

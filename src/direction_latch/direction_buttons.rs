//! Debounced polling of the two direction buttons.
//!
//! See [`DirectionButtons`].

use embedded_hal::digital::{Error as _, InputPin};

use super::DirectionInputLatch;
use crate::clock::{HighResolutionClock, Tick};
use crate::pulse_config::PulseConfig;
use crate::{debug, warn};

// ============================================================================
// PressedTo - How the button is wired
// ============================================================================

/// Describes how the button is physically wired.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PressedTo {
    /// Button connects pin to voltage when pressed. Pin reads HIGH when pressed.
    Voltage,

    /// Button connects pin to ground when pressed. Pin reads LOW when pressed.
    Ground,
}

/// Edges forwarded to the latch by one [`DirectionButtons::poll`].
///
/// `Some(true)` is a press, `Some(false)` a release, `None` no accepted change.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEdges {
    /// Accepted forward-button edge.
    pub forward: Option<bool>,
    /// Accepted backward-button edge.
    pub backward: Option<bool>,
}

// ============================================================================
// DebouncedInput
// ============================================================================

struct DebouncedInput<I> {
    pin: I,
    pressed_to: PressedTo,
    is_active: bool,
    last_change: Option<Tick>,
}

impl<I: InputPin> DebouncedInput<I> {
    const fn new(pin: I, pressed_to: PressedTo) -> Self {
        Self {
            pin,
            pressed_to,
            is_active: false,
            last_change: None,
        }
    }

    fn read_active(&mut self) -> Option<bool> {
        let level = match self.pressed_to {
            PressedTo::Voltage => self.pin.is_high(),
            PressedTo::Ground => self.pin.is_low(),
        };
        match level {
            Ok(active) => Some(active),
            Err(err) => {
                warn!("button read failed: {:?}", err.kind());
                None
            }
        }
    }

    // A change is accepted only once the debounce window since the previous accepted
    // change has passed; until then it is bounce and ignored.
    fn poll(&mut self, now: Tick, window_ticks: u64) -> Option<bool> {
        let active = self.read_active()?;
        if active == self.is_active {
            return None;
        }
        if let Some(last_change) = self.last_change {
            if now.saturating_since(last_change) < window_ticks {
                return None;
            }
        }
        self.is_active = active;
        self.last_change = Some(now);
        Some(active)
    }
}

// ============================================================================
// DirectionButtons
// ============================================================================

/// Polls a forward and a backward button, debounces them, and forwards accepted edges to a
/// [`DirectionInputLatch`].
///
/// Call [`poll`](Self::poll) from a periodic timer or any loop that is not the pulse
/// generator's. A transition arriving within the debounce window of the previous accepted
/// transition on the same button is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use embedded_hal::digital::InputPin;
/// use pulse_kit::clock::StdClock;
/// use pulse_kit::direction_latch::{DirectionButtons, DirectionInputLatch, PressedTo};
/// use pulse_kit::pulse_config::PulseConfig;
/// use pulse_kit::pulse_generator::PulseFrame;
///
/// static FRAME: PulseFrame = PulseFrame::new(PulseConfig::DEFAULT.period);
///
/// fn watch<F: InputPin, B: InputPin>(forward: F, backward: B) -> ! {
///     let latch = DirectionInputLatch::from_config(&FRAME, &PulseConfig::DEFAULT);
///     let mut buttons = DirectionButtons::new(
///         latch,
///         forward,
///         backward,
///         PressedTo::Ground,
///         StdClock::new(),
///         &PulseConfig::DEFAULT,
///     );
///     loop {
///         buttons.poll();
///         std::thread::sleep(core::time::Duration::from_millis(5));
///     }
/// }
/// ```
pub struct DirectionButtons<'a, F, B, C> {
    latch: DirectionInputLatch<'a>,
    forward: DebouncedInput<F>,
    backward: DebouncedInput<B>,
    clock: C,
    window_ticks: u64,
}

impl<'a, F, B, C> DirectionButtons<'a, F, B, C>
where
    F: InputPin,
    B: InputPin,
    C: HighResolutionClock,
{
    /// Create a poller for two buttons wired the same way, debounced per `config`.
    #[must_use]
    pub fn new(
        latch: DirectionInputLatch<'a>,
        forward: F,
        backward: B,
        pressed_to: PressedTo,
        clock: C,
        config: &PulseConfig,
    ) -> Self {
        let window_ticks = clock.ticks_for_micros(config.debounce.as_micros());
        Self {
            latch,
            forward: DebouncedInput::new(forward, pressed_to),
            backward: DebouncedInput::new(backward, pressed_to),
            clock,
            window_ticks,
        }
    }

    /// Read both buttons once and forward accepted edges to the latch.
    ///
    /// When both buttons change in the same poll the backward edge is applied last and
    /// wins.
    pub fn poll(&mut self) -> ButtonEdges {
        let now = self.clock.now();
        let edges = ButtonEdges {
            forward: self.forward.poll(now, self.window_ticks),
            backward: self.backward.poll(now, self.window_ticks),
        };
        if let Some(active) = edges.forward {
            debug!("forward button active={}", active);
            self.latch.on_forward_edge(active);
        }
        if let Some(active) = edges.backward {
            debug!("backward button active={}", active);
            self.latch.on_backward_edge(active);
        }
        edges
    }

    /// The latch edges are forwarded to.
    #[must_use]
    pub const fn latch(&self) -> &DirectionInputLatch<'a> {
        &self.latch
    }

    /// Give back the forward and backward pins.
    pub fn free(self) -> (F, B) {
        (self.forward.pin, self.backward.pin)
    }
}

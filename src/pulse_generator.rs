//! A software PWM pulse train for hobby servos.
//!
//! [`PulseGenerator`] drives an output pin high for the current on-width, then low for the
//! rest of a fixed frame period, timing both phases with a [`BusyWaitScheduler`]. The
//! on-width lives in a shared [`PulseFrame`] so a setpoint source (usually a
//! [`DirectionInputLatch`](crate::direction_latch::DirectionInputLatch)) can change it while
//! the generator runs on its own core or thread.

use core::ops::Deref;

use embassy_time::Duration;
use embedded_hal::digital::{Error as _, OutputPin};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::busy_wait::BusyWaitScheduler;
use crate::clock::HighResolutionClock;
use crate::{debug, info, warn};

const ZERO: Duration = Duration::from_ticks(0);

// ============================================================================
// PulseFrame - shared setpoint
// ============================================================================

/// The period and current on-width of a pulse train, shared between one writer and the
/// generator loop.
///
/// The on-width is a single 32-bit microsecond word, so a reader never observes a torn
/// value. Writes are clamped to `[0, period]`.
///
/// `new` is a `const fn`, so a frame can live in a `static`:
///
/// ```rust
/// use embassy_time::Duration;
/// use pulse_kit::pulse_generator::PulseFrame;
///
/// static FRAME: PulseFrame = PulseFrame::new(Duration::from_millis(20));
///
/// FRAME.set_on_width(Duration::from_millis(30));
/// assert_eq!(FRAME.on_width(), Duration::from_millis(20));
/// ```
#[derive(Debug)]
pub struct PulseFrame {
    period_us: u32,
    on_width_us: AtomicU32,
    stop: AtomicBool,
}

impl PulseFrame {
    /// Create an idle frame (on-width zero) with a fixed `period`.
    ///
    /// Periods beyond `u32::MAX` microseconds are truncated to that bound.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        let period_us = period.as_micros();
        let period_us = if period_us > u32::MAX as u64 {
            u32::MAX
        } else {
            period_us as u32
        };
        Self {
            period_us,
            on_width_us: AtomicU32::new(0),
            stop: AtomicBool::new(false),
        }
    }

    /// The constant frame period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_micros(self.period_us as u64)
    }

    /// The current on-width.
    #[must_use]
    pub fn on_width(&self) -> Duration {
        Duration::from_micros(u64::from(self.on_width_us.load(Ordering::Relaxed)))
    }

    /// Store a new on-width, clamped to `[0, period]`. Returns the stored value.
    pub fn set_on_width(&self, width: Duration) -> Duration {
        let width_us = u32::try_from(width.as_micros())
            .unwrap_or(u32::MAX)
            .min(self.period_us);
        self.on_width_us.store(width_us, Ordering::Relaxed);
        debug!("pulse on-width -> {}us", width_us);
        Duration::from_micros(u64::from(width_us))
    }

    /// Ask a running [`PulseGenerator::run`] loop to finish its current cycle and return.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Clear a previous stop request so the frame can drive a new loop.
    pub fn clear_stop(&self) {
        self.stop.store(false, Ordering::Release);
    }
}

// ============================================================================
// PulseGenerator
// ============================================================================

/// Emits one HIGH/LOW pulse per frame period on an [`OutputPin`].
///
/// Each [`run_cycle`](Self::run_cycle) reads the shared on-width, drives the pin high for
/// that long, then low for the remainder of the period. With an on-width of zero the high
/// phase is skipped entirely and the cycle is one full-period low phase.
///
/// Pin write failures never stop the train: the edge is simply not realized, the failure is
/// logged and counted, and the cycle carries on.
///
/// `F` is whatever owns or borrows the frame: `&PulseFrame` for a frame on the stack or in a
/// `static`, `Arc<PulseFrame>` when the generator runs on another thread.
///
/// # Example
///
/// ```rust,no_run
/// use embassy_time::Duration;
/// use embedded_hal::digital::OutputPin;
/// use pulse_kit::pulse_generator::PulseGenerator;
///
/// fn drive<P: OutputPin + Send + 'static>(pin: P) -> P {
///     // Dedicated thread, 20 ms frames.
///     let handle = PulseGenerator::start(pin, Duration::from_millis(20));
///     handle.set_on_width(Duration::from_micros(1_500));
///     std::thread::sleep(core::time::Duration::from_secs(2));
///     handle.stop()
/// }
/// ```
pub struct PulseGenerator<F, P, C> {
    frame: F,
    pin: P,
    scheduler: BusyWaitScheduler<C>,
    write_failures: u32,
}

impl<F, P, C> PulseGenerator<F, P, C>
where
    F: Deref<Target = PulseFrame>,
    P: OutputPin,
    C: HighResolutionClock,
{
    /// Create a generator that reads its setpoint from `frame`.
    ///
    /// The pin is not touched until the first cycle.
    #[must_use]
    pub const fn new(frame: F, pin: P, clock: C) -> Self {
        Self {
            frame,
            pin,
            scheduler: BusyWaitScheduler::new(clock),
            write_failures: 0,
        }
    }

    /// The shared frame this generator reads.
    #[must_use]
    pub fn frame(&self) -> &PulseFrame {
        &self.frame
    }

    /// Set the on-width directly, clamped to `[0, period]`. Returns the stored value.
    pub fn set_on_width(&self, width: Duration) -> Duration {
        self.frame.set_on_width(width)
    }

    /// Pin writes rejected by the hardware layer since construction.
    #[must_use]
    pub const fn write_failures(&self) -> u32 {
        self.write_failures
    }

    /// Run one frame: HIGH for the on-width, then LOW for the rest of the period.
    ///
    /// Returns the on-width that was applied after clamping.
    pub fn run_cycle(&mut self) -> Duration {
        let period = self.frame.period();
        let on_width = self.frame.on_width().min(period);

        if on_width != ZERO {
            self.write(true);
            self.scheduler.wait_for(on_width);
        }
        self.write(false);
        self.scheduler
            .wait_for(period.checked_sub(on_width).unwrap_or(ZERO));

        on_width
    }

    /// Run cycles back to back until [`PulseFrame::request_stop`] is called, then leave the
    /// pin LOW.
    ///
    /// The stop flag is checked between cycles, so the call returns within one period of
    /// the request.
    pub fn run(&mut self) {
        info!(
            "pulse generator running, period {}us",
            self.frame.period().as_micros()
        );
        while !self.frame.is_stop_requested() {
            self.run_cycle();
        }
        self.write(false);
        info!(
            "pulse generator stopped, {} failed pin writes",
            self.write_failures
        );
    }

    /// Give back the pin.
    pub fn into_pin(self) -> P {
        self.pin
    }

    fn write(&mut self, high: bool) {
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(err) = result {
            self.write_failures = self.write_failures.saturating_add(1);
            warn!("pulse pin write (high={}) failed: {:?}", high, err.kind());
        }
    }
}

// ============================================================================
// Host thread runner
// ============================================================================

#[cfg(feature = "host")]
pub use host::PulseHandle;

#[cfg(feature = "host")]
mod host {
    use core::ops::Deref;
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    use embassy_time::Duration;
    use embedded_hal::digital::OutputPin;

    use super::{PulseFrame, PulseGenerator};
    use crate::clock::{HighResolutionClock, StdClock};

    /// Handle to a pulse generator running on its own thread.
    ///
    /// Returned by [`PulseGenerator::start`] (which owns its frame through an [`Arc`]) and
    /// [`PulseGenerator::start_with_frame`]. The frame is released once the handle is
    /// stopped and the thread has exited.
    #[derive(Debug)]
    pub struct PulseHandle<P, F = Arc<PulseFrame>> {
        frame: F,
        thread: JoinHandle<P>,
    }

    impl<P, F: Deref<Target = PulseFrame>> PulseHandle<P, F> {
        /// The frame the generator thread reads. Hand this to a
        /// [`DirectionInputLatch`](crate::direction_latch::DirectionInputLatch).
        #[must_use]
        pub fn frame(&self) -> &PulseFrame {
            &self.frame
        }

        /// Set the on-width, clamped to `[0, period]`. Returns the stored value.
        pub fn set_on_width(&self, width: Duration) -> Duration {
            self.frame.set_on_width(width)
        }

        /// Stop the generator, wait for its thread, and give back the pin (left LOW).
        ///
        /// # Panics
        ///
        /// Re-raises a panic from the generator thread.
        pub fn stop(self) -> P {
            self.frame.request_stop();
            self.thread
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
        }
    }

    impl<P> PulseGenerator<Arc<PulseFrame>, P, StdClock>
    where
        P: OutputPin + Send + 'static,
    {
        /// Start a generator with the given `period` on a dedicated thread.
        #[must_use]
        pub fn start(pin: P, period: Duration) -> PulseHandle<P> {
            Self::start_with_frame(Arc::new(PulseFrame::new(period)), pin, StdClock::new())
        }
    }

    impl<F, P, C> PulseGenerator<F, P, C>
    where
        F: Deref<Target = PulseFrame> + Clone + Send + 'static,
        P: OutputPin + Send + 'static,
        C: HighResolutionClock + Send + 'static,
    {
        /// Start a generator over a caller-supplied frame and clock: a `&'static PulseFrame`
        /// or an `Arc<PulseFrame>` the caller keeps a clone of.
        ///
        /// Clears any earlier stop request on `frame`.
        #[must_use]
        pub fn start_with_frame(frame: F, pin: P, clock: C) -> PulseHandle<P, F> {
            frame.clear_stop();
            let shared = frame.clone();
            let thread = thread::spawn(move || {
                let mut generator = Self::new(shared, pin, clock);
                generator.run();
                generator.into_pin()
            });
            PulseHandle { frame, thread }
        }
    }
}

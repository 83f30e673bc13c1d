//! Precise blocking delays by spinning on a [`HighResolutionClock`].
//!
//! See [`BusyWaitScheduler`].

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};

use crate::clock::{HighResolutionClock, Tick};
use crate::{Error, Result, warn};

/// Blocks the calling core until a target tick by polling the clock.
///
/// The scheduler never sleeps or yields. Sleep-based delays typically have a granularity
/// of several milliseconds, which would swamp a 1-2 ms servo pulse; spinning trades CPU
/// time for pulse-width accuracy. Run it on a core or thread dedicated to the pulse train.
///
/// # Example
///
/// ```rust
/// use embassy_time::Duration;
/// use pulse_kit::busy_wait::BusyWaitScheduler;
/// use pulse_kit::clock::StdClock;
///
/// let mut scheduler = BusyWaitScheduler::new(StdClock::new());
/// scheduler.wait_for(Duration::from_micros(250));
/// ```
#[derive(Clone, Debug)]
pub struct BusyWaitScheduler<C> {
    clock: C,
}

impl<C: HighResolutionClock> BusyWaitScheduler<C> {
    /// Create a scheduler over `clock`.
    #[must_use]
    pub const fn new(clock: C) -> Self {
        Self { clock }
    }

    /// The clock this scheduler polls.
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Give back the clock.
    pub fn free(self) -> C {
        self.clock
    }

    /// Spin until `duration` has elapsed. A zero duration returns without reading the clock.
    pub fn wait_for(&mut self, duration: Duration) {
        if duration.as_ticks() == 0 {
            return;
        }
        let target = self
            .clock
            .now()
            .saturating_add(self.clock.ticks_for_micros(duration.as_micros()));
        self.wait_until(target);
    }

    /// Spin until the clock reads at least `target`.
    pub fn wait_until(&mut self, target: Tick) {
        while self.clock.now() < target {
            core::hint::spin_loop();
        }
    }

    /// Drive `pin` high for `width`, then low: the start pulse of single-wire sensors such
    /// as the DHT22.
    ///
    /// Sensor lines are usually pulled low through a transistor, so a high pin is an active
    /// (low) line. Unless a write fails, the pin is left low. If the thread was preempted and
    /// the last clock read before the falling edge is more than `tolerance` past the end of
    /// the pulse, the pulse is reported as [`Error::Timeout`] and the caller should retry.
    ///
    /// # Errors
    ///
    /// [`Error::WriteFailure`] if a pin write fails; [`Error::Timeout`] on overshoot.
    pub fn start_pulse<P: OutputPin>(
        &mut self,
        pin: &mut P,
        width: Duration,
        tolerance: Duration,
    ) -> Result<()> {
        let mut now = self.clock.now();
        pin.set_high().map_err(|err| pin_write_failed(&err))?;
        let deadline = now.saturating_add(self.clock.ticks_for_micros(width.as_micros()));
        while now < deadline {
            core::hint::spin_loop();
            now = self.clock.now();
        }
        pin.set_low().map_err(|err| pin_write_failed(&err))?;

        let late = now.saturating_since(deadline);
        if late > self.clock.ticks_for_micros(tolerance.as_micros()) {
            warn!("start pulse overran by {} ticks", late);
            return Err(Error::Timeout);
        }
        Ok(())
    }
}

fn pin_write_failed<E: embedded_hal::digital::Error>(err: &E) -> Error {
    warn!("start pulse pin write failed: {:?}", err.kind());
    Error::WriteFailure
}

impl<C: HighResolutionClock> DelayNs for BusyWaitScheduler<C> {
    fn delay_ns(&mut self, ns: u32) {
        if ns == 0 {
            return;
        }
        // Round up so a delay is never shorter than requested.
        let ticks = u128::from(ns)
            .saturating_mul(u128::from(self.clock.frequency()))
            .div_ceil(1_000_000_000);
        let target = self
            .clock
            .now()
            .saturating_add(u64::try_from(ticks).unwrap_or(u64::MAX));
        self.wait_until(target);
    }

    fn delay_us(&mut self, us: u32) {
        self.wait_for(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.wait_for(Duration::from_millis(u64::from(ms)));
    }
}

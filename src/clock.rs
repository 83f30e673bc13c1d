//! Monotonic high-frequency tick sources.
//!
//! See [`HighResolutionClock`] for the contract and [`EmbassyClock`] for the default source.

/// Elapsed hardware clock ticks since an arbitrary epoch.
///
/// Ticks never decrease within a process. Arithmetic saturates; wrap-around is not expected
/// within a pulse cycle.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick(pub u64);

impl Tick {
    /// The tick `ticks` after this one, saturating at `u64::MAX`.
    #[must_use]
    pub const fn saturating_add(self, ticks: u64) -> Self {
        Self(self.0.saturating_add(ticks))
    }

    /// Ticks elapsed since `earlier`, or zero if `earlier` is in the future.
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// A monotonic tick counter with sub-millisecond resolution.
///
/// Reads are side-effect free and cannot fail.
pub trait HighResolutionClock {
    /// Current tick count.
    fn now(&self) -> Tick;

    /// Ticks per second. Constant for the lifetime of the clock.
    fn frequency(&self) -> u64;

    /// Number of ticks spanning `micros` microseconds, rounded up and saturating.
    ///
    /// Rounding up keeps a wait of at least `micros` on clocks coarser than 1 MHz.
    fn ticks_for_micros(&self, micros: u64) -> u64 {
        let ticks = u128::from(micros)
            .saturating_mul(u128::from(self.frequency()))
            .div_ceil(1_000_000);
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }
}

impl<C: HighResolutionClock + ?Sized> HighResolutionClock for &C {
    fn now(&self) -> Tick {
        (**self).now()
    }

    fn frequency(&self) -> u64 {
        (**self).frequency()
    }
}

// ============================================================================
// EmbassyClock - embassy-time driver backed
// ============================================================================

/// Clock backed by the `embassy-time` driver.
///
/// On target hardware the HAL's time driver supplies the ticks (1 MHz by default). On the
/// host the `host` feature enables embassy's std driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

impl HighResolutionClock for EmbassyClock {
    #[inline]
    fn now(&self) -> Tick {
        Tick(embassy_time::Instant::now().as_ticks())
    }

    #[inline]
    fn frequency(&self) -> u64 {
        embassy_time::TICK_HZ
    }
}

// ============================================================================
// StdClock - host only
// ============================================================================

/// Nanosecond clock over [`std::time::Instant`], for host builds.
#[cfg(feature = "host")]
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    epoch: std::time::Instant,
}

#[cfg(feature = "host")]
impl StdClock {
    /// Create a clock whose epoch is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "host")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "host")]
impl HighResolutionClock for StdClock {
    #[inline]
    fn now(&self) -> Tick {
        Tick(u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX))
    }

    #[inline]
    fn frequency(&self) -> u64 {
        1_000_000_000
    }
}

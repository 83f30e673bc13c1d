//! Compile-time configuration for the servo pulse train and its direction buttons.
//!
//! Use the [`pulse_config!`] macro for a keyword-driven constructor with defaults, or
//! [`PulseConfig::DEFAULT`] and its `with_*` builders.

use embassy_time::Duration;

/// Default frame period for hobby servos (microseconds).
pub const PERIOD_US_DEFAULT: u64 = 20_000; // 20 ms

/// Default pulse width while the forward button is held (microseconds).
pub const FORWARD_US_DEFAULT: u64 = 2_000;

/// Default pulse width while the backward button is held (microseconds).
pub const BACKWARD_US_DEFAULT: u64 = 1_000;

/// Default button debounce window (milliseconds).
pub const DEBOUNCE_MS_DEFAULT: u64 = 250;

/// Create a [`PulseConfig`] with keyword arguments.
///
/// All fields are optional: `period_us`, `forward_us`, `backward_us` (defaults
/// [`PERIOD_US_DEFAULT`], [`FORWARD_US_DEFAULT`], [`BACKWARD_US_DEFAULT`]) and `debounce_ms`
/// (default [`DEBOUNCE_MS_DEFAULT`]).
///
/// # Example
///
/// ```rust
/// use pulse_kit::pulse_config;
///
/// const CONFIG: pulse_kit::pulse_config::PulseConfig = pulse_config! {
///     forward_us: 1_800,
///     backward_us: 1_200,
/// };
///
/// assert_eq!(CONFIG.forward_width.as_micros(), 1_800);
/// assert_eq!(CONFIG.period.as_millis(), 20);
/// ```
#[macro_export]
macro_rules! pulse_config {
    ($($tt:tt)*) => {
        $crate::__pulse_config_impl! {
            @__fill_defaults
            period_us: $crate::pulse_config::PERIOD_US_DEFAULT,
            forward_us: $crate::pulse_config::FORWARD_US_DEFAULT,
            backward_us: $crate::pulse_config::BACKWARD_US_DEFAULT,
            debounce_ms: $crate::pulse_config::DEBOUNCE_MS_DEFAULT,
            fields: [ $($tt)* ]
        }
    };
}
#[doc(inline)]
pub use pulse_config;

// Public for macro expansion in downstream crates.
#[doc(hidden)]
#[macro_export]
macro_rules! __pulse_config_impl {
    (@__fill_defaults
        period_us: $period_us:expr,
        forward_us: $forward_us:expr,
        backward_us: $backward_us:expr,
        debounce_ms: $debounce_ms:expr,
        fields: [ ]
    ) => {
        $crate::pulse_config::PulseConfig::from_micros(
            $period_us,
            $forward_us,
            $backward_us,
            $debounce_ms,
        )
    };

    (@__fill_defaults
        period_us: $period_us:expr,
        forward_us: $forward_us:expr,
        backward_us: $backward_us:expr,
        debounce_ms: $debounce_ms:expr,
        fields: [ period_us: $value:expr $(, $($rest:tt)*)? ]
    ) => {
        $crate::__pulse_config_impl! {
            @__fill_defaults
            period_us: $value,
            forward_us: $forward_us,
            backward_us: $backward_us,
            debounce_ms: $debounce_ms,
            fields: [ $($($rest)*)? ]
        }
    };

    (@__fill_defaults
        period_us: $period_us:expr,
        forward_us: $forward_us:expr,
        backward_us: $backward_us:expr,
        debounce_ms: $debounce_ms:expr,
        fields: [ forward_us: $value:expr $(, $($rest:tt)*)? ]
    ) => {
        $crate::__pulse_config_impl! {
            @__fill_defaults
            period_us: $period_us,
            forward_us: $value,
            backward_us: $backward_us,
            debounce_ms: $debounce_ms,
            fields: [ $($($rest)*)? ]
        }
    };

    (@__fill_defaults
        period_us: $period_us:expr,
        forward_us: $forward_us:expr,
        backward_us: $backward_us:expr,
        debounce_ms: $debounce_ms:expr,
        fields: [ backward_us: $value:expr $(, $($rest:tt)*)? ]
    ) => {
        $crate::__pulse_config_impl! {
            @__fill_defaults
            period_us: $period_us,
            forward_us: $forward_us,
            backward_us: $value,
            debounce_ms: $debounce_ms,
            fields: [ $($($rest)*)? ]
        }
    };

    (@__fill_defaults
        period_us: $period_us:expr,
        forward_us: $forward_us:expr,
        backward_us: $backward_us:expr,
        debounce_ms: $debounce_ms:expr,
        fields: [ debounce_ms: $value:expr $(, $($rest:tt)*)? ]
    ) => {
        $crate::__pulse_config_impl! {
            @__fill_defaults
            period_us: $period_us,
            forward_us: $forward_us,
            backward_us: $backward_us,
            debounce_ms: $value,
            fields: [ $($($rest)*)? ]
        }
    };
}

/// Period, direction widths and debounce window for a button-driven servo.
///
/// Every width must fit inside the period; the constructors panic otherwise (at compile
/// time when used in a `const`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseConfig {
    /// Frame period of the pulse train.
    pub period: Duration,
    /// Pulse width emitted while the forward button is active.
    pub forward_width: Duration,
    /// Pulse width emitted while the backward button is active.
    pub backward_width: Duration,
    /// Transitions closer together than this are treated as switch bounce.
    pub debounce: Duration,
}

impl PulseConfig {
    /// 20 ms frames, 2 ms forward, 1 ms backward, 250 ms debounce.
    pub const DEFAULT: Self = Self::from_micros(
        PERIOD_US_DEFAULT,
        FORWARD_US_DEFAULT,
        BACKWARD_US_DEFAULT,
        DEBOUNCE_MS_DEFAULT,
    );

    /// Build a configuration from raw microsecond widths and a millisecond debounce window.
    ///
    /// # Panics
    ///
    /// Panics if either width exceeds the period.
    #[must_use]
    pub const fn from_micros(
        period_us: u64,
        forward_us: u64,
        backward_us: u64,
        debounce_ms: u64,
    ) -> Self {
        assert!(forward_us <= period_us, "forward_us must fit in the frame period");
        assert!(backward_us <= period_us, "backward_us must fit in the frame period");
        Self {
            period: Duration::from_micros(period_us),
            forward_width: Duration::from_micros(forward_us),
            backward_width: Duration::from_micros(backward_us),
            debounce: Duration::from_millis(debounce_ms),
        }
    }

    /// Same configuration with a different frame period.
    #[must_use]
    pub const fn with_period(self, period: Duration) -> Self {
        Self::from_micros(
            period.as_micros(),
            self.forward_width.as_micros(),
            self.backward_width.as_micros(),
            self.debounce.as_millis(),
        )
    }

    /// Same configuration with different direction widths.
    #[must_use]
    pub const fn with_widths(self, forward: Duration, backward: Duration) -> Self {
        Self::from_micros(
            self.period.as_micros(),
            forward.as_micros(),
            backward.as_micros(),
            self.debounce.as_millis(),
        )
    }

    /// Same configuration with a different debounce window.
    #[must_use]
    pub const fn with_debounce(self, debounce: Duration) -> Self {
        Self { debounce, ..self }
    }
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

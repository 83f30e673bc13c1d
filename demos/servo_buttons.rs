//! Two simulated direction buttons steer a servo pulse train on a simulated pin.
//!
//! Run with `RUST_LOG=info cargo run --bin demo_servo_buttons`.
#![cfg(feature = "host")]

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::info;
use pulse_kit::Result;
use pulse_kit::clock::StdClock;
use pulse_kit::direction_latch::{DirectionButtons, DirectionInputLatch, PressedTo};
use pulse_kit::pulse_config;
use pulse_kit::pulse_config::PulseConfig;
use pulse_kit::pulse_generator::PulseGenerator;

const CONFIG: PulseConfig = pulse_config! {
    forward_us: 2_000,
    backward_us: 1_000,
    debounce_ms: 50,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = inner_main() {
        panic!("{err}");
    }
}

fn inner_main() -> Result<()> {
    let scope = ScopePin::default();
    let pulses = Arc::clone(&scope.pulses);
    let last_width_us = Arc::clone(&scope.last_width_us);

    info!("Starting servo pulse train, period {}us", CONFIG.period.as_micros());
    let handle = PulseGenerator::start(scope, CONFIG.period);

    let forward = SimButton::default();
    let backward = SimButton::default();
    let mut buttons = DirectionButtons::new(
        DirectionInputLatch::from_config(handle.frame(), &CONFIG),
        forward.clone(),
        backward.clone(),
        PressedTo::Ground,
        StdClock::new(),
        &CONFIG,
    );

    // (button, pressed, hold time in ms)
    let script = [
        (&forward, true, 400),
        (&forward, false, 300),
        (&backward, true, 400),
        (&backward, false, 300),
    ];
    for (button, pressed, hold_ms) in script {
        button.set_pressed(pressed);
        let until = Instant::now() + core::time::Duration::from_millis(hold_ms);
        while Instant::now() < until {
            let edges = buttons.poll();
            if edges != Default::default() {
                info!(
                    "edges {:?} -> on-width {}us",
                    edges,
                    buttons.latch().current_width().as_micros()
                );
            }
            thread::sleep(core::time::Duration::from_millis(5));
        }
        info!(
            "{} pulses so far, last high phase {}us",
            pulses.load(Ordering::Relaxed),
            last_width_us.load(Ordering::Relaxed)
        );
    }

    // The buttons borrow the handle's frame.
    drop(buttons);
    let scope = handle.stop();
    info!(
        "Stopped after {} pulses, pin low={}",
        scope.pulses.load(Ordering::Relaxed),
        !scope.is_high()
    );
    Ok(())
}

// ============================================================================
// Simulated hardware
// ============================================================================

/// Output pin that measures each high phase, like a scope on the servo line.
#[derive(Default)]
struct ScopePin {
    rose_at: Option<Instant>,
    pulses: Arc<AtomicU32>,
    last_width_us: Arc<AtomicU64>,
}

impl ScopePin {
    const fn is_high(&self) -> bool {
        self.rose_at.is_some()
    }
}

impl ErrorType for ScopePin {
    type Error = Infallible;
}

impl OutputPin for ScopePin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        if let Some(rose_at) = self.rose_at.take() {
            let width = u64::try_from(rose_at.elapsed().as_micros()).unwrap_or(u64::MAX);
            self.last_width_us.store(width, Ordering::Relaxed);
            self.pulses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.rose_at.get_or_insert_with(Instant::now);
        Ok(())
    }
}

/// Ground-wired push button: the pin reads low while pressed.
#[derive(Clone, Default)]
struct SimButton {
    pressed: Rc<Cell<bool>>,
}

impl SimButton {
    fn set_pressed(&self, pressed: bool) {
        self.pressed.set(pressed);
    }
}

impl ErrorType for SimButton {
    type Error = Infallible;
}

impl InputPin for SimButton {
    fn is_high(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(!self.pressed.get())
    }

    fn is_low(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(self.pressed.get())
    }
}

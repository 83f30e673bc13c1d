//! Shared test infrastructure for pulse-kit integration tests

#![allow(dead_code, reason = "items used across multiple test files; Rust analyzes per-file")]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::i2c::{self, I2c};
use embedded_hal::spi::{self, SpiBus, SpiDevice};
use pulse_kit::clock::{HighResolutionClock, Tick};

// ============================================================================
// Fake Clock
// ============================================================================

/// Tick counter that advances by `step` on every read (1 MHz unless overridden).
///
/// Clones share the same counter, so a pin can timestamp its writes with the clock the
/// scheduler spins on.
#[derive(Clone)]
pub struct FakeClock {
    ticks: Rc<Cell<u64>>,
    step: u64,
    frequency: u64,
}

impl FakeClock {
    pub const FREQUENCY: u64 = 1_000_000;

    /// Clock that advances one tick per read, so busy waits terminate.
    pub fn stepping() -> Self {
        Self::stepping_by(1)
    }

    /// Clock that jumps `step` ticks per read, like a thread that gets preempted.
    pub fn stepping_by(step: u64) -> Self {
        Self {
            ticks: Rc::new(Cell::new(0)),
            step,
            frequency: Self::FREQUENCY,
        }
    }

    /// Clock that only moves when the test advances it.
    pub fn manual() -> Self {
        Self::stepping_by(0)
    }

    /// Same clock ticking at `frequency` Hz.
    pub fn at_frequency(self, frequency: u64) -> Self {
        Self { frequency, ..self }
    }

    /// Current tick without advancing.
    pub fn peek(&self) -> u64 {
        self.ticks.get()
    }

    pub fn advance_micros(&self, micros: u64) {
        self.ticks.set(self.ticks.get() + micros);
    }

    pub fn advance_millis(&self, millis: u64) {
        self.advance_micros(millis * 1_000);
    }
}

impl HighResolutionClock for FakeClock {
    fn now(&self) -> Tick {
        let now = self.ticks.get();
        self.ticks.set(now + self.step);
        Tick(now)
    }

    fn frequency(&self) -> u64 {
        self.frequency
    }
}

// ============================================================================
// Output Pins
// ============================================================================

/// Output pin that records `(tick, level)` for every successful write.
pub struct RecordingPin {
    clock: FakeClock,
    writes: Rc<RefCell<Vec<(u64, bool)>>>,
    failing: bool,
}

impl RecordingPin {
    pub fn new(clock: &FakeClock) -> Self {
        Self {
            clock: clock.clone(),
            writes: Rc::default(),
            failing: false,
        }
    }

    /// Pin whose every write is rejected.
    pub fn failing(clock: &FakeClock) -> Self {
        Self {
            failing: true,
            ..Self::new(clock)
        }
    }

    /// Shared view of the recorded writes.
    pub fn writes(&self) -> Rc<RefCell<Vec<(u64, bool)>>> {
        Rc::clone(&self.writes)
    }

    fn record(&mut self, level: bool) -> Result<(), digital::ErrorKind> {
        if self.failing {
            return Err(digital::ErrorKind::Other);
        }
        self.writes.borrow_mut().push((self.clock.peek(), level));
        Ok(())
    }
}

impl digital::ErrorType for RecordingPin {
    type Error = digital::ErrorKind;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.record(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.record(true)
    }
}

/// Thread-safe output pin that records levels only.
#[derive(Clone, Default)]
pub struct SharedPin {
    levels: Arc<Mutex<Vec<bool>>>,
}

impl SharedPin {
    pub fn levels(&self) -> Vec<bool> {
        self.levels.lock().expect("pin mutex poisoned").clone()
    }
}

impl digital::ErrorType for SharedPin {
    type Error = digital::ErrorKind;
}

impl OutputPin for SharedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.lock().expect("pin mutex poisoned").push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.lock().expect("pin mutex poisoned").push(true);
        Ok(())
    }
}

// ============================================================================
// Input Pins
// ============================================================================

/// Input pin whose electrical level the test sets.
#[derive(Clone)]
pub struct ScriptedInput {
    high: Rc<Cell<bool>>,
    failing: Rc<Cell<bool>>,
}

impl ScriptedInput {
    pub fn new(high: bool) -> Self {
        Self {
            high: Rc::new(Cell::new(high)),
            failing: Rc::new(Cell::new(false)),
        }
    }

    pub fn set_high(&self, high: bool) {
        self.high.set(high);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    fn level(&self) -> Result<bool, digital::ErrorKind> {
        if self.failing.get() {
            Err(digital::ErrorKind::Other)
        } else {
            Ok(self.high.get())
        }
    }
}

impl digital::ErrorType for ScriptedInput {
    type Error = digital::ErrorKind;
}

impl InputPin for ScriptedInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.level()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.level().map(|high| !high)
    }
}

/// Input pin that replays a recorded line: `(tick, level)` transitions against a fake clock.
#[derive(Clone)]
pub struct WaveformInput {
    clock: FakeClock,
    initial: bool,
    transitions: Rc<Vec<(u64, bool)>>,
}

impl WaveformInput {
    pub fn new(clock: &FakeClock, initial: bool, transitions: Vec<(u64, bool)>) -> Self {
        Self {
            clock: clock.clone(),
            initial,
            transitions: Rc::new(transitions),
        }
    }

    fn level(&self) -> bool {
        let now = self.clock.peek();
        self.transitions
            .iter()
            .take_while(|&&(at, _)| at <= now)
            .last()
            .map_or(self.initial, |&(_, level)| level)
    }
}

impl digital::ErrorType for WaveformInput {
    type Error = digital::ErrorKind;
}

impl InputPin for WaveformInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

// ============================================================================
// Mock I2C
// ============================================================================

/// I2C bus answering reads from a register map keyed by the last written command byte.
#[derive(Default)]
pub struct MockI2c {
    pub responses: HashMap<u8, Vec<u8>>,
    pub writes: Vec<(u8, Vec<u8>)>,
    pub failing: bool,
}

impl MockI2c {
    pub fn with_response(mut self, command: u8, reply: &[u8]) -> Self {
        self.responses.insert(command, reply.to_vec());
        self
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = i2c::ErrorKind;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.failing {
            return Err(i2c::ErrorKind::Bus);
        }
        let mut command = None;
        for operation in operations {
            match operation {
                i2c::Operation::Write(bytes) => {
                    self.writes.push((address, bytes.to_vec()));
                    command = bytes.first().copied();
                }
                i2c::Operation::Read(buffer) => {
                    let reply = command
                        .and_then(|command| self.responses.get(&command))
                        .ok_or(i2c::ErrorKind::NoAcknowledge(
                            i2c::NoAcknowledgeSource::Data,
                        ))?;
                    buffer.copy_from_slice(&reply[..buffer.len()]);
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Mock SPI
// ============================================================================

/// SPI device that records every command and replies with a fixed byte sequence.
pub struct MockSpiDevice {
    pub reply: Vec<u8>,
    pub sent: Vec<Vec<u8>>,
    pub failing: bool,
}

impl MockSpiDevice {
    pub fn replying(reply: &[u8]) -> Self {
        Self {
            reply: reply.to_vec(),
            sent: Vec::new(),
            failing: false,
        }
    }
}

impl spi::ErrorType for MockSpiDevice {
    type Error = spi::ErrorKind;
}

impl SpiDevice for MockSpiDevice {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        if self.failing {
            return Err(spi::ErrorKind::Other);
        }
        for operation in operations {
            match operation {
                spi::Operation::Transfer(read, write) => {
                    self.sent.push(write.to_vec());
                    read.copy_from_slice(&self.reply[..read.len()]);
                }
                spi::Operation::Write(write) => self.sent.push(write.to_vec()),
                spi::Operation::Read(read) => read.copy_from_slice(&self.reply[..read.len()]),
                spi::Operation::TransferInPlace(words) => {
                    self.sent.push(words.to_vec());
                    words.copy_from_slice(&self.reply[..words.len()]);
                }
                spi::Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}

/// SPI bus that records written bytes.
#[derive(Default)]
pub struct MockSpiBus {
    pub written: Vec<Vec<u8>>,
    pub flushes: usize,
    pub failing: bool,
}

impl spi::ErrorType for MockSpiBus {
    type Error = spi::ErrorKind;
}

impl SpiBus for MockSpiBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        if self.failing {
            return Err(spi::ErrorKind::Other);
        }
        self.written.push(words.to_vec());
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        read.fill(0);
        self.write(write)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let sent = words.to_vec();
        words.fill(0);
        self.write(&sent)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

// ============================================================================
// Test Helper Functions
// ============================================================================

/// Compare floats with a tolerance.
pub fn approx_eq(actual: f32, expected: f32, epsilon: f32) -> bool {
    (actual - expected).abs() <= epsilon
}

//! Shared test infrastructure for flashlight-modes integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_storage::{ReadStorage, Storage};
use flashlight_modes::press::ARMED;
use flashlight_modes::store::SENTINEL;
use flashlight_modes::{
    BatterySensor, Board, DriverConfig, ModeController, ModeStore, PersistentState,
    PowerControl, PwmOutput, RetainedMemory,
};

// ============================================================================
// Mock EEPROM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEepromError {
    /// Access outside the device.
    OutOfBounds,
    /// Power was cut before this write.
    PowerCut,
}

struct EepromCells {
    bytes: Vec<u8>,
    writes: Vec<(u32, u8)>,
    write_budget: Option<usize>,
}

/// Byte-addressed EEPROM shared between clones, so a test can "power cycle"
/// by booting a new controller on a clone of the same device.
#[derive(Clone)]
pub struct MockEeprom {
    cells: Rc<RefCell<EepromCells>>,
}

impl MockEeprom {
    /// Blank (erased) device of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: Rc::new(RefCell::new(EepromCells {
                bytes: vec![SENTINEL; capacity],
                writes: Vec::new(),
                write_budget: None,
            })),
        }
    }

    /// Allows `writes` more writes, then fails every write after that.
    pub fn cut_power_after(&self, writes: usize) {
        self.cells.borrow_mut().write_budget = Some(writes);
    }

    pub fn restore_power(&self) {
        self.cells.borrow_mut().write_budget = None;
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.cells.borrow().bytes.clone()
    }

    pub fn byte(&self, offset: usize) -> u8 {
        self.cells.borrow().bytes[offset]
    }

    pub fn poke(&self, offset: usize, value: u8) {
        self.cells.borrow_mut().bytes[offset] = value;
    }

    /// Every successful write as `(offset, value)`.
    pub fn writes(&self) -> Vec<(u32, u8)> {
        self.cells.borrow().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.cells.borrow().writes.len()
    }

    /// Offsets of ring cells holding something other than the sentinel.
    pub fn live_cells(&self, size: usize) -> Vec<usize> {
        let cells = self.cells.borrow();
        (0..size / 2)
            .filter(|&pos| cells.bytes[pos] != SENTINEL)
            .collect()
    }
}

impl ReadStorage for MockEeprom {
    type Error = MockEepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let cells = self.cells.borrow();
        let start = offset as usize;
        let end = start + bytes.len();
        let source = cells
            .bytes
            .get(start..end)
            .ok_or(MockEepromError::OutOfBounds)?;
        bytes.copy_from_slice(source);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.cells.borrow().bytes.len()
    }
}

impl Storage for MockEeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut cells = self.cells.borrow_mut();
        if let Some(budget) = cells.write_budget.as_mut() {
            if *budget == 0 {
                return Err(MockEepromError::PowerCut);
            }
            *budget -= 1;
        }

        let start = offset as usize;
        let end = start + bytes.len();
        cells
            .bytes
            .get_mut(start..end)
            .ok_or(MockEepromError::OutOfBounds)?
            .copy_from_slice(bytes);
        for (i, &value) in bytes.iter().enumerate() {
            cells.writes.push((offset + i as u32, value));
        }
        Ok(())
    }
}

/// Writes `state` into `eeprom` as if a previous boot had saved it.
pub fn seed_state(eeprom: &MockEeprom, size: u32, state: PersistentState) {
    let mut store = ModeStore::new(eeprom.clone(), size).unwrap();
    store.save_state(&state).unwrap();
}

// ============================================================================
// Mock PWM
// ============================================================================

/// Mock PWM channel that records every duty written
pub struct MockPwm {
    duty_history: Vec<u8>,
}

impl MockPwm {
    pub fn new() -> Self {
        Self {
            duty_history: Vec::new(),
        }
    }

    pub fn duty_history(&self) -> &[u8] {
        &self.duty_history
    }

    pub fn last_duty(&self) -> Option<u8> {
        self.duty_history.last().copied()
    }

    /// How many times `duty` was written.
    pub fn count(&self, duty: u8) -> usize {
        self.duty_history.iter().filter(|&&d| d == duty).count()
    }
}

impl PwmOutput for MockPwm {
    fn set_duty(&mut self, duty: u8) {
        self.duty_history.push(duty);
    }
}

// ============================================================================
// Mock Battery
// ============================================================================

/// Battery ADC that plays back scripted readings, then repeats a fallback
pub struct MockBattery {
    script: VecDeque<u8>,
    fallback: u8,
    conversions: usize,
}

impl MockBattery {
    /// Every reading returns `value`.
    pub fn steady(value: u8) -> Self {
        Self::scripted(&[], value)
    }

    pub fn scripted(readings: &[u8], fallback: u8) -> Self {
        Self {
            script: readings.iter().copied().collect(),
            fallback,
            conversions: 0,
        }
    }

    pub fn conversions(&self) -> usize {
        self.conversions
    }
}

impl BatterySensor for MockBattery {
    fn sample_ready(&mut self) -> bool {
        true
    }

    fn sample_value(&mut self) -> u8 {
        self.script.pop_front().unwrap_or(self.fallback)
    }

    fn start_conversion(&mut self) {
        self.conversions += 1;
    }
}

/// A healthy battery reading for the presets.
pub const FULL_BATTERY: u8 = 200;

/// A reading below the presets' low-voltage threshold.
pub const EMPTY_BATTERY: u8 = 100;

// ============================================================================
// Mock Delay
// ============================================================================

/// Delay that returns immediately and accumulates the requested time
pub struct MockDelay {
    elapsed_ns: u64,
}

impl MockDelay {
    pub fn new() -> Self {
        Self { elapsed_ns: 0 }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_ns += u64::from(us) * 1_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ns += u64::from(ms) * 1_000_000;
    }
}

// ============================================================================
// Mock MCU
// ============================================================================

struct RetainedCells {
    off_marker: u8,
    fast_presses: u8,
    power_downs: usize,
}

/// Retained RAM shared between clones so it survives simulated power cycles.
///
/// Starts decayed, so the first boot sees a long press.
#[derive(Clone)]
pub struct MockMcu {
    cells: Rc<RefCell<RetainedCells>>,
}

impl MockMcu {
    pub fn new() -> Self {
        Self {
            cells: Rc::new(RefCell::new(RetainedCells {
                off_marker: 0,
                fast_presses: 0,
                power_downs: 0,
            })),
        }
    }

    /// Simulates the light staying off long enough for RAM to decay.
    pub fn long_off(&self) {
        let mut cells = self.cells.borrow_mut();
        cells.off_marker = 0;
        cells.fast_presses = 0;
    }

    /// Simulates a brief power blip: RAM keeps its marker.
    pub fn short_off(&self) {
        self.cells.borrow_mut().off_marker = ARMED;
    }

    pub fn is_armed(&self) -> bool {
        self.cells.borrow().off_marker == ARMED
    }

    pub fn retained_fast_presses(&self) -> u8 {
        self.cells.borrow().fast_presses
    }

    pub fn power_downs(&self) -> usize {
        self.cells.borrow().power_downs
    }
}

impl RetainedMemory for MockMcu {
    fn off_marker(&self) -> u8 {
        self.cells.borrow().off_marker
    }

    fn set_off_marker(&mut self, value: u8) {
        self.cells.borrow_mut().off_marker = value;
    }

    fn fast_presses(&self) -> u8 {
        self.cells.borrow().fast_presses
    }

    fn set_fast_presses(&mut self, count: u8) {
        self.cells.borrow_mut().fast_presses = count;
    }
}

impl PowerControl for MockMcu {
    fn power_down(&mut self) {
        self.cells.borrow_mut().power_downs += 1;
    }
}

// ============================================================================
// Test Helper Functions
// ============================================================================

pub type TestController<'c> =
    ModeController<'c, MockEeprom, MockPwm, MockBattery, MockDelay, MockMcu>;

pub fn board(mcu: &MockMcu, battery: MockBattery) -> Board<MockPwm, MockBattery, MockDelay, MockMcu> {
    Board {
        pwm: MockPwm::new(),
        battery,
        delay: MockDelay::new(),
        mcu: mcu.clone(),
    }
}

/// Powers the light on with a healthy battery.
pub fn power_on<'c>(config: &'c DriverConfig, eeprom: &MockEeprom, mcu: &MockMcu) -> TestController<'c> {
    power_on_with(config, eeprom, mcu, MockBattery::steady(FULL_BATTERY))
}

pub fn power_on_with<'c>(
    config: &'c DriverConfig,
    eeprom: &MockEeprom,
    mcu: &MockMcu,
    battery: MockBattery,
) -> TestController<'c> {
    ModeController::boot(config, eeprom.clone(), board(mcu, battery)).unwrap()
}

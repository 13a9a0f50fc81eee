//! Low-voltage protection.
//!
//! [`BatteryMonitor`] debounces low readings and decides how far to step the
//! output down. Pure logic: the controller feeds it samples and applies the
//! result, so it is fully testable on the host.

use crate::types::RuntimeState;

/// Consecutive low samples needed before acting.
pub const LOW_SAMPLE_LIMIT: u8 = 8;

/// Trait for the battery voltage ADC.
///
/// Readings are 8-bit and proportional to battery voltage. Conversions run in
/// the background; the controller polls for completion and restarts them.
pub trait BatterySensor {
    /// Returns true when a finished conversion is waiting.
    fn sample_ready(&mut self) -> bool;

    /// Returns the last finished conversion.
    fn sample_value(&mut self) -> u8;

    /// Starts the next conversion.
    fn start_conversion(&mut self);

    /// Starts a conversion and blocks until it finishes.
    fn measure(&mut self) -> u8 {
        self.start_conversion();
        while !self.sample_ready() {
            core::hint::spin_loop();
        }
        self.sample_value()
    }
}

/// Trait for entering the deepest sleep state.
pub trait PowerControl {
    /// Powers down everything possible. On hardware this does not return;
    /// only an external reset (the switch) restarts the driver.
    fn power_down(&mut self);
}

/// Result of a debounced low-voltage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepDown {
    /// Continue at this lower level.
    Level(u8),

    /// Already at the floor: turn off and sleep.
    Shutdown,
}

/// Hysteresis filter over battery readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryMonitor {
    low_voltage: u8,
}

impl BatteryMonitor {
    /// Creates a monitor that treats readings below `low_voltage` as low.
    pub const fn new(low_voltage: u8) -> Self {
        Self { low_voltage }
    }

    /// Feeds one sample.
    ///
    /// After [`LOW_SAMPLE_LIMIT`] consecutive low samples the counter resets
    /// and the step-down is applied to `runtime.actual_level`:
    /// - above `ceiling` (a special mode was showing): half the ceiling
    /// - above 1: one level lower
    /// - otherwise: shutdown, level 0
    pub fn update(&self, runtime: &mut RuntimeState, sample: u8, ceiling: u8) -> Option<StepDown> {
        if sample < self.low_voltage {
            runtime.low_batt_counter = runtime.low_batt_counter.saturating_add(1);
        } else {
            runtime.low_batt_counter = 0;
        }

        if runtime.low_batt_counter < LOW_SAMPLE_LIMIT {
            return None;
        }
        runtime.low_batt_counter = 0;

        let step = if runtime.actual_level > ceiling {
            StepDown::Level((ceiling / 2).max(1))
        } else if runtime.actual_level > 1 {
            StepDown::Level(runtime.actual_level - 1)
        } else {
            StepDown::Shutdown
        };

        runtime.actual_level = match step {
            StepDown::Level(level) => level,
            StepDown::Shutdown => 0,
        };
        Some(step)
    }
}

/// Number of battery-check blinks for a reading: how many thresholds of the
/// table the reading exceeds.
pub fn battery_blinks(sample: u8, thresholds: &[u8]) -> u8 {
    thresholds
        .iter()
        .take_while(|&&threshold| sample > threshold)
        .count() as u8
}

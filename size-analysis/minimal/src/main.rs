#![no_std]
#![no_main]

use core::convert::Infallible;

use cortex_m_rt::entry;
use embedded_hal::delay::DelayNs;
use embedded_storage::{ReadStorage, Storage};
use flashlight_modes::{
    BatterySensor, Board, ModeController, PowerControl, PwmOutput, RetainedMemory, presets,
};
use panic_halt as _;

// ============================================================================
// Minimal Hardware
// ============================================================================

/// Zero-size PWM implementation for measuring library overhead
pub struct MinimalPwm;

impl PwmOutput for MinimalPwm {
    fn set_duty(&mut self, duty: u8) {
        core::hint::black_box(duty);
    }
}

/// Battery that always reads full
pub struct MinimalBattery;

impl BatterySensor for MinimalBattery {
    fn sample_ready(&mut self) -> bool {
        true
    }

    fn sample_value(&mut self) -> u8 {
        core::hint::black_box(200)
    }

    fn start_conversion(&mut self) {}
}

pub struct MinimalDelay;

impl DelayNs for MinimalDelay {
    fn delay_ns(&mut self, ns: u32) {
        core::hint::black_box(ns);
    }
}

/// Retained RAM that always reads as decayed
pub struct MinimalMcu;

impl RetainedMemory for MinimalMcu {
    fn off_marker(&self) -> u8 {
        core::hint::black_box(0)
    }

    fn set_off_marker(&mut self, value: u8) {
        core::hint::black_box(value);
    }

    fn fast_presses(&self) -> u8 {
        core::hint::black_box(0)
    }

    fn set_fast_presses(&mut self, count: u8) {
        core::hint::black_box(count);
    }
}

impl PowerControl for MinimalMcu {
    fn power_down(&mut self) {
        cortex_m::asm::wfi();
    }
}

/// Blank 64-byte EEPROM that discards writes
pub struct MinimalEeprom;

impl ReadStorage for MinimalEeprom {
    type Error = Infallible;

    fn read(&mut self, _offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        bytes.fill(0xFF);
        Ok(())
    }

    fn capacity(&self) -> usize {
        64
    }
}

impl Storage for MinimalEeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        core::hint::black_box((offset, bytes));
        Ok(())
    }
}

// ============================================================================
// Engine
// ============================================================================

// This function uses the library to prevent optimizer from removing code
#[inline(never)]
fn run_engine() {
    let board = Board {
        pwm: MinimalPwm,
        battery: MinimalBattery,
        delay: MinimalDelay,
        mcu: MinimalMcu,
    };

    if let Ok(mut controller) = ModeController::boot(&presets::FULL, MinimalEeprom, board) {
        let _ = controller.run();
    }
}

#[entry]
fn main() -> ! {
    run_engine();

    // Halt - this is a size analysis binary, not meant to run
    loop {
        cortex_m::asm::nop();
    }
}

#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`DriverConfig`**: Build-time description of a driver: ramp, mode groups, enabled special modes, battery and timing constants
//! - **`ModeCode`**: A decoded group entry, either a solid ramp level or a `SpecialMode`
//! - **`ModeStore`**: Wear-leveled persistent state over any `embedded_storage::Storage`
//! - **`RetainedMemory`**: Trait to implement for RAM that survives a brief power blip
//! - **`PwmOutput`**: Trait to implement for your PWM channel
//! - **`BatterySensor`**: Trait to implement for your battery ADC
//! - **`PowerControl`**: Trait to implement for entering deep sleep
//! - **`BatteryMonitor`**: Debounced low-voltage step-down
//! - **`ModeController`**: Runs the boot decision and the main loop
//!
//! Delays use `embedded_hal::delay::DelayNs`. One tick is `DriverConfig::tick_ms`
//! milliseconds; every wait in the engine is a whole number of ticks.

#[macro_use]
mod fmt;

pub mod types;
pub mod config;
pub mod groups;
pub mod store;
pub mod press;
pub mod output;
pub mod battery;
pub mod special;
pub mod controller;

pub use types::{ModeCode, PersistentState, PressKind, RuntimeState, SpecialMode, SPECIAL_CODE_BASE};
pub use config::{ConfigError, DriverConfig, GroupRow, presets};
pub use groups::{ActiveModes, count_modes};
pub use store::{ModeStore, StoreError};
pub use press::RetainedMemory;
pub use output::{LevelDriver, PwmOutput, Ticker};
pub use battery::{BatteryMonitor, BatterySensor, PowerControl, StepDown};
pub use controller::{Board, ControllerError, ControllerState, LoopOutcome, ModeController};

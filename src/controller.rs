//! Mode controller.
//!
//! Provides [`ModeController`], which decides the mode once per boot and then
//! runs the main loop: render the mode, handle the config gesture and group
//! selection, and step the output down when the battery runs low.

use crate::battery::{BatteryMonitor, BatterySensor, PowerControl, StepDown};
use crate::config::{ConfigError, DriverConfig};
use crate::groups::{ActiveModes, count_modes};
use crate::output::{LevelDriver, PwmOutput, Ticker, blink};
use crate::press::{self, RetainedMemory};
use crate::special::SpecialContext;
use crate::store::{ModeStore, StoreError};
use crate::types::{ModeCode, PersistentState, PressKind, RuntimeState, SpecialMode};
use embedded_hal::delay::DelayNs;
use embedded_storage::Storage;

/// Fast presses needed within one burst to enter config mode.
pub const CONFIG_PRESS_COUNT: u8 = 10;

/// Blinks shown while a config toggle waits to be committed.
const COMMIT_WINDOW_BLINKS: u8 = 32;

/// Ticks per commit window blink.
const COMMIT_WINDOW_SPEED: u16 = 500 / 4 / 32;

/// The hardware collaborators of a driver.
pub struct Board<O, B, D, M> {
    /// PWM channel driving the emitter.
    pub pwm: O,
    /// Battery voltage ADC.
    pub battery: B,
    /// Busy-wait delay provider.
    pub delay: D,
    /// Retained RAM and sleep control.
    pub mcu: M,
}

/// What the controller is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerState {
    /// Showing a solid mode from the active group.
    Normal,
    /// The next loop pass offers the config toggles.
    ConfigFastPress,
    /// Cycling through mode groups.
    GroupSelect,
    /// Running a special mode.
    Special(SpecialMode),
    /// Output reduced by the battery monitor.
    LowBatteryDegraded,
    /// Output off after the battery hit the floor.
    Shutdown,
}

/// Result of one main loop pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopOutcome {
    /// Keep looping.
    Continue,
    /// The driver powered down.
    Shutdown,
}

/// Errors that can occur during controller operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerError<E> {
    /// The driver configuration is inconsistent.
    Config(ConfigError),
    /// Persistent state could not be read or written.
    Store(StoreError<E>),
}

impl<E: core::fmt::Debug> core::fmt::Display for ControllerError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ControllerError::Config(err) => write!(f, "config error: {}", err),
            ControllerError::Store(err) => write!(f, "store error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for ControllerError<E> {}

impl<E> From<ConfigError> for ControllerError<E> {
    fn from(err: ConfigError) -> Self {
        ControllerError::Config(err)
    }
}

impl<E> From<StoreError<E>> for ControllerError<E> {
    fn from(err: StoreError<E>) -> Self {
        ControllerError::Store(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum ConfigOption {
    GroupSelectOnNextBoot,
    Memory,
}

impl ConfigOption {
    fn number(self) -> u8 {
        match self {
            ConfigOption::GroupSelectOnNextBoot => 1,
            ConfigOption::Memory => 2,
        }
    }
}

/// Drives a single-channel light through its modes.
///
/// Owns every collaborator for the lifetime of one power-on. Build it with
/// [`ModeController::boot`], then call [`step`](ModeController::step) in a
/// loop or hand control to [`run`](ModeController::run).
///
/// # Type Parameters
/// * `'c` - Lifetime of the driver configuration
/// * `S` - EEPROM implementation
/// * `O` - PWM output implementation
/// * `B` - Battery ADC implementation
/// * `D` - Delay implementation
/// * `M` - Retained RAM and sleep implementation
pub struct ModeController<'c, S, O: PwmOutput, B, D: DelayNs, M> {
    config: &'c DriverConfig,
    store: ModeStore<S>,
    output: LevelDriver<O>,
    battery: B,
    ticker: Ticker<D>,
    mcu: M,
    monitor: BatteryMonitor,
    modes: ActiveModes,
    persistent: PersistentState,
    runtime: RuntimeState,
    active: ModeCode,
    degraded: bool,
    shut_down: bool,
}

impl<'c, S, O, B, D, M> ModeController<'c, S, O, B, D, M>
where
    S: Storage,
    O: PwmOutput,
    B: BatterySensor,
    D: DelayNs,
    M: RetainedMemory + PowerControl,
{
    /// Runs the boot decision.
    ///
    /// Restores the saved state, classifies the press that powered the light
    /// on, advances or resets the mode index and saves it. The output stays
    /// off until the first [`step`](Self::step).
    ///
    /// # Errors
    /// * `Config` - `config` fails validation
    /// * `Store` - the EEPROM layout is invalid or the device failed
    pub fn boot(
        config: &'c DriverConfig,
        storage: S,
        board: Board<O, B, D, M>,
    ) -> Result<Self, ControllerError<S::Error>> {
        config.validate()?;

        let Board {
            pwm,
            mut battery,
            delay,
            mut mcu,
        } = board;

        let mut store = ModeStore::new(storage, config.eeprom_size)?;
        let mut persistent = store.restore(config.group_count())?;
        let modes = count_modes(config, persistent.mode_group);

        let press = press::classify(&mut mcu);
        let mut runtime = RuntimeState::default();

        if persistent.override_active {
            mcu.set_fast_presses(0);
        } else {
            runtime.fast_press_count = press::count_press(&mut mcu, press);
            match press {
                PressKind::Short => {
                    persistent.mode_index = modes.next_index(persistent.mode_index);
                }
                PressKind::Long if !persistent.memory_enabled => persistent.mode_index = 0,
                PressKind::Long => {}
            }
            if persistent.mode_index >= modes.solid_modes() {
                persistent.mode_index = 0;
            }
        }

        let active = match Self::pending_override(config, &persistent) {
            Some(mode) => ModeCode::Special(mode),
            None if persistent.override_active => {
                warn!("invalid pending mode {}, clearing override", persistent.mode_index);
                persistent.override_active = false;
                persistent.mode_index = 0;
                store.save_state(&persistent)?;
                Self::mode_at(&modes, 0)
            }
            None => Self::mode_at(&modes, persistent.mode_index),
        };
        store.save_mode(persistent.mode_index)?;

        info!(
            "boot: {:?} press, group {} mode {} -> {:?}",
            press, persistent.mode_group, persistent.mode_index, active
        );

        battery.start_conversion();

        Ok(Self {
            config,
            store,
            output: LevelDriver::new(pwm, config.ramp),
            battery,
            ticker: Ticker::new(delay, config.tick_ms),
            mcu,
            monitor: BatteryMonitor::new(config.low_voltage),
            modes,
            persistent,
            runtime: RuntimeState {
                actual_level: active.raw(),
                ..runtime
            },
            active,
            degraded: false,
            shut_down: false,
        })
    }

    /// Runs one main loop pass: dispatch the active mode, then poll the
    /// battery monitor.
    pub fn step(&mut self) -> Result<LoopOutcome, ControllerError<S::Error>> {
        if self.shut_down {
            return Ok(LoopOutcome::Shutdown);
        }

        if self.runtime.fast_press_count >= CONFIG_PRESS_COUNT {
            self.config_mode()?;
        } else {
            match self.active {
                ModeCode::Special(SpecialMode::GroupSelect) => self.group_select()?,
                ModeCode::Special(mode) => {
                    SpecialContext {
                        output: &mut self.output,
                        ticker: &mut self.ticker,
                        battery: &mut self.battery,
                        config: self.config,
                    }
                    .run(mode);
                }
                ModeCode::Solid(_) => {
                    self.output.set_level(self.runtime.actual_level);
                    self.ticker.ticks(u16::from(self.config.loop_ticks));
                }
            }
        }

        // Presses only count until the first pass completes.
        self.clear_fast_presses();

        Ok(self.poll_battery())
    }

    /// Loops until the battery monitor shuts the driver down.
    pub fn run(&mut self) -> Result<(), ControllerError<S::Error>> {
        loop {
            if self.step()? == LoopOutcome::Shutdown {
                return Ok(());
            }
        }
    }

    /// Returns the current controller state.
    pub fn state(&self) -> ControllerState {
        if self.shut_down {
            ControllerState::Shutdown
        } else if self.runtime.fast_press_count >= CONFIG_PRESS_COUNT {
            ControllerState::ConfigFastPress
        } else if self.degraded {
            ControllerState::LowBatteryDegraded
        } else {
            match self.active {
                ModeCode::Special(SpecialMode::GroupSelect) => ControllerState::GroupSelect,
                ModeCode::Special(mode) => ControllerState::Special(mode),
                ModeCode::Solid(_) => ControllerState::Normal,
            }
        }
    }

    /// The mode being shown.
    pub fn active_mode(&self) -> ModeCode {
        self.active
    }

    /// The modes of the active group.
    pub fn active_modes(&self) -> &ActiveModes {
        &self.modes
    }

    /// In-memory mirror of the persistent state.
    pub fn persistent(&self) -> &PersistentState {
        &self.persistent
    }

    /// Per-boot runtime state.
    pub fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }

    /// Returns a reference to the persistent state store.
    pub fn store(&self) -> &ModeStore<S> {
        &self.store
    }

    /// Returns a reference to the output driver.
    pub fn output(&self) -> &LevelDriver<O> {
        &self.output
    }

    /// Returns a reference to the battery sensor.
    pub fn battery(&self) -> &B {
        &self.battery
    }

    /// Returns a reference to the delay provider.
    pub fn delay(&self) -> &D {
        self.ticker.delay()
    }

    /// Returns a reference to the retained RAM and sleep control.
    pub fn mcu(&self) -> &M {
        &self.mcu
    }

    fn pending_override(config: &DriverConfig, persistent: &PersistentState) -> Option<SpecialMode> {
        if !persistent.override_active {
            return None;
        }
        match ModeCode::decode(persistent.mode_index, config.ramp_size()) {
            Some(ModeCode::Special(mode)) if config.has_special(mode) => Some(mode),
            _ => None,
        }
    }

    fn mode_at(modes: &ActiveModes, index: u8) -> ModeCode {
        // A validated group is never empty; level 1 only guards the fallback.
        modes.get(index).unwrap_or(ModeCode::Solid(1))
    }

    fn clear_fast_presses(&mut self) {
        self.runtime.fast_press_count = 0;
        self.mcu.set_fast_presses(0);
    }

    fn config_mode(&mut self) -> Result<(), ControllerError<S::Error>> {
        info!("config mode after {} fast presses", self.runtime.fast_press_count);

        // Let the user stop clicking.
        self.ticker.second();
        self.clear_fast_presses();

        if self.config.has_special(SpecialMode::GroupSelect) {
            self.persistent.mode_index = SpecialMode::GroupSelect.code();
            self.toggle(ConfigOption::GroupSelectOnNextBoot)?;
        }
        self.persistent.mode_index = 0;
        self.toggle(ConfigOption::Memory)?;

        self.active = Self::mode_at(&self.modes, 0);
        self.runtime.actual_level = self.active.raw();
        Ok(())
    }

    /// Offers one option: flip and save it, show the commit window, then
    /// flip it back and save again. Cutting power during the window keeps
    /// the flipped value.
    fn toggle(&mut self, option: ConfigOption) -> Result<(), ControllerError<S::Error>> {
        let speed = u16::from(self.config.blink_ticks / 4);
        blink(
            &mut self.output,
            &mut self.ticker,
            self.config.blink_level,
            option.number(),
            speed,
        );

        self.flip(option);
        self.store.save_state(&self.persistent)?;
        debug!("offering {:?} = {}", option, self.option_value(option));

        blink(
            &mut self.output,
            &mut self.ticker,
            self.config.blink_level,
            COMMIT_WINDOW_BLINKS,
            COMMIT_WINDOW_SPEED,
        );

        self.flip(option);
        self.store.save_state(&self.persistent)?;
        self.ticker.second();
        Ok(())
    }

    fn flip(&mut self, option: ConfigOption) {
        match option {
            ConfigOption::GroupSelectOnNextBoot => {
                self.persistent.override_active = !self.persistent.override_active;
            }
            ConfigOption::Memory => {
                self.persistent.memory_enabled = !self.persistent.memory_enabled;
            }
        }
    }

    fn option_value(&self, option: ConfigOption) -> bool {
        match option {
            ConfigOption::GroupSelectOnNextBoot => self.persistent.override_active,
            ConfigOption::Memory => self.persistent.memory_enabled,
        }
    }

    /// One pass over every group. Each group is saved as it is shown, so the
    /// one on display when power is cut becomes the active group.
    fn group_select(&mut self) -> Result<(), ControllerError<S::Error>> {
        self.persistent.mode_index = 0;
        self.persistent.override_active = false;

        let speed = u16::from(self.config.blink_ticks / 4);
        for group in 0..self.config.group_count() {
            self.persistent.mode_group = group;
            self.store.save_state(&self.persistent)?;
            debug!("group select: offering group {}", group);

            blink(
                &mut self.output,
                &mut self.ticker,
                self.config.blink_level,
                group + 1,
                speed,
            );
            self.ticker.second();
            self.ticker.second();
        }
        self.ticker.second();
        Ok(())
    }

    fn poll_battery(&mut self) -> LoopOutcome {
        if !self.battery.sample_ready() {
            return LoopOutcome::Continue;
        }

        let sample = self.battery.sample_value();
        let ceiling = self.config.ramp_size();
        match self.monitor.update(&mut self.runtime, sample, ceiling) {
            None => {}
            Some(StepDown::Level(level)) => {
                info!("low battery ({}), stepping down to {}", sample, level);
                self.degraded = true;
                self.active = ModeCode::Solid(level);
                self.output.set_level(level);
                // Hold before the next step so one depletion event acts once.
                self.ticker.second();
            }
            Some(StepDown::Shutdown) => {
                warn!("battery empty ({}), shutting down", sample);
                self.output.set_level(0);
                self.shut_down = true;
                self.mcu.power_down();
                return LoopOutcome::Shutdown;
            }
        }

        self.battery.start_conversion();
        LoopOutcome::Continue
    }
}

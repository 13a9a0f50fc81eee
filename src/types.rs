//! Core types shared by the store, the mode table and the controller.

/// Raw codes at or above this value are reserved for special modes.
pub const SPECIAL_CODE_BASE: u8 = 240;

/// A behavior dispatched by name instead of a ramp lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpecialMode {
    /// Blink out the approximate battery charge.
    BatteryCheck,

    /// Cycle through the mode groups so the user can pick one.
    GroupSelect,

    /// 10 Hz tactical strobe.
    Strobe,

    /// Two-level stutter beacon.
    BikingStrobe,

    /// Ramp up and down through every level.
    RampTest,

    /// Two-speed police-style strobe.
    PoliceStrobe,

    /// Morse SOS.
    Sos,
}

impl SpecialMode {
    /// Every special mode the engine knows how to run.
    pub const ALL: [SpecialMode; 7] = [
        SpecialMode::BatteryCheck,
        SpecialMode::GroupSelect,
        SpecialMode::Strobe,
        SpecialMode::BikingStrobe,
        SpecialMode::RampTest,
        SpecialMode::PoliceStrobe,
        SpecialMode::Sos,
    ];

    /// Returns the raw table code for this mode.
    pub const fn code(self) -> u8 {
        match self {
            SpecialMode::BatteryCheck => 254,
            SpecialMode::GroupSelect => 253,
            SpecialMode::Strobe => 251,
            SpecialMode::BikingStrobe => 250,
            SpecialMode::RampTest => 249,
            SpecialMode::PoliceStrobe => 248,
            SpecialMode::Sos => 246,
        }
    }

    /// Looks up the special mode for a raw table code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }
}

/// A decoded entry of a mode group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeCode {
    /// Steady output at a ramp level (1-based).
    Solid(u8),

    /// A named special behavior.
    Special(SpecialMode),
}

impl ModeCode {
    /// Decodes a raw table code against a ramp of `ramp_size` levels.
    ///
    /// Returns `None` for zero (the group terminator) and for codes that are
    /// neither a ramp level nor a known special code.
    pub fn decode(raw: u8, ramp_size: u8) -> Option<Self> {
        match raw {
            0 => None,
            level if level <= ramp_size => Some(ModeCode::Solid(level)),
            code if code >= SPECIAL_CODE_BASE => SpecialMode::from_code(code).map(ModeCode::Special),
            _ => None,
        }
    }

    /// Returns the raw table code.
    pub const fn raw(self) -> u8 {
        match self {
            ModeCode::Solid(level) => level,
            ModeCode::Special(mode) => mode.code(),
        }
    }
}

/// How long the switch was held off before this boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PressKind {
    /// Brief power blip: advance to the next mode.
    Short,

    /// Power was off long enough for retained memory to decay.
    Long,
}

/// The durable record kept in EEPROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PersistentState {
    /// Position within the active group, or a pending special code while
    /// `override_active` is set.
    pub mode_index: u8,

    /// Active row of the mode group table.
    pub mode_group: u8,

    /// Resume the last mode after a long press instead of the first one.
    pub memory_enabled: bool,

    /// Boot into the pending special mode instead of normal lighting.
    pub override_active: bool,
}

/// Per-boot state that does not survive a full power-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RuntimeState {
    /// Short presses counted across brief power blips (0..32).
    pub fast_press_count: u8,

    /// Output level after battery derating. Holds the raw special code while
    /// a special mode is active.
    pub actual_level: u8,

    /// Consecutive low-voltage samples seen by the battery monitor.
    pub low_batt_counter: u8,
}

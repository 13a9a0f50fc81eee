//! Driver configuration and the stock presets.
//!
//! A [`DriverConfig`] captures every build-time choice of a driver: the
//! brightness ramp, the mode group table, which special modes exist, the
//! battery calibration, the blink timing and the EEPROM size. One engine runs
//! any of them; [`presets`] holds the configurations shipped with the crate.

use crate::types::{ModeCode, SPECIAL_CODE_BASE, SpecialMode};

/// Number of entries in every mode group row.
pub const GROUP_WIDTH: usize = 8;

/// One row of the mode group table. Unused trailing entries are zero.
pub type GroupRow = [u8; GROUP_WIDTH];

/// Ticks in the standard one-second wait.
pub const TICKS_PER_SECOND: u16 = 250;

/// Complete description of a driver build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// PWM duty for levels `1..=ramp.len()`.
    pub ramp: &'static [u8],

    /// Mode group table, selected by `PersistentState::mode_group`.
    pub groups: &'static [GroupRow],

    /// Special modes this build supports. Groups may only use these.
    pub special_modes: &'static [SpecialMode],

    /// Battery readings below this count as low.
    pub low_voltage: u8,

    /// Ascending battery-check thresholds, terminated by 255. The number of
    /// thresholds a reading exceeds is the number of blinks shown.
    pub battcheck: &'static [u8],

    /// Ramp level used for feedback blinks.
    pub blink_level: u8,

    /// Length of a normal-speed blink, in ticks.
    pub blink_ticks: u8,

    /// Hold time of one main-loop pass in a solid mode, in ticks.
    pub loop_ticks: u8,

    /// Milliseconds per tick.
    pub tick_ms: u32,

    /// Size of the EEPROM region in bytes.
    pub eeprom_size: u32,
}

/// Configuration validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Ramp is empty or reaches into the special code range.
    InvalidRamp,

    /// No groups, or more than fit in a byte.
    InvalidGroupCount,

    /// A group has no modes at all.
    EmptyGroup { group: u8 },

    /// A group entry is neither a ramp level nor a known special code.
    UnknownCode { group: u8, code: u8 },

    /// A group uses a special mode this build does not enable.
    SpecialModeDisabled { group: u8, mode: SpecialMode },

    /// EEPROM size is not a power of two in `8..=512`.
    InvalidEepromSize(u32),

    /// Blink level is not a ramp level.
    InvalidBlinkLevel(u8),

    /// Battery-check thresholds are unsorted or not terminated by 255.
    InvalidBattcheckTable,

    /// Tick length is zero.
    ZeroTick,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::InvalidRamp => {
                write!(f, "ramp must have 1 to {} levels", SPECIAL_CODE_BASE - 1)
            }
            ConfigError::InvalidGroupCount => {
                write!(f, "mode group table must have 1 to 255 groups")
            }
            ConfigError::EmptyGroup { group } => {
                write!(f, "mode group {} has no modes", group)
            }
            ConfigError::UnknownCode { group, code } => {
                write!(f, "mode group {} contains unknown code {}", group, code)
            }
            ConfigError::SpecialModeDisabled { group, mode } => {
                write!(f, "mode group {} uses disabled special mode {:?}", group, mode)
            }
            ConfigError::InvalidEepromSize(size) => {
                write!(f, "EEPROM size {} is not a power of two between 8 and 512", size)
            }
            ConfigError::InvalidBlinkLevel(level) => {
                write!(f, "blink level {} is outside the ramp", level)
            }
            ConfigError::InvalidBattcheckTable => {
                write!(f, "battery-check thresholds must ascend and end with 255")
            }
            ConfigError::ZeroTick => write!(f, "tick length must be non-zero"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

impl DriverConfig {
    /// Number of ramp levels, i.e. the highest solid level.
    pub fn ramp_size(&self) -> u8 {
        self.ramp.len() as u8
    }

    /// Number of mode groups.
    pub fn group_count(&self) -> u8 {
        self.groups.len() as u8
    }

    /// Returns true if the build supports `mode`.
    pub fn has_special(&self, mode: SpecialMode) -> bool {
        self.special_modes.contains(&mode)
    }

    /// Checks the configuration for internal consistency.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ramp.is_empty() || self.ramp.len() >= SPECIAL_CODE_BASE as usize {
            return Err(ConfigError::InvalidRamp);
        }

        if self.groups.is_empty() || self.groups.len() > u8::MAX as usize {
            return Err(ConfigError::InvalidGroupCount);
        }

        let ramp_size = self.ramp_size();
        for (group, row) in self.groups.iter().enumerate() {
            let group = group as u8;
            if row[0] == 0 {
                return Err(ConfigError::EmptyGroup { group });
            }

            for &code in row.iter().take_while(|&&code| code != 0) {
                match ModeCode::decode(code, ramp_size) {
                    None => return Err(ConfigError::UnknownCode { group, code }),
                    Some(ModeCode::Special(mode)) if !self.has_special(mode) => {
                        return Err(ConfigError::SpecialModeDisabled { group, mode });
                    }
                    Some(_) => {}
                }
            }
        }

        if !self.eeprom_size.is_power_of_two() || !(8..=512).contains(&self.eeprom_size) {
            return Err(ConfigError::InvalidEepromSize(self.eeprom_size));
        }

        if self.blink_level == 0 || self.blink_level > ramp_size {
            return Err(ConfigError::InvalidBlinkLevel(self.blink_level));
        }

        let sorted = self.battcheck.windows(2).all(|pair| pair[0] < pair[1]);
        if !sorted || self.battcheck.last() != Some(&u8::MAX) {
            return Err(ConfigError::InvalidBattcheckTable);
        }

        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }

        Ok(())
    }
}

/// Stock driver configurations.
///
/// All three target the same 7-step single-channel board with a 64-byte
/// EEPROM. Battery values assume an 8-bit reading of a 1.1 V reference
/// through the usual 22k/4.7k divider; calibrate them per board.
pub mod presets {
    use super::{DriverConfig, GroupRow};
    use crate::types::SpecialMode;

    const RAMP: &[u8] = &[1, 7, 32, 63, 107, 127, 255];

    /// Battery reading of roughly 3.0 V under load.
    const LOW_VOLTAGE: u8 = 130;

    /// 0%, 25%, 50%, 75% and 100% charge, then the ceiling.
    const BATTCHECK_4BARS: &[u8] = &[132, 154, 167, 176, 185, 255];

    const POLICE: u8 = SpecialMode::PoliceStrobe.code();
    const BIKING: u8 = SpecialMode::BikingStrobe.code();
    const BATTCHECK: u8 = SpecialMode::BatteryCheck.code();
    const SOS: u8 = SpecialMode::Sos.code();

    const FULL_GROUPS: &[GroupRow] = &[
        [1, 2, 3, 5, 7, POLICE, BIKING, BATTCHECK],
        [1, 2, 3, 5, 7, 0, 0, 0],
        [7, 5, 3, 2, 1, 0, 0, 0],
        [2, 4, 7, POLICE, BIKING, BATTCHECK, SOS, 0],
        [2, 4, 7, 0, 0, 0, 0, 0],
        [7, 4, 2, 0, 0, 0, 0, 0],
        [1, 2, 3, 6, POLICE, BIKING, BATTCHECK, SOS],
        [1, 2, 3, 6, 0, 0, 0, 0],
        [6, 3, 2, 1, 0, 0, 0, 0],
        [2, 3, 5, 7, 0, 0, 0, 0],
        [7, 4, POLICE, 0, 0, 0, 0, 0],
        [7, 0, 0, 0, 0, 0, 0, 0],
    ];

    const TWO_GROUPS: &[GroupRow] = &[
        [1, 2, 3, 4, 5, 6, 7, 0],
        [1, 2, 3, 5, 7, 0, 0, 0],
    ];

    const ONE_GROUP: &[GroupRow] = &[[1, 2, 3, 4, 5, 6, 7, 0]];

    const BASE: DriverConfig = DriverConfig {
        ramp: RAMP,
        groups: ONE_GROUP,
        special_modes: &[SpecialMode::GroupSelect],
        low_voltage: LOW_VOLTAGE,
        battcheck: BATTCHECK_4BARS,
        blink_level: 3,
        blink_ticks: (750 / 4) as u8,
        loop_ticks: 125,
        tick_ms: 4,
        eeprom_size: 64,
    };

    /// Twelve groups with strobes, beacon, battery check and SOS.
    pub const FULL: DriverConfig = DriverConfig {
        groups: FULL_GROUPS,
        special_modes: &[
            SpecialMode::GroupSelect,
            SpecialMode::BatteryCheck,
            SpecialMode::BikingStrobe,
            SpecialMode::PoliceStrobe,
            SpecialMode::Sos,
        ],
        ..BASE
    };

    /// Two groups of plain solid levels.
    pub const TWO_GROUP: DriverConfig = DriverConfig {
        groups: TWO_GROUPS,
        ..BASE
    };

    /// A single group of all seven levels.
    pub const SINGLE_GROUP: DriverConfig = BASE;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert_eq!(presets::FULL.validate(), Ok(()));
        assert_eq!(presets::TWO_GROUP.validate(), Ok(()));
        assert_eq!(presets::SINGLE_GROUP.validate(), Ok(()));
    }

    #[test]
    fn rejects_unknown_code() {
        const GROUPS: &[GroupRow] = &[[1, 2, 100, 0, 0, 0, 0, 0]];
        let config = DriverConfig {
            groups: GROUPS,
            ..presets::SINGLE_GROUP
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownCode { group: 0, code: 100 })
        );
    }

    #[test]
    fn rejects_disabled_special_mode() {
        const GROUPS: &[GroupRow] = &[[1, 2, 251, 0, 0, 0, 0, 0]];
        let config = DriverConfig {
            groups: GROUPS,
            ..presets::SINGLE_GROUP
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SpecialModeDisabled {
                group: 0,
                mode: SpecialMode::Strobe
            })
        );
    }

    #[test]
    fn rejects_empty_group() {
        const GROUPS: &[GroupRow] = &[[1, 0, 0, 0, 0, 0, 0, 0], [0; 8]];
        let config = DriverConfig {
            groups: GROUPS,
            ..presets::SINGLE_GROUP
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyGroup { group: 1 }));
    }

    #[test]
    fn rejects_bad_eeprom_size() {
        let config = DriverConfig {
            eeprom_size: 48,
            ..presets::SINGLE_GROUP
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidEepromSize(48)));

        let config = DriverConfig {
            eeprom_size: 4,
            ..presets::SINGLE_GROUP
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidEepromSize(4)));
    }

    #[test]
    fn rejects_unterminated_battcheck_table() {
        let config = DriverConfig {
            battcheck: &[100, 120],
            ..presets::SINGLE_GROUP
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidBattcheckTable));

        let config = DriverConfig {
            battcheck: &[120, 100, 255],
            ..presets::SINGLE_GROUP
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidBattcheckTable));
    }

    #[test]
    fn rejects_blink_level_outside_ramp() {
        let config = DriverConfig {
            blink_level: 8,
            ..presets::SINGLE_GROUP
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidBlinkLevel(8)));
    }
}

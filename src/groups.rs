//! Mode group table lookups.

use crate::config::{DriverConfig, GROUP_WIDTH};
use crate::types::ModeCode;
use heapless::Vec;

/// The modes of the active group, copied out of the table at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveModes {
    modes: Vec<ModeCode, GROUP_WIDTH>,
}

impl ActiveModes {
    /// Number of modes in the group.
    pub fn solid_modes(&self) -> u8 {
        self.modes.len() as u8
    }

    /// Returns the mode at `index`, if the group has one there.
    pub fn get(&self, index: u8) -> Option<ModeCode> {
        self.modes.get(index as usize).copied()
    }

    /// Returns the modes as a slice.
    pub fn as_slice(&self) -> &[ModeCode] {
        &self.modes
    }

    /// Index of the mode after `index`, wrapping to the first one.
    pub fn next_index(&self, index: u8) -> u8 {
        let next = index.wrapping_add(1);
        if next >= self.solid_modes() { 0 } else { next }
    }
}

/// Copies the modes of `group` out of the table.
///
/// Stops at the first zero entry or after [`GROUP_WIDTH`] entries. Entries
/// that do not decode against the ramp also end the group; a validated
/// configuration has none. A group index past the end of the table yields an
/// empty set.
pub fn count_modes(config: &DriverConfig, group: u8) -> ActiveModes {
    let ramp_size = config.ramp_size();

    // A row is exactly GROUP_WIDTH long, so it always fits the buffer.
    let modes = match config.groups.get(group as usize) {
        Some(row) => row
            .iter()
            .map_while(|&raw| ModeCode::decode(raw, ramp_size))
            .collect(),
        None => Vec::new(),
    };

    ActiveModes { modes }
}

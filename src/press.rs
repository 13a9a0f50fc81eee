//! Off-time press detection.
//!
//! The driver has no clock that runs while the light is off. Instead it keeps
//! a marker byte in RAM that is not cleared on reset. After a brief power
//! blip the RAM still holds the marker; after a longer off period the cell
//! decays to zero. How long that takes is a property of the board (supply
//! capacitance, RAM retention), not of this code.
//!
//! The same retained RAM carries the fast-press counter across blips.

use crate::types::PressKind;

/// Value written to the off-time cell once it has been read.
pub const ARMED: u8 = 0x5A;

/// Counter wraps at this value.
pub const FAST_PRESS_MASK: u8 = 0x1F;

/// RAM that survives a brief power loss but decays to zero after a long one.
///
/// Implementations on real hardware back these with variables in a
/// non-initialised linker section. Test harnesses inject both outcomes
/// directly.
pub trait RetainedMemory {
    /// Reads the off-time cell. Zero means the cell decayed.
    fn off_marker(&self) -> u8;

    /// Writes the off-time cell.
    fn set_off_marker(&mut self, value: u8);

    /// Reads the retained fast-press counter.
    fn fast_presses(&self) -> u8;

    /// Writes the retained fast-press counter.
    fn set_fast_presses(&mut self, count: u8);
}

/// Classifies the press that led to this boot and re-arms the cell.
///
/// Reports each boot exactly once: the cell is re-armed unconditionally, so
/// a second call in the same boot always sees a short press.
pub fn classify<R: RetainedMemory>(memory: &mut R) -> PressKind {
    let kind = if memory.off_marker() == 0 {
        PressKind::Long
    } else {
        PressKind::Short
    };
    memory.set_off_marker(ARMED);
    kind
}

/// Updates the fast-press counter for a boot of the given kind and returns
/// the new count.
pub fn count_press<R: RetainedMemory>(memory: &mut R, kind: PressKind) -> u8 {
    let count = match kind {
        PressKind::Short => memory.fast_presses().wrapping_add(1) & FAST_PRESS_MASK,
        PressKind::Long => 0,
    };
    memory.set_fast_presses(count);
    count
}

//! Wear-leveled persistent state in a small EEPROM.
//!
//! The lower half of the region is a ring of cells holding the mode index.
//! Exactly one cell is live at a time; every other cell holds [`SENTINEL`].
//! Each save moves the live value one cell forward, so every cell takes an
//! equal share of the writes. The top three bytes hold the mode group, the
//! memory flag and the override flag; those change rarely and are written in
//! place.
//!
//! ```text
//! 0            size/2                     size-3 size-2 size-1
//! | ring cells |     reserved        ...  | ovr  | mem  | group |
//! ```

use crate::types::PersistentState;
use embedded_storage::Storage;

/// Value of an empty ring cell.
pub const SENTINEL: u8 = 0xFF;

/// Errors from the persistent state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError<E> {
    /// The storage driver failed.
    Storage(E),

    /// Region size is not a power of two of at least 8 bytes, or exceeds the
    /// device capacity.
    InvalidLayout { size: u32, capacity: u32 },

    /// The value collides with the empty-cell sentinel.
    ReservedValue,
}

impl<E: core::fmt::Debug> core::fmt::Display for StoreError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreError::Storage(err) => write!(f, "storage error: {:?}", err),
            StoreError::InvalidLayout { size, capacity } => {
                write!(
                    f,
                    "invalid store layout: {} bytes on a device of {} bytes",
                    size, capacity
                )
            }
            StoreError::ReservedValue => {
                write!(f, "0x{:02X} is reserved for empty cells", SENTINEL)
            }
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for StoreError<E> {}

/// Persistent state store over a byte-addressed storage device.
pub struct ModeStore<S> {
    storage: S,
    size: u32,
    cursor: u32,
}

impl<S: Storage> ModeStore<S> {
    /// Creates a store using the first `size` bytes of `storage`.
    ///
    /// # Errors
    /// `InvalidLayout` if `size` is not a power of two of at least 8 or is
    /// larger than the device.
    pub fn new(storage: S, size: u32) -> Result<Self, StoreError<S::Error>> {
        let capacity = storage.capacity() as u32;
        if !size.is_power_of_two() || size < 8 || size > capacity {
            return Err(StoreError::InvalidLayout { size, capacity });
        }

        Ok(Self {
            storage,
            size,
            cursor: size / 2 - 1,
        })
    }

    /// Number of cells in the wear-leveling ring.
    pub fn ring_len(&self) -> u32 {
        self.size / 2
    }

    /// Position of the live cell.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Returns a reference to the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Consumes the store and returns the underlying storage.
    pub fn release(self) -> S {
        self.storage
    }

    /// Loads the saved state.
    ///
    /// Blank memory, or a mode group at or beyond `group_count`, resets to
    /// defaults and saves them. Extra live cells left by an interrupted save
    /// are erased so only the first one survives.
    pub fn restore(&mut self, group_count: u8) -> Result<PersistentState, StoreError<S::Error>> {
        let mut live = None;
        for pos in 0..self.ring_len() {
            let value = self.read_byte(pos)?;
            if value == SENTINEL {
                continue;
            }
            match live {
                None => live = Some((pos, value)),
                Some(_) => {
                    warn!("erasing stray live cell {}", pos);
                    self.write_byte(pos, SENTINEL)?;
                }
            }
        }

        let Some((pos, mode_index)) = live else {
            info!("blank EEPROM, writing defaults");
            return self.reset();
        };
        self.cursor = pos;

        let state = PersistentState {
            mode_index,
            mode_group: self.read_byte(self.group_offset())?,
            memory_enabled: self.read_byte(self.memory_offset())? != 0,
            override_active: self.read_byte(self.override_offset())? != 0,
        };

        if state.mode_group >= group_count {
            warn!("mode group {} out of range, resetting", state.mode_group);
            return self.reset();
        }

        debug!("restored {:?} from cell {}", state, pos);
        Ok(state)
    }

    /// Moves the live cell forward and stores `index` in it.
    ///
    /// The new cell is written before the old one is erased, so a power cut
    /// between the two leaves two live cells rather than none.
    pub fn save_mode(&mut self, index: u8) -> Result<(), StoreError<S::Error>> {
        if index == SENTINEL {
            return Err(StoreError::ReservedValue);
        }

        let old = self.cursor;
        let new = (old + 1) & (self.ring_len() - 1);
        self.write_byte(new, index)?;
        self.write_byte(old, SENTINEL)?;
        self.cursor = new;
        trace!("mode {} saved to cell {}", index, new);
        Ok(())
    }

    /// Saves the mode index and all configuration bytes.
    pub fn save_state(&mut self, state: &PersistentState) -> Result<(), StoreError<S::Error>> {
        self.save_mode(state.mode_index)?;
        self.write_byte(self.group_offset(), state.mode_group)?;
        self.write_byte(self.memory_offset(), u8::from(state.memory_enabled))?;
        self.write_byte(self.override_offset(), u8::from(state.override_active))?;
        Ok(())
    }

    fn reset(&mut self) -> Result<PersistentState, StoreError<S::Error>> {
        let state = PersistentState::default();
        self.save_state(&state)?;
        Ok(state)
    }

    fn group_offset(&self) -> u32 {
        self.size - 1
    }

    fn memory_offset(&self) -> u32 {
        self.size - 2
    }

    fn override_offset(&self) -> u32 {
        self.size - 3
    }

    fn read_byte(&mut self, offset: u32) -> Result<u8, StoreError<S::Error>> {
        let mut byte = [0u8; 1];
        self.storage
            .read(offset, &mut byte)
            .map_err(StoreError::Storage)?;
        Ok(byte[0])
    }

    fn write_byte(&mut self, offset: u32, value: u8) -> Result<(), StoreError<S::Error>> {
        self.storage
            .write(offset, &[value])
            .map_err(StoreError::Storage)
    }
}

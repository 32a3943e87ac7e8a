//!
//! The HashTable module contains the open-addressed table that maps a cleaned name to the
//! local index of its record.  The table only stores indices; the name of a candidate is always
//! read back through the records, so the caller supplies the comparison.
//!

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use super::key::TableId;
use super::name_cleaner::fold_byte;

/// Rotation applied per character by the primary hash
const PRIMARY_ROTATE : u32 = 13;

/// Rotation applied per character by the probe-step hash
const STEP_ROTATE : u32 = 21;

/// Smallest table we'll ever build
pub const MIN_HASH_BITS : u32 = 4;

/// Computes the hash of `text`, folded down to `n_bits` bits.
///
/// The step variant uses a different rotation and is always odd, so that stepping through a
/// power-of-two table visits every slot.
pub fn hash_text(text : &str, n_bits : u32, case_sensitive : bool, step : bool) -> u32 {
    let rotate = if step { STEP_ROTATE } else { PRIMARY_ROTATE };

    let mut x : u32 = 0;
    for b in text.bytes() {
        x = (fold_byte(b, case_sensitive) as u32) ^ x.rotate_left(rotate);
    }

    //XOR-fold the high bits into the low n_bits
    let mut j = x;
    let mut i = n_bits;
    while i < 32 {
        j ^= x >> i;
        i += n_bits;
    }
    j &= (1u32 << n_bits) - 1;

    if step {
        j |= 1;
    }
    j
}

/// A 64-bit digest of the folded name, tying a [ProbeHint] to the name that produced it
fn fingerprint(text : &str, case_sensitive : bool) -> u64 {
    let mut hasher = DefaultHasher::new();
    for b in text.bytes() {
        hasher.write_u8(fold_byte(b, case_sensitive));
    }
    hasher.finish()
}

/// Returns the number of bits of the smallest table whose size exceeds `rate * count`
pub fn bits_for_count(count : usize, rate : f64) -> u32 {
    let needed = (count as f64 * rate).floor() as usize;
    let mut bits = MIN_HASH_BITS;
    while (1usize << bits) <= needed {
        bits += 1;
    }
    bits
}

/// The outcome of probing for a name
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Probe {
    /// The name is held by the record at `index`, referenced from `slot`
    Found { slot : usize, index : u32 },
    /// The name is absent and `slot` is where it would be inserted
    Vacant { slot : usize, hint : ProbeHint },
}

/// Remembers the empty slot where a failed probe ended, so an immediately following insert of
/// the same name can skip the probe.
///
/// A hint is only honored while the table it came from is unchanged since the probe, and only
/// for a name with the same probe sequence.  It belongs to the [Lexicon](crate::Lexicon) that
/// returned it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProbeHint {
    pub(crate) table : TableId,
    pub(crate) slot : usize,
    pub(crate) generation : u64,
    pub(crate) primary : u32,
    pub(crate) step : Option<u32>,
    pub(crate) fingerprint : u64,
}

/// The probe walked the whole table without finding the name or an empty slot
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HashTableFull;

/// An open-addressed hash table of local record indices.  A slot value of 0 means empty,
/// which works because record 0 has an empty name and is never hashed.
#[derive(Clone, Debug)]
pub struct LexHashTable {
    table : TableId,
    bits : u32,
    slots : Vec<u32>,
    occupied : usize,
    generation : u64,
}

impl LexHashTable {

    /// Creates an empty table.  `generation` is where the table's generation count starts; the
    /// owner hands each table instance its own range so a hint can't outlive a table that was
    /// cleared and read back
    pub fn new(table : TableId, bits : u32, generation : u64) -> Self {
        let bits = bits.max(MIN_HASH_BITS);
        Self {
            table,
            bits,
            slots : vec![0; 1 << bits],
            occupied : 0,
            generation,
        }
    }

    /// Rebuilds a table from persisted slots.  Returns `None` if the slot count is not a power of two
    pub fn from_slots(table : TableId, slots : Vec<u32>, generation : u64) -> Option<Self> {
        if slots.len() < (1 << MIN_HASH_BITS) || !slots.len().is_power_of_two() {
            return None;
        }
        let bits = slots.len().trailing_zeros();
        let occupied = slots.iter().filter(|&&s| s != 0).count();
        Some(Self {
            table,
            bits,
            slots,
            occupied,
            generation,
        })
    }

    pub fn slots(&self) -> &[u32] {
        &self.slots
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Number of non-empty slots, including stale ones left behind by renames
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Bumped whenever the table changes.  Any [ProbeHint] from an older generation is void
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` if the table must grow before another entry is inserted
    pub fn needs_growth(&self, record_count : usize, rate : f64) -> bool {
        let load = record_count.max(self.occupied + 1);
        load as f64 * rate > self.slots.len() as f64
    }

    /// Walks the probe sequence for `text`.  `matches` is asked whether the record at a
    /// candidate index holds `text`.
    pub fn probe<F : FnMut(u32) -> bool>(&self, text : &str, case_sensitive : bool, mut matches : F) -> Result<Probe, HashTableFull> {

        let size_mask = self.slots.len() - 1;
        let primary = hash_text(text, self.bits, case_sensitive, false);
        let mut step = None;
        let mut slot = primary as usize;

        for _ in 0..self.slots.len() {
            let index = self.slots[slot];
            if index == 0 {
                return Ok(Probe::Vacant {
                    slot,
                    hint : ProbeHint {
                        table : self.table,
                        slot,
                        generation : self.generation,
                        primary,
                        step,
                        fingerprint : fingerprint(text, case_sensitive),
                    }
                });
            }
            if matches(index) {
                return Ok(Probe::Found { slot, index });
            }

            //The step hash is only computed once we have a collision
            let delta = *step.get_or_insert_with(|| hash_text(text, self.bits, case_sensitive, true));
            slot = (slot + delta as usize) & size_mask;
        }

        Err(HashTableFull)
    }

    /// Returns `true` if `hint` can stand in for probing `text` right now
    pub fn hint_is_valid(&self, hint : &ProbeHint, text : &str, case_sensitive : bool) -> bool {
        if hint.table != self.table || hint.generation != self.generation || hint.slot >= self.slots.len() {
            return false;
        }
        if self.slots[hint.slot] != 0 || fingerprint(text, case_sensitive) != hint.fingerprint {
            return false;
        }
        if hash_text(text, self.bits, case_sensitive, false) != hint.primary {
            return false;
        }
        match hint.step {
            Some(step) => hash_text(text, self.bits, case_sensitive, true) == step,
            None => hint.slot == hint.primary as usize,
        }
    }

    /// Stores `index` in an empty `slot`, as found by [probe](Self::probe)
    pub fn fill(&mut self, slot : usize, index : u32) {
        debug_assert_eq!(self.slots[slot], 0);
        debug_assert!(index != 0);
        self.slots[slot] = index;
        self.occupied += 1;
        self.generation += 1;
    }

    /// Drops every entry and resizes the table to `bits`.  The caller re-inserts the live records.
    pub fn reset(&mut self, bits : u32) {
        let bits = bits.max(MIN_HASH_BITS);
        self.bits = bits;
        self.slots = vec![0; 1 << bits];
        self.occupied = 0;
        self.generation += 1;
    }
}

//!
//! The Table module contains [LexTable], everything the lexicon holds for one class: the
//! vocabulary, the record array, the hash table, the overflow arena and, for classes that
//! keep them, the per-record timestamps.
//!

use tracing::{debug, warn};

use super::database::{BlockName, BlockStore};
use super::error::LexError;
use super::hash_table::{bits_for_count, HashTableFull, LexHashTable, Probe, ProbeHint};
use super::key::{Key, TableId};
use super::name_cleaner::names_equal;
use super::overflow::{CacheHandle, ExtendedState, OverflowArena};
use super::perf_counters::PerfCounters;
use super::records::{DiskAddr, LexRecord, LexStatus, PersistedRecord, RecordPayload, Timestamps};
use super::table_config::LexConfig;
use super::vocabulary::Vocabulary;
use crate::Coder;

bitflags::bitflags! {
    /// Which parts of a table differ from their persisted form
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        const VOCABULARY = 0x01;
        const RECORDS = 0x02;
        const HASH = 0x04;
        const TIMESTAMPS = 0x08;
    }
}

/// The in-memory state of one class
pub struct LexTable {
    id : TableId,
    vocabulary : Vocabulary,
    records : Vec<LexRecord>,
    hash : LexHashTable,
    overflow : OverflowArena,
    timestamps : Option<Vec<Timestamps>>,
    dirty : DirtyFlags,
    session_start_size : usize,
}

fn corrupt(table : TableId, detail : &str) -> LexError {
    LexError::Corrupt { table, detail : detail.to_string() }
}

impl LexTable {

    /// Creates the table of a class that has nothing in storage.  Record 0 is the sentinel
    ///
    /// `generation` seeds the hash table's generation count, see [LexHashTable::new]
    pub fn fresh<ConfigT : LexConfig>(id : TableId, with_timestamps : bool, generation : u64) -> Self {
        Self {
            id,
            vocabulary : Vocabulary::new(ConfigT::INITIAL_VOCAB_CAPACITY),
            records : vec![LexRecord::sentinel()],
            hash : LexHashTable::new(id, ConfigT::INITIAL_HASH_BITS, generation),
            overflow : OverflowArena::new(),
            timestamps : with_timestamps.then(|| vec![Timestamps::default()]),
            dirty : DirtyFlags::all(),
            session_start_size : 0,
        }
    }

    /// Reads a table back from `store`.
    ///
    /// Returns `Ok(None)` if the class has never been saved, or was saved with nothing but the
    /// sentinel, in which case the caller initializes it fresh on first insert.
    pub fn load<ConfigT : LexConfig, StoreT : BlockStore>(id : TableId, store : &StoreT, coder : &ConfigT::CoderT, case_sensitive : bool, with_timestamps : bool, generation : u64, perf_counters : &PerfCounters) -> Result<Option<Self>, LexError> {

        //Vocabulary first.  Its absence means the class is new
        let vocabulary = match store.read_block(BlockName::Vocabulary(id))? {
            Some(bytes) => Vocabulary::from_bytes(bytes).ok_or_else(|| corrupt(id, "vocabulary is not NUL-framed utf-8"))?,
            None => return Ok(None)
        };
        if vocabulary.is_empty() {
            return Ok(None);
        }

        //Then the records
        let record_bytes = store.read_block(BlockName::Records(id))?
            .ok_or_else(|| corrupt(id, "vocabulary present without records"))?;
        let record_count = coder.fmt1_list_len(&record_bytes).map_err(LexError::Codec)?;
        if record_count > ConfigT::MAX_RECORDS + 1 {
            return Err(LexError::TableFull { table : id, max : ConfigT::MAX_RECORDS });
        }
        let persisted : Vec<PersistedRecord> = coder.decode_fmt1_from_bytes(&record_bytes).map_err(LexError::Codec)?;
        let records : Vec<LexRecord> = persisted.into_iter().map(PersistedRecord::into_record).collect();
        match records.first() {
            Some(sentinel) if sentinel.is_empty() => {},
            _ => return Err(corrupt(id, "record 0 is not the empty sentinel"))
        }
        if let Some(index) = records.iter().position(|record| vocabulary.text_at(record.name_offset).is_none()) {
            return Err(corrupt(id, &format!("record {index} names an offset outside the vocabulary")));
        }

        //Then the hash, if we keep it
        let persisted_hash = if ConfigT::PERSIST_HASH {
            Self::read_hash::<ConfigT, StoreT>(id, store, coder, records.len(), generation)?
        } else {
            None
        };
        let rebuild_hash = persisted_hash.is_none();

        let timestamps = if with_timestamps {
            let mut stamps : Vec<Timestamps> = match store.read_block(BlockName::Timestamps(id))? {
                Some(bytes) => coder.decode_fmt1_from_bytes(&bytes).map_err(LexError::Codec)?,
                None => vec![]
            };
            stamps.resize(records.len(), Timestamps::default());
            Some(stamps)
        } else {
            None
        };

        let mut table = Self {
            id,
            vocabulary,
            session_start_size : records.len(),
            records,
            hash : persisted_hash.unwrap_or_else(|| LexHashTable::new(id, ConfigT::INITIAL_HASH_BITS, generation)),
            overflow : OverflowArena::new(),
            timestamps,
            dirty : DirtyFlags::empty(),
        };
        if rebuild_hash {
            table.rehash::<ConfigT>(case_sensitive, perf_counters)?;
            //A rebuilt hash matches the records, so there is nothing new to write
            table.dirty.remove(DirtyFlags::HASH);
        }

        debug!(table = %id, records = table.records.len(), vocabulary = table.vocabulary.len(), "loaded table");
        Ok(Some(table))
    }

    /// Reads the persisted hash slots, discarding them if they can't index `record_count` records
    fn read_hash<ConfigT : LexConfig, StoreT : BlockStore>(id : TableId, store : &StoreT, coder : &ConfigT::CoderT, record_count : usize, generation : u64) -> Result<Option<LexHashTable>, LexError> {
        let bytes = match store.read_block(BlockName::Hash(id))? {
            Some(bytes) => bytes,
            None => return Ok(None)
        };
        let slot_count = coder.fmt2_list_len(&bytes).map_err(LexError::Codec)?;
        if !slot_count.is_power_of_two() || (slot_count as f64) <= record_count as f64 * ConfigT::HASH_RATE {
            debug!(table = %id, slot_count, record_count, "discarding undersized persisted hash");
            return Ok(None);
        }
        let slots : Vec<u32> = coder.decode_fmt2_from_bytes(&bytes).map_err(LexError::Codec)?;
        if slots.iter().any(|&index| index as usize >= record_count) {
            debug!(table = %id, "discarding persisted hash that references missing records");
            return Ok(None);
        }
        Ok(LexHashTable::from_slots(id, slots, generation))
    }

    /// Writes the dirty parts of the table.  `force` writes everything regardless
    pub fn save<ConfigT : LexConfig, StoreT : BlockStore>(&mut self, store : &mut StoreT, coder : &ConfigT::CoderT, force : bool) -> Result<(), LexError> {

        let dirty = if force { DirtyFlags::all() } else { self.dirty };
        if dirty.is_empty() {
            return Ok(());
        }

        if dirty.contains(DirtyFlags::VOCABULARY) {
            store.write_block(BlockName::Vocabulary(self.id), self.vocabulary.as_bytes())?;
        }
        if dirty.contains(DirtyFlags::RECORDS) {
            //Fold the disk addresses held in the overflow arena back into the records
            let persisted = self.records.iter().enumerate()
                .map(|(index, record)| Ok(PersistedRecord::from_record(record, self.disk_of(index as u32)?)))
                .collect::<Result<Vec<PersistedRecord>, LexError>>()?;
            let bytes = coder.encode_fmt1_list_to_buf(&persisted).map_err(LexError::Codec)?;
            store.write_block(BlockName::Records(self.id), &bytes)?;
        }
        if ConfigT::PERSIST_HASH && dirty.contains(DirtyFlags::HASH) {
            let bytes = coder.encode_fmt2_list_to_buf(&self.hash.slots()).map_err(LexError::Codec)?;
            store.write_block(BlockName::Hash(self.id), &bytes)?;
        }
        if dirty.contains(DirtyFlags::TIMESTAMPS) {
            if let Some(stamps) = &self.timestamps {
                let bytes = coder.encode_fmt1_list_to_buf(stamps).map_err(LexError::Codec)?;
                store.write_block(BlockName::Timestamps(self.id), &bytes)?;
            }
        }

        debug!(table = %self.id, ?dirty, "saved table");
        self.dirty = DirtyFlags::empty();
        Ok(())
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    /// Number of records, including the sentinel
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[LexRecord] {
        &self.records
    }

    pub fn record(&self, index : u32) -> Option<&LexRecord> {
        self.records.get(index as usize)
    }

    pub fn record_mut(&mut self, index : u32) -> Option<&mut LexRecord> {
        self.records.get_mut(index as usize)
    }

    pub fn hash(&self) -> &LexHashTable {
        &self.hash
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn mark_dirty(&mut self, flags : DirtyFlags) {
        self.dirty |= flags;
    }

    pub fn has_timestamps(&self) -> bool {
        self.timestamps.is_some()
    }

    /// The text of the record at `index`, or `None` if there is no such record or its name
    /// offset is out of bounds
    pub fn name_at(&self, index : u32) -> Option<&str> {
        let record = self.records.get(index as usize)?;
        self.vocabulary.text_at(record.name_offset)
    }

    /// Probes the hash for `text`.  Deleted records never match
    pub fn probe(&self, text : &str, case_sensitive : bool, perf_counters : &PerfCounters) -> Result<Probe, HashTableFull> {
        let mut comparisons = 0;
        let result = self.hash.probe(text, case_sensitive, |index| {
            comparisons += 1;
            match self.records.get(index as usize) {
                Some(record) if !record.is_empty() => match self.vocabulary.text_at(record.name_offset) {
                    Some(candidate) => names_equal(candidate, text, case_sensitive),
                    None => false
                },
                _ => false
            }
        });

        perf_counters.update(|fields| {
            fields.probe_count += 1;
            let stepped = match result {
                Ok(Probe::Found { .. }) => comparisons > 1,
                Ok(Probe::Vacant { .. }) => comparisons > 0,
                Err(_) => true,
            };
            if stepped {
                fields.step_hash_count += 1;
            }
        });
        result
    }

    /// Appends a record named `text`.  The record is not yet reachable through the hash
    pub fn push_record<ConfigT : LexConfig>(&mut self, text : &str) -> Result<u32, LexError> {
        let index = self.check_record_ceiling::<ConfigT>()?;
        if self.vocabulary.len() + text.len() + 1 > ConfigT::MAX_VOCAB {
            return Err(LexError::ArenaExhausted { table : self.id, max : ConfigT::MAX_VOCAB });
        }
        let offset = self.vocabulary.append(text);
        self.records.push(LexRecord::new(offset));
        if let Some(stamps) = &mut self.timestamps {
            stamps.push(Timestamps::default());
        }
        self.dirty |= DirtyFlags::VOCABULARY | DirtyFlags::RECORDS | DirtyFlags::HASH | DirtyFlags::TIMESTAMPS;
        Ok(index)
    }

    /// Appends a nameless EMPTY record, holding a local index for a later hard define
    pub fn push_placeholder<ConfigT : LexConfig>(&mut self) -> Result<u32, LexError> {
        let index = self.check_record_ceiling::<ConfigT>()?;
        self.records.push(LexRecord::sentinel());
        if let Some(stamps) = &mut self.timestamps {
            stamps.push(Timestamps::default());
        }
        self.dirty |= DirtyFlags::RECORDS;
        Ok(index)
    }

    fn check_record_ceiling<ConfigT : LexConfig>(&self) -> Result<u32, LexError> {
        let index = self.records.len();
        if index > ConfigT::MAX_RECORDS {
            return Err(LexError::TableFull { table : self.id, max : ConfigT::MAX_RECORDS });
        }
        Ok(index as u32)
    }

    /// Gives the record at `index` the name `text`, in place if it fits
    pub fn rename_text<ConfigT : LexConfig>(&mut self, index : u32, text : &str) -> Result<(), LexError> {
        let in_place = self.name_at(index).is_some_and(|current| text.len() <= current.len());
        if !in_place && self.vocabulary.len() + text.len() + 1 > ConfigT::MAX_VOCAB {
            return Err(LexError::ArenaExhausted { table : self.id, max : ConfigT::MAX_VOCAB });
        }
        let record = self.records.get_mut(index as usize).ok_or_else(|| corrupt(self.id, "rename of a missing record"))?;
        record.name_offset = self.vocabulary.rename(record.name_offset, text);
        self.dirty |= DirtyFlags::VOCABULARY | DirtyFlags::RECORDS;
        Ok(())
    }

    /// Replaces a placeholder's empty name with `text`
    pub fn name_placeholder<ConfigT : LexConfig>(&mut self, index : u32, text : &str) -> Result<(), LexError> {
        if self.vocabulary.len() + text.len() + 1 > ConfigT::MAX_VOCAB {
            return Err(LexError::ArenaExhausted { table : self.id, max : ConfigT::MAX_VOCAB });
        }
        let offset = self.vocabulary.append(text);
        let record = self.records.get_mut(index as usize).ok_or_else(|| corrupt(self.id, "placeholder is missing"))?;
        *record = LexRecord::new(offset);
        self.dirty |= DirtyFlags::VOCABULARY | DirtyFlags::RECORDS | DirtyFlags::HASH;
        Ok(())
    }

    /// Makes the name of the record at `index` read back empty.  Its hash slot goes stale
    pub fn blank_name(&mut self, index : u32) {
        if let Some(record) = self.records.get(index as usize) {
            if record.name_offset != 0 {
                self.vocabulary.zero_first_byte(record.name_offset);
                self.dirty |= DirtyFlags::VOCABULARY;
            }
        }
    }

    /// The alias records whose chain ends at the record at `index`
    pub fn aliases_leading_to(&self, index : u32) -> Vec<u32> {
        (1..self.records.len() as u32).filter(|&candidate| {
            let mut current = candidate;
            for _ in 0..self.records.len() {
                match self.records.get(current as usize).and_then(|record| record.alias_target()) {
                    Some(next) if next.table() == self.id => current = next.index(),
                    _ => break
                }
            }
            candidate != index && current == index
        }).collect()
    }

    /// Exchanges the names of two records
    pub fn swap_names(&mut self, a : u32, b : u32) {
        let offset_a = self.records[a as usize].name_offset;
        self.records[a as usize].name_offset = self.records[b as usize].name_offset;
        self.records[b as usize].name_offset = offset_a;
        self.dirty |= DirtyFlags::RECORDS;
    }

    /// Makes the record at `index` reachable through the hash under its current name, growing
    /// the hash first if the load factor demands it
    pub fn insert_into_hash<ConfigT : LexConfig>(&mut self, index : u32, case_sensitive : bool, perf_counters : &PerfCounters) -> Result<(), LexError> {

        if self.hash.needs_growth(self.records.len(), ConfigT::HASH_RATE) {
            //The rebuild picks up `index` along with everything else
            return self.rehash::<ConfigT>(case_sensitive, perf_counters);
        }

        let text = match self.name_at(index) {
            Some(text) if !text.is_empty() => text,
            _ => return Ok(())
        };
        match self.probe(text, case_sensitive, perf_counters) {
            Ok(Probe::Vacant { slot, .. }) => {
                self.hash.fill(slot, index);
                self.dirty |= DirtyFlags::HASH;
                Ok(())
            },
            Ok(Probe::Found { .. }) => Ok(()),
            Err(HashTableFull) => {
                //Stale entries from renames can fill a table.  One rebuild clears them
                warn!(table = %self.id, "hash table full, rebuilding");
                self.rehash::<ConfigT>(case_sensitive, perf_counters)
            }
        }
    }

    /// Stores `index` in the slot remembered by `hint`, if the hint still applies.  Returns
    /// `false` if the caller must insert the normal way
    pub fn fill_hinted<ConfigT : LexConfig>(&mut self, hint : &ProbeHint, index : u32, case_sensitive : bool) -> bool {
        if self.hash.needs_growth(self.records.len(), ConfigT::HASH_RATE) {
            return false;
        }
        let valid = match self.name_at(index) {
            Some(text) => self.hash.hint_is_valid(hint, text, case_sensitive),
            None => false
        };
        if valid {
            self.hash.fill(hint.slot, index);
            self.dirty |= DirtyFlags::HASH;
        }
        valid
    }

    /// Rebuilds the hash from scratch, sized for the current record count, re-inserting every
    /// named, non-deleted record in index order
    pub fn rehash<ConfigT : LexConfig>(&mut self, case_sensitive : bool, perf_counters : &PerfCounters) -> Result<(), LexError> {

        let bits = bits_for_count(self.records.len(), ConfigT::HASH_RATE);
        self.hash.reset(bits);

        for index in 1..self.records.len() as u32 {
            let record = &self.records[index as usize];
            if record.is_empty() {
                continue;
            }
            let text = match self.vocabulary.text_at(record.name_offset) {
                Some(text) if !text.is_empty() => text,
                _ => continue
            };
            match self.probe(text, case_sensitive, perf_counters) {
                Ok(Probe::Vacant { slot, .. }) => self.hash.fill(slot, index),
                //Two live records with one name.  The older one keeps it
                Ok(Probe::Found { .. }) => {},
                Err(HashTableFull) => return Err(LexError::HashTableFull { table : self.id }),
            }
        }

        self.dirty |= DirtyFlags::HASH;
        perf_counters.update(|fields| fields.rehash_count += 1);
        debug!(table = %self.id, bits, records = self.records.len(), "rebuilt hash table");
        Ok(())
    }

    /// The disk address of the record at `index`, looking through the overflow arena
    pub fn disk_of(&self, index : u32) -> Result<DiskAddr, LexError> {
        let record = self.records.get(index as usize).ok_or_else(|| corrupt(self.id, "disk address of a missing record"))?;
        match record.ext {
            Some(ext) => self.overflow.get(ext).map(|state| state.disk).ok_or(LexError::OverflowInconsistent {
                key : Key::new(self.id, index),
                overflow_id : ext.0,
            }),
            None => Ok(match record.payload {
                RecordPayload::Disk(addr) => addr,
                RecordPayload::Alias(_) => DiskAddr::NULL,
            })
        }
    }

    pub fn set_disk(&mut self, index : u32, addr : DiskAddr) -> Result<(), LexError> {
        let key = Key::new(self.id, index);
        let record = self.records.get_mut(index as usize).ok_or_else(|| corrupt(self.id, "disk address of a missing record"))?;
        match record.ext {
            Some(ext) => {
                let state = self.overflow.get_mut(ext).ok_or(LexError::OverflowInconsistent { key, overflow_id : ext.0 })?;
                state.disk = addr;
            },
            None => record.payload = RecordPayload::Disk(addr),
        }
        self.dirty |= DirtyFlags::RECORDS;
        Ok(())
    }

    pub fn cache_of(&self, index : u32) -> Result<Option<CacheHandle>, LexError> {
        let record = match self.records.get(index as usize) {
            Some(record) => record,
            None => return Ok(None)
        };
        match record.ext {
            Some(ext) => self.overflow.get(ext).map(|state| state.cache).ok_or(LexError::OverflowInconsistent {
                key : Key::new(self.id, index),
                overflow_id : ext.0,
            }),
            None => Ok(None)
        }
    }

    /// Attaches or detaches the cached body of a record, promoting it into the overflow arena
    /// or demoting it back out.  Returns the handle that was replaced
    pub fn set_cache(&mut self, index : u32, handle : Option<CacheHandle>) -> Result<Option<CacheHandle>, LexError> {
        let key = Key::new(self.id, index);
        let record = self.records.get_mut(index as usize).ok_or_else(|| corrupt(self.id, "cache of a missing record"))?;

        match (record.ext, handle) {
            (Some(ext), Some(handle)) => {
                let state = self.overflow.get_mut(ext).ok_or(LexError::OverflowInconsistent { key, overflow_id : ext.0 })?;
                Ok(state.cache.replace(handle))
            },
            (Some(ext), None) => {
                let state = self.overflow.release(ext).ok_or(LexError::OverflowInconsistent { key, overflow_id : ext.0 })?;
                record.ext = None;
                if let RecordPayload::Disk(_) = record.payload {
                    record.payload = RecordPayload::Disk(state.disk);
                }
                Ok(state.cache)
            },
            (None, Some(handle)) => {
                let disk = match record.payload {
                    RecordPayload::Disk(addr) => addr,
                    RecordPayload::Alias(_) => DiskAddr::NULL,
                };
                record.ext = Some(self.overflow.alloc(ExtendedState { disk, cache : Some(handle) }));
                Ok(None)
            },
            (None, None) => Ok(None)
        }
    }

    /// Every cache handle held by the table
    pub fn cache_handles(&self) -> Vec<CacheHandle> {
        self.overflow.cache_handles().collect()
    }

    /// Number of records currently promoted into the overflow arena
    pub fn overflow_count(&self) -> usize {
        self.overflow.live_count()
    }

    pub fn timestamps(&self, index : u32) -> Option<Timestamps> {
        self.timestamps.as_ref()?.get(index as usize).copied()
    }

    /// Records `user` as the last to modify the record at `index`, and as its creator if `created`
    pub fn stamp(&mut self, index : u32, user : Key, created : bool) {
        if let Some(stamp) = self.timestamps.as_mut().and_then(|stamps| stamps.get_mut(index as usize)) {
            if created {
                stamp.created = user;
            }
            stamp.updated = user;
            self.dirty |= DirtyFlags::TIMESTAMPS;
        }
    }

    pub fn session_start_size(&self) -> usize {
        self.session_start_size
    }

    /// Starts a session: records from here on are new, and nothing is touched yet
    pub fn begin_session(&mut self) {
        self.session_start_size = self.records.len();
        for record in self.records.iter_mut() {
            record.status.remove(LexStatus::TOUCH);
        }
    }

    /// The keys created, and the pre-existing keys modified, since the session started
    pub fn session_diff(&self) -> (Vec<Key>, Vec<Key>) {
        let mut new_keys = vec![];
        let mut touched_keys = vec![];
        for (index, record) in self.records.iter().enumerate().skip(1) {
            if index >= self.session_start_size {
                if !record.is_empty() {
                    new_keys.push(Key::new(self.id, index as u32));
                }
            } else if record.status.contains(LexStatus::TOUCH) {
                touched_keys.push(Key::new(self.id, index as u32));
            }
        }
        (new_keys, touched_keys)
    }
}

//!
//! The Records module contains the per-key lexicon record and its persisted form.  [LexStatus],
//! [DiskAddr] and [RecordPayload] are re-exported.
//!

use serde::{Serialize, Deserialize};

use super::key::{Key, Mask};
use super::overflow::OverflowId;

bitflags::bitflags! {
    /// Identity status bits of a record
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LexStatus: u8 {
        /// Locked by an edit session
        const LOCK = 0x01;
        /// This record is an alias; its payload is the target key
        const ALIAS = 0x02;
        /// Deleted or blank.  Never displayed
        const EMPTY = 0x04;
        /// Modified since the session started
        const TOUCH = 0x08;
        /// Some other record is aliased to this one
        const IS_ALIAS = 0x10;
        /// Reserved for the kernel
        const PRIVATE = 0xE0;
    }
}

impl Default for LexStatus {
    fn default() -> Self {
        LexStatus::empty()
    }
}

impl LexStatus {
    /// Bits that only make sense within the running process
    pub const TRANSIENT : LexStatus = LexStatus::LOCK.union(LexStatus::TOUCH);
}

/// Address of a persisted object body in the external block store.  0 means "no body"
#[derive(Copy, Debug, Clone, Default, Hash, Eq, PartialEq, Ord, PartialOrd, derive_more::Display, Serialize, Deserialize)]
pub struct DiskAddr(pub u32);

impl DiskAddr {
    pub const NULL : DiskAddr = DiskAddr(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// What a record points at: its object body on disk, or the key it is an alias of
#[derive(Copy, Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum RecordPayload {
    Disk(DiskAddr),
    Alias(Key),
}

impl Default for RecordPayload {
    fn default() -> Self {
        RecordPayload::Disk(DiskAddr::NULL)
    }
}

/// The in-memory record for one key.  "Naked": nothing here follows aliases.
///
/// When `ext` is set the record has been promoted into the overflow arena, and the disk
/// address held there supersedes the one in `payload`.
#[derive(Clone, Debug, Default)]
pub struct LexRecord {
    pub name_offset : u32,
    pub status : LexStatus,
    pub is_mask : Mask,
    pub payload : RecordPayload,
    pub ext : Option<OverflowId>,
}

impl LexRecord {
    pub fn new(name_offset : u32) -> Self {
        Self {
            name_offset,
            ..Default::default()
        }
    }

    /// The record 0 of every table
    pub fn sentinel() -> Self {
        Self {
            status : LexStatus::EMPTY,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.contains(LexStatus::EMPTY)
    }

    pub fn is_alias(&self) -> bool {
        self.status.contains(LexStatus::ALIAS)
    }

    pub fn is_locked(&self) -> bool {
        self.status.contains(LexStatus::LOCK)
    }

    pub fn alias_target(&self) -> Option<Key> {
        match self.payload {
            RecordPayload::Alias(target) if self.is_alias() => Some(target),
            _ => None
        }
    }

    pub fn set_alias(&mut self, target : Key) {
        self.status.insert(LexStatus::ALIAS);
        self.payload = RecordPayload::Alias(target);
    }
}

/// The on-disk form of a [LexRecord]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub name_offset : u32,
    pub status : u8,
    pub is_mask : u32,
    pub payload : RecordPayload,
}

impl PersistedRecord {

    /// Builds the persisted form.  `disk` is the record's current disk address, already resolved
    /// through the overflow arena by the caller
    pub fn from_record(record : &LexRecord, disk : DiskAddr) -> Self {
        let payload = match record.payload {
            RecordPayload::Alias(target) => RecordPayload::Alias(target),
            RecordPayload::Disk(_) => RecordPayload::Disk(disk),
        };
        Self {
            name_offset : record.name_offset,
            status : (record.status - LexStatus::TRANSIENT).bits(),
            is_mask : record.is_mask.0,
            payload,
        }
    }

    pub fn into_record(self) -> LexRecord {
        LexRecord {
            name_offset : self.name_offset,
            status : LexStatus::from_bits_retain(self.status) - LexStatus::TRANSIENT,
            is_mask : Mask(self.is_mask),
            payload : self.payload,
            ext : None,
        }
    }
}

/// Created/updated stamps of a record.  Each stamp is the key of the session user that acted,
/// resolved to wall-clock time through the session table
#[derive(Copy, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created : Key,
    pub updated : Key,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::TableId;

    #[test]
    fn transient_bits_are_not_persisted() {
        let mut record = LexRecord::new(12);
        record.status = LexStatus::LOCK | LexStatus::TOUCH | LexStatus::IS_ALIAS;
        record.is_mask = Mask(6);
        record.payload = RecordPayload::Disk(DiskAddr(3));

        let persisted = PersistedRecord::from_record(&record, DiskAddr(99));
        assert_eq!(persisted.status, LexStatus::IS_ALIAS.bits());
        assert_eq!(persisted.payload, RecordPayload::Disk(DiskAddr(99)));

        let back = persisted.into_record();
        assert_eq!(back.name_offset, 12);
        assert_eq!(back.status, LexStatus::IS_ALIAS);
        assert_eq!(back.is_mask, Mask(6));
        assert!(back.ext.is_none());
    }

    #[test]
    fn alias_payload_survives() {
        let target = Key::new(TableId(8), 4);
        let mut record = LexRecord::new(1);
        record.set_alias(target);
        assert_eq!(record.alias_target(), Some(target));

        let back = PersistedRecord::from_record(&record, DiskAddr(5)).into_record();
        assert_eq!(back.alias_target(), Some(target));
    }

    #[test]
    fn sentinel_is_empty() {
        let record = LexRecord::sentinel();
        assert!(record.is_empty());
        assert!(!record.is_alias());
        assert_eq!(record.alias_target(), None);
    }
}

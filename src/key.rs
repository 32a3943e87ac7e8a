//!
//! The Key module contains the identifier types shared by every part of the lexicon: [Key],
//! [TableId], [Mask] and [ClassSelector].  All of them are re-exported.
//!

use core::fmt;

use serde::{Serialize, Deserialize};

/// Number of low bits of a [Key] used for the local record index
pub const LOCAL_INDEX_BITS : u32 = 24;

/// Mask selecting the local record index out of a [Key]
pub const LOCAL_INDEX_MASK : u32 = (1 << LOCAL_INDEX_BITS) - 1;

/// Number of tables (classes) addressable by the high byte of a [Key]
pub const TABLE_COUNT : usize = 256;

/// Identifies one table, i.e. one class vocabulary.  The table id is the high byte of every
/// [Key] belonging to that class.
#[derive(Copy, Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, derive_more::Display, Serialize, Deserialize)]
pub struct TableId(pub u8);

impl TableId {
    /// System tags.  Always loaded, never cleared
    pub const SYSTEM : TableId = TableId(0);
    /// Global bootstrap vocabulary.  Always loaded, never cleared, always flushed on save
    pub const GLOBAL : TableId = TableId(1);
    /// Session objects.  Never cleared
    pub const SESSION : TableId = TableId(2);
    /// Class models.  The synthetic `?ClassName` root records of tree-typed classes live here
    pub const MODEL : TableId = TableId(3);
    /// The global class registry.  Read-only through [ensure](crate::Lexicon::ensure) outside bootstrap
    pub const MAIN_CLASSES : TableId = TableId(4);

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Bootstrap tables may never be cleared during a session
    pub fn is_bootstrap(&self) -> bool {
        self.0 <= 2
    }
}

/// The fundamental identifier of a named entity.
///
/// High byte is the [TableId], the low 24 bits are the local index of the record within the
/// table.  Local index 0 in any table is the reserved "no such object" sentinel.
#[derive(Copy, Clone, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Key(u32);

impl Key {
    /// The null key, i.e. local index 0 of table 0
    pub const NULL : Key = Key(0);

    pub fn new(table : TableId, index : u32) -> Self {
        debug_assert!(index <= LOCAL_INDEX_MASK);
        Key(((table.0 as u32) << LOCAL_INDEX_BITS) | (index & LOCAL_INDEX_MASK))
    }
    pub fn from_raw(raw : u32) -> Self {
        Key(raw)
    }
    pub fn raw(&self) -> u32 {
        self.0
    }
    pub fn table(&self) -> TableId {
        TableId((self.0 >> LOCAL_INDEX_BITS) as u8)
    }
    pub fn index(&self) -> u32 {
        self.0 & LOCAL_INDEX_MASK
    }
    /// Returns `true` if this is the reserved sentinel key of its table
    pub fn is_null(&self) -> bool {
        self.index() == 0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table().0, self.index())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}:{})", self.table().0, self.index())
    }
}

/// Subclass membership bits.  A record belongs to a subclass when its mask contains every bit
/// of the subclass' mask.
#[derive(Copy, Debug, Clone, Default, Hash, Eq, PartialEq, derive_more::Display, Serialize, Deserialize)]
pub struct Mask(pub u32);

impl Mask {
    pub const NONE : Mask = Mask(0);

    pub fn satisfies(&self, required : Mask) -> bool {
        self.0 & required.0 == required.0
    }
}

/// The class argument accepted by lookups and iteration, resolved once at the API boundary
/// into a concrete table and the mask a found record must satisfy
#[derive(Copy, Debug, Clone, Hash, Eq, PartialEq)]
pub enum ClassSelector {
    Direct(TableId),
    Masked(TableId, Mask),
}

impl ClassSelector {
    pub fn resolve(&self) -> (TableId, Mask) {
        match *self {
            ClassSelector::Direct(t) => (t, Mask::NONE),
            ClassSelector::Masked(t, mask) => (t, mask),
        }
    }
    pub fn table(&self) -> TableId {
        self.resolve().0
    }
}

impl From<TableId> for ClassSelector {
    fn from(table : TableId) -> Self {
        ClassSelector::Direct(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_packing() {
        let key = Key::new(TableId(7), 0x123456);
        assert_eq!(key.table(), TableId(7));
        assert_eq!(key.index(), 0x123456);
        assert_eq!(key.raw(), 0x07123456);
        assert!(!key.is_null());
        assert!(Key::new(TableId(9), 0).is_null());
        assert_eq!(format!("{}", key), "7:1193046");
    }

    #[test]
    fn keys_order_by_table_then_index() {
        let a = Key::new(TableId(3), 900);
        let b = Key::new(TableId(4), 1);
        let c = Key::new(TableId(4), 2);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn selector_resolution() {
        let (t, mask) = ClassSelector::from(TableId(12)).resolve();
        assert_eq!(t, TableId(12));
        assert_eq!(mask, Mask::NONE);

        let sel = ClassSelector::Masked(TableId(12), Mask(0b100));
        assert_eq!(sel.table(), TableId(12));
        assert!(Mask(0b110).satisfies(Mask(0b100)));
        assert!(!Mask(0b010).satisfies(Mask(0b100)));
        assert!(Mask(0).satisfies(Mask::NONE));
    }
}

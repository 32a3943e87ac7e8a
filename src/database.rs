//!
//! The Database module contains the block store the lexicon persists itself into, and its two
//! implementations: [RocksBlockStore] on top of RocksDB and [MemoryBlockStore] in memory.
//! [BlockStore], [BlockName] and both stores are re-exported.
//!

use core::fmt;

use std::collections::HashMap;
use std::path::Path;

use rocksdb::{DB, DBWithThreadMode, ColumnFamilyDescriptor};

use crate::key::TableId;

/// The ColumnFamily names used for the different kinds of block
pub const LEX_CF_NAME : &str = "lex";
pub const KEYSETS_CF_NAME : &str = "keysets";
pub const METADATA_CF_NAME : &str = "metadata";

/// The name of one persisted block
#[derive(Copy, Debug, Clone, Hash, Eq, PartialEq)]
pub enum BlockName {
    /// Raw vocabulary bytes of a table
    Vocabulary(TableId),
    /// Record list of a table
    Records(TableId),
    /// Hash slots of a table
    Hash(TableId),
    /// Created/updated stamps of a table
    Timestamps(TableId),
    /// Keys created during a session
    NewKeys(u32),
    /// Pre-existing keys modified during a session
    TouchedKeys(u32),
    /// Version of the crate that created the database
    Version,
    /// Number of the last completed session
    SessionCounter,
}

impl BlockName {
    fn column_family(&self) -> &'static str {
        match self {
            BlockName::Vocabulary(_) | BlockName::Records(_) | BlockName::Hash(_) | BlockName::Timestamps(_) => LEX_CF_NAME,
            BlockName::NewKeys(_) | BlockName::TouchedKeys(_) => KEYSETS_CF_NAME,
            BlockName::Version | BlockName::SessionCounter => METADATA_CF_NAME,
        }
    }
}

impl fmt::Display for BlockName {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockName::Vocabulary(t) => write!(f, "_voc{t}"),
            BlockName::Records(t) => write!(f, "_lexi{t}"),
            BlockName::Hash(t) => write!(f, "_lexh{t}"),
            BlockName::Timestamps(t) => write!(f, "_lext{t}"),
            BlockName::NewKeys(session) => write!(f, "_knew{session}"),
            BlockName::TouchedKeys(session) => write!(f, "_ktouch{session}"),
            BlockName::Version => write!(f, "_version"),
            BlockName::SessionCounter => write!(f, "_session"),
        }
    }
}

/// A key-value store of named blocks, plus the oracle that says whether this process may write
///
/// NOTE: Errors are plain strings.  [rocksdb::Error] is a wrapper around a string anyway.
pub trait BlockStore {
    fn read_block(&self, name : BlockName) -> Result<Option<Vec<u8>>, String>;
    fn write_block(&mut self, name : BlockName, bytes : &[u8]) -> Result<(), String>;
    fn delete_block(&mut self, name : BlockName) -> Result<(), String>;
    fn is_write_access(&self) -> bool;
}

/// Encapsulates a connection to a RocksDB database
pub struct RocksBlockStore {
    db : DBWithThreadMode<rocksdb::SingleThreaded>,
    write_access : bool,
}

impl RocksBlockStore {

    /// Opens or creates the database at `path`, with write access
    pub fn open<P : AsRef<Path>>(path : P) -> Result<Self, String> {

        let lex_cf = ColumnFamilyDescriptor::new(LEX_CF_NAME, rocksdb::Options::default());
        let keysets_cf = ColumnFamilyDescriptor::new(KEYSETS_CF_NAME, rocksdb::Options::default());
        let metadata_cf = ColumnFamilyDescriptor::new(METADATA_CF_NAME, rocksdb::Options::default());

        //Configure the database itself
        let mut db_opts = rocksdb::Options::default();
        db_opts.create_missing_column_families(true);
        db_opts.create_if_missing(true);

        let db = DB::open_cf_descriptors(&db_opts, path, vec![lex_cf, keysets_cf, metadata_cf])?;

        Ok(Self{
            db,
            write_access : true,
        })
    }

    /// Grants or withdraws write access.  Without it, saves are skipped
    pub fn set_write_access(&mut self, write_access : bool) {
        self.write_access = write_access;
    }

    fn cf(&self, name : BlockName) -> Result<&rocksdb::ColumnFamily, String> {
        let cf_name = name.column_family();
        self.db.cf_handle(cf_name).ok_or_else(|| format!("missing column family {cf_name}"))
    }
}

impl BlockStore for RocksBlockStore {

    fn read_block(&self, name : BlockName) -> Result<Option<Vec<u8>>, String> {
        let cf = self.cf(name)?;
        let bytes = self.db.get_pinned_cf(cf, name.to_string())?;
        Ok(bytes.map(|bytes| bytes.to_vec()))
    }

    fn write_block(&mut self, name : BlockName, bytes : &[u8]) -> Result<(), String> {
        let cf = self.cf(name)?;
        self.db.put_cf(cf, name.to_string(), bytes)?;
        Ok(())
    }

    fn delete_block(&mut self, name : BlockName) -> Result<(), String> {
        let cf = self.cf(name)?;
        self.db.delete_cf(cf, name.to_string())?;
        Ok(())
    }

    fn is_write_access(&self) -> bool {
        self.write_access
    }
}

impl Drop for RocksBlockStore {
    fn drop(&mut self) {
        if let Err(err) = self.db.flush() {
            tracing::warn!(error = %err, "flush on close failed");
        }
    }
}

/// A [BlockStore] held in memory.  Useful for tests and for throwaway databases
#[derive(Clone, Debug)]
pub struct MemoryBlockStore {
    blocks : HashMap<String, Vec<u8>>,
    write_access : bool,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self {
            blocks : HashMap::new(),
            write_access : true,
        }
    }

    pub fn set_write_access(&mut self, write_access : bool) {
        self.write_access = write_access;
    }

    pub fn contains(&self, name : BlockName) -> bool {
        self.blocks.contains_key(&name.to_string())
    }
}

impl Default for MemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for MemoryBlockStore {
    fn read_block(&self, name : BlockName) -> Result<Option<Vec<u8>>, String> {
        Ok(self.blocks.get(&name.to_string()).cloned())
    }
    fn write_block(&mut self, name : BlockName, bytes : &[u8]) -> Result<(), String> {
        self.blocks.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
    fn delete_block(&mut self, name : BlockName) -> Result<(), String> {
        self.blocks.remove(&name.to_string());
        Ok(())
    }
    fn is_write_access(&self) -> bool {
        self.write_access
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_names() {
        assert_eq!(BlockName::Vocabulary(TableId(3)).to_string(), "_voc3");
        assert_eq!(BlockName::Records(TableId(12)).to_string(), "_lexi12");
        assert_eq!(BlockName::Hash(TableId(0)).to_string(), "_lexh0");
        assert_eq!(BlockName::Timestamps(TableId(255)).to_string(), "_lext255");
        assert_eq!(BlockName::NewKeys(4).to_string(), "_knew4");
        assert_eq!(BlockName::TouchedKeys(4).to_string(), "_ktouch4");
    }

    #[test]
    fn rocks_round_trip() {
        let dir = tempfile::tempdir().expect("create tempdir");
        {
            let mut store = RocksBlockStore::open(dir.path()).unwrap();
            store.write_block(BlockName::Vocabulary(TableId(9)), b"\0abc\0").unwrap();
            store.write_block(BlockName::NewKeys(1), &[1, 2, 3]).unwrap();
            store.write_block(BlockName::Version, b"0.4.0").unwrap();
            store.delete_block(BlockName::NewKeys(1)).unwrap();
        }
        let store = RocksBlockStore::open(dir.path()).unwrap();
        assert_eq!(store.read_block(BlockName::Vocabulary(TableId(9))).unwrap().unwrap(), b"\0abc\0".to_vec());
        assert_eq!(store.read_block(BlockName::Version).unwrap().unwrap(), b"0.4.0".to_vec());
        assert!(store.read_block(BlockName::NewKeys(1)).unwrap().is_none());
        assert!(store.read_block(BlockName::Records(TableId(9))).unwrap().is_none());
    }

    #[test]
    fn memory_store() {
        let mut store = MemoryBlockStore::new();
        assert!(store.is_write_access());
        store.write_block(BlockName::Records(TableId(5)), &[9]).unwrap();
        assert!(store.contains(BlockName::Records(TableId(5))));
        store.set_write_access(false);
        assert!(!store.is_write_access());
        store.delete_block(BlockName::Records(TableId(5))).unwrap();
        assert!(store.read_block(BlockName::Records(TableId(5))).unwrap().is_none());
    }
}

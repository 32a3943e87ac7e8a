//!
//! The Error module contains the two error kinds of the lexicon.  Both are re-exported.
//!
//! [LexError] is structural: corruption, exhausted ceilings, missing bootstrap data and storage
//! failures.  [AliasError] is a recoverable conflict reported by [rename](crate::Lexicon::rename);
//! the database is left unchanged.
//!

use thiserror::Error;

use crate::key::{Key, TableId};

#[derive(Error, Debug)]
pub enum LexError {
    /// The hash table has no free slot even after a rebuild
    #[error("hash table of class {table} is full")]
    HashTableFull { table : TableId },

    /// Following aliases from a key came back around
    #[error("alias chain starting at {key} loops")]
    AliasLoop { key : Key },

    /// A record references an overflow entry that isn't live
    #[error("record {key} references overflow entry {overflow_id} which is not allocated")]
    OverflowInconsistent { key : Key, overflow_id : u32 },

    /// The vocabulary would exceed the addressable size
    #[error("vocabulary of class {table} exceeds {max} bytes")]
    ArenaExhausted { table : TableId, max : usize },

    /// The table would exceed the addressable record count
    #[error("class {table} exceeds {max} keys")]
    TableFull { table : TableId, max : usize },

    /// Neither the persisted system tags nor a legacy tag file are available
    #[error("system tag table is missing and no tag definition file is available: {detail}")]
    MissingBootstrap { detail : String },

    /// Hard-defining a tag would overwrite a real entry
    #[error("cannot define {name} at {table}:{index}, the slot already holds {existing}")]
    DefineConflict { table : TableId, index : u32, name : String, existing : String },

    /// Persisted data doesn't hang together
    #[error("class {table} is corrupt: {detail}")]
    Corrupt { table : TableId, detail : String },

    /// The bootstrap tables can't be cleared
    #[error("class {table} is a bootstrap table and cannot be cleared")]
    BootstrapTable { table : TableId },

    /// New keys can't be added to this class outside bootstrap
    #[error("class {table} is read-only")]
    ReadOnlyClass { table : TableId },

    /// The database was written by an incompatible version of this crate
    #[error("database was created with version {found}, incompatible with {expected}")]
    IncompatibleVersion { found : String, expected : String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a rename was refused
#[derive(Error, Debug)]
pub enum AliasError {
    #[error("{name} is locked by another session")]
    Locked { name : String },

    #[error("{name} is already an alias or has been deleted")]
    NotRenamable { name : String },

    #[error("{from} cannot be renamed to {to}: it would create an alias loop")]
    WouldLoop { from : String, to : String },

    #[error("{from} and {to} both exist and objects of class {class} cannot be merged")]
    CannotMerge { from : String, to : String, class : String },

    #[error("merge of {from} into {to} was declined")]
    UserDeclined { from : String, to : String },

    #[error("merge of {from} into {to} failed: {detail}")]
    FusionFailed { from : String, to : String, detail : String },

    #[error(transparent)]
    Lex(#[from] LexError),
}

impl From<String> for LexError {
    fn from(detail : String) -> Self {
        LexError::Storage(detail)
    }
}

/// Aborts on a violated structural invariant
#[cold]
pub(crate) fn fatal(err : LexError) -> ! {
    tracing::error!(error = %err, "fatal lexicon error");
    panic!("{err}")
}

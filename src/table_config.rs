//!
//! The Table Config module contains the compile-time parameters of a [Lexicon](crate::Lexicon).
//! [LexConfig] and [DefaultLexConfig] are re-exported.
//!

use crate::key::LOCAL_INDEX_MASK;

/// The LexConfig trait specifies the compile-time parameters shared by every table of a
/// [Lexicon](crate::Lexicon)
///
/// ## An example creating a [Lexicon](crate::Lexicon) with a custom [LexConfig]
/// ```
/// use ace_lex::{*};
///
/// struct Config();
/// impl LexConfig for Config {
///     type CoderT = BincodeCoder;
///     const INITIAL_HASH_BITS : u32 = 7;
///     const PERSIST_HASH : bool = true;
/// }
/// let lex = Lexicon::<Config, _>::open(MemoryBlockStore::new()).unwrap();
/// ```
pub trait LexConfig {

    /// The [Coder](crate::Coder) used to encode records, hash slots, timestamps and key sets
    type CoderT : 'static + crate::Coder + Send + Sync;

    /// A table is rebuilt whenever `record_count * HASH_RATE` would reach its size
    const HASH_RATE : f64 = 1.6;

    /// log2 of the hash table size of a freshly created table
    const INITIAL_HASH_BITS : u32 = 8;

    /// Bytes reserved for the vocabulary of a freshly created table
    const INITIAL_VOCAB_CAPACITY : usize = 1024;

    /// Hard ceiling on the vocabulary of one table.  Offsets are 32-bit
    const MAX_VOCAB : usize = i32::MAX as usize;

    /// Hard ceiling on the number of records of one table, set by the width of the local index
    const MAX_RECORDS : usize = LOCAL_INDEX_MASK as usize;

    /// Whether the hash table is written on save and reused on load.  When `false` it is
    /// rebuilt from the records every time a table is read
    const PERSIST_HASH : bool = false;
}

/// A struct that implements [LexConfig] with default values
#[cfg(feature = "bincode")]
pub struct DefaultLexConfig();

#[cfg(feature = "bincode")]
impl LexConfig for DefaultLexConfig {
    type CoderT = crate::BincodeCoder;
}

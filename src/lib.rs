
//! # ace_lex Overview
//!
//! A persistent identity store backed by [RocksDB](https://rocksdb.org) that maps the names of
//! database objects to stable, compact [Key]s and back.  Names are partitioned into up to 256
//! classes, each with its own table, and a name is unique within its class.
//!
//! The reasons to use this crate over a plain string interner are:
//! - Keys survive restarts, renames and merges.  A renamed object keeps its key
//! - Case-insensitive classes, with the original spelling preserved
//! - Aliasing and object fusion when two names turn out to denote the same thing
//! - Per-session key sets, so a client can find out what changed since it last looked
//!
//! ## Keys & Classes
//!
//! A [Key] is a 32-bit value: the high 8 bits are the class ([TableId]), the low 24 bits the index
//! of the name's record in that class' table.  Index 0 of every class is the null key.  Class
//! metadata ([ClassInfo]) is supplied by the schema layer at startup through
//! [Lexicon::define_class], and decides case sensitivity, whether the objects of the class can be
//! fused, and whether created/updated stamps are kept.
//!
//! A few classes are reserved: [TableId::SYSTEM] holds the built-in tags, [TableId::GLOBAL] the
//! keys of the system vocabulary, [TableId::SESSION] the session objects, [TableId::MODEL] the
//! `?ClassName` model roots and [TableId::MAIN_CLASSES] the class registry itself.
//!
//! ## Usage Example
//!
//! ```
//! use ace_lex::{*};
//!
//! let mut lex = Lexicon::<DefaultLexConfig, _>::open(MemoryBlockStore::new()).unwrap();
//! let gene = TableId(10);
//! lex.define_class(gene, ClassInfo::new("Gene").tree_typed()).unwrap();
//!
//! //Registering a name is idempotent, and case-insensitive unless the class says otherwise
//! let unc22 = lex.ensure("unc-22", gene).unwrap();
//! assert_eq!(lex.ensure("UNC-22", gene).unwrap(), unc22);
//! assert_eq!(lex.lookup("Unc-22", gene), Some(unc22));
//! assert_eq!(lex.name(unc22), "unc-22");
//!
//! //A rename keeps the key
//! lex.rename(unc22, "twitchin", false, false).unwrap();
//! assert_eq!(lex.lookup("twitchin", gene), Some(unc22));
//! assert_eq!(lex.lookup("unc-22", gene), None);
//!
//! //Renaming onto an existing name joins the two keys
//! let twn = lex.ensure("twn-1", gene).unwrap();
//! lex.rename(twn, "twitchin", false, true).unwrap();
//! assert_eq!(lex.lookup("twn-1", gene), Some(unc22));
//!
//! lex.save().unwrap();
//! ```
//!
//! Additional usage examples can be found in the tests, located at the bottom of the `src/lib.rs` file.
//!
//! ## Configuration
//!
//! A [LexConfig] type parameter sets the compile-time parameters shared by all tables: the
//! [Coder] used on disk, the hash load factor and initial sizes, and the hard ceilings.
//! [DefaultLexConfig] will be sufficient for most situations.
//!
//! Storage is reached through the [BlockStore] trait.  [RocksBlockStore] keeps every table as a
//! handful of named blocks in RocksDB, and [MemoryBlockStore] keeps them in memory.
//!
//! ## Object Bodies
//!
//! The lexicon doesn't own object bodies.  Each key carries a [DiskAddr] pointing at the persisted
//! body and optionally a [CacheHandle] naming an in-memory copy.  Whenever a body has to be merged,
//! released or evaluated, the lexicon calls back through [ObjectHooks].
//!
//! ## Performance Counters
//!
//! Building with the `perf_counters` feature makes [Lexicon::perf_counters] report probe counts,
//! collision rates, rebuilds and table loads.  Without it the counters read zero and cost nothing.
//!
//! The benchmarks in `benches/` are run with `cargo bench`.
//!

mod key;
pub use key::{Key, TableId, Mask, ClassSelector, LOCAL_INDEX_MASK, TABLE_COUNT};
mod name_cleaner;
mod vocabulary;
mod hash_table;
pub use hash_table::ProbeHint;
mod records;
pub use records::{LexStatus, DiskAddr, RecordPayload, Timestamps};
mod overflow;
pub use overflow::CacheHandle;
mod table;
mod classes;
pub use classes::{ClassInfo, ClassRegistry};
mod table_config;
pub use table_config::{LexConfig};
#[cfg(feature = "bincode")]
pub use table_config::DefaultLexConfig;
mod database;
pub use database::{BlockStore, BlockName, RocksBlockStore, MemoryBlockStore};
mod encode_decode;
pub use encode_decode::Coder;
#[cfg(feature = "bincode")]
pub use encode_decode::bincode_interface::BincodeCoder;
#[cfg(feature = "msgpack")]
pub use encode_decode::msgpack_interface::MsgPackCoder;
#[cfg(feature = "bincode")]
mod bincode_helpers;
mod hooks;
pub use hooks::{ObjectHooks, NoObjectHooks};
mod error;
pub use error::{LexError, AliasError};
mod perf_counters;
pub use perf_counters::PerfCounterFields;
mod lexicon;
pub use lexicon::{Lexicon, KeyStatus, IterMode, NULL_KEY_NAME};
mod alias;
mod session;
pub use session::SessionKeySets;
mod bootstrap;

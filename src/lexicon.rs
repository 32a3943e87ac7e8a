//!
//! The Lexicon module contains the main [Lexicon] object: the table lifecycle and the key
//! identity operations.  Renaming lives in the Alias module, session diffing in the Session
//! module, and opening an old database in the Bootstrap module.
//!

use std::marker::PhantomData;

use tracing::{debug, info, warn};

use super::classes::{ClassInfo, ClassRegistry};
use super::database::{BlockName, BlockStore};
use super::error::{fatal, LexError};
use super::hash_table::{Probe, ProbeHint};
use super::hooks::{NoObjectHooks, ObjectHooks};
use super::key::{ClassSelector, Key, Mask, TableId, TABLE_COUNT};
use super::name_cleaner::clean_name;
use super::overflow::CacheHandle;
use super::perf_counters::{PerfCounterFields, PerfCounters};
use super::records::{DiskAddr, LexRecord, LexStatus, RecordPayload, Timestamps};
use super::table::{DirtyFlags, LexTable};
use super::table_config::LexConfig;
use crate::Coder;

/// What [name](Lexicon::name) returns for a key that names nothing
pub const NULL_KEY_NAME : &str = "(NULL KEY)";

/// What [exists](Lexicon::exists) knows about a key
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    /// Out of range, the null key of its table, or deleted
    Unknown,
    /// The name is registered but no object body was ever stored
    NameOnly,
    /// The key has a persisted or cached object body
    HasObject,
}

/// Which records [keys](Lexicon::keys) visits
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum IterMode {
    /// Skips deleted records and aliases
    Canonical,
    /// Skips deleted records only
    Live,
    /// Every slot after the sentinel, ignoring the subclass mask
    Raw,
}

impl IterMode {
    fn admits(&self, record : &LexRecord, mask : Mask) -> bool {
        match self {
            IterMode::Canonical => !record.is_empty() && !record.is_alias() && record.is_mask.satisfies(mask),
            IterMode::Live => !record.is_empty() && record.is_mask.satisfies(mask),
            IterMode::Raw => true,
        }
    }
}

pub(crate) enum TableSlot {
    /// Not read from storage yet
    Unloaded,
    /// Read, and storage had nothing for this class
    Absent,
    Loaded(LexTable),
}

/// Outcome of probing a class for a name, before any alias is followed
enum NameProbe {
    NoTable,
    Found(u32),
    Vacant(ProbeHint),
}

/// The identity store: maps the names of every class to stable [Key]s and back
///
/// A Lexicon exclusively owns every class table and is driven from one thread.  Tables are read
/// from the [BlockStore] the first time they are referenced.
///
/// Hot-path queries ([lookup](Self::lookup), [exists](Self::exists), [name](Self::name)) never
/// return errors.  If storage fails while they lazily read a table, or they find the table
/// corrupt, they panic.  Call [read_table](Self::read_table) beforehand to handle those errors
/// instead.
pub struct Lexicon<ConfigT : LexConfig, StoreT : BlockStore> {
    pub(crate) tables : Vec<TableSlot>,
    pub(crate) classes : ClassRegistry,
    pub(crate) store : StoreT,
    pub(crate) coder : ConfigT::CoderT,
    pub(crate) hooks : Box<dyn ObjectHooks>,
    pub(crate) session_user : Key,
    pub(crate) session_number : u32,
    pub(crate) bootstrapping : bool,
    pub(crate) perf_counters : PerfCounters,
    /// Start of the generation range the next table instance gets
    next_generation : u64,
    phantom : PhantomData<ConfigT>,
}

/// Databases are compatible within a semver-major version, or a minor version before 1.0
fn versions_compatible(found : &str, current : &str) -> bool {
    match (semver::Version::parse(found), semver::Version::parse(current)) {
        (Ok(found), Ok(current)) => {
            found.major == current.major && (current.major > 0 || found.minor == current.minor)
        },
        _ => false
    }
}

impl <ConfigT : LexConfig, StoreT : BlockStore>Lexicon<ConfigT, StoreT> {

    /// Opens the lexicon persisted in `store`, or initializes a new one if `store` is empty
    ///
    /// Fails with [LexError::MissingBootstrap] if the store holds a database old enough to need
    /// its tag definition file.  Use [open_with_legacy_tags](Self::open_with_legacy_tags) for those.
    pub fn open(store : StoreT) -> Result<Self, LexError> {
        let mut lex = Self::new_unbooted(store);
        lex.check_version()?;
        lex.read_session_counter()?;
        lex.bootstrap(None)?;
        info!(session = lex.session_number, "opened lexicon");
        Ok(lex)
    }

    pub(crate) fn new_unbooted(store : StoreT) -> Self {
        Self {
            tables : (0..TABLE_COUNT).map(|_| TableSlot::Unloaded).collect(),
            classes : ClassRegistry::new(),
            store,
            coder : ConfigT::CoderT::new(),
            hooks : Box::new(NoObjectHooks),
            session_user : Key::NULL,
            session_number : 0,
            bootstrapping : false,
            perf_counters : PerfCounters::new(),
            next_generation : 0,
            phantom : PhantomData,
        }
    }

    pub(crate) fn check_version(&mut self) -> Result<(), LexError> {
        let current = env!("CARGO_PKG_VERSION");
        match self.store.read_block(BlockName::Version)? {
            Some(bytes) => {
                let found = String::from_utf8(bytes).map_err(|_| LexError::Corrupt {
                    table : TableId::SYSTEM,
                    detail : "version block is not utf-8".to_string(),
                })?;
                if !versions_compatible(&found, current) {
                    return Err(LexError::IncompatibleVersion { found, expected : current.to_string() });
                }
            },
            None => {
                if self.store.is_write_access() {
                    self.store.write_block(BlockName::Version, current.as_bytes())?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn read_session_counter(&mut self) -> Result<(), LexError> {
        if let Some(bytes) = self.store.read_block(BlockName::SessionCounter)? {
            self.session_number = self.coder.decode_fmt1_from_bytes(&bytes).map_err(LexError::Codec)?;
        }
        Ok(())
    }

    /// Replaces the collaborator that owns object bodies
    pub fn with_hooks<HooksT : ObjectHooks + 'static>(mut self, hooks : HooksT) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Returns the version of the crate that created the database
    pub fn get_version(&self) -> Result<Option<String>, LexError> {
        match self.store.read_block(BlockName::Version)? {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None)
        }
    }

    pub fn store(&self) -> &StoreT {
        &self.store
    }

    /// Gives back the store, without saving
    pub fn into_store(self) -> StoreT {
        self.store
    }

    pub fn class_info(&self, table : TableId) -> &ClassInfo {
        self.classes.get(table)
    }

    /// Sets the metadata of a class.  Changing the case sensitivity of a loaded class rebuilds
    /// its hash
    pub fn define_class(&mut self, table : TableId, info : ClassInfo) -> Result<(), LexError> {
        let case_changed = self.classes.get(table).case_sensitive != info.case_sensitive;
        let case_sensitive = info.case_sensitive;
        self.classes.define(table, info);
        if case_changed {
            if let TableSlot::Loaded(lex_table) = &mut self.tables[table.index()] {
                lex_table.rehash::<ConfigT>(case_sensitive, &self.perf_counters)?;
            }
        }
        Ok(())
    }

    /// Names a subclass: the records of `base` whose subclass mask contains `mask`
    pub fn define_subclass(&mut self, name : &str, base : TableId, mask : Mask) {
        self.classes.define_subclass(name, base, mask);
    }

    /// Resolves a class or subclass name into a selector
    pub fn subclass(&self, name : &str) -> Option<ClassSelector> {
        self.classes.selector(name)
    }

    /// The key of the session object stamped on created and updated records
    pub fn set_session_user(&mut self, user : Key) {
        self.session_user = user;
    }

    pub fn session_user(&self) -> Key {
        self.session_user
    }

    /// While bootstrapping, the class registry table accepts new keys
    pub fn set_bootstrapping(&mut self, bootstrapping : bool) {
        self.bootstrapping = bootstrapping;
    }

    pub fn perf_counters(&self) -> PerfCounterFields {
        self.perf_counters.get()
    }

    pub fn reset_perf_counters(&self) {
        self.perf_counters.reset()
    }

    /// Reads the table of a class from storage, if it isn't loaded already
    pub fn read_table(&mut self, table : TableId) -> Result<(), LexError> {
        if !matches!(self.tables[table.index()], TableSlot::Unloaded) {
            return Ok(());
        }
        let generation = self.generation_range();
        let info = self.classes.get(table);
        let loaded = LexTable::load::<ConfigT, StoreT>(table, &self.store, &self.coder, info.case_sensitive, info.timestamps, generation, &self.perf_counters)?;
        self.perf_counters.update(|fields| fields.table_load_count += 1);
        self.tables[table.index()] = match loaded {
            Some(lex_table) => TableSlot::Loaded(lex_table),
            None => {
                debug!(table = %table, "no persisted table");
                TableSlot::Absent
            }
        };
        Ok(())
    }

    /// Returns `true` if the table of a class is in memory
    pub fn is_loaded(&self, table : TableId) -> bool {
        matches!(self.tables[table.index()], TableSlot::Loaded(_))
    }

    /// Every table instance counts its hash generations from its own base, so a [ProbeHint]
    /// taken before a table was cleared and read back can never match the new instance
    fn generation_range(&mut self) -> u64 {
        let base = self.next_generation;
        self.next_generation += 1 << 32;
        base
    }

    /// Lazy load for the paths that can't return errors
    pub(crate) fn load_or_die(&mut self, table : TableId) {
        if let Err(err) = self.read_table(table) {
            fatal(err)
        }
    }

    pub(crate) fn loaded(&self, table : TableId) -> Option<&LexTable> {
        match &self.tables[table.index()] {
            TableSlot::Loaded(lex_table) => Some(lex_table),
            _ => None
        }
    }

    pub(crate) fn loaded_mut(&mut self, table : TableId) -> Result<&mut LexTable, LexError> {
        match &mut self.tables[table.index()] {
            TableSlot::Loaded(lex_table) => Ok(lex_table),
            _ => Err(LexError::Corrupt { table, detail : "table is not loaded".to_string() })
        }
    }

    /// Loads the table of a class, creating it if storage has nothing.  A new tree-typed class
    /// registers its `?ClassName` model root
    pub(crate) fn ensure_table(&mut self, table : TableId) -> Result<&mut LexTable, LexError> {
        self.read_table(table)?;
        if let TableSlot::Absent = self.tables[table.index()] {
            let info = self.classes.get(table).clone();
            let generation = self.generation_range();
            self.tables[table.index()] = TableSlot::Loaded(LexTable::fresh::<ConfigT>(table, info.timestamps, generation));
            debug!(table = %table, class = %info.name, "initialized empty table");
            if info.tree_typed && table != TableId::MODEL {
                self.ensure(&info.model_name(), TableId::MODEL)?;
            }
        }
        self.loaded_mut(table)
    }

    /// Makes `key`'s record reachable under its current name
    pub(crate) fn hash_key(&mut self, key : Key) -> Result<(), LexError> {
        let table = key.table();
        let case_sensitive = self.classes.get(table).case_sensitive;
        match &mut self.tables[table.index()] {
            TableSlot::Loaded(lex_table) => lex_table.insert_into_hash::<ConfigT>(key.index(), case_sensitive, &self.perf_counters),
            _ => Err(LexError::Corrupt { table, detail : "hash insert into an unloaded table".to_string() })
        }
    }

    fn probe_name(&mut self, text : &str, table : TableId) -> NameProbe {
        self.load_or_die(table);
        let case_sensitive = self.classes.get(table).case_sensitive;
        let lex_table = match &self.tables[table.index()] {
            TableSlot::Loaded(lex_table) => lex_table,
            _ => return NameProbe::NoTable
        };
        match lex_table.probe(text, case_sensitive, &self.perf_counters) {
            Ok(Probe::Found { index, .. }) => NameProbe::Found(index),
            Ok(Probe::Vacant { hint, .. }) => NameProbe::Vacant(hint),
            Err(_) => fatal(LexError::HashTableFull { table }),
        }
    }

    fn mask_of(&self, key : Key) -> Mask {
        self.loaded(key.table())
            .and_then(|lex_table| lex_table.record(key.index()))
            .map(|record| record.is_mask)
            .unwrap_or_default()
    }

    /// Finds the key for `name`, following aliases to the canonical key
    ///
    /// Returns `None` for an empty name, an unpopulated class, or a name whose record isn't in
    /// the subclass `selector` asks for.
    pub fn lookup<S : Into<ClassSelector>>(&mut self, name : &str, selector : S) -> Option<Key> {
        self.lookup_hinted(name, selector).0
    }

    /// Same as [lookup](Self::lookup), and on a miss also returns a [ProbeHint] that lets an
    /// immediately following [ensure_hinted](Self::ensure_hinted) of the same name skip its probe
    ///
    /// A name that exists but fails the subclass mask yields neither a key nor a hint.
    pub fn lookup_hinted<S : Into<ClassSelector>>(&mut self, name : &str, selector : S) -> (Option<Key>, Option<ProbeHint>) {
        let (table, mask) = selector.into().resolve();
        let text = clean_name(name);
        if text.is_empty() {
            return (None, None);
        }
        match self.probe_name(text, table) {
            NameProbe::Found(index) => {
                let canonical = self.alias_of(Key::new(table, index));
                if self.exists_naked(canonical) == KeyStatus::Unknown {
                    return (None, None);
                }
                if self.mask_of(canonical).satisfies(mask) {
                    (Some(canonical), None)
                } else {
                    (None, None)
                }
            },
            NameProbe::Vacant(hint) => (None, Some(hint)),
            NameProbe::NoTable => (None, None),
        }
    }

    /// Finds the record holding `name`, without following aliases
    pub fn lookup_naked<S : Into<ClassSelector>>(&mut self, name : &str, selector : S) -> Option<Key> {
        let (table, mask) = selector.into().resolve();
        let text = clean_name(name);
        if text.is_empty() {
            return None;
        }
        match self.probe_name(text, table) {
            NameProbe::Found(index) => {
                let key = Key::new(table, index);
                let live = self.exists_naked(key) != KeyStatus::Unknown;
                (live && self.mask_of(key).satisfies(mask)).then_some(key)
            },
            _ => None
        }
    }

    /// Returns the key for `name`, registering the name if it's new
    ///
    /// The subclass mask of `selector` is not applied: a name already registered in the base
    /// class is returned as is, since names are unique per class.  An empty name only makes
    /// sure the class has a table, and returns its null key.
    pub fn ensure<S : Into<ClassSelector>>(&mut self, name : &str, selector : S) -> Result<Key, LexError> {
        self.ensure_hinted(name, selector, None)
    }

    /// Same as [ensure](Self::ensure), inserting at the slot remembered by `hint` when it is still
    /// valid for this name
    pub fn ensure_hinted<S : Into<ClassSelector>>(&mut self, name : &str, selector : S, hint : Option<ProbeHint>) -> Result<Key, LexError> {
        let table = selector.into().table();
        let text = clean_name(name);
        if text.is_empty() {
            self.ensure_table(table)?;
            return Ok(Key::new(table, 0));
        }
        let case_sensitive = self.classes.get(table).case_sensitive;

        //A still-valid hint proves the name is absent, so we can skip the lookup
        let caller_hint = match (hint, self.loaded(table)) {
            (Some(hint), Some(lex_table)) if lex_table.hash().hint_is_valid(&hint, text, case_sensitive) => Some(hint),
            _ => None
        };
        let hint = match caller_hint {
            Some(hint) => Some(hint),
            None => {
                let (found, probed) = self.lookup_hinted(text, table);
                if let Some(key) = found {
                    return Ok(key);
                }
                probed
            }
        };

        if table == TableId::MAIN_CLASSES && !self.bootstrapping {
            return Err(LexError::ReadOnlyClass { table });
        }

        let user = self.session_user;
        self.ensure_table(table)?;
        let lex_table = match &mut self.tables[table.index()] {
            TableSlot::Loaded(lex_table) => lex_table,
            _ => return Err(LexError::Corrupt { table, detail : "table vanished during insert".to_string() })
        };
        let index = lex_table.push_record::<ConfigT>(text)?;
        let hinted = match hint {
            Some(hint) => lex_table.fill_hinted::<ConfigT>(&hint, index, case_sensitive),
            None => false
        };
        if hinted {
            self.perf_counters.update(|fields| fields.hint_reuse_count += 1);
        } else {
            lex_table.insert_into_hash::<ConfigT>(index, case_sensitive, &self.perf_counters)?;
        }
        lex_table.stamp(index, user, true);

        Ok(Key::new(table, index))
    }

    /// What is known about `key`, after following aliases
    pub fn exists(&mut self, key : Key) -> KeyStatus {
        let canonical = self.alias_of(key);
        self.exists_naked(canonical)
    }

    /// What is known about `key`'s own record
    pub fn exists_naked(&mut self, key : Key) -> KeyStatus {
        if key.is_null() {
            return KeyStatus::Unknown;
        }
        self.load_or_die(key.table());
        let lex_table = match self.loaded(key.table()) {
            Some(lex_table) => lex_table,
            None => return KeyStatus::Unknown
        };
        match lex_table.record(key.index()) {
            Some(record) if !record.is_empty() => {},
            _ => return KeyStatus::Unknown
        }
        let disk = lex_table.disk_of(key.index()).unwrap_or_else(|err| fatal(err));
        let cache = lex_table.cache_of(key.index()).unwrap_or_else(|err| fatal(err));
        if cache.is_some() || !disk.is_null() {
            KeyStatus::HasObject
        } else {
            KeyStatus::NameOnly
        }
    }

    /// The name of `key`, after following aliases.  Returns [NULL_KEY_NAME] for a key that names nothing
    pub fn name(&mut self, key : Key) -> String {
        let canonical = self.alias_of(key);
        self.name_naked(canonical)
    }

    /// The name held by `key`'s own record
    pub fn name_naked(&mut self, key : Key) -> String {
        if self.exists_naked(key) == KeyStatus::Unknown {
            return NULL_KEY_NAME.to_string();
        }
        match self.loaded(key.table()).and_then(|lex_table| lex_table.name_at(key.index())) {
            Some(text) => text.to_string(),
            None => fatal(LexError::Corrupt {
                table : key.table(),
                detail : format!("record {} names an offset outside the vocabulary", key.index()),
            })
        }
    }

    /// `Class:name`, the unambiguous spelling of a key
    pub fn name_with_class(&mut self, key : Key) -> String {
        let name = self.name(key);
        format!("{}:{}", self.classes.get(key.table()).name, name)
    }

    /// The class of `key`.  Aliases never cross classes
    pub fn class_of(&self, key : Key) -> TableId {
        key.table()
    }

    /// Deletes `key`: the record stays, marked EMPTY, and its name stops matching.  Returns
    /// `false` if there was nothing to delete
    pub fn delete(&mut self, key : Key) -> bool {
        if key.is_null() {
            return false;
        }
        self.load_or_die(key.table());
        let user = self.session_user;
        let index = key.index();
        let lex_table = match &mut self.tables[key.table().index()] {
            TableSlot::Loaded(lex_table) => lex_table,
            _ => return false
        };
        match lex_table.record(index) {
            Some(record) if !record.is_empty() => {},
            _ => return false
        }

        let aliased = lex_table.record(index).is_some_and(|record| record.status.contains(LexStatus::IS_ALIAS));
        let released = lex_table.set_cache(index, None).unwrap_or_else(|err| fatal(err));
        lex_table.blank_name(index);
        if let Some(record) = lex_table.record_mut(index) {
            record.status.remove(LexStatus::ALIAS | LexStatus::IS_ALIAS);
            record.status.insert(LexStatus::EMPTY | LexStatus::TOUCH);
            record.payload = RecordPayload::Disk(DiskAddr::NULL);
            record.is_mask = Mask::NONE;
        }
        lex_table.stamp(index, user, false);

        //Names kept by aliases of a deleted key must not lead back to it
        if aliased {
            for orphan in lex_table.aliases_leading_to(index) {
                lex_table.blank_name(orphan);
                if let Some(record) = lex_table.record_mut(orphan) {
                    record.status.remove(LexStatus::ALIAS | LexStatus::IS_ALIAS);
                    record.status.insert(LexStatus::EMPTY | LexStatus::TOUCH);
                    record.payload = RecordPayload::Disk(DiskAddr::NULL);
                }
                lex_table.stamp(orphan, user, false);
                debug!(key = %Key::new(key.table(), orphan), deleted = %key, "retired alias of deleted key");
            }
        }
        lex_table.mark_dirty(DirtyFlags::RECORDS);

        if let Some(handle) = released {
            self.hooks.release_cache(handle);
        }
        true
    }

    /// Takes the edit lock on `key`.  Returns `false` if it is already held or the key names nothing
    pub fn lock(&mut self, key : Key) -> bool {
        let canonical = self.alias_of(key);
        if self.exists_naked(canonical) == KeyStatus::Unknown {
            return false;
        }
        match self.record_mut(canonical) {
            Some(record) if !record.is_locked() => {
                record.status.insert(LexStatus::LOCK);
                true
            },
            _ => false
        }
    }

    pub fn unlock(&mut self, key : Key) {
        let canonical = self.alias_of(key);
        match self.record_mut(canonical) {
            Some(record) if record.is_locked() => record.status.remove(LexStatus::LOCK),
            _ => warn!(key = %canonical, "unlocking a key that is not locked"),
        }
    }

    pub fn is_locked(&mut self, key : Key) -> bool {
        let canonical = self.alias_of(key);
        self.loaded(canonical.table())
            .and_then(|lex_table| lex_table.record(canonical.index()))
            .map(|record| record.is_locked())
            .unwrap_or(false)
    }

    fn record_mut(&mut self, key : Key) -> Option<&mut LexRecord> {
        match &mut self.tables[key.table().index()] {
            TableSlot::Loaded(lex_table) => lex_table.record_mut(key.index()),
            _ => None
        }
    }

    /// Points `key` at its persisted object body.  Returns `false` if the key names nothing
    pub fn set_disk(&mut self, key : Key, addr : DiskAddr) -> bool {
        let canonical = self.alias_of(key);
        if self.exists_naked(canonical) == KeyStatus::Unknown {
            return false;
        }
        if let Ok(lex_table) = self.loaded_mut(canonical.table()) {
            lex_table.set_disk(canonical.index(), addr).unwrap_or_else(|err| fatal(err));
        }
        self.touch(canonical);
        true
    }

    /// The address of `key`'s persisted object body, [DiskAddr::NULL] if it has none
    pub fn disk(&mut self, key : Key) -> DiskAddr {
        let canonical = self.alias_of(key);
        if self.exists_naked(canonical) == KeyStatus::Unknown {
            return DiskAddr::NULL;
        }
        self.loaded(canonical.table())
            .map(|lex_table| lex_table.disk_of(canonical.index()).unwrap_or_else(|err| fatal(err)))
            .unwrap_or_default()
    }

    /// Attaches (`Some`) or detaches (`None`) the in-memory body of `key`.  Returns the handle
    /// previously attached, which the caller now owns
    pub fn set_cache(&mut self, key : Key, handle : Option<CacheHandle>) -> Option<CacheHandle> {
        let canonical = self.alias_of(key);
        if self.exists_naked(canonical) == KeyStatus::Unknown {
            return None;
        }
        self.loaded_mut(canonical.table()).ok()
            .and_then(|lex_table| lex_table.set_cache(canonical.index(), handle).unwrap_or_else(|err| fatal(err)))
    }

    pub fn cache(&mut self, key : Key) -> Option<CacheHandle> {
        let canonical = self.alias_of(key);
        self.loaded(canonical.table())
            .and_then(|lex_table| lex_table.cache_of(canonical.index()).unwrap_or_else(|err| fatal(err)))
    }

    /// Marks `key` as modified in this session
    pub fn touch(&mut self, key : Key) {
        let canonical = self.alias_of(key);
        let user = self.session_user;
        if let Ok(lex_table) = self.loaded_mut(canonical.table()) {
            if let Some(record) = lex_table.record_mut(canonical.index()) {
                record.status.insert(LexStatus::TOUCH);
                lex_table.stamp(canonical.index(), user, false);
            }
        }
    }

    /// The created/updated stamps of `key`, for classes that keep them
    pub fn timestamps(&mut self, key : Key) -> Option<Timestamps> {
        let canonical = self.alias_of(key);
        self.loaded(canonical.table())?.timestamps(canonical.index())
    }

    /// Stores the subclass membership of `key`, as evaluated by the object layer when the body
    /// is saved.  Returns `false` if the key names nothing
    pub fn set_is_mask(&mut self, key : Key, mask : Mask) -> bool {
        let canonical = self.alias_of(key);
        if self.exists_naked(canonical) == KeyStatus::Unknown {
            return false;
        }
        match self.loaded_mut(canonical.table()) {
            Ok(lex_table) => {
                if let Some(record) = lex_table.record_mut(canonical.index()) {
                    record.is_mask = mask;
                }
                lex_table.mark_dirty(DirtyFlags::RECORDS);
                true
            },
            Err(_) => false
        }
    }

    /// Number of slots in the hash table of a class, 0 if the class has no table
    pub fn hash_table_size(&mut self, table : TableId) -> usize {
        self.load_or_die(table);
        self.loaded(table).map(|lex_table| lex_table.hash().size()).unwrap_or(0)
    }

    /// The status bits of `key`'s own record
    pub fn status(&mut self, key : Key) -> Option<LexStatus> {
        self.load_or_die(key.table());
        self.loaded(key.table())?.record(key.index()).map(|record| record.status)
    }

    /// Number of records in a class, including the null key and deleted records
    pub fn record_count(&mut self, table : TableId) -> usize {
        self.load_or_die(table);
        self.loaded(table).map(|lex_table| lex_table.len()).unwrap_or(0)
    }

    /// The keys of a class in ascending order
    pub fn keys<S : Into<ClassSelector>>(&mut self, selector : S, mode : IterMode) -> impl Iterator<Item=Key> + '_ {
        let (table, mask) = selector.into().resolve();
        self.load_or_die(table);
        let records : &[LexRecord] = match self.loaded(table) {
            Some(lex_table) => lex_table.records(),
            None => &[]
        };
        records.iter().enumerate().skip(1)
            .filter(move |(_, record)| mode.admits(record, mask))
            .map(move |(index, _)| Key::new(table, index as u32))
    }

    /// Writes every dirty table.  The global table is always written
    ///
    /// Does nothing without write access.
    pub fn save(&mut self) -> Result<(), LexError> {
        if !self.store.is_write_access() {
            debug!("no write access, save skipped");
            return Ok(());
        }
        for (t, slot) in self.tables.iter_mut().enumerate() {
            if let TableSlot::Loaded(lex_table) = slot {
                lex_table.save::<ConfigT, StoreT>(&mut self.store, &self.coder, t == TableId::GLOBAL.index())?;
            }
        }
        Ok(())
    }

    /// Drops a class table from memory, discarding unsaved changes.  It is read back on next use
    pub fn clear_table(&mut self, table : TableId) -> Result<(), LexError> {
        if table.is_bootstrap() {
            return Err(LexError::BootstrapTable { table });
        }
        let slot = std::mem::replace(&mut self.tables[table.index()], TableSlot::Unloaded);
        if let TableSlot::Loaded(lex_table) = slot {
            if !lex_table.dirty().is_empty() {
                warn!(table = %table, dirty = ?lex_table.dirty(), "clearing a table with unsaved changes");
            }
            for handle in lex_table.cache_handles() {
                self.hooks.release_cache(handle);
            }
        }
        Ok(())
    }

    /// Drops every non-bootstrap table from memory
    pub fn clear(&mut self) -> Result<(), LexError> {
        for t in 0..TABLE_COUNT {
            let table = TableId(t as u8);
            if !table.is_bootstrap() {
                self.clear_table(table)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_compatibility() {
        assert!(versions_compatible("0.4.0", "0.4.3"));
        assert!(!versions_compatible("0.3.9", "0.4.0"));
        assert!(versions_compatible("1.2.0", "1.9.1"));
        assert!(!versions_compatible("1.2.0", "2.0.0"));
        assert!(!versions_compatible("garbage", "0.4.0"));
    }
}

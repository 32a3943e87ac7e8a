//!
//! The Alias module contains renaming, aliasing and object fusion for [Lexicon]
//!

use tracing::debug;

use super::database::BlockStore;
use super::error::{fatal, AliasError, LexError};
use super::key::{Key, Mask};
use super::lexicon::{KeyStatus, Lexicon};
use super::name_cleaner::{clean_name, is_case_only_change};
use super::records::{DiskAddr, LexStatus};
use super::table::DirtyFlags;
use super::table_config::LexConfig;

/// What a rename needs to know about one of the two records involved
struct RecordState {
    name : String,
    status : LexStatus,
    has_body : bool,
}

impl <ConfigT : LexConfig, StoreT : BlockStore>Lexicon<ConfigT, StoreT> {

    /// Follows the alias chain from `key` to the key holding the object.  Returns `key` itself
    /// if it is not an alias
    ///
    /// Panics if the chain loops, which only a corrupt table can cause.
    pub fn alias_of(&mut self, key : Key) -> Key {
        self.load_or_die(key.table());
        let lex_table = match self.loaded(key.table()) {
            Some(lex_table) => lex_table,
            None => return key
        };
        let mut current = key;
        for _ in 0..lex_table.len() {
            match lex_table.record(current.index()).and_then(|record| record.alias_target()) {
                Some(next) => current = next,
                None => return current
            }
        }
        fatal(LexError::AliasLoop { key })
    }

    /// Returns `true` if aliasing `from` to `to` would close a loop, i.e. `to` already leads
    /// back to `from`
    pub fn would_loop(&mut self, from : Key, to : Key) -> bool {
        if from == to {
            return true;
        }
        self.load_or_die(to.table());
        let lex_table = match self.loaded(to.table()) {
            Some(lex_table) => lex_table,
            None => return false
        };
        let mut current = to;
        for _ in 0..lex_table.len() {
            match lex_table.record(current.index()).and_then(|record| record.alias_target()) {
                Some(next) if next == from => return true,
                Some(next) => current = next,
                None => return false
            }
        }
        true
    }

    fn record_state(&self, key : Key) -> Option<RecordState> {
        let lex_table = self.loaded(key.table())?;
        let record = lex_table.record(key.index())?;
        let disk = lex_table.disk_of(key.index()).unwrap_or_else(|err| fatal(err));
        let cache = lex_table.cache_of(key.index()).unwrap_or_else(|err| fatal(err));
        Some(RecordState {
            name : lex_table.name_at(key.index()).unwrap_or_default().to_string(),
            status : record.status,
            has_body : !disk.is_null() || cache.is_some(),
        })
    }

    /// Renames `key` to `new_name`
    ///
    /// If no other key holds `new_name`, `key` simply takes it.  Otherwise the two keys are
    /// joined: one becomes an alias of the other, and if both have object bodies the bodies are
    /// fused through [ObjectHooks::fuse_objects](crate::ObjectHooks::fuse_objects), the key
    /// already holding `new_name` winning any conflict.  `interactive` asks
    /// [ObjectHooks::confirm](crate::ObjectHooks::confirm) before a fusion.  With
    /// `keep_old_name` the old name stays registered and resolves to the surviving key.
    ///
    /// On error nothing has changed.
    pub fn rename(&mut self, key : Key, new_name : &str, interactive : bool, keep_old_name : bool) -> Result<(), AliasError> {
        let table = key.table();
        self.read_table(table)?;
        let case_sensitive = self.classes.get(table).case_sensitive;

        //Only a live, unaliased record can be renamed, and not while another session holds it
        let old = match self.record_state(key) {
            Some(state) if !key.is_null() && !state.status.intersects(LexStatus::EMPTY | LexStatus::ALIAS) => state,
            _ => return Err(AliasError::NotRenamable { name : self.name_naked(key) })
        };
        if old.status.contains(LexStatus::LOCK) {
            return Err(AliasError::Locked { name : old.name });
        }
        let new_text = clean_name(new_name);
        if new_text.is_empty() {
            return Err(AliasError::NotRenamable { name : old.name });
        }
        if new_text == old.name {
            return Ok(());
        }

        //Case-only change: same hash, same slot
        if !case_sensitive && is_case_only_change(&old.name, new_text) {
            self.loaded_mut(table)?.rename_text::<ConfigT>(key.index(), new_text)?;
            self.finish_rename(key);
            return Ok(());
        }

        //Hard rename: the name is free and the old one goes away
        let existing = self.lookup_naked(new_text, table);
        if existing.is_none() && !keep_old_name {
            self.loaded_mut(table)?.rename_text::<ConfigT>(key.index(), new_text)?;
            self.hash_key(key)?;
            self.finish_rename(key);
            debug!(key = %key, from = %old.name, to = new_text, "renamed");
            return Ok(());
        }

        //Two keys must coexist
        if let Some(found) = existing {
            if self.would_loop(key, found) {
                return Err(AliasError::WouldLoop { from : old.name, to : new_text.to_string() });
            }
        }
        let (target, swappable) = match existing {
            Some(found) => {
                let canonical = self.alias_of(found);
                (canonical, canonical == found)
            },
            None => (self.ensure(new_text, table)?, true)
        };
        let target_state = match self.record_state(target) {
            Some(state) if !state.status.contains(LexStatus::EMPTY) => state,
            _ => return Err(AliasError::NotRenamable { name : new_text.to_string() })
        };
        if target_state.status.contains(LexStatus::LOCK) {
            return Err(AliasError::Locked { name : target_state.name });
        }

        let survivor = if !old.has_body {
            self.make_alias(key, target, keep_old_name)?;
            target
        } else if !target_state.has_body && swappable {
            //Move the name rather than the body: `key` takes over the target's name and the
            //target, holding the old name, becomes the alias
            self.loaded_mut(table)?.swap_names(key.index(), target.index());
            self.make_alias(target, key, keep_old_name)?;
            self.hash_key(key)?;
            if keep_old_name {
                self.hash_key(target)?;
            }
            key
        } else if !target_state.has_body {
            //The target is itself reached through an alias, so its name can't move.  Hand it the body
            let disk = self.disk(key);
            let cache = self.set_cache(key, None);
            let lex_table = self.loaded_mut(table)?;
            lex_table.set_disk(key.index(), DiskAddr::NULL)?;
            lex_table.set_disk(target.index(), disk)?;
            lex_table.set_cache(target.index(), cache)?;
            self.make_alias(key, target, keep_old_name)?;
            target
        } else {
            self.fuse(key, target, &old.name, &target_state.name, interactive)?;
            self.make_alias(key, target, keep_old_name)?;
            target
        };

        self.finish_rename(survivor);
        self.touch(key);
        debug!(key = %key, survivor = %survivor, from = %old.name, to = new_text, "aliased");
        Ok(())
    }

    /// Merges `key`'s body into `target`'s and drops `key`'s
    fn fuse(&mut self, key : Key, target : Key, name : &str, target_name : &str, interactive : bool) -> Result<(), AliasError> {
        let class = self.classes.get(key.table()).clone();
        if !self.hooks.can_fuse(&class) {
            return Err(AliasError::CannotMerge {
                from : name.to_string(),
                to : target_name.to_string(),
                class : class.name,
            });
        }
        if interactive {
            let question = format!("Both {name} and {target_name} exist. In case of conflict I will keep the data of {target_name}. Proceed?");
            if !self.hooks.confirm(&question) {
                return Err(AliasError::UserDeclined { from : name.to_string(), to : target_name.to_string() });
            }
        }
        self.hooks.fuse_objects(key, target).map_err(|detail| AliasError::FusionFailed {
            from : name.to_string(),
            to : target_name.to_string(),
            detail,
        })?;

        if let Some(handle) = self.set_cache(key, None) {
            self.hooks.release_cache(handle);
        }
        self.loaded_mut(key.table())?.set_disk(key.index(), DiskAddr::NULL)?;
        Ok(())
    }

    /// Turns `from` into an alias of `to`.  Without `keep_name`, `from`'s name stops matching
    fn make_alias(&mut self, from : Key, to : Key, keep_name : bool) -> Result<(), LexError> {
        if let Some(handle) = self.set_cache(from, None) {
            self.hooks.release_cache(handle);
        }
        let lex_table = self.loaded_mut(from.table())?;
        if let Some(record) = lex_table.record_mut(from.index()) {
            record.set_alias(to);
            record.is_mask = Mask::NONE;
            record.status.insert(LexStatus::TOUCH);
        }
        if let Some(record) = lex_table.record_mut(to.index()) {
            record.status.insert(LexStatus::IS_ALIAS);
        }
        if !keep_name {
            lex_table.blank_name(from.index());
        }
        lex_table.mark_dirty(DirtyFlags::RECORDS);
        Ok(())
    }

    /// Recomputes the subclass mask of the key that came out of a rename, and touches it
    fn finish_rename(&mut self, survivor : Key) {
        if self.classes.get(survivor.table()).has_constraints && self.exists_naked(survivor) != KeyStatus::Unknown {
            let mask = self.hooks.compute_is_mask(survivor);
            if let Ok(lex_table) = self.loaded_mut(survivor.table()) {
                if let Some(record) = lex_table.record_mut(survivor.index()) {
                    record.is_mask = mask;
                }
                lex_table.mark_dirty(DirtyFlags::RECORDS);
            }
        }
        self.touch(survivor);
    }
}

//!
//! The Bootstrap module contains everything that brings up the system tables of a [Lexicon]:
//! fresh initialization, hard-defined tags, and replay of the tag definition file an old
//! database was built from.
//!

use std::path::Path;

use tracing::{info, warn};

use super::database::{BlockName, BlockStore};
use super::error::LexError;
use super::key::{Key, TableId};
use super::lexicon::{Lexicon, NULL_KEY_NAME};
use super::name_cleaner::{clean_name, names_equal};
use super::records::LexStatus;
use super::table::DirtyFlags;
use super::table_config::LexConfig;

/// Parses a tag definition file: one `name index` pair per line.  Blank lines and everything
/// after `//` are ignored
fn parse_tag_definitions(text : &str) -> Result<Vec<(String, u32)>, LexError> {
    let mut tags = vec![];
    for (line_no, line) in text.lines().enumerate() {
        let line = match line.find("//") {
            Some(comment) => &line[..comment],
            None => line
        }.trim();
        if line.is_empty() {
            continue;
        }
        let malformed = || LexError::Corrupt {
            table : TableId::SYSTEM,
            detail : format!("tag file line {}: expected `name index`, found `{line}`", line_no + 1),
        };
        let mut fields = line.split_whitespace();
        let (Some(name), Some(index), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(malformed());
        };
        let index : u32 = index.parse().map_err(|_| malformed())?;
        tags.push((name.to_string(), index));
    }
    Ok(tags)
}

impl <ConfigT : LexConfig, StoreT : BlockStore>Lexicon<ConfigT, StoreT> {

    /// Opens the lexicon persisted in `store`.  If the system tags were never persisted, they
    /// are defined from the tag definition file at `tag_file`
    pub fn open_with_legacy_tags<P : AsRef<Path>>(store : StoreT, tag_file : P) -> Result<Self, LexError> {
        let mut lex = Self::new_unbooted(store);
        lex.check_version()?;
        lex.read_session_counter()?;
        lex.bootstrap(Some(tag_file.as_ref()))?;
        info!(session = lex.session_number, "opened lexicon");
        Ok(lex)
    }

    /// Loads the system and global tables, initializing them if the database is new
    pub(crate) fn bootstrap(&mut self, tag_file : Option<&Path>) -> Result<(), LexError> {

        //The records block is written on the first save even when no tag has been defined
        let system_persisted = self.store.read_block(BlockName::Records(TableId::SYSTEM))?.is_some();
        let global_persisted = self.store.read_block(BlockName::Vocabulary(TableId::GLOBAL))?.is_some();

        if !system_persisted && global_persisted && tag_file.is_none() {
            return Err(LexError::MissingBootstrap {
                detail : "the database has a global vocabulary but no system tags".to_string(),
            });
        }

        self.ensure_table(TableId::SYSTEM)?;
        self.ensure_table(TableId::GLOBAL)?;

        if !system_persisted {
            if let Some(path) = tag_file {
                let text = match std::fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(LexError::MissingBootstrap {
                        detail : format!("{}: {err}", path.display()),
                    }),
                    Err(err) => return Err(err.into())
                };
                let tags = parse_tag_definitions(&text)?;
                let was_bootstrapping = self.bootstrapping;
                self.bootstrapping = true;
                let result = tags.iter().try_for_each(|(name, index)| self.hard_define(name, TableId::SYSTEM, *index).map(|_| ()));
                self.bootstrapping = was_bootstrapping;
                result?;
                info!(tags = tags.len(), file = %path.display(), "replayed tag definition file");
            } else {
                info!("initialized new database");
            }
        }
        Ok(())
    }

    /// Gives `name` the exact key `table:index`, the way built-in tags are defined
    ///
    /// Indices below `index` that don't exist yet are filled with empty placeholders.  If
    /// `name` is already registered at another index, it is moved and the old record is blanked.
    /// Fails if `table:index` already holds a different name.
    pub fn hard_define(&mut self, name : &str, table : TableId, index : u32) -> Result<Key, LexError> {
        let text = clean_name(name);
        let wanted = Key::new(table, index);
        if text.is_empty() || index == 0 {
            return Err(LexError::DefineConflict {
                table,
                index,
                name : text.to_string(),
                existing : NULL_KEY_NAME.to_string(),
            });
        }
        if index as usize > ConfigT::MAX_RECORDS {
            return Err(LexError::TableFull { table, max : ConfigT::MAX_RECORDS });
        }
        let case_sensitive = self.classes.get(table).case_sensitive;

        //Refuse before changing anything
        let lex_table = self.ensure_table(table)?;
        if let Some(record) = lex_table.record(index) {
            let existing = lex_table.name_at(index).unwrap_or_default();
            //A live alias is taken even when its name was dropped
            let taken = record.is_alias() || !existing.is_empty();
            if !record.is_empty() && taken && !names_equal(existing, text, case_sensitive) {
                let existing = match record.alias_target() {
                    Some(target) if existing.is_empty() => format!("alias of {target}"),
                    _ => existing.to_string()
                };
                return Err(LexError::DefineConflict {
                    table,
                    index,
                    name : text.to_string(),
                    existing,
                });
            }
        }

        match self.lookup_naked(text, table) {
            Some(found) if found == wanted => return Ok(wanted),
            Some(found) => {
                warn!(name = text, from = %found, to = %wanted, "tag renumbered");
                let lex_table = self.loaded_mut(table)?;
                lex_table.blank_name(found.index());
                if let Some(record) = lex_table.record_mut(found.index()) {
                    record.status.insert(LexStatus::EMPTY);
                }
                lex_table.mark_dirty(DirtyFlags::RECORDS);
            },
            None => {}
        }

        let lex_table = self.loaded_mut(table)?;
        while lex_table.len() <= index as usize {
            lex_table.push_placeholder::<ConfigT>()?;
        }
        lex_table.name_placeholder::<ConfigT>(index, text)?;
        self.hash_key(wanted)?;
        Ok(wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_file_parsing() {
        let text = "// system tags\n\n_Tag1 1\n  _Tag2   7 // trailing comment\n";
        let tags = parse_tag_definitions(text).unwrap();
        assert_eq!(tags, vec![("_Tag1".to_string(), 1), ("_Tag2".to_string(), 7)]);

        assert!(parse_tag_definitions("_Tag1").is_err());
        assert!(parse_tag_definitions("_Tag1 one").is_err());
        assert!(parse_tag_definitions("_Tag1 1 2").is_err());
    }
}

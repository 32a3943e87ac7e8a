//!
//! The Session module contains the session boundaries of a [Lexicon]: at the end of every
//! session the keys created and the keys modified are computed and persisted as key sets.
//! [SessionKeySets] is re-exported.
//!

use tracing::info;

use super::database::{BlockName, BlockStore};
use super::error::LexError;
use super::key::Key;
use super::lexicon::{Lexicon, TableSlot};
use super::table_config::LexConfig;
use crate::Coder;

/// What changed during one session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionKeySets {
    /// The number of the session these sets belong to
    pub session : u32,
    /// Keys created during the session, deleted ones excluded
    pub new : Vec<Key>,
    /// Keys that existed before the session and were modified during it
    pub touched : Vec<Key>,
}

impl <ConfigT : LexConfig, StoreT : BlockStore>Lexicon<ConfigT, StoreT> {

    /// Starts a session.  Every key that exists now counts as pre-existing
    pub fn session_start(&mut self) {
        for slot in self.tables.iter_mut() {
            if let TableSlot::Loaded(lex_table) = slot {
                lex_table.begin_session();
            }
        }
        info!(session = self.session_number + 1, "session started");
    }

    /// Ends the session: computes the new and touched key sets, persists them under the next
    /// session number, and starts the following session
    ///
    /// Tables must not be cleared mid-session, or their touched keys are lost.
    pub fn session_end(&mut self) -> Result<SessionKeySets, LexError> {
        let mut sets = SessionKeySets {
            session : self.session_number + 1,
            ..Default::default()
        };
        for slot in self.tables.iter() {
            if let TableSlot::Loaded(lex_table) = slot {
                let (new_keys, touched_keys) = lex_table.session_diff();
                sets.new.extend(new_keys);
                sets.touched.extend(touched_keys);
            }
        }

        if self.store.is_write_access() {
            let new_bytes = self.coder.encode_fmt2_list_to_buf(&sets.new).map_err(LexError::Codec)?;
            self.store.write_block(BlockName::NewKeys(sets.session), &new_bytes)?;
            let touched_bytes = self.coder.encode_fmt2_list_to_buf(&sets.touched).map_err(LexError::Codec)?;
            self.store.write_block(BlockName::TouchedKeys(sets.session), &touched_bytes)?;
            let counter_bytes = self.coder.encode_fmt1_to_buf(&sets.session).map_err(LexError::Codec)?;
            self.store.write_block(BlockName::SessionCounter, &counter_bytes)?;
        }
        self.session_number = sets.session;

        for slot in self.tables.iter_mut() {
            if let TableSlot::Loaded(lex_table) = slot {
                lex_table.begin_session();
            }
        }
        info!(session = sets.session, new = sets.new.len(), touched = sets.touched.len(), "session ended");
        Ok(sets)
    }

    /// The number of the last session that ended
    pub fn session_number(&self) -> u32 {
        self.session_number
    }

    /// Reads back the key sets persisted at the end of `session`
    pub fn session_key_sets(&self, session : u32) -> Result<Option<SessionKeySets>, LexError> {
        let new_bytes = match self.store.read_block(BlockName::NewKeys(session))? {
            Some(bytes) => bytes,
            None => return Ok(None)
        };
        let touched : Vec<Key> = match self.store.read_block(BlockName::TouchedKeys(session))? {
            Some(bytes) => self.coder.decode_fmt2_from_bytes(&bytes).map_err(LexError::Codec)?,
            None => vec![]
        };
        Ok(Some(SessionKeySets {
            session,
            new : self.coder.decode_fmt2_from_bytes(&new_bytes).map_err(LexError::Codec)?,
            touched,
        }))
    }
}

//!
//! The Hooks module contains the interface through which the lexicon reaches the object store
//! and the user.  [ObjectHooks] and [NoObjectHooks] are re-exported.
//!

use super::classes::ClassInfo;
use super::key::{Key, Mask};
use super::overflow::CacheHandle;

/// Callbacks into the collaborators that own object bodies and talk to the user
///
/// Every method has a default suitable for a lexicon with no object store attached.
pub trait ObjectHooks {

    /// Whether two bodies of `class` can be merged into one
    fn can_fuse(&self, class : &ClassInfo) -> bool {
        class.tree_typed
    }

    /// Merges the body of `from` into the body of `into`.  On conflict, `into`'s data wins
    fn fuse_objects(&mut self, _from : Key, _into : Key) -> Result<(), String> {
        Ok(())
    }

    /// Evaluates the subclass constraints of `key`'s class against its body
    fn compute_is_mask(&mut self, _key : Key) -> Mask {
        Mask::NONE
    }

    /// Asks the user a yes/no question.  Only called for interactive renames
    fn confirm(&mut self, _question : &str) -> bool {
        false
    }

    /// The lexicon no longer references a cached body
    fn release_cache(&mut self, _handle : CacheHandle) {
    }
}

/// [ObjectHooks] with all the defaults
pub struct NoObjectHooks;

impl ObjectHooks for NoObjectHooks {}

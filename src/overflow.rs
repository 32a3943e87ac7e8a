//!
//! The Overflow module contains the arena of extended, in-memory-only record state.
//!
//! Records stay small.  A record is promoted into this arena only when it needs an in-memory
//! object cache handle, and from then on the arena entry carries the record's disk address
//! decoupled from the cache.  The arena index space never reaches storage.
//!

use super::records::DiskAddr;

/// Index of an entry in an [OverflowArena]
#[derive(Copy, Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, derive_more::Display)]
pub struct OverflowId(pub u32);

/// Opaque handle to an object body cached in memory by the object store
#[derive(Copy, Debug, Clone, Hash, Eq, PartialEq, derive_more::Display)]
pub struct CacheHandle(pub u64);

/// The extended state of a promoted record
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct ExtendedState {
    pub disk : DiskAddr,
    pub cache : Option<CacheHandle>,
}

#[derive(Copy, Debug, Clone)]
enum OverflowSlot {
    Live(ExtendedState),
    Free,
}

/// A slab of [ExtendedState] entries with a free list
#[derive(Clone, Debug, Default)]
pub struct OverflowArena {
    slots : Vec<OverflowSlot>,
    free : Vec<OverflowId>,
}

impl OverflowArena {

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn alloc(&mut self, state : ExtendedState) -> OverflowId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0 as usize] = OverflowSlot::Live(state);
                id
            },
            None => {
                self.slots.push(OverflowSlot::Live(state));
                OverflowId(self.slots.len() as u32 - 1)
            }
        }
    }

    /// Releases an entry and returns its last state.  Returns `None` if `id` is not live
    pub fn release(&mut self, id : OverflowId) -> Option<ExtendedState> {
        let slot = self.slots.get_mut(id.0 as usize)?;
        match *slot {
            OverflowSlot::Live(state) => {
                *slot = OverflowSlot::Free;
                self.free.push(id);
                Some(state)
            },
            OverflowSlot::Free => None
        }
    }

    pub fn get(&self, id : OverflowId) -> Option<&ExtendedState> {
        match self.slots.get(id.0 as usize)? {
            OverflowSlot::Live(state) => Some(state),
            OverflowSlot::Free => None
        }
    }

    pub fn get_mut(&mut self, id : OverflowId) -> Option<&mut ExtendedState> {
        match self.slots.get_mut(id.0 as usize)? {
            OverflowSlot::Live(state) => Some(state),
            OverflowSlot::Free => None
        }
    }

    /// Every cache handle still held by a live entry
    pub fn cache_handles(&self) -> impl Iterator<Item=CacheHandle> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            OverflowSlot::Live(state) => state.cache,
            OverflowSlot::Free => None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_list_reuse() {
        let mut arena = OverflowArena::new();
        let a = arena.alloc(ExtendedState { disk : DiskAddr(1), cache : Some(CacheHandle(10)) });
        let b = arena.alloc(ExtendedState { disk : DiskAddr(2), cache : None });
        assert_eq!(arena.live_count(), 2);

        let released = arena.release(a).unwrap();
        assert_eq!(released.disk, DiskAddr(1));
        assert!(arena.get(a).is_none());
        assert!(arena.release(a).is_none());
        assert_eq!(arena.live_count(), 1);

        let c = arena.alloc(ExtendedState { disk : DiskAddr(3), cache : Some(CacheHandle(30)) });
        assert_eq!(c, a);
        assert_eq!(arena.get(b).unwrap().disk, DiskAddr(2));
        arena.get_mut(c).unwrap().disk = DiskAddr(4);
        assert_eq!(arena.get(c).unwrap().disk, DiskAddr(4));

        let handles : Vec<CacheHandle> = arena.cache_handles().collect();
        assert_eq!(handles, vec![CacheHandle(30)]);
    }
}

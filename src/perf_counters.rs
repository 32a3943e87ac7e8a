//!
//! The PerfCounters module contains everything associated with the "perf_counters" feature
//!

#[cfg(feature = "perf_counters")]
use core::cell::Cell;

/// All of the performance counters to measure and tune the hashing of a [Lexicon](crate::Lexicon)
///
/// These counters don't reflect totals across the whole database, rather they can be reset and
/// therefore used to measure individual operations or sequences of operations.
///
/// NOTE: In order to get valid data, you must enable the `perf_counters` feature in the `Cargo.toml` file
/// with an entry similar to this:
///
/// ```toml
/// [dependencies]
/// ace_lex = { version = "0.4.0", features = ["perf_counters"] }
/// ```
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PerfCounterFields {

    /// The number of hash probes started, by lookups and inserts alike
    pub probe_count : usize,

    /// The number of probes that collided at least once and needed the step hash
    ///
    /// `step_hash_count / probe_count` approximates the collision rate, which is governed by
    /// [HASH_RATE](crate::LexConfig::HASH_RATE)
    pub step_hash_count : usize,

    /// The number of times a hash table was rebuilt, either to grow it or to recover from a full probe
    pub rehash_count : usize,

    /// The number of tables read from the [BlockStore](crate::BlockStore)
    pub table_load_count : usize,

    /// The number of inserts that reused a [ProbeHint](crate::ProbeHint) instead of probing again
    pub hint_reuse_count : usize,
}

impl PerfCounterFields {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "perf_counters")]
pub struct PerfCounters(Cell<PerfCounterFields>);

#[cfg(feature = "perf_counters")]
impl PerfCounters {
    pub fn new() -> Self {
        Self(Cell::new(PerfCounterFields::new()))
    }
    pub fn reset(&self) {
        self.0.set(PerfCounterFields::new())
    }
    pub fn update<F : Fn(&mut PerfCounterFields)>(&self, func : F) {
        let mut fields = self.0.get();
        func(&mut fields);
        self.0.set(fields);
    }
    pub fn get(&self) -> PerfCounterFields {
        self.0.get()
    }
}

#[cfg(not(feature = "perf_counters"))]
pub struct PerfCounters();

#[cfg(not(feature = "perf_counters"))]
impl PerfCounters {
    pub fn new() -> Self {
        Self()
    }
    pub fn reset(&self) {
    }
    #[inline(always)]
    pub fn update<F : Fn(&mut PerfCounterFields)>(&self, _func : F) {
    }
    pub fn get(&self) -> PerfCounterFields {
        PerfCounterFields::new()
    }
}

//! Per-table bucket storage.
//!
//! Families with short packed-bit keys get an arena of `2^K` bucket slots
//! indexed directly by key; families with wide or unbounded keys (p-stable
//! cells, long codes) get a hash map. The choice is made once per index from
//! the family's declared key width.

use rustc_hash::FxHashMap;

/// Key widths up to this many bits use the dense arena layout.
const DENSE_MAX_BITS: u32 = 16;

/// One hash table: bucket key -> point identifiers.
#[derive(Debug, Clone)]
pub(crate) enum Buckets {
    /// Arena of `2^K` slots, key indexes directly.
    Dense(Vec<Vec<u32>>),
    /// Sparse map for large or unbounded key spaces.
    Sparse(FxHashMap<u64, Vec<u32>>),
}

impl Buckets {
    /// Pick a layout for a family with the given packed-key width.
    ///
    /// `None` means the key space is unbounded (integer quantization cells).
    pub(crate) fn for_key_bits(key_bits: Option<u32>) -> Self {
        match key_bits {
            Some(bits) if bits <= DENSE_MAX_BITS => {
                Buckets::Dense(vec![Vec::new(); 1usize << bits])
            }
            _ => Buckets::Sparse(FxHashMap::default()),
        }
    }

    pub(crate) fn insert(&mut self, key: u64, id: u32) {
        match self {
            Buckets::Dense(slots) => slots[key as usize].push(id),
            Buckets::Sparse(map) => map.entry(key).or_default().push(id),
        }
    }

    /// Identifiers in the bucket for `key`; empty slice when absent.
    pub(crate) fn get(&self, key: u64) -> &[u32] {
        match self {
            Buckets::Dense(slots) => slots
                .get(key as usize)
                .map_or(&[][..], Vec::as_slice),
            Buckets::Sparse(map) => map.get(&key).map_or(&[][..], Vec::as_slice),
        }
    }

    /// Number of non-empty buckets.
    pub(crate) fn occupied(&self) -> usize {
        match self {
            Buckets::Dense(slots) => slots.iter().filter(|b| !b.is_empty()).count(),
            Buckets::Sparse(map) => map.len(),
        }
    }

    /// Non-empty `(key, ids)` records in ascending key order.
    ///
    /// The ordering makes persisted artifacts byte-stable across runs.
    pub(crate) fn sorted_records(&self) -> Vec<(u64, &[u32])> {
        let mut records: Vec<(u64, &[u32])> = match self {
            Buckets::Dense(slots) => slots
                .iter()
                .enumerate()
                .filter(|(_, b)| !b.is_empty())
                .map(|(k, b)| (k as u64, b.as_slice()))
                .collect(),
            Buckets::Sparse(map) => map
                .iter()
                .map(|(&k, b)| (k, b.as_slice()))
                .collect(),
        };
        records.sort_unstable_by_key(|&(k, _)| k);
        records
    }
}

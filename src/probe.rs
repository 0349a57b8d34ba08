//! Hamming-neighborhood probe-key generation for multi-probe queries.
//!
//! Probing nearby buckets trades extra lookups for recall without adding
//! tables. Keys at Hamming distance 1 from the query's key are emitted before
//! distance-2 keys, and the budget bounds the total emitted per table.

use smallvec::SmallVec;

/// Probe keys for one table, collected without heap allocation for typical
/// budgets.
pub type ProbeBuf = SmallVec<[u64; 32]>;

/// Emit up to `budget` neighbor keys of `base`, flipping bits in index order.
///
/// Distance-1 flips first, then distance-2 pairs.
pub(crate) fn uniform_flips(base: u64, bits: u32, budget: usize, out: &mut ProbeBuf) {
    for bit in 0..bits {
        if out.len() >= budget {
            return;
        }
        out.push(base ^ (1u64 << bit));
    }
    for i in 0..bits {
        for j in (i + 1)..bits {
            if out.len() >= budget {
                return;
            }
            out.push(base ^ (1u64 << i) ^ (1u64 << j));
        }
    }
}

/// Emit up to `budget` neighbor keys of `base`, flipping the most uncertain
/// bits first.
///
/// `uncertainty[i]` is the margin of bit `i` (for hyperplane hashes, the
/// absolute projection onto plane `i`); smaller margins flip first since
/// those bits are the likeliest to differ for a true neighbor.
pub(crate) fn ranked_flips(base: u64, uncertainty: &[f32], budget: usize, out: &mut ProbeBuf) {
    let mut order: Vec<u32> = (0..uncertainty.len() as u32).collect();
    order.sort_unstable_by(|&a, &b| {
        uncertainty[a as usize]
            .partial_cmp(&uncertainty[b as usize])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for &bit in &order {
        if out.len() >= budget {
            return;
        }
        out.push(base ^ (1u64 << bit));
    }
    for (i, &bit_i) in order.iter().enumerate() {
        for &bit_j in &order[i + 1..] {
            if out.len() >= budget {
                return;
            }
            out.push(base ^ (1u64 << bit_i) ^ (1u64 << bit_j));
        }
    }
}

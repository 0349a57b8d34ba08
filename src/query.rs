//! Query execution: candidate gathering, deduplication, true-distance
//! ranking.
//!
//! Hash keys only decide which buckets to read. Every returned neighbor is
//! ranked by its exact distance in the original vector space, computed under
//! the metric the index's family implies, so the hash approximation can cost
//! recall but never mis-order results.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::dataset::{Dataset, Element};
use crate::error::{LshError, Result};
use crate::family::HashFamily;
use crate::probe::ProbeBuf;
use crate::table::Buckets;

/// What a query returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Retrieval {
    /// The `k` nearest candidates found.
    TopK(usize),
    /// All candidates within the given true distance.
    Radius(f32),
}

/// A query: retrieval mode plus a multi-probe budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuerySpec {
    /// Retrieval mode.
    pub mode: Retrieval,
    /// Extra buckets to probe per table beyond the exact one. Zero probes
    /// only exact buckets.
    pub probes_per_table: usize,
}

impl QuerySpec {
    /// Nearest-`k` query with no probing.
    pub fn top_k(k: usize) -> Self {
        Self {
            mode: Retrieval::TopK(k),
            probes_per_table: 0,
        }
    }

    /// Range query with no probing.
    pub fn radius(r: f32) -> Self {
        Self {
            mode: Retrieval::Radius(r),
            probes_per_table: 0,
        }
    }

    /// Set the multi-probe budget.
    pub fn with_probes(mut self, probes: usize) -> Self {
        self.probes_per_table = probes;
        self
    }
}

/// One query result: a point identifier and its true distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row index into the dataset the index was built from.
    pub id: u32,
    /// True distance under the family's metric.
    pub distance: f32,
}

fn validate_spec(spec: &QuerySpec) -> Result<()> {
    match spec.mode {
        Retrieval::TopK(0) => Err(LshError::InvalidParameter(
            "top-k requires k >= 1".to_string(),
        )),
        Retrieval::Radius(r) if !(r >= 0.0) || !r.is_finite() => Err(
            LshError::InvalidParameter(format!("radius must be finite and non-negative, got {r}")),
        ),
        _ => Ok(()),
    }
}

/// Run `spec` against a fitted family and its bucket tables.
pub(crate) fn execute<T, F>(
    dataset: &Dataset<T>,
    family: &F,
    tables: &[Buckets],
    vector: &[T],
    spec: &QuerySpec,
) -> Result<Vec<Neighbor>>
where
    T: Element,
    F: HashFamily<T>,
{
    if vector.len() != family.dim() {
        return Err(LshError::DimensionMismatch {
            expected: family.dim(),
            actual: vector.len(),
        });
    }
    validate_spec(spec)?;

    let mut candidates: FxHashSet<u32> = FxHashSet::default();
    let mut probes = ProbeBuf::new();
    for (t, buckets) in tables.iter().enumerate() {
        let key = family.hash_point(vector, t);
        let exact = buckets.get(key);
        candidates.extend(exact.iter().copied());

        if spec.probes_per_table > 0 {
            probes.clear();
            family.probe_keys(vector, t, spec.probes_per_table, &mut probes);
            for &probe in &probes {
                candidates.extend(buckets.get(probe).iter().copied());
            }
        } else if exact.is_empty() && family.widens_on_empty() {
            // No budget, nothing in the exact bucket: take the nearest
            // single-bit neighbor that has anything in it.
            let width = family.key_bits().unwrap_or(0) as usize;
            probes.clear();
            family.probe_keys(vector, t, width, &mut probes);
            for &probe in &probes {
                let ids = buckets.get(probe);
                if !ids.is_empty() {
                    candidates.extend(ids.iter().copied());
                    break;
                }
            }
        }
    }

    debug!(
        candidates = candidates.len(),
        tables = tables.len(),
        probes_per_table = spec.probes_per_table,
        "gathered candidates"
    );

    let metric = family.metric();
    let mut neighbors: Vec<Neighbor> = candidates
        .into_iter()
        .map(|id| Neighbor {
            id,
            distance: metric.distance(vector, dataset.row(id as usize)),
        })
        .collect();
    neighbors.sort_unstable_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });

    match spec.mode {
        Retrieval::TopK(k) => neighbors.truncate(k),
        Retrieval::Radius(r) => neighbors.retain(|n| n.distance <= r),
    }
    Ok(neighbors)
}

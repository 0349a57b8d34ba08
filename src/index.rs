//! The index: a fitted hash family plus one bucket table per hash table.
//!
//! Building hashes every dataset point into every table; tables are
//! independent, so they fill in parallel. The index borrows nothing: it owns
//! its dataset, which keeps point identifiers valid for its whole lifetime
//! and lets queries rank candidates by true distance without a callback into
//! caller-owned storage.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::dataset::{Dataset, Element};
use crate::error::{LshError, Result};
use crate::family::HashFamily;
use crate::persist;
use crate::query::{self, Neighbor, QuerySpec};
use crate::table::Buckets;

/// An immutable LSH index over an owned dataset.
#[derive(Debug)]
pub struct LshIndex<T: Element, F: HashFamily<T>> {
    dataset: Dataset<T>,
    family: F,
    tables: Vec<Buckets>,
}

impl<T: Element, F: HashFamily<T>> LshIndex<T, F> {
    /// Fit `params` against `dataset` and hash every point into every table.
    ///
    /// The same `(dataset, params, seed)` triple always produces the same
    /// index. Fails with [`LshError::EmptyDataset`] on a zero-point dataset
    /// and [`LshError::InvalidParameter`] on out-of-range parameters.
    pub fn build(dataset: Dataset<T>, params: &F::Params, seed: u64) -> Result<Self> {
        if dataset.is_empty() {
            return Err(LshError::EmptyDataset);
        }
        if dataset.len() > u32::MAX as usize {
            return Err(LshError::InvalidParameter(format!(
                "dataset has {} points, identifiers are 32-bit",
                dataset.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let family = F::fit(&dataset, params, &mut rng)?;

        let tables: Vec<Buckets> = (0..family.tables())
            .into_par_iter()
            .map(|t| {
                let mut buckets = Buckets::for_key_bits(family.key_bits());
                for (id, row) in dataset.rows().enumerate() {
                    buckets.insert(family.hash_point(row, t), id as u32);
                }
                buckets
            })
            .collect();

        info!(
            family = F::TAG.name(),
            points = dataset.len(),
            dim = dataset.dim(),
            tables = tables.len(),
            occupied = tables.iter().map(Buckets::occupied).sum::<usize>(),
            "built index"
        );
        Ok(Self {
            dataset,
            family,
            tables,
        })
    }

    /// Identifiers stored in table `table` under `key`.
    ///
    /// An absent key (or out-of-range table) yields an empty slice, never an
    /// error.
    pub fn lookup(&self, table: usize, key: u64) -> &[u32] {
        self.tables.get(table).map_or(&[][..], |b| b.get(key))
    }

    /// Run a query, returning neighbors sorted by true distance (ties by
    /// identifier).
    pub fn query(&self, vector: &[T], spec: &QuerySpec) -> Result<Vec<Neighbor>> {
        query::execute(&self.dataset, &self.family, &self.tables, vector, spec)
    }

    /// The dataset this index was built from.
    pub fn dataset(&self) -> &Dataset<T> {
        &self.dataset
    }

    /// The fitted hash family.
    pub fn family(&self) -> &F {
        &self.family
    }

    /// Number of hash tables.
    pub fn tables(&self) -> usize {
        self.tables.len()
    }

    /// Persist the fitted state and bucket tables to `path`, atomically.
    ///
    /// The dataset itself is not stored; [`load`](Self::load) needs it again.
    pub fn save(&self, path: &Path) -> Result<()> {
        persist::save_index::<T, F>(
            path,
            self.dataset.len(),
            self.dataset.dim(),
            &self.family,
            &self.tables,
        )
    }

    /// Load an index from `path`, re-attaching `dataset`.
    ///
    /// The artifact must have been saved from an index built over a dataset
    /// of the same shape; anything malformed fails with
    /// [`LshError::CorruptArtifact`].
    pub fn load(path: &Path, dataset: Dataset<T>) -> Result<Self> {
        let (family, tables) = persist::load_index::<T, F>(path, &dataset)?;
        Ok(Self {
            dataset,
            family,
            tables,
        })
    }

    /// Load from `path` when the file exists, otherwise build and save.
    ///
    /// With `None` for `path` this always builds and never persists. Load
    /// errors propagate rather than falling back to a rebuild, so a corrupt
    /// artifact is surfaced instead of silently overwritten.
    pub fn build_or_load(
        dataset: Dataset<T>,
        params: &F::Params,
        seed: u64,
        path: Option<&Path>,
    ) -> Result<Self> {
        match path {
            Some(p) if p.exists() => {
                debug!(path = %p.display(), "artifact present, loading");
                Self::load(p, dataset)
            }
            Some(p) => {
                debug!(path = %p.display(), "no artifact, building");
                let index = Self::build(dataset, params, seed)?;
                index.save(p)?;
                Ok(index)
            }
            None => Self::build(dataset, params, seed),
        }
    }
}

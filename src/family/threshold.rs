//! Thresholded random projections.
//!
//! Like hyperplane hashing, but each projection is compared against a
//! threshold learned from the data instead of zero: the median of the
//! projected dataset values. Medians split every bucket bit roughly in half
//! regardless of where the data sits, which keeps occupancy balanced for
//! datasets far from the origin.
//!
//! When a query's exact bucket is empty and no probe budget was given, the
//! query engine widens to single-bit-flip neighbors for this family
//! (`widens_on_empty`); a median split makes near-miss bits common.

use std::io::{Read, Write};

use rand::rngs::StdRng;

use crate::dataset::Dataset;
use crate::distance::Metric;
use crate::error::{LshError, Result};
use crate::family::hyperplane::sample_unit_plane;
use crate::family::{pack_sign_bits, project, validate_tables_bits, FamilyTag, HashFamily};
use crate::persist;
use crate::probe::{uniform_flips, ProbeBuf};

/// Configuration for [`Threshold`].
#[derive(Debug, Clone)]
pub struct ThresholdParams {
    /// Number of hash tables.
    pub tables: usize,
    /// Projections per table (key width).
    pub bits: usize,
}

/// Fitted thresholded-projection family.
#[derive(Debug, Clone)]
pub struct Threshold {
    tables: usize,
    bits: usize,
    dim: usize,
    /// `tables * bits` unit-norm projections, each `dim` long, stored flat.
    planes: Vec<f32>,
    /// Per-projection median of the fitted dataset, `tables * bits` long.
    thresholds: Vec<f32>,
}

fn median(values: &mut [f32]) -> f32 {
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

impl Threshold {
    #[inline]
    fn plane(&self, table: usize, bit: usize) -> &[f32] {
        let start = (table * self.bits + bit) * self.dim;
        &self.planes[start..start + self.dim]
    }
}

impl HashFamily<f32> for Threshold {
    type Params = ThresholdParams;

    const TAG: FamilyTag = FamilyTag::Threshold;

    fn fit(dataset: &Dataset<f32>, params: &Self::Params, rng: &mut StdRng) -> Result<Self> {
        validate_tables_bits(params.tables, params.bits)?;
        let dim = dataset.dim();
        let mut planes = Vec::with_capacity(params.tables * params.bits * dim);
        for _ in 0..params.tables * params.bits {
            sample_unit_plane(rng, dim, &mut planes);
        }

        let mut thresholds = Vec::with_capacity(params.tables * params.bits);
        let mut projected = Vec::with_capacity(dataset.len());
        for i in 0..params.tables * params.bits {
            let plane = &planes[i * dim..(i + 1) * dim];
            projected.clear();
            projected.extend(dataset.rows().map(|row| project(row, plane)));
            thresholds.push(median(&mut projected));
        }

        Ok(Self {
            tables: params.tables,
            bits: params.bits,
            dim,
            planes,
            thresholds,
        })
    }

    fn tables(&self) -> usize {
        self.tables
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn metric(&self) -> Metric {
        Metric::L2
    }

    fn key_bits(&self) -> Option<u32> {
        Some(self.bits as u32)
    }

    fn hash_point(&self, vector: &[f32], table: usize) -> u64 {
        pack_sign_bits((0..self.bits).map(|b| {
            project(vector, self.plane(table, b)) - self.thresholds[table * self.bits + b]
        }))
    }

    fn probe_keys(&self, vector: &[f32], table: usize, budget: usize, out: &mut ProbeBuf) {
        let base = self.hash_point(vector, table);
        uniform_flips(base, self.bits as u32, budget, out);
    }

    fn widens_on_empty(&self) -> bool {
        true
    }

    fn write_params<W: Write>(&self, w: &mut W) -> Result<()> {
        persist::write_u32(w, self.tables as u32)?;
        persist::write_u32(w, self.bits as u32)?;
        persist::write_u32(w, self.dim as u32)?;
        persist::write_f32_slice(w, &self.planes)?;
        persist::write_f32_slice(w, &self.thresholds)
    }

    fn read_params<R: Read>(r: &mut R) -> Result<Self> {
        let tables = persist::read_u32(r)? as usize;
        let bits = persist::read_u32(r)? as usize;
        let dim = persist::read_u32(r)? as usize;
        let planes = persist::read_f32_vec(r)?;
        let thresholds = persist::read_f32_vec(r)?;
        if planes.len() != tables * bits * dim || thresholds.len() != tables * bits {
            return Err(LshError::CorruptArtifact(
                "threshold table has wrong length".to_string(),
            ));
        }
        Ok(Self {
            tables,
            bits,
            dim,
            planes,
            thresholds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn median_of_odd_and_even_sets() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn thresholds_split_an_offset_cluster() {
        // All points sit far from the origin; zero thresholds would put the
        // whole dataset in one bucket per bit, the median cannot.
        let rows: Vec<Vec<f32>> = (0..16)
            .map(|i| vec![100.0 + i as f32, 100.0 - i as f32])
            .collect();
        let ds = Dataset::from_rows(&rows).unwrap();
        let params = ThresholdParams { tables: 1, bits: 4 };
        let mut rng = StdRng::seed_from_u64(11);
        let fam = Threshold::fit(&ds, &params, &mut rng).unwrap();

        for b in 0..4 {
            let set = ds
                .rows()
                .filter(|row| fam.hash_point(row, 0) & (1 << b) != 0)
                .count();
            assert!(set > 0 && set < 16, "bit {b} never splits");
        }
    }

    #[test]
    fn widens_when_no_probe_budget() {
        let ds = Dataset::from_rows(&[vec![1.0f32, 2.0]]).unwrap();
        let params = ThresholdParams { tables: 1, bits: 2 };
        let mut rng = StdRng::seed_from_u64(0);
        let fam = Threshold::fit(&ds, &params, &mut rng).unwrap();
        assert!(fam.widens_on_empty());
    }
}

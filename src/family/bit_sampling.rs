//! Random bit sampling over unary-encoded integer vectors.
//!
//! A `u32` vector with coordinates in `0..=value_range` is viewed as a
//! virtual bit string of `dim * value_range` bits, where coordinate `c`
//! contributes `value_range` unary bits of which the first `v[c] + 1` are
//! set (capped at `value_range`).
//! Each table samples `bits` distinct positions from that string; collisions
//! under the sampled key approximate Hamming proximity.

use std::io::{Read, Write};

use rand::rngs::StdRng;

use crate::dataset::Dataset;
use crate::distance::Metric;
use crate::error::{LshError, Result};
use crate::family::{pack_sign_bits, validate_tables_bits, FamilyTag, HashFamily};
use crate::persist;
use crate::probe::{uniform_flips, ProbeBuf};

/// Configuration for [`BitSampling`].
#[derive(Debug, Clone)]
pub struct BitSamplingParams {
    /// Number of hash tables.
    pub tables: usize,
    /// Sampled bit positions per table (key width).
    pub bits: usize,
    /// Upper bound of coordinate values; coordinates live in
    /// `0..=value_range`.
    pub value_range: u32,
}

/// Fitted random-bit-sampling family.
#[derive(Debug, Clone)]
pub struct BitSampling {
    tables: usize,
    bits: usize,
    value_range: u32,
    dim: usize,
    /// `tables * bits` sampled positions, sorted within each table.
    positions: Vec<u32>,
}

impl BitSampling {
    #[inline]
    fn table_positions(&self, table: usize) -> &[u32] {
        &self.positions[table * self.bits..(table + 1) * self.bits]
    }

    #[inline]
    fn bit_at(&self, vector: &[u32], pos: u32) -> bool {
        let coord = (pos / self.value_range) as usize;
        let unary = pos % self.value_range;
        unary <= vector[coord]
    }
}

impl HashFamily<u32> for BitSampling {
    type Params = BitSamplingParams;

    const TAG: FamilyTag = FamilyTag::BitSampling;

    fn fit(dataset: &Dataset<u32>, params: &Self::Params, rng: &mut StdRng) -> Result<Self> {
        validate_tables_bits(params.tables, params.bits)?;
        if params.value_range == 0 {
            return Err(LshError::InvalidParameter(
                "value range must be positive".to_string(),
            ));
        }
        let universe = dataset.dim() * params.value_range as usize;
        if params.bits > universe {
            return Err(LshError::InvalidParameter(format!(
                "cannot sample {} distinct positions from a {universe}-bit string",
                params.bits
            )));
        }

        let mut positions = Vec::with_capacity(params.tables * params.bits);
        for _ in 0..params.tables {
            let mut sampled = rand::seq::index::sample(rng, universe, params.bits)
                .into_iter()
                .map(|p| p as u32)
                .collect::<Vec<_>>();
            sampled.sort_unstable();
            positions.extend_from_slice(&sampled);
        }

        Ok(Self {
            tables: params.tables,
            bits: params.bits,
            value_range: params.value_range,
            dim: dataset.dim(),
            positions,
        })
    }

    fn tables(&self) -> usize {
        self.tables
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn metric(&self) -> Metric {
        Metric::Hamming
    }

    fn key_bits(&self) -> Option<u32> {
        Some(self.bits as u32)
    }

    fn hash_point(&self, vector: &[u32], table: usize) -> u64 {
        let positions = self.table_positions(table);
        pack_sign_bits(
            positions
                .iter()
                .map(|&pos| if self.bit_at(vector, pos) { 1.0 } else { -1.0 }),
        )
    }

    fn probe_keys(&self, vector: &[u32], table: usize, budget: usize, out: &mut ProbeBuf) {
        let base = self.hash_point(vector, table);
        uniform_flips(base, self.bits as u32, budget, out);
    }

    fn write_params<W: Write>(&self, w: &mut W) -> Result<()> {
        persist::write_u32(w, self.tables as u32)?;
        persist::write_u32(w, self.bits as u32)?;
        persist::write_u32(w, self.value_range)?;
        persist::write_u32(w, self.dim as u32)?;
        persist::write_u32_slice(w, &self.positions)
    }

    fn read_params<R: Read>(r: &mut R) -> Result<Self> {
        let tables = persist::read_u32(r)? as usize;
        let bits = persist::read_u32(r)? as usize;
        let value_range = persist::read_u32(r)?;
        let dim = persist::read_u32(r)? as usize;
        let positions = persist::read_u32_vec(r)?;
        if positions.len() != tables * bits {
            return Err(LshError::CorruptArtifact(
                "bit-sampling position table has wrong length".to_string(),
            ));
        }
        let universe = (dim as u64) * u64::from(value_range);
        if positions.iter().any(|&p| u64::from(p) >= universe) {
            return Err(LshError::CorruptArtifact(
                "bit-sampling position out of range".to_string(),
            ));
        }
        Ok(Self {
            tables,
            bits,
            value_range,
            dim,
            positions,
        })
    }
}

//! p-stable distribution hashing for L1 and L2 distances.
//!
//! Each hash function projects onto a vector of p-stable random variates
//! (Cauchy for p = 1, Gaussian for p = 2), shifts by a uniform offset, and
//! quantizes into cells of width `w`. The stability property makes the
//! projected gap between two vectors distribute like their Lp distance, so
//! nearby vectors land in the same cell often.
//!
//! A table's `k` cell indices are combined into one `u64` key by multiplying
//! each with a fixed random odd mixer and summing with wrapping arithmetic.
//! Unlike bit packing this keeps the cell structure probe-able: moving one
//! projection to an adjacent cell shifts the key by exactly that mixer, so
//! neighbor keys come from additions, not re-hashing.

use std::io::{Read, Write};

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Cauchy, Distribution, StandardNormal};

use crate::dataset::Dataset;
use crate::distance::Metric;
use crate::error::{LshError, Result};
use crate::family::{project, FamilyTag, HashFamily};
use crate::persist;
use crate::probe::ProbeBuf;

/// Which stable distribution the projections are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Stability {
    /// Cauchy variates, 1-stable: collisions track L1 distance.
    Cauchy = 1,
    /// Gaussian variates, 2-stable: collisions track L2 distance.
    Gaussian = 2,
}

impl TryFrom<u8> for Stability {
    type Error = LshError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Stability::Cauchy),
            2 => Ok(Stability::Gaussian),
            other => Err(LshError::CorruptArtifact(format!(
                "unknown stability marker {other}"
            ))),
        }
    }
}

/// Configuration for [`PStable`].
#[derive(Debug, Clone)]
pub struct PStableParams {
    /// Number of hash tables.
    pub tables: usize,
    /// Projections combined per table key.
    pub projections: usize,
    /// Quantization cell width, strictly positive.
    pub width: f32,
    /// Stable distribution, which also fixes the ranking metric.
    pub stability: Stability,
}

/// Fitted p-stable family.
#[derive(Debug, Clone)]
pub struct PStable {
    tables: usize,
    k: usize,
    dim: usize,
    width: f32,
    stability: Stability,
    /// `tables * k` projection vectors, each `dim` long, stored flat.
    planes: Vec<f32>,
    /// Uniform offsets in `[0, width)`, `tables * k` long.
    offsets: Vec<f32>,
    /// Odd multipliers combining cell indices into a key, `tables * k` long.
    mixers: Vec<u64>,
}

impl PStable {
    #[inline]
    fn plane(&self, table: usize, i: usize) -> &[f32] {
        let start = (table * self.k + i) * self.dim;
        &self.planes[start..start + self.dim]
    }

    #[inline]
    fn cell(&self, vector: &[f32], table: usize, i: usize) -> i64 {
        let shifted = project(vector, self.plane(table, i)) + self.offsets[table * self.k + i];
        (shifted / self.width).floor() as i64
    }
}

impl HashFamily<f32> for PStable {
    type Params = PStableParams;

    const TAG: FamilyTag = FamilyTag::PStable;

    fn fit(dataset: &Dataset<f32>, params: &Self::Params, rng: &mut StdRng) -> Result<Self> {
        if params.tables == 0 {
            return Err(LshError::InvalidParameter(
                "table count must be positive".to_string(),
            ));
        }
        if params.projections == 0 {
            return Err(LshError::InvalidParameter(
                "projection count must be positive".to_string(),
            ));
        }
        if !(params.width > 0.0) {
            return Err(LshError::InvalidParameter(format!(
                "cell width must be positive, got {}",
                params.width
            )));
        }

        let dim = dataset.dim();
        let count = params.tables * params.projections;
        let mut planes = Vec::with_capacity(count * dim);
        match params.stability {
            Stability::Cauchy => {
                let cauchy = Cauchy::<f32>::new(0.0, 1.0)
                    .map_err(|e| LshError::InvalidParameter(e.to_string()))?;
                for _ in 0..count * dim {
                    planes.push(cauchy.sample(rng));
                }
            }
            Stability::Gaussian => {
                for _ in 0..count * dim {
                    planes.push(rng.sample(StandardNormal));
                }
            }
        }
        let offsets = (0..count)
            .map(|_| rng.gen_range(0.0..params.width))
            .collect();
        let mixers = (0..count).map(|_| rng.gen::<u64>() | 1).collect();

        Ok(Self {
            tables: params.tables,
            k: params.projections,
            dim,
            width: params.width,
            stability: params.stability,
            planes,
            offsets,
            mixers,
        })
    }

    fn tables(&self) -> usize {
        self.tables
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn metric(&self) -> Metric {
        match self.stability {
            Stability::Cauchy => Metric::L1,
            Stability::Gaussian => Metric::L2,
        }
    }

    fn key_bits(&self) -> Option<u32> {
        None
    }

    fn hash_point(&self, vector: &[f32], table: usize) -> u64 {
        let mut key = 0u64;
        for i in 0..self.k {
            let cell = self.cell(vector, table, i) as u64;
            key = key.wrapping_add(cell.wrapping_mul(self.mixers[table * self.k + i]));
        }
        key
    }

    fn probe_keys(&self, vector: &[f32], table: usize, budget: usize, out: &mut ProbeBuf) {
        let base = self.hash_point(vector, table);
        // One projection moved to an adjacent cell first, then two cells out.
        for step in [1u64, 2] {
            for i in 0..self.k {
                let delta = self.mixers[table * self.k + i].wrapping_mul(step);
                for key in [base.wrapping_add(delta), base.wrapping_sub(delta)] {
                    if out.len() >= budget {
                        return;
                    }
                    out.push(key);
                }
            }
        }
    }

    fn write_params<W: Write>(&self, w: &mut W) -> Result<()> {
        persist::write_u32(w, self.tables as u32)?;
        persist::write_u32(w, self.k as u32)?;
        persist::write_u32(w, self.dim as u32)?;
        persist::write_f32(w, self.width)?;
        persist::write_u8(w, self.stability as u8)?;
        persist::write_f32_slice(w, &self.planes)?;
        persist::write_f32_slice(w, &self.offsets)?;
        persist::write_u64_slice(w, &self.mixers)
    }

    fn read_params<R: Read>(r: &mut R) -> Result<Self> {
        let tables = persist::read_u32(r)? as usize;
        let k = persist::read_u32(r)? as usize;
        let dim = persist::read_u32(r)? as usize;
        let width = persist::read_f32(r)?;
        let stability = Stability::try_from(persist::read_u8(r)?)?;
        let planes = persist::read_f32_vec(r)?;
        let offsets = persist::read_f32_vec(r)?;
        let mixers = persist::read_u64_vec(r)?;
        if planes.len() != tables * k * dim
            || offsets.len() != tables * k
            || mixers.len() != tables * k
        {
            return Err(LshError::CorruptArtifact(
                "p-stable table has wrong length".to_string(),
            ));
        }
        if !(width > 0.0) {
            return Err(LshError::CorruptArtifact(
                "p-stable cell width must be positive".to_string(),
            ));
        }
        Ok(Self {
            tables,
            k,
            dim,
            width,
            stability,
            planes,
            offsets,
            mixers,
        })
    }
}

//! Random-hyperplane (sign-of-projection) hashing.
//!
//! Each table draws `bits` unit-norm hyperplanes from the standard normal
//! distribution; a vector's key packs the signs of its projections. Two
//! vectors collide on a bit with probability `1 - theta / pi`, so keys
//! approximate angular closeness and candidates are ranked by L2 distance.
//!
//! Probing is margin-ranked: the bit with the smallest absolute projection
//! is the likeliest to differ for a true neighbor, so it flips first.

use std::io::{Read, Write};

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::dataset::Dataset;
use crate::distance::Metric;
use crate::error::{LshError, Result};
use crate::family::{pack_sign_bits, project, validate_tables_bits, FamilyTag, HashFamily};
use crate::persist;
use crate::probe::{ranked_flips, ProbeBuf};

/// Configuration for [`Hyperplane`].
#[derive(Debug, Clone)]
pub struct HyperplaneParams {
    /// Number of hash tables.
    pub tables: usize,
    /// Hyperplanes per table (key width).
    pub bits: usize,
}

/// Fitted random-hyperplane family.
#[derive(Debug, Clone)]
pub struct Hyperplane {
    tables: usize,
    bits: usize,
    dim: usize,
    /// `tables * bits` unit-norm hyperplanes, each `dim` long, stored flat.
    planes: Vec<f32>,
}

/// Draw a unit-norm normal vector of length `dim` into `out`.
pub(crate) fn sample_unit_plane(rng: &mut StdRng, dim: usize, out: &mut Vec<f32>) {
    let start = out.len();
    for _ in 0..dim {
        out.push(rng.sample(StandardNormal));
    }
    let plane = &mut out[start..];
    let norm = plane.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in plane {
            *x /= norm;
        }
    }
}

impl Hyperplane {
    #[inline]
    fn plane(&self, table: usize, bit: usize) -> &[f32] {
        let start = (table * self.bits + bit) * self.dim;
        &self.planes[start..start + self.dim]
    }

    fn projections(&self, vector: &[f32], table: usize) -> Vec<f32> {
        (0..self.bits)
            .map(|b| project(vector, self.plane(table, b)))
            .collect()
    }
}

impl HashFamily<f32> for Hyperplane {
    type Params = HyperplaneParams;

    const TAG: FamilyTag = FamilyTag::Hyperplane;

    fn fit(dataset: &Dataset<f32>, params: &Self::Params, rng: &mut StdRng) -> Result<Self> {
        validate_tables_bits(params.tables, params.bits)?;
        let dim = dataset.dim();
        let mut planes = Vec::with_capacity(params.tables * params.bits * dim);
        for _ in 0..params.tables * params.bits {
            sample_unit_plane(rng, dim, &mut planes);
        }
        Ok(Self {
            tables: params.tables,
            bits: params.bits,
            dim,
            planes,
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
        pack_sign_bits((0..self.bits).map(|b| project(vector, self.plane(table, b))))
    }

    fn probe_keys(&self, vector: &[f32], table: usize, budget: usize, out: &mut ProbeBuf) {
        let projections = self.projections(vector, table);
        let base = pack_sign_bits(projections.iter().copied());
        let margins: Vec<f32> = projections.iter().map(|p| p.abs()).collect();
        ranked_flips(base, &margins, budget, out);
    }

    fn write_params<W: Write>(&self, w: &mut W) -> Result<()> {
        persist::write_u32(w, self.tables as u32)?;
        persist::write_u32(w, self.bits as u32)?;
        persist::write_u32(w, self.dim as u32)?;
        persist::write_f32_slice(w, &self.planes)
    }

    fn read_params<R: Read>(r: &mut R) -> Result<Self> {
        let tables = persist::read_u32(r)? as usize;
        let bits = persist::read_u32(r)? as usize;
        let dim = persist::read_u32(r)? as usize;
        let planes = persist::read_f32_vec(r)?;
        if planes.len() != tables * bits * dim {
            return Err(LshError::CorruptArtifact(
                "hyperplane table has wrong length".to_string(),
            ));
        }
        Ok(Self {
            tables,
            bits,
            dim,
            planes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn toy() -> Dataset<f32> {
        Dataset::from_rows(&[vec![1.0f32, 0.0], vec![0.0, 1.0]]).unwrap()
    }

    #[test]
    fn planes_are_unit_norm() {
        let params = HyperplaneParams { tables: 2, bits: 3 };
        let mut rng = StdRng::seed_from_u64(42);
        let fam = Hyperplane::fit(&toy(), &params, &mut rng).unwrap();
        for t in 0..2 {
            for b in 0..3 {
                let norm: f32 = fam.plane(t, b).iter().map(|x| x * x).sum();
                assert!((norm - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn scaling_preserves_the_key() {
        // Sign hashing only sees direction.
        let params = HyperplaneParams { tables: 1, bits: 8 };
        let mut rng = StdRng::seed_from_u64(3);
        let fam = Hyperplane::fit(&toy(), &params, &mut rng).unwrap();
        let v = [0.3f32, -0.7];
        let scaled = [3.0f32, -7.0];
        assert_eq!(fam.hash_point(&v, 0), fam.hash_point(&scaled, 0));
    }

    #[test]
    fn first_probe_flips_the_tightest_margin() {
        let params = HyperplaneParams { tables: 1, bits: 4 };
        let mut rng = StdRng::seed_from_u64(9);
        let fam = Hyperplane::fit(&toy(), &params, &mut rng).unwrap();
        let v = [0.5f32, 0.5];
        let base = fam.hash_point(&v, 0);
        let mut out = ProbeBuf::new();
        fam.probe_keys(&v, 0, 1, &mut out);
        assert_eq!(out.len(), 1);
        // The probe must differ from the base key in exactly one bit.
        assert_eq!((out[0] ^ base).count_ones(), 1);
    }
}

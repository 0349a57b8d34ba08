//! Iterative quantization (ITQ).
//!
//! Projects the data onto its top principal components, then learns an
//! orthogonal rotation of that subspace which minimizes the quantization
//! error of mapping each projected point to the nearest binary-code vertex.
//! The alternating minimization is the classic two-step: fix the rotation
//! and snap codes with `sign`, then fix the codes and recover the best
//! rotation from the SVD of `B^T V`.
//!
//! The PCA basis is shared across tables; each table starts from its own
//! random orthogonal rotation, so tables end up with different codes.

use std::io::{Read, Write};

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::dataset::Dataset;
use crate::distance::Metric;
use crate::error::{LshError, Result};
use crate::family::{pack_sign_bits, project, validate_tables_bits, FamilyTag, HashFamily};
use crate::linalg;
use crate::persist;
use crate::probe::{uniform_flips, ProbeBuf};

/// Configuration for [`Itq`].
#[derive(Debug, Clone)]
pub struct ItqParams {
    /// Number of hash tables.
    pub tables: usize,
    /// Code length (key width), at most the dataset dimension.
    pub bits: usize,
    /// Alternating-minimization rounds, at least one.
    pub iterations: usize,
}

/// Fitted iterative-quantization family.
#[derive(Debug, Clone)]
pub struct Itq {
    tables: usize,
    bits: usize,
    dim: usize,
    /// Combined projection (PCA basis times learned rotation) per table,
    /// `tables * bits` rows of `dim`, stored flat.
    proj: Vec<f32>,
}

impl Itq {
    #[inline]
    fn row(&self, table: usize, bit: usize) -> &[f32] {
        let start = (table * self.bits + bit) * self.dim;
        &self.proj[start..start + self.dim]
    }
}

impl HashFamily<f32> for Itq {
    type Params = ItqParams;

    const TAG: FamilyTag = FamilyTag::Itq;

    fn fit(dataset: &Dataset<f32>, params: &Self::Params, rng: &mut StdRng) -> Result<Self> {
        validate_tables_bits(params.tables, params.bits)?;
        if params.iterations == 0 {
            return Err(LshError::InvalidParameter(
                "iteration count must be positive".to_string(),
            ));
        }
        let dim = dataset.dim();
        let bits = params.bits;

        let x = linalg::dataset_matrix(dataset);
        let cov = linalg::covariance(&x, false);
        let basis = linalg::top_eigenvectors(cov, bits)?;
        let projected = &x * &basis;

        let mut proj = Vec::with_capacity(params.tables * bits * dim);
        for _ in 0..params.tables {
            let init = DMatrix::from_fn(bits, bits, |_, _| rng.sample::<f64, _>(StandardNormal));
            let (mut rotation, _) = linalg::svd_factors(init)?;
            for _ in 0..params.iterations {
                let z = &projected * &rotation;
                let codes = z.map(|v| if v >= 0.0 { 1.0 } else { -1.0 });
                let (u, v_t) = linalg::svd_factors(codes.transpose() * &projected)?;
                rotation = v_t.transpose() * u.transpose();
            }
            let combined = (&basis * &rotation).transpose();
            for j in 0..bits {
                for i in 0..dim {
                    proj.push(combined[(j, i)] as f32);
                }
            }
        }

        Ok(Self {
            tables: params.tables,
            bits,
            dim,
            proj,
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
        pack_sign_bits((0..self.bits).map(|b| project(vector, self.row(table, b))))
    }

    fn probe_keys(&self, vector: &[f32], table: usize, budget: usize, out: &mut ProbeBuf) {
        let base = self.hash_point(vector, table);
        uniform_flips(base, self.bits as u32, budget, out);
    }

    fn write_params<W: Write>(&self, w: &mut W) -> Result<()> {
        persist::write_u32(w, self.tables as u32)?;
        persist::write_u32(w, self.bits as u32)?;
        persist::write_u32(w, self.dim as u32)?;
        persist::write_f32_slice(w, &self.proj)
    }

    fn read_params<R: Read>(r: &mut R) -> Result<Self> {
        let tables = persist::read_u32(r)? as usize;
        let bits = persist::read_u32(r)? as usize;
        let dim = persist::read_u32(r)? as usize;
        let proj = persist::read_f32_vec(r)?;
        if proj.len() != tables * bits * dim {
            return Err(LshError::CorruptArtifact(
                "itq projection table has wrong length".to_string(),
            ));
        }
        Ok(Self {
            tables,
            bits,
            dim,
            proj,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn clusters() -> Dataset<f32> {
        // Two tight clusters in opposite quadrants.
        let mut rows = Vec::new();
        for i in 0..8 {
            let eps = i as f32 * 0.01;
            rows.push(vec![5.0 + eps, 5.0 - eps, 0.1]);
            rows.push(vec![-5.0 - eps, -5.0 + eps, -0.1]);
        }
        Dataset::from_rows(&rows).unwrap()
    }

    #[test]
    fn rotation_rows_stay_orthonormal() {
        let params = ItqParams {
            tables: 1,
            bits: 2,
            iterations: 10,
        };
        let mut rng = StdRng::seed_from_u64(21);
        let fam = Itq::fit(&clusters(), &params, &mut rng).unwrap();
        // Rows of an orthogonal rotation of an orthonormal basis are
        // themselves unit-norm.
        for b in 0..2 {
            let norm: f32 = fam.row(0, b).iter().map(|x| x * x).sum();
            assert!((norm - 1.0).abs() < 1e-4, "row {b} norm {norm}");
        }
    }

    #[test]
    fn opposite_clusters_get_different_codes() {
        let params = ItqParams {
            tables: 1,
            bits: 2,
            iterations: 10,
        };
        let mut rng = StdRng::seed_from_u64(4);
        let fam = Itq::fit(&clusters(), &params, &mut rng).unwrap();
        let a = fam.hash_point(&[5.0f32, 5.0, 0.1], 0);
        let b = fam.hash_point(&[-5.0f32, -5.0, -0.1], 0);
        assert_ne!(a, b);
    }

    #[test]
    fn code_width_is_respected() {
        let params = ItqParams {
            tables: 2,
            bits: 3,
            iterations: 2,
        };
        let mut rng = StdRng::seed_from_u64(8);
        let fam = Itq::fit(&clusters(), &params, &mut rng).unwrap();
        for t in 0..2 {
            assert!(fam.hash_point(&[1.0f32, 2.0, 3.0], t) < 1 << 3);
        }
    }
}

//! Spectral hashing.
//!
//! Principal components of the centered covariance span the data; along each
//! component the dataset occupies an interval `[min, max]`. Treating that
//! interval as the domain of a Laplacian eigenproblem with a uniform prior
//! gives analytic eigenfunctions `sin(pi/2 + f * omega0 * y)` with
//! eigenvalues `(f * omega0)^2`, where `omega0 = pi / (max - min)` and
//! `f = 1, 2, ...` counts oscillation modes (the constant `f = 0` mode
//! carries no information and is skipped). The `bits` smallest-eigenvalue
//! modes across all components become the code bits.
//!
//! Fitting is fully deterministic given the dataset, so all tables produce
//! identical codes; one table is the sensible configuration.

use std::f64::consts::PI;
use std::io::{Read, Write};

use rand::rngs::StdRng;
use tracing::debug;

use crate::dataset::Dataset;
use crate::distance::Metric;
use crate::error::{LshError, Result};
use crate::family::{pack_sign_bits, project, validate_tables_bits, FamilyTag, HashFamily};
use crate::linalg;
use crate::persist;
use crate::probe::{uniform_flips, ProbeBuf};

/// Degenerate components get this range instead of zero.
const MIN_RANGE: f64 = 1e-6;

/// Configuration for [`Spectral`].
#[derive(Debug, Clone)]
pub struct SpectralParams {
    /// Number of hash tables. Fitting is deterministic, so extra tables
    /// duplicate the first.
    pub tables: usize,
    /// Code length (key width), at most the dataset dimension.
    pub bits: usize,
}

/// Fitted spectral-hashing family.
#[derive(Debug, Clone)]
pub struct Spectral {
    tables: usize,
    bits: usize,
    dim: usize,
    /// Principal components, `bits` rows of `dim`, stored flat.
    components: Vec<f32>,
    /// Per-component dataset minimum of the projection, `bits` long.
    mins: Vec<f32>,
    /// Component index of each selected mode, `bits` long.
    mode_pcs: Vec<u32>,
    /// Angular frequency `f * omega0` of each selected mode, `bits` long.
    mode_omegas: Vec<f32>,
}

impl Spectral {
    #[inline]
    fn component(&self, pc: usize) -> &[f32] {
        &self.components[pc * self.dim..(pc + 1) * self.dim]
    }
}

impl HashFamily<f32> for Spectral {
    type Params = SpectralParams;

    const TAG: FamilyTag = FamilyTag::Spectral;

    fn fit(dataset: &Dataset<f32>, params: &Self::Params, _rng: &mut StdRng) -> Result<Self> {
        validate_tables_bits(params.tables, params.bits)?;
        if params.tables > 1 {
            debug!(
                tables = params.tables,
                "spectral fit is deterministic; extra tables duplicate the first"
            );
        }
        let dim = dataset.dim();
        let bits = params.bits;

        let x = linalg::dataset_matrix(dataset);
        let cov = linalg::covariance(&x, true);
        let basis = linalg::top_eigenvectors(cov, bits)?;
        let projected = &x * &basis;

        let mut mins = vec![f64::INFINITY; bits];
        let mut maxs = vec![f64::NEG_INFINITY; bits];
        for i in 0..projected.nrows() {
            for j in 0..bits {
                let y = projected[(i, j)];
                mins[j] = mins[j].min(y);
                maxs[j] = maxs[j].max(y);
            }
        }
        let ranges: Vec<f64> = (0..bits).map(|j| (maxs[j] - mins[j]).max(MIN_RANGE)).collect();
        let max_range = ranges.iter().cloned().fold(MIN_RANGE, f64::max);

        // Enumerate candidate modes per component and keep the smoothest.
        let mut modes: Vec<(f64, usize, u32)> = Vec::new();
        for (pc, &range) in ranges.iter().enumerate() {
            let omega0 = PI / range;
            let max_mode = ((bits as f64 + 1.0) * range / max_range).ceil() as u32;
            for f in 1..=max_mode {
                let omega = f64::from(f) * omega0;
                modes.push((omega * omega, pc, f));
            }
        }
        modes.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });
        modes.truncate(bits);

        let mut components = Vec::with_capacity(bits * dim);
        for j in 0..bits {
            for i in 0..dim {
                components.push(basis[(i, j)] as f32);
            }
        }
        let mode_pcs = modes.iter().map(|&(_, pc, _)| pc as u32).collect();
        let mode_omegas = modes
            .iter()
            .map(|&(_, pc, f)| (f64::from(f) * PI / ranges[pc]) as f32)
            .collect();

        Ok(Self {
            tables: params.tables,
            bits,
            dim,
            components,
            mins: mins.iter().map(|&m| m as f32).collect(),
            mode_pcs,
            mode_omegas,
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

    fn hash_point(&self, vector: &[f32], _table: usize) -> u64 {
        pack_sign_bits((0..self.bits).map(|b| {
            let pc = self.mode_pcs[b] as usize;
            let y = project(vector, self.component(pc)) - self.mins[pc];
            (std::f32::consts::FRAC_PI_2 + self.mode_omegas[b] * y).sin()
        }))
    }

    fn probe_keys(&self, vector: &[f32], table: usize, budget: usize, out: &mut ProbeBuf) {
        let base = self.hash_point(vector, table);
        uniform_flips(base, self.bits as u32, budget, out);
    }

    fn write_params<W: Write>(&self, w: &mut W) -> Result<()> {
        persist::write_u32(w, self.tables as u32)?;
        persist::write_u32(w, self.bits as u32)?;
        persist::write_u32(w, self.dim as u32)?;
        persist::write_f32_slice(w, &self.components)?;
        persist::write_f32_slice(w, &self.mins)?;
        persist::write_u32_slice(w, &self.mode_pcs)?;
        persist::write_f32_slice(w, &self.mode_omegas)
    }

    fn read_params<R: Read>(r: &mut R) -> Result<Self> {
        let tables = persist::read_u32(r)? as usize;
        let bits = persist::read_u32(r)? as usize;
        let dim = persist::read_u32(r)? as usize;
        let components = persist::read_f32_vec(r)?;
        let mins = persist::read_f32_vec(r)?;
        let mode_pcs: Vec<u32> = persist::read_u32_vec(r)?;
        let mode_omegas = persist::read_f32_vec(r)?;
        if components.len() != bits * dim
            || mins.len() != bits
            || mode_pcs.len() != bits
            || mode_omegas.len() != bits
            || mode_pcs.iter().any(|&pc| pc as usize >= bits)
        {
            return Err(LshError::CorruptArtifact(
                "spectral parameter block has wrong shape".to_string(),
            ));
        }
        Ok(Self {
            tables,
            bits,
            dim,
            components,
            mins,
            mode_pcs,
            mode_omegas,
        })
    }
}

//! Hash families.
//!
//! Six sibling implementations of one capability set: fit against a dataset,
//! hash any vector to a per-table bucket key, and enumerate probe keys for
//! multi-probe queries. No family is a refinement of another; the index and
//! query engine only ever talk to the [`HashFamily`] trait.
//!
//! | Family | Data | Key derivation | Probing |
//! |---|---|---|---|
//! | [`BitSampling`] | `u32` | K sampled bits of the unary value encoding | bit flips |
//! | [`Hyperplane`] | `f32` | signs of K random-hyperplane projections | margin-ranked bit flips |
//! | [`Threshold`] | `f32` | K projections thresholded at their median | bit flips, widens on empty |
//! | [`PStable`] | `f32` | K quantized stable projections, mixed | adjacent cells |
//! | [`Spectral`] | `f32` | signs of K analytic PCA eigenfunctions | bit flips |
//! | [`Itq`] | `f32` | signs of rotated PCA projections | bit flips |

mod bit_sampling;
mod hyperplane;
mod itq;
mod pstable;
mod spectral;
mod threshold;

pub use bit_sampling::{BitSampling, BitSamplingParams};
pub use hyperplane::{Hyperplane, HyperplaneParams};
pub use itq::{Itq, ItqParams};
pub use pstable::{PStable, PStableParams, Stability};
pub use spectral::{Spectral, SpectralParams};
pub use threshold::{Threshold, ThresholdParams};

use std::io::{Read, Write};

use rand::rngs::StdRng;

use crate::dataset::{Dataset, Element};
use crate::distance::Metric;
use crate::error::{LshError, Result};
pub use crate::probe::ProbeBuf;

/// Identifies a hash family in artifact headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FamilyTag {
    BitSampling = 1,
    Hyperplane = 2,
    Threshold = 3,
    PStable = 4,
    Spectral = 5,
    Itq = 6,
}

impl FamilyTag {
    /// Human-readable family name, used in logs.
    pub fn name(self) -> &'static str {
        match self {
            FamilyTag::BitSampling => "bit-sampling",
            FamilyTag::Hyperplane => "hyperplane",
            FamilyTag::Threshold => "threshold",
            FamilyTag::PStable => "p-stable",
            FamilyTag::Spectral => "spectral",
            FamilyTag::Itq => "itq",
        }
    }
}

impl TryFrom<u8> for FamilyTag {
    type Error = LshError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(FamilyTag::BitSampling),
            2 => Ok(FamilyTag::Hyperplane),
            3 => Ok(FamilyTag::Threshold),
            4 => Ok(FamilyTag::PStable),
            5 => Ok(FamilyTag::Spectral),
            6 => Ok(FamilyTag::Itq),
            other => Err(LshError::CorruptArtifact(format!(
                "unknown family tag {other}"
            ))),
        }
    }
}

/// Capability set shared by all hash families.
///
/// A value of an implementing type is the *fitted* state: random projections,
/// sampled bit positions, learned rotations. It is produced once by
/// [`HashFamily::fit`] and immutable afterwards; hashing and probing are
/// read-only and safe to call concurrently.
pub trait HashFamily<T: Element>: Sized + Send + Sync {
    /// Build-time configuration for this family.
    type Params: Clone + std::fmt::Debug;

    /// Tag written into artifact headers.
    const TAG: FamilyTag;

    /// Validate `params` and fit hash functions against `dataset`.
    ///
    /// All randomness is drawn from `rng`, so a seed fully determines the
    /// fitted state.
    fn fit(dataset: &Dataset<T>, params: &Self::Params, rng: &mut StdRng) -> Result<Self>;

    /// Number of hash tables.
    fn tables(&self) -> usize;

    /// Vector dimension this family was fitted for.
    fn dim(&self) -> usize;

    /// True distance metric implied by this family.
    fn metric(&self) -> Metric;

    /// Packed key width in bits, or `None` when the key space is unbounded
    /// (quantization-cell keys). Drives dense vs. sparse bucket storage.
    fn key_bits(&self) -> Option<u32>;

    /// Bucket key of `vector` under table `table`.
    ///
    /// `vector` must have length [`dim`](HashFamily::dim); the index
    /// validates this before calling.
    fn hash_point(&self, vector: &[T], table: usize) -> u64;

    /// Emit up to `budget` additional candidate keys near `vector`'s exact
    /// key for table `table`.
    fn probe_keys(&self, vector: &[T], table: usize, budget: usize, out: &mut ProbeBuf);

    /// Whether an empty exact bucket should widen to neighboring buckets
    /// even when the caller requested no probes.
    fn widens_on_empty(&self) -> bool {
        false
    }

    /// Serialize the fitted state (artifact parameter block).
    fn write_params<W: Write>(&self, w: &mut W) -> Result<()>;

    /// Deserialize a fitted state previously written by
    /// [`write_params`](HashFamily::write_params).
    fn read_params<R: Read>(r: &mut R) -> Result<Self>;
}

/// Shared validation for `(tables, bits)` parameter pairs of the
/// packed-bit-key families.
pub(crate) fn validate_tables_bits(tables: usize, bits: usize) -> Result<()> {
    if tables == 0 {
        return Err(LshError::InvalidParameter(
            "table count must be positive".to_string(),
        ));
    }
    if bits == 0 || bits > 64 {
        return Err(LshError::InvalidParameter(format!(
            "bits per key must be in 1..=64, got {bits}"
        )));
    }
    Ok(())
}

/// Pack sign bits of projections into a key: bit `i` set iff
/// `projections[i] > 0`.
#[inline]
pub(crate) fn pack_sign_bits(projections: impl Iterator<Item = f32>) -> u64 {
    let mut key = 0u64;
    for (i, p) in projections.enumerate() {
        if p > 0.0 {
            key |= 1u64 << i;
        }
    }
    key
}

/// Dot product of a dataset vector with an `f32` projection row.
#[inline]
pub(crate) fn project<T: Element>(vector: &[T], row: &[f32]) -> f32 {
    vector
        .iter()
        .zip(row)
        .map(|(&v, &w)| v.to_f32() * w)
        .sum()
}

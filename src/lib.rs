//! vecino: locality-sensitive hashing for approximate nearest neighbors.
//!
//! Six hash families behind one trait, an index that owns its dataset, and a
//! query engine that always ranks by true distance:
//!
//! - [`family::BitSampling`]: sampled bits of unary-encoded integers, Hamming.
//! - [`family::Hyperplane`]: random-hyperplane signs, angular/L2.
//! - [`family::Threshold`]: projections split at data medians, L2.
//! - [`family::PStable`]: quantized stable projections, L1 or L2.
//! - [`family::Spectral`]: analytic Laplacian eigenfunctions over PCA, L2.
//! - [`family::Itq`]: learned rotation of the PCA subspace, L2.
//!
//! # How candidates become results
//!
//! Hashing is only a coarse filter. A query collects bucket candidates from
//! every table (optionally probing neighboring buckets), deduplicates them,
//! and computes the exact distance of each survivor against the original
//! vectors. Recall depends on the family and its parameters; result ordering
//! never does.
//!
//! # Choosing parameters
//!
//! More bits per key make buckets smaller and queries cheaper but miss more
//! true neighbors; more tables or probes buy recall back. A common starting
//! point is 12-16 bits, 4-8 tables, and a probe budget near the bit count.
//! Spectral hashing fits deterministically, so give it one table and spend
//! the budget on probes instead.
//!
//! # Example
//!
//! ```
//! use vecino::{Dataset, Hyperplane, HyperplaneParams, LshIndex, QuerySpec};
//!
//! let dataset = Dataset::from_rows(&[
//!     vec![0.0f32, 0.0],
//!     vec![1.0, 0.0],
//!     vec![5.0, 5.0],
//! ])?;
//! let params = HyperplaneParams { tables: 4, bits: 8 };
//! let index = LshIndex::<f32, Hyperplane>::build(dataset, &params, 42)?;
//!
//! // A dataset point always finds itself at distance zero.
//! let hits = index.query(&[5.0, 5.0], &QuerySpec::top_k(1))?;
//! assert_eq!(hits[0].id, 2);
//! assert_eq!(hits[0].distance, 0.0);
//! # Ok::<(), vecino::LshError>(())
//! ```

pub mod dataset;
pub mod distance;
pub mod error;
pub mod family;
pub mod index;
pub mod query;

mod linalg;
mod persist;
mod probe;
mod table;

pub use dataset::{Dataset, Element};
pub use distance::Metric;
pub use error::{LshError, Result};
pub use family::{
    BitSampling, BitSamplingParams, FamilyTag, HashFamily, Hyperplane, HyperplaneParams, Itq,
    ItqParams, PStable, PStableParams, ProbeBuf, Spectral, SpectralParams, Stability, Threshold,
    ThresholdParams,
};
pub use index::LshIndex;
pub use query::{Neighbor, QuerySpec, Retrieval};

//! Distance metrics for candidate ranking.
//!
//! Each hash family implies one metric (see `HashFamily::metric`): Hamming
//! for the integer bit-sampling family, L1 for Cauchy p-stable hashes, L2
//! everywhere else. The query engine always ranks candidates by the true
//! distance computed here against the original dataset, never by code
//! distance.

use crate::dataset::Element;

/// Distance metric over dataset vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Manhattan (L1) distance.
    L1,
    /// Euclidean (L2) distance.
    L2,
    /// Number of coordinates that differ.
    Hamming,
}

impl Metric {
    /// Compute the distance between two vectors.
    ///
    /// If dimensions mismatch, this returns `f32::INFINITY` so the pair is
    /// never selected as a nearest neighbor.
    #[inline]
    #[must_use]
    pub fn distance<T: Element>(self, a: &[T], b: &[T]) -> f32 {
        match self {
            Metric::L1 => l1_distance(a, b),
            Metric::L2 => l2_distance(a, b),
            Metric::Hamming => hamming_distance(a, b),
        }
    }
}

/// Manhattan (L1) distance.
#[inline]
#[must_use]
pub fn l1_distance<T: Element>(a: &[T], b: &[T]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (x.to_f32() - y.to_f32()).abs())
        .sum()
}

/// Euclidean (L2) distance.
#[inline]
#[must_use]
pub fn l2_distance<T: Element>(a: &[T], b: &[T]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x.to_f32() - y.to_f32();
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Number of coordinates at which the two vectors disagree.
#[inline]
#[must_use]
pub fn hamming_distance<T: Element>(a: &[T], b: &[T]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter().zip(b).filter(|(x, y)| x != y).count() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_matches_hand_computation() {
        let a = [0.0f32, 0.0];
        let b = [3.0f32, 4.0];
        assert!((l2_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn l1_matches_hand_computation() {
        let a = [1.0f32, -1.0];
        let b = [4.0f32, 1.0];
        assert!((l1_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn hamming_counts_disagreements() {
        let a = [1u32, 2, 3, 4];
        let b = [1u32, 9, 3, 7];
        assert_eq!(hamming_distance(&a, &b), 2.0);
    }

    #[test]
    fn mismatched_lengths_are_infinite() {
        assert!(l2_distance(&[1.0f32], &[1.0f32, 2.0]).is_infinite());
        assert!(hamming_distance(&[1u32], &[1u32, 2]).is_infinite());
    }
}

//! End-to-end build-and-query tests across all six hash families.

use vecino::{
    BitSampling, BitSamplingParams, Dataset, Hyperplane, HyperplaneParams, Itq, ItqParams,
    LshError, LshIndex, PStable, PStableParams, QuerySpec, Spectral, SpectralParams, Stability,
    Threshold, ThresholdParams,
};

fn five_points() -> Dataset<f32> {
    Dataset::from_rows(&[
        vec![0.0f32, 0.0],
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![5.0, 5.0],
        vec![5.0, 6.0],
    ])
    .unwrap()
}

#[test]
fn hyperplane_finds_an_exact_match() {
    let params = HyperplaneParams { tables: 1, bits: 2 };
    let index = LshIndex::<f32, Hyperplane>::build(five_points(), &params, 1234).unwrap();

    // The zero vector projects to zero on every hyperplane, so it shares a
    // bucket with point 0 no matter how the planes were drawn.
    let hits = index.query(&[0.0, 0.0], &QuerySpec::top_k(1)).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 0);
    assert_eq!(hits[0].distance, 0.0);
}

#[test]
fn hyperplane_probing_recovers_the_true_neighbors() {
    let params = HyperplaneParams { tables: 1, bits: 2 };
    let index = LshIndex::<f32, Hyperplane>::build(five_points(), &params, 99).unwrap();

    // Three probes plus the exact bucket cover the whole 2-bit key space,
    // so this is exhaustive regardless of seed.
    let spec = QuerySpec::top_k(2).with_probes(3);
    let hits = index.query(&[5.0, 5.0], &spec).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, 3);
    assert_eq!(hits[0].distance, 0.0);
    assert_eq!(hits[1].id, 4);
    assert_eq!(hits[1].distance, 1.0);
}

#[test]
fn radius_query_keeps_only_close_points() {
    let params = HyperplaneParams { tables: 1, bits: 2 };
    let index = LshIndex::<f32, Hyperplane>::build(five_points(), &params, 7).unwrap();

    let spec = QuerySpec::radius(1.5).with_probes(3);
    let hits = index.query(&[5.0, 5.0], &spec).unwrap();
    let ids: Vec<u32> = hits.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![3, 4]);
    assert!(hits.iter().all(|n| n.distance <= 1.5));
}

#[test]
fn every_family_retrieves_its_own_points() {
    let rows: Vec<Vec<f32>> = (0..24)
        .map(|i| {
            let t = i as f32;
            vec![t.sin() * 3.0, t.cos() * 3.0, t * 0.25, 1.0 - t * 0.1]
        })
        .collect();
    let ds = Dataset::from_rows(&rows).unwrap();

    fn assert_self_retrieval<F: vecino::HashFamily<f32>>(
        index: &LshIndex<f32, F>,
        ds: &Dataset<f32>,
    ) {
        for i in 0..ds.len() {
            let hits = index.query(ds.row(i), &QuerySpec::top_k(1)).unwrap();
            assert_eq!(hits[0].distance, 0.0, "point {i} missed itself");
        }
    }

    let hp = LshIndex::<f32, Hyperplane>::build(
        ds.clone(),
        &HyperplaneParams { tables: 4, bits: 8 },
        3,
    )
    .unwrap();
    assert_self_retrieval(&hp, &ds);

    let th = LshIndex::<f32, Threshold>::build(
        ds.clone(),
        &ThresholdParams { tables: 4, bits: 6 },
        3,
    )
    .unwrap();
    assert_self_retrieval(&th, &ds);

    let ps = LshIndex::<f32, PStable>::build(
        ds.clone(),
        &PStableParams {
            tables: 4,
            projections: 3,
            width: 2.0,
            stability: Stability::Gaussian,
        },
        3,
    )
    .unwrap();
    assert_self_retrieval(&ps, &ds);

    let sp = LshIndex::<f32, Spectral>::build(
        ds.clone(),
        &SpectralParams { tables: 1, bits: 4 },
        3,
    )
    .unwrap();
    assert_self_retrieval(&sp, &ds);

    let itq = LshIndex::<f32, Itq>::build(
        ds.clone(),
        &ItqParams {
            tables: 2,
            bits: 4,
            iterations: 20,
        },
        3,
    )
    .unwrap();
    assert_self_retrieval(&itq, &ds);
}

#[test]
fn bit_sampling_ranks_by_hamming_distance() {
    let ds = Dataset::from_rows(&[
        vec![1u32, 1, 1, 1],
        vec![1, 1, 1, 2],
        vec![3, 3, 0, 0],
    ])
    .unwrap();
    let params = BitSamplingParams {
        tables: 4,
        bits: 6,
        value_range: 4,
    };
    let index = LshIndex::<u32, BitSampling>::build(ds, &params, 17).unwrap();

    let spec = QuerySpec::top_k(3).with_probes(16);
    let hits = index.query(&[1u32, 1, 1, 1], &spec).unwrap();
    assert_eq!(hits[0].id, 0);
    assert_eq!(hits[0].distance, 0.0);
    // Hamming distances: 1 coordinate differs for point 1, all four for 2.
    if let Some(second) = hits.get(1) {
        assert_eq!(second.id, 1);
        assert_eq!(second.distance, 1.0);
    }
}

#[test]
fn threshold_widens_instead_of_returning_nothing() {
    // Two clusters; a query between them may hash into an empty bucket, and
    // the median-threshold family then widens by one bit on its own.
    let mut rows = Vec::new();
    for i in 0..8 {
        rows.push(vec![10.0 + i as f32 * 0.1, 10.0]);
        rows.push(vec![-10.0 - i as f32 * 0.1, -10.0]);
    }
    let ds = Dataset::from_rows(&rows).unwrap();
    // With 2-bit keys and median splits, every key is within one bit flip of
    // an occupied bucket, so the widened lookup always lands somewhere.
    let params = ThresholdParams { tables: 2, bits: 2 };
    let index = LshIndex::<f32, Threshold>::build(ds, &params, 12).unwrap();

    let hits = index.query(&[0.5, 0.3], &QuerySpec::top_k(3)).unwrap();
    assert!(!hits.is_empty(), "graceful widening found no candidates");
}

#[test]
fn query_dimension_is_checked() {
    let params = HyperplaneParams { tables: 1, bits: 2 };
    let index = LshIndex::<f32, Hyperplane>::build(five_points(), &params, 0).unwrap();
    let err = index.query(&[1.0, 2.0, 3.0], &QuerySpec::top_k(1)).unwrap_err();
    assert!(matches!(
        err,
        LshError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    ));
}

#[test]
fn invalid_parameters_are_rejected() {
    let ds = five_points();
    assert!(matches!(
        LshIndex::<f32, Hyperplane>::build(ds.clone(), &HyperplaneParams { tables: 0, bits: 4 }, 0),
        Err(LshError::InvalidParameter(_))
    ));
    assert!(matches!(
        LshIndex::<f32, Hyperplane>::build(ds.clone(), &HyperplaneParams { tables: 1, bits: 0 }, 0),
        Err(LshError::InvalidParameter(_))
    ));
    // More code bits than dimensions: no PCA basis of that size exists.
    assert!(matches!(
        LshIndex::<f32, Spectral>::build(ds.clone(), &SpectralParams { tables: 1, bits: 5 }, 0),
        Err(LshError::InvalidParameter(_))
    ));
    assert!(matches!(
        LshIndex::<f32, Itq>::build(
            ds.clone(),
            &ItqParams {
                tables: 1,
                bits: 2,
                iterations: 0,
            },
            0
        ),
        Err(LshError::InvalidParameter(_))
    ));
    assert!(matches!(
        LshIndex::<f32, PStable>::build(
            ds,
            &PStableParams {
                tables: 1,
                projections: 2,
                width: -1.0,
                stability: Stability::Cauchy,
            },
            0
        ),
        Err(LshError::InvalidParameter(_))
    ));
}

#[test]
fn top_k_larger_than_dataset_returns_everything_found() {
    let params = HyperplaneParams { tables: 2, bits: 2 };
    let index = LshIndex::<f32, Hyperplane>::build(five_points(), &params, 5).unwrap();
    let spec = QuerySpec::top_k(100).with_probes(3);
    let hits = index.query(&[0.0, 0.0], &spec).unwrap();
    assert_eq!(hits.len(), 5);
    // Sorted by distance, no duplicate identifiers.
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    let mut ids: Vec<u32> = hits.iter().map(|n| n.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

//! Property tests for query invariants that must hold for any dataset,
//! query point, and seed.

use proptest::prelude::*;

use vecino::{
    Dataset, Hyperplane, HyperplaneParams, LshIndex, PStable, PStableParams, QuerySpec, Retrieval,
    Stability,
};

fn dataset_strategy() -> impl Strategy<Value = (Vec<Vec<f32>>, Vec<f32>)> {
    (2usize..6).prop_flat_map(|dim| {
        let row = proptest::collection::vec(-10.0f32..10.0, dim);
        (
            proptest::collection::vec(row.clone(), 2..24),
            row,
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn results_are_sorted_deduplicated_and_bounded(
        (rows, query) in dataset_strategy(),
        seed in any::<u64>(),
        k in 1usize..8,
        probes in 0usize..12,
    ) {
        let ds = Dataset::from_rows(&rows).unwrap();
        let params = HyperplaneParams { tables: 3, bits: 6 };
        let index = LshIndex::<f32, Hyperplane>::build(ds, &params, seed).unwrap();

        let spec = QuerySpec {
            mode: Retrieval::TopK(k),
            probes_per_table: probes,
        };
        let hits = index.query(&query, &spec).unwrap();

        prop_assert!(hits.len() <= k);
        prop_assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        let mut ids: Vec<u32> = hits.iter().map(|n| n.id).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), hits.len());
        prop_assert!(hits.iter().all(|n| (n.id as usize) < rows.len()));
    }

    #[test]
    fn same_seed_means_same_results(
        (rows, query) in dataset_strategy(),
        seed in any::<u64>(),
    ) {
        let params = HyperplaneParams { tables: 2, bits: 5 };
        let a = LshIndex::<f32, Hyperplane>::build(
            Dataset::from_rows(&rows).unwrap(), &params, seed,
        ).unwrap();
        let b = LshIndex::<f32, Hyperplane>::build(
            Dataset::from_rows(&rows).unwrap(), &params, seed,
        ).unwrap();

        let spec = QuerySpec::top_k(5).with_probes(4);
        prop_assert_eq!(a.query(&query, &spec).unwrap(), b.query(&query, &spec).unwrap());
    }

    #[test]
    fn every_point_finds_a_zero_distance_match(
        (rows, _) in dataset_strategy(),
        seed in any::<u64>(),
    ) {
        let ds = Dataset::from_rows(&rows).unwrap();
        let params = HyperplaneParams { tables: 2, bits: 4 };
        let index = LshIndex::<f32, Hyperplane>::build(ds.clone(), &params, seed).unwrap();

        // A point always collides with itself, so the nearest hit sits at
        // distance zero (possibly a duplicate row with a smaller id).
        for i in 0..ds.len() {
            let hits = index.query(ds.row(i), &QuerySpec::top_k(1)).unwrap();
            prop_assert_eq!(hits[0].distance, 0.0);
        }
    }

    #[test]
    fn radius_results_respect_the_radius(
        (rows, query) in dataset_strategy(),
        seed in any::<u64>(),
        radius in 0.0f32..20.0,
    ) {
        let ds = Dataset::from_rows(&rows).unwrap();
        let params = PStableParams {
            tables: 3,
            projections: 2,
            width: 3.0,
            stability: Stability::Cauchy,
        };
        let index = LshIndex::<f32, PStable>::build(ds, &params, seed).unwrap();

        let spec = QuerySpec::radius(radius).with_probes(4);
        let hits = index.query(&query, &spec).unwrap();
        prop_assert!(hits.iter().all(|n| n.distance <= radius));
    }
}

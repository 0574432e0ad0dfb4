use biblio_clustering::{DensityClusterer, Hdbscan, HdbscanParams, Projector, Tsne, TsneParams};
use biblio_common::{ClusterId, NOISE_CLUSTER};

/// Twelve rows around each of two centers far apart in 4 dimensions
fn two_topics() -> Vec<Vec<f64>> {
    let mut data = Vec::new();
    for center in [0.0, 50.0] {
        for i in 0..12 {
            let jitter = (i as f64 - 5.5) * 0.05;
            data.push(vec![center + jitter, center - jitter, center + jitter / 2.0, center]);
        }
    }
    data
}

fn projector(n_dims: usize) -> Box<dyn Projector> {
    Box::new(Tsne::new(
        TsneParams::default()
            .with_n_dims(n_dims)
            .with_perplexity(5.0)
            .with_iterations(400)
            .with_seed(7),
    ))
}

#[test]
fn test_projection_through_trait_object() {
    let data = two_topics();
    let projected = projector(3).project(&data).unwrap();

    assert_eq!(projected.len(), data.len());
    assert!(projected.iter().all(|row| row.len() == 3));
    assert!(projected.iter().flatten().all(|v| v.is_finite()));
}

#[test]
fn test_projection_is_reproducible_for_a_seed() {
    let data = two_topics();
    assert_eq!(projector(2).project(&data).unwrap(), projector(2).project(&data).unwrap());
}

#[test]
fn test_projected_topics_never_share_a_cluster() {
    let projected = projector(2).project(&two_topics()).unwrap();

    let clusterer: Box<dyn DensityClusterer> = Box::new(Hdbscan::new(
        HdbscanParams::default().with_min_cluster_size(5).with_min_samples(3),
    ));
    let labels = clusterer.fit_predict(&projected).unwrap();

    assert_eq!(labels.len(), 24);

    let clustered = |half: &[ClusterId]| -> Vec<ClusterId> {
        half.iter().copied().filter(|l| *l != NOISE_CLUSTER).collect()
    };
    let (first, second) = (clustered(&labels[..12]), clustered(&labels[12..]));
    assert!(!first.is_empty());
    assert!(!second.is_empty());
    assert!(first.iter().all(|l| !second.contains(l)), "a cluster spans both topics");
}

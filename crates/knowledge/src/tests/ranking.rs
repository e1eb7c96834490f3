//! Ranking behaviour of the vector index under both metrics.

use crate::index::{SearchHit, VectorIndex};
use crate::types::{Chunk, DistanceMetric, IndexEntry, ModelIdentity};
use chrono::Utc;
use std::sync::Arc;

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn entry(source: &str, text: &str, embedding: &[f32]) -> IndexEntry {
    IndexEntry {
        embedding: normalize(embedding),
        chunk: Chunk {
            source_id: source.to_string(),
            position: 0,
            text: text.to_string(),
            byte_range: (0, text.len()),
            full_text: Arc::from(text),
        },
    }
}

fn index(metric: DistanceMetric, entries: Vec<IndexEntry>) -> VectorIndex {
    VectorIndex::new(
        ModelIdentity {
            provider: "fixed".to_string(),
            model: "unit".to_string(),
            dimensions: 3,
        },
        metric,
        Utc::now(),
        Vec::new(),
        entries,
    )
    .unwrap()
}

fn corpus(metric: DistanceMetric) -> VectorIndex {
    index(
        metric,
        vec![
            entry("cooking.txt", "Pasta needs salted water", &[0.0, 0.1, 1.0]),
            entry("rust.txt", "Rust is a systems programming language", &[1.0, 0.1, 0.0]),
            entry("python.txt", "Python is a scripting language", &[0.7, 0.7, 0.0]),
        ],
    )
}

fn sources(hits: &[SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.chunk.source_id.as_str()).collect()
}

#[test]
fn test_relevant_query_ranks_closest_first() {
    for metric in [DistanceMetric::SquaredL2, DistanceMetric::Cosine] {
        let hits = corpus(metric)
            .search(&normalize(&[0.9, 0.2, 0.0]), 10)
            .unwrap();

        assert_eq!(
            sources(&hits),
            vec!["rust.txt", "python.txt", "cooking.txt"],
            "metric {:?}",
            metric
        );
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }
}

#[test]
fn test_unrelated_query_is_far() {
    let hits = corpus(DistanceMetric::SquaredL2)
        .search(&normalize(&[0.0, -1.0, 0.0]), 1)
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert!(
        hits[0].distance > 1.0,
        "orthogonal-ish query should be farther than the default threshold, got {}",
        hits[0].distance
    );
}

#[test]
fn test_opposite_vector_is_maximally_distant() {
    let idx = index(
        DistanceMetric::Cosine,
        vec![entry("opposite.txt", "opposite", &[-1.0, 0.0, 0.0])],
    );

    let hits = idx.search(&[1.0, 0.0, 0.0], 1).unwrap();
    assert!((hits[0].distance - 2.0).abs() < 1e-6);
}

#[test]
fn test_squared_l2_on_unit_vectors_tracks_cosine() {
    // For unit vectors, squared L2 = 2 * cosine distance.
    let query = normalize(&[0.3, 0.4, 0.5]);
    let l2 = corpus(DistanceMetric::SquaredL2).search(&query, 3).unwrap();
    let cos = corpus(DistanceMetric::Cosine).search(&query, 3).unwrap();

    assert_eq!(sources(&l2), sources(&cos));
    for (a, b) in l2.iter().zip(&cos) {
        assert!((a.distance - 2.0 * b.distance).abs() < 1e-5);
    }
}

#[test]
fn test_top_k_limit_respected() {
    let entries = (0..6)
        .map(|i| entry(&format!("doc{}.txt", i), "text", &[1.0, i as f32, 0.5]))
        .collect();
    let idx = index(DistanceMetric::SquaredL2, entries);

    assert_eq!(idx.search(&[1.0, 0.0, 0.0], 3).unwrap().len(), 3);
    assert_eq!(idx.search(&[1.0, 0.0, 0.0], 10).unwrap().len(), 6);
}

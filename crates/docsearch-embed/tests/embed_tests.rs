use docsearch_core::traits::Embedder;
use docsearch_embed::{default_embedder, HashEmbedder, DEFAULT_DIM};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = default_embedder(DEFAULT_DIM).expect("embedder");
    let texts = vec!["Hello world".to_string(), "hello, WORLD!".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 2);
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), DEFAULT_DIM, "embedding dim matches");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Case and punctuation do not change tokens
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_vocabulary_is_closer() {
    let e = HashEmbedder::new(256).unwrap();
    let q = e.embed_text("react hooks state");
    let near = e.embed_text("state management with react hooks");
    let far = e.embed_text("grid layout in css");
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn empty_text_is_zero_vector() {
    let e = HashEmbedder::new(8).unwrap();
    assert!(e.embed_text("  ...  ").iter().all(|x| *x == 0.0));
    assert_eq!(e.dim(), 8);
}

#[test]
fn zero_dimension_is_rejected() {
    assert!(HashEmbedder::new(0).is_err());
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Hashing embedder properties

use rag_chat_core::embeddings::{
    bucket_for, cosine_similarity, magnitude, string_hash, HashingEmbedder, TextEmbedder,
    EMBEDDING_DIMENSION,
};

const SAMPLES: &[&str] = &[
    "Paris is the capital of France",
    "The quick brown fox jumps over the lazy dog",
    "snake_case_identifiers and CamelCase",
    "repeat repeat repeat",
    "a",
    "Numbers 42 and 3.14159 count too",
];

#[test]
fn test_embed_is_deterministic() {
    let embedder = HashingEmbedder::default();
    for text in SAMPLES {
        let first = embedder.embed(text);
        let second = HashingEmbedder::default().embed(text);
        let bits_a: Vec<u32> = first.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = second.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b, "embedding of {:?} changed between runs", text);
    }
}

#[test]
fn test_non_empty_text_is_unit_norm() {
    let embedder = HashingEmbedder::default();
    for text in SAMPLES {
        let embedding = embedder.embed(text);
        assert_eq!(embedding.len(), EMBEDDING_DIMENSION);
        assert!(
            (magnitude(&embedding) - 1.0).abs() < 1e-5,
            "norm of {:?} was {}",
            text,
            magnitude(&embedding)
        );
    }
}

#[test]
fn test_texts_without_tokens_embed_to_zero() {
    let embedder = HashingEmbedder::default();
    for text in ["", "   ", "?!.,;", "---"] {
        let embedding = embedder.embed(text);
        assert_eq!(embedding.len(), EMBEDDING_DIMENSION);
        assert!(embedding.iter().all(|v| *v == 0.0), "{:?} was not zero", text);
    }
}

#[test]
fn test_single_token_hits_its_bucket() {
    let embedder = HashingEmbedder::default();
    let embedding = embedder.embed("paris");
    let bucket = bucket_for(string_hash("paris"), EMBEDDING_DIMENSION);

    assert_eq!(embedding[bucket], 1.0);
    assert_eq!(embedding.iter().filter(|v| **v != 0.0).count(), 1);
}

#[test]
fn test_earlier_occurrences_weigh_more() {
    let embedder = HashingEmbedder::default();
    let first = embedder.embed("alpha beta");
    let second = embedder.embed("beta alpha");
    let alpha = bucket_for(string_hash("alpha"), EMBEDDING_DIMENSION);
    let beta = bucket_for(string_hash("beta"), EMBEDDING_DIMENSION);
    assert_ne!(alpha, beta);

    assert!(first[alpha] > first[beta]);
    assert!(second[beta] > second[alpha]);
}

#[test]
fn test_self_similarity_is_one() {
    let embedder = HashingEmbedder::default();
    for text in SAMPLES {
        let v = embedder.embed(text);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }
}

#[test]
fn test_norm_squares_components_in_f32() {
    // Repeated tokens give components whose f64 squares round differently.
    let embedding =
        HashingEmbedder::default().embed("paris quick of france france of quick paris quick of");

    let nonzero: Vec<(usize, u32)> = embedding
        .iter()
        .enumerate()
        .filter(|(_, v)| **v != 0.0)
        .map(|(i, v)| (i, v.to_bits()))
        .collect();
    assert_eq!(
        nonzero,
        vec![
            (87, 0x3ec6700a),
            (109, 0x3ef95c07),
            (267, 0x3f3a0909),
            (283, 0x3e94d407),
        ]
    );
}

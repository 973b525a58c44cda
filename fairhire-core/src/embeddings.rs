//! Text embeddings and the similarity capability used for feedback dispersion.
//!
//! `LocalEmbedder` hashes lower-cased word frequencies into a fixed number of
//! dimensions and L2-normalises the result. It needs no model download and is
//! deterministic, which keeps reports reproducible.

use std::collections::HashMap;

/// Text to vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;

    fn embed_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

}

/// Hashed term-frequency embedder.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dimensions: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

fn djb2(s: &str) -> usize {
    let mut hash: usize = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as usize);
    }
    hash
}

impl Embedder for LocalEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        let mut tf: HashMap<&str, usize> = HashMap::new();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            *tf.entry(word).or_insert(0) += 1;
        }

        for (term, count) in &tf {
            vector[djb2(term) % self.dimensions] += *count as f32;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

/// Cosine similarity; 0.0 when either vector is zero or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Semantic similarity between texts.
pub trait SimilarityScorer: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;

    /// Scores for every unordered pair `(i, j)` with `i < j`, row-major.
    fn pairwise(&self, texts: &[&str]) -> Vec<f64> {
        let mut scores = Vec::new();
        for i in 0..texts.len() {
            for j in (i + 1)..texts.len() {
                scores.push(self.similarity(texts[i], texts[j]));
            }
        }
        scores
    }
}

/// Cosine similarity of embeddings from any [`Embedder`].
pub struct EmbeddingSimilarity<E> {
    embedder: E,
}

impl<E: Embedder> EmbeddingSimilarity<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }
}

impl<E: Embedder> SimilarityScorer for EmbeddingSimilarity<E> {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        cosine_similarity(&self.embedder.embed(a), &self.embedder.embed(b))
    }

    fn pairwise(&self, texts: &[&str]) -> Vec<f64> {
        let vectors = self.embedder.embed_batch(texts);
        let mut scores = Vec::new();
        for i in 0..vectors.len() {
            for j in (i + 1)..vectors.len() {
                scores.push(cosine_similarity(&vectors[i], &vectors[j]));
            }
        }
        scores
    }
}

//! Embedder trait and vector utilities.
//!
//! Defines the [`Embedder`] capability that every embedding backend
//! implements, plus the cosine similarity used for ranking.
//!
//! Concrete providers (OpenAI, Gemini, the offline hashing embedder) live in
//! the `lexindex` app crate. Retry and timeout behavior is layered on top by
//! [`RetryingEmbedder`](crate::retry::RetryingEmbedder).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into a fixed-length vector.
///
/// Implementations must return vectors of the same length for every call
/// within one process configuration. Failures should be classified as
/// [`Error::ProviderTransient`](crate::Error::ProviderTransient) when a retry
/// may help and [`Error::ProviderRejected`](crate::Error::ProviderRejected)
/// otherwise.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-004"`).
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, and
/// whenever either vector has zero magnitude.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    // Accumulate in f64 so tiny components do not underflow to zero.
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if !denom.is_finite() || !dot.is_finite() {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_magnitude() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![0.3, -0.2, 0.9];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_cosine_empty() {
        let sim = cosine_similarity(&[], &[]);
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_cosine_different_lengths() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0];
        let sim = cosine_similarity(&a, &b);
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_cosine_tiny_vectors_are_not_zero() {
        let tiny = [1e-4f32; 4];
        assert!((cosine_similarity(&tiny, &tiny) - 1.0).abs() < 1e-6);

        let subnormal = [1e-30f32, 2e-30];
        assert!((cosine_similarity(&subnormal, &subnormal) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&subnormal, &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_symmetric_and_bounded() {
        let vectors = [
            vec![0.1, 0.7, -0.4, 2.0],
            vec![-3.0, 0.5, 0.5, 0.0],
            vec![1e-3, 1e-3, 1e-3, 1e-3],
            vec![100.0, -100.0, 50.0, 25.0],
        ];
        for a in &vectors {
            for b in &vectors {
                let ab = cosine_similarity(a, b);
                let ba = cosine_similarity(b, a);
                assert_eq!(ab, ba);
                assert!((-1.0..=1.0).contains(&ab));
            }
            assert!((cosine_similarity(a, a) - 1.0).abs() < 1e-5);
        }
    }
}

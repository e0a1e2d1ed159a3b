//! Vector similarity scoring.

/// Compute cosine similarity between two vectors.
///
/// The dot product divided by the product of the Euclidean norms. Returns 0.0
/// if either vector has zero magnitude. Callers are responsible for checking
/// that both vectors have the same length; extra trailing components of the
/// longer vector are ignored here.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Cosine similarity of two vectors, in `[-1, 1]`.
///
/// Returns `0.0` for mismatched lengths or a zero-magnitude side, so a
/// malformed embedding can never clear a positive threshold.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Keep candidates scoring at or above `threshold`, sort descending by score,
/// and cap at `limit`. Ties keep their input order.
pub fn rank_matches<T>(candidates: Vec<(T, f32)>, threshold: f32, limit: usize) -> Vec<(T, f32)> {
    let mut kept: Vec<(T, f32)> = candidates
        .into_iter()
        .filter(|(_, score)| *score >= threshold)
        .collect();

    kept.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    kept.truncate(limit);
    kept
}

use std::cmp::Ordering;

/// Cosine similarity; 0.0 for empty, mismatched or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Rank candidates by ascending cosine distance. The sort is stable, so
/// equal distances keep candidate order.
pub fn rank_ascending_by_distance(query: &[f32], candidates: &[Vec<f32>]) -> Vec<(usize, f32)> {
    let mut scores: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, candidate)| (idx, cosine_distance(query, candidate)))
        .collect();

    scores.sort_by(|left, right| left.1.partial_cmp(&right.1).unwrap_or(Ordering::Equal));
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn distance_is_zero_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(cosine_distance(&vec, &vec), 0.0));
    }

    #[test]
    fn distance_is_one_for_orthogonal_vectors() {
        assert!(approx_eq(cosine_distance(&[1.0, 0.0], &[0.0, 1.0]), 1.0));
    }

    #[test]
    fn degenerate_vectors_have_zero_similarity() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn ranking_returns_nearest_first_and_keeps_ties_in_order() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.1, 0.9], vec![1.0, 0.0], vec![0.5, 0.5], vec![2.0, 0.0]];
        let ranked = rank_ascending_by_distance(&query, &candidates);

        let order: Vec<usize> = ranked.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(order, vec![1, 3, 2, 0]);
    }
}


use tracing::warn;

/// Score given to a pair of vectors whose lengths differ.
/// [`rank`] drops such candidates before thresholding.
pub const DIMENSION_MISMATCH_SCORE: f32 = -1.0;

/// A ranked candidate with its cosine similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub score: f32,
}

/// Cosine similarity in `[-1, 1]`.
///
/// Zero vectors score `0.0`. Vectors of different lengths score
/// [`DIMENSION_MISMATCH_SCORE`] and log a warning instead of panicking.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        warn!(
            "Embedding dimension mismatch ({} vs {}); scoring candidate as irrelevant",
            a.len(),
            b.len()
        );
        return DIMENSION_MISMATCH_SCORE;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    // NaN passes through so the threshold filter can reject it
    similarity.clamp(-1.0, 1.0) as f32
}

/// Score every candidate against `query`, keep those at or above `threshold`,
/// and return at most `limit` of them, best first.
///
/// Candidates whose length differs from the query's are never returned,
/// whatever the threshold. The sort is stable: equal scores keep their input
/// order.
#[inline]
pub fn rank<T, V, I>(query: &[f32], candidates: I, threshold: f32, limit: usize) -> Vec<Ranked<T>>
where
    V: AsRef<[f32]>,
    I: IntoIterator<Item = (T, V)>,
{
    if limit == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<Ranked<T>> = candidates
        .into_iter()
        .filter_map(|(item, vector)| {
            let vector = vector.as_ref();
            if vector.len() != query.len() {
                warn!(
                    "Embedding dimension mismatch ({} vs {}); dropping candidate",
                    query.len(),
                    vector.len()
                );
                return None;
            }
            Some(Ranked {
                score: cosine_similarity(query, vector),
                item,
            })
        })
        .filter(|candidate| candidate.score >= threshold)
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

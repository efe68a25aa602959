//! Fixed-seed row sampling.
//!
//! Selecting `n` rows is equivalent to shuffling the whole split with a
//! seeded generator and taking the first `n`: the result is a set of
//! distinct row indices in a seed-determined order.

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Pick `n` distinct row indices out of `total`, deterministically.
///
/// The same `(total, n, seed)` always yields the same indices in the same
/// order. `n` larger than `total` is clamped to `total`.
pub fn sample_indices(total: u64, n: usize, seed: u64) -> Vec<u64> {
    let total = usize::try_from(total).unwrap_or(usize::MAX);
    let amount = n.min(total);
    if amount == 0 {
        return Vec::new();
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    index::sample(&mut rng, total, amount)
        .into_iter()
        .map(|i| i as u64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_same_seed_same_rows() {
        let a = sample_indices(117_592, 100, 42);
        let b = sample_indices(117_592, 100, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 100);
    }

    #[test]
    fn test_different_seed_different_rows() {
        let a = sample_indices(117_592, 100, 42);
        let b = sample_indices(117_592, 100, 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_indices_are_distinct_and_in_range() {
        let rows = sample_indices(500, 100, 7);
        let unique: HashSet<_> = rows.iter().collect();
        assert_eq!(unique.len(), rows.len());
        assert!(rows.iter().all(|&r| r < 500));
    }

    #[test]
    fn test_sample_larger_than_total_is_clamped() {
        let mut rows = sample_indices(5, 100, 42);
        assert_eq!(rows.len(), 5);
        rows.sort_unstable();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(sample_indices(0, 100, 42).is_empty());
        assert!(sample_indices(100, 0, 42).is_empty());
    }
}

//! 加权抽样

use crate::types::{MLError, MLResult};
use rand::seq::SliceRandom;
use rand::Rng;

/// 按权重不放回抽取 `k` 个元素。
///
/// 只在正权重的候选中抽取，候选少于 `k` 时报错。
pub fn weighted_sample<T: Clone, R: Rng + ?Sized>(
    items: &[T],
    weights: &[f64],
    k: usize,
    rng: &mut R,
) -> MLResult<Vec<T>> {
    if items.len() != weights.len() {
        return Err(MLError::DimensionMismatch {
            expected: items.len(),
            actual: weights.len(),
        });
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(MLError::InvalidConfig("权重必须为非负有限值".to_string()));
    }

    let candidates: Vec<(usize, f64)> = weights
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, w)| *w > 0.0)
        .collect();
    if candidates.len() < k {
        return Err(MLError::InsufficientData {
            required: k,
            actual: candidates.len(),
        });
    }

    let chosen = candidates
        .choose_multiple_weighted(rng, k, |(_, w)| *w)
        .map_err(|e| MLError::InvalidConfig(format!("加权抽样失败: {}", e)))?
        .map(|(index, _)| items[*index].clone())
        .collect();
    Ok(chosen)
}

/// 线性递减的名次权重：第 0 名为 `high`，最后一名为 `low`；只有一个元素时为 1
pub fn linear_rank_weights(n: usize, high: f64, low: f64) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| high - (high - low) * i as f64 / (n - 1) as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_without_replacement() {
        let mut rng = StdRng::seed_from_u64(42);
        let items: Vec<u32> = (1..=10).collect();
        let weights = vec![1.0; 10];

        let mut picked = weighted_sample(&items, &weights, 10, &mut rng).unwrap();
        picked.sort();
        assert_eq!(picked, items);
    }

    #[test]
    fn test_zero_weights_are_never_picked() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = ["01", "02", "03", "04"];
        let weights = [0.0, 5.0, 0.0, 1.0];

        for _ in 0..50 {
            let mut picked = weighted_sample(&items, &weights, 2, &mut rng).unwrap();
            picked.sort();
            assert_eq!(picked, vec!["02", "04"]);
        }
        assert!(weighted_sample(&items, &weights, 3, &mut rng).is_err());
    }

    #[test]
    fn test_same_seed_same_sample() {
        let items: Vec<u32> = (1..=35).collect();
        let weights: Vec<f64> = (1..=35).map(|i| i as f64).collect();
        let a = weighted_sample(&items, &weights, 5, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = weighted_sample(&items, &weights, 5, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_heavy_weight_dominates() {
        let items = ["01", "02"];
        let weights = [1000.0, 1.0];
        let mut rng = StdRng::seed_from_u64(3);

        let first_hits = (0..200)
            .filter(|_| weighted_sample(&items, &weights, 1, &mut rng).unwrap()[0] == "01")
            .count();
        assert!(first_hits > 190);
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(weighted_sample(&[1, 2], &[1.0], 1, &mut rng).is_err());
        assert!(weighted_sample(&[1, 2], &[1.0, -1.0], 1, &mut rng).is_err());
        assert!(weighted_sample(&[1, 2], &[1.0, f64::NAN], 1, &mut rng).is_err());
    }

    #[test]
    fn test_linear_rank_weights() {
        assert_eq!(linear_rank_weights(3, 3.0, 1.0), vec![3.0, 2.0, 1.0]);
        assert_eq!(linear_rank_weights(1, 3.0, 1.0), vec![1.0]);
        assert!(linear_rank_weights(0, 3.0, 1.0).is_empty());
    }
}

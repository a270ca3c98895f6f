//! 统计检验与相关系数

use crate::types::{MLError, MLResult, TestResult};
use ndarray::{Array2, Axis};
use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};

fn mean_var(sample: &[f64]) -> (f64, f64) {
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let var = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var)
}

/// 两独立样本 t 检验（不假设方差相等，Welch），双侧 p 值
pub fn welch_t_test(a: &[f64], b: &[f64]) -> MLResult<TestResult> {
    for sample in [a, b] {
        if sample.len() < 2 {
            return Err(MLError::InsufficientData {
                required: 2,
                actual: sample.len(),
            });
        }
    }

    let (mean_a, var_a) = mean_var(a);
    let (mean_b, var_b) = mean_var(b);
    let se_a = var_a / a.len() as f64;
    let se_b = var_b / b.len() as f64;
    let se = se_a + se_b;
    if se <= 0.0 || !se.is_finite() {
        return Err(MLError::Training("两组样本方差均为 0，t 统计量无定义".to_string()));
    }

    let statistic = (mean_a - mean_b) / se.sqrt();
    let dof = se.powi(2)
        / (se_a.powi(2) / (a.len() as f64 - 1.0) + se_b.powi(2) / (b.len() as f64 - 1.0));

    let dist = StudentsT::new(0.0, 1.0, dof).map_err(|e| MLError::Training(e.to_string()))?;
    let p_value = (2.0 * dist.sf(statistic.abs())).min(1.0);

    Ok(TestResult {
        statistic,
        p_value,
        dof,
    })
}

/// 列联表独立性卡方检验
///
/// 全零的列先剔除；自由度为 1 时使用 Yates 连续性校正。
pub fn chi_square_independence(table: &Array2<f64>) -> MLResult<TestResult> {
    let keep: Vec<usize> = (0..table.ncols())
        .filter(|&j| table.column(j).sum() > 0.0)
        .collect();
    let observed = table.select(Axis(1), &keep);

    let (rows, cols) = observed.dim();
    if rows < 2 || cols < 2 {
        return Err(MLError::InsufficientData {
            required: 2,
            actual: rows.min(cols),
        });
    }

    let row_sums = observed.sum_axis(Axis(1));
    let col_sums = observed.sum_axis(Axis(0));
    if row_sums.iter().any(|s| *s <= 0.0) {
        return Err(MLError::Training("列联表存在全零行".to_string()));
    }
    let total = row_sums.sum();

    let dof = ((rows - 1) * (cols - 1)) as f64;
    let yates = rows == 2 && cols == 2;

    let mut statistic = 0.0;
    for i in 0..rows {
        for j in 0..cols {
            let expected = row_sums[i] * col_sums[j] / total;
            let mut diff = (observed[[i, j]] - expected).abs();
            if yates {
                diff = (diff - 0.5).max(0.0);
            }
            statistic += diff * diff / expected;
        }
    }

    let dist = ChiSquared::new(dof).map_err(|e| MLError::Training(e.to_string()))?;
    Ok(TestResult {
        statistic,
        p_value: dist.sf(statistic),
        dof,
    })
}

/// Pearson 相关系数，只使用两边都有值的样本对；样本不足或方差为 0 时为 None
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        cov += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

/// 两两比较矩阵：只计算上三角并镜像，对角线填 `diagonal`
pub fn pairwise_matrix(n: usize, diagonal: f64, mut compare: impl FnMut(usize, usize) -> f64) -> Array2<f64> {
    let mut matrix = Array2::<f64>::from_elem((n, n), diagonal);
    for i in 0..n {
        for j in i + 1..n {
            let value = compare(i, j);
            matrix[[i, j]] = value;
            matrix[[j, i]] = value;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_welch_t_test() {
        let result = welch_t_test(&[0.0, 2.0], &[1.0, 3.0]).unwrap();
        assert!((result.statistic + std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((result.dof - 2.0).abs() < 1e-12);
        assert!((result.p_value - 0.552786).abs() < 1e-5);

        let swapped = welch_t_test(&[1.0, 3.0], &[0.0, 2.0]).unwrap();
        assert!((swapped.p_value - result.p_value).abs() < 1e-12);
    }

    #[test]
    fn test_welch_rejects_degenerate_samples() {
        assert!(welch_t_test(&[1.0], &[1.0, 2.0]).is_err());
        assert!(welch_t_test(&[3.0, 3.0], &[3.0, 3.0]).is_err());
    }

    #[test]
    fn test_chi_square_independence() {
        let result = chi_square_independence(&array![[10.0, 20.0, 30.0], [20.0, 20.0, 20.0]]).unwrap();
        assert!((result.statistic - 16.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.dof, 2.0);
        assert!((result.p_value - 0.069483).abs() < 1e-5);
    }

    #[test]
    fn test_chi_square_drops_zero_columns_and_applies_yates() {
        let result = chi_square_independence(&array![[10.0, 0.0, 20.0], [20.0, 0.0, 10.0]]).unwrap();
        assert_eq!(result.dof, 1.0);
        assert!((result.statistic - 5.4).abs() < 1e-9);
        assert!((result.p_value - 0.020137).abs() < 1e-5);
    }

    #[test]
    fn test_pearson() {
        let x = [Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), None];
        let y = [Some(2.0), Some(4.0), Some(5.0), Some(4.0), Some(5.0), Some(100.0)];
        assert!((pearson(&x, &y).unwrap() - 0.774597).abs() < 1e-5);
        assert_eq!(pearson(&[Some(1.0), Some(1.0)], &[Some(2.0), Some(3.0)]), None);
    }

    #[test]
    fn test_pairwise_matrix_is_symmetric() {
        let values: [f64; 3] = [3.0, 5.0, 9.0];
        let matrix = pairwise_matrix(3, 1.0, |i, j| (values[i] - values[j]).abs());
        for i in 0..3 {
            assert_eq!(matrix[[i, i]], 1.0);
            for j in 0..3 {
                assert_eq!(matrix[[i, j]], matrix[[j, i]]);
            }
        }
        assert_eq!(matrix[[0, 2]], 6.0);
    }
}

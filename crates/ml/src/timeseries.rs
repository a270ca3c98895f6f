//! 时间序列数据处理模块

use crate::types::{MLError, MLResult};
use ndarray::{Array1, Array2};

/// 滑动窗口数据集构建器
#[derive(Debug, Clone)]
pub struct TimeSeriesBuilder {
    window: usize,
}

impl TimeSeriesBuilder {
    /// # 参数
    /// - `window`: 输入窗口长度（用多少个历史点预测下一个点）
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// 把一维序列切成滞后窗口
    ///
    /// # 返回
    /// - X: (样本数, 窗口长度)，第 i 行为 `series[i..i+window]`
    /// - y: (样本数,)，第 i 个为 `series[i+window]`
    pub fn build_windows(&self, series: &[f64]) -> MLResult<(Array2<f64>, Array1<f64>)> {
        if self.window == 0 {
            return Err(MLError::InvalidConfig("窗口长度必须大于 0".to_string()));
        }
        if series.len() <= self.window {
            return Err(MLError::InsufficientData {
                required: self.window + 1,
                actual: series.len(),
            });
        }

        let n_samples = series.len() - self.window;
        let x = Array2::from_shape_fn((n_samples, self.window), |(i, t)| series[i + t]);
        let y = Array1::from_iter(series[self.window..].iter().copied());

        Ok((x, y))
    }

    /// 序列末尾的一个窗口，用作滚动预测的起点
    pub fn last_window(&self, series: &[f64]) -> MLResult<Vec<f64>> {
        if series.len() < self.window {
            return Err(MLError::InsufficientData {
                required: self.window,
                actual: series.len(),
            });
        }
        Ok(series[series.len() - self.window..].to_vec())
    }
}

/// d 阶差分
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut current = series.to_vec();
    for _ in 0..d {
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    current
}

/// 差分序列上的预测值还原到原序列尺度
///
/// `history` 为原始序列，`forecasts` 为 d 阶差分后的预测值
pub fn undifference(history: &[f64], forecasts: &[f64], d: usize) -> Vec<f64> {
    if d == 0 {
        return forecasts.to_vec();
    }

    // 各阶差分序列的最后一个值
    let mut tails = Vec::with_capacity(d);
    let mut current = history.to_vec();
    for _ in 0..d {
        tails.push(current.last().copied().unwrap_or(0.0));
        current = difference(&current, 1);
    }

    let mut restored = forecasts.to_vec();
    for level in (0..d).rev() {
        let mut last = tails[level];
        for value in restored.iter_mut() {
            last += *value;
            *value = last;
        }
    }
    restored
}

/// 按等间隔补齐缺失点：内部缺口线性插值，首尾缺口取最近的观测值。
///
/// 返回补齐后的序列和补齐的点数；没有任何观测值时返回 `None`
pub fn fill_gaps(values: &[Option<f64>]) -> Option<(Vec<f64>, usize)> {
    let observed: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();
    let (first, last) = (observed.first()?, observed.last()?);

    let mut filled = Vec::with_capacity(values.len());
    let mut next = 0;
    for i in 0..values.len() {
        while next < observed.len() && observed[next].0 < i {
            next += 1;
        }
        let value = if i <= first.0 {
            first.1
        } else if i >= last.0 {
            last.1
        } else if observed[next].0 == i {
            observed[next].1
        } else {
            let (x0, y0) = observed[next - 1];
            let (x1, y1) = observed[next];
            y0 + (y1 - y0) * (i - x0) as f64 / (x1 - x0) as f64
        };
        filled.push(value);
    }
    Some((filled, values.len() - observed.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_build_windows() {
        let builder = TimeSeriesBuilder::new(3);
        let (x, y) = builder.build_windows(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        assert_eq!(x, array![[1.0, 2.0, 3.0], [2.0, 3.0, 4.0]]);
        assert_eq!(y, array![4.0, 5.0]);
        assert_eq!(builder.last_window(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_build_windows_needs_more_than_window() {
        let builder = TimeSeriesBuilder::new(3);
        let err = builder.build_windows(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, MLError::InsufficientData { required: 4, actual: 3 }));
    }

    #[test]
    fn test_difference_and_restore() {
        let series = [1.0, 4.0, 9.0, 16.0];
        assert_eq!(difference(&series, 1), vec![3.0, 5.0, 7.0]);
        assert_eq!(difference(&series, 2), vec![2.0, 2.0]);

        // 二阶差分恒为 2，继续外推得到 25、36
        assert_eq!(undifference(&series, &[2.0, 2.0], 2), vec![25.0, 36.0]);
        assert_eq!(undifference(&series, &[9.0], 1), vec![25.0]);
    }

    #[test]
    fn test_fill_gaps() {
        let (filled, count) = fill_gaps(&[None, Some(1.0), None, None, Some(4.0), None]).unwrap();
        assert_eq!(filled, vec![1.0, 1.0, 2.0, 3.0, 4.0, 4.0]);
        assert_eq!(count, 3);

        let (filled, count) = fill_gaps(&[Some(1.0), Some(f64::NAN), Some(3.0)]).unwrap();
        assert_eq!(filled, vec![1.0, 2.0, 3.0]);
        assert_eq!(count, 1);

        assert!(fill_gaps(&[None, None]).is_none());
    }
}

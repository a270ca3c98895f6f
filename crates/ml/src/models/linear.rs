//! 线性回归与滑动窗口滚动预测

use crate::models::{Forecaster, Regressor};
use crate::timeseries::TimeSeriesBuilder;
use crate::types::{MLError, MLResult};
use ndarray::{s, Array1, Array2};
use ndarray_linalg::LeastSquaresSvd;
use serde::{Deserialize, Serialize};

/// 带截距的最小二乘线性回归
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    weights: Option<Array1<f64>>,
    bias: Option<f64>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weights(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }

    pub fn bias(&self) -> Option<f64> {
        self.bias
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> MLResult<()> {
        if x.nrows() != y.len() {
            return Err(MLError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        if x.nrows() == 0 {
            return Err(MLError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        // 添加截距项
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let mut design = Array2::<f64>::ones((n_samples, n_features + 1));
        design.slice_mut(s![.., 1..]).assign(x);

        // 使用 SVD 求解最小二乘；特征共线时得到最小范数解
        let solution = design
            .least_squares(y)
            .map_err(|e| MLError::Training(format!("最小二乘求解失败: {:?}", e)))?;
        let params = solution.solution;
        tracing::debug!("Least squares fit, rank {}", solution.rank);

        self.bias = Some(params[0]);
        self.weights = Some(params.slice(s![1..]).to_owned());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> MLResult<Array1<f64>> {
        let weights = self
            .weights
            .as_ref()
            .ok_or_else(|| MLError::Prediction("模型未训练".to_string()))?;
        let bias = self
            .bias
            .ok_or_else(|| MLError::Prediction("模型未训练".to_string()))?;

        if x.ncols() != weights.len() {
            return Err(MLError::DimensionMismatch {
                expected: weights.len(),
                actual: x.ncols(),
            });
        }

        Ok(x.dot(weights) + bias)
    }
}

/// 在滞后窗口上训练线性回归，预测时把每个预测值追加进窗口继续外推
#[derive(Debug, Clone)]
pub struct SlidingWindowRegressor {
    builder: TimeSeriesBuilder,
    model: LinearRegression,
    seed: Vec<f64>,
}

impl SlidingWindowRegressor {
    pub fn new(window: usize) -> Self {
        Self {
            builder: TimeSeriesBuilder::new(window),
            model: LinearRegression::new(),
            seed: Vec::new(),
        }
    }

    /// 单步预测：给定一个完整窗口，预测下一个值
    pub fn predict_next(&self, window: &[f64]) -> MLResult<f64> {
        if window.len() != self.builder.window() {
            return Err(MLError::DimensionMismatch {
                expected: self.builder.window(),
                actual: window.len(),
            });
        }
        let x = Array2::from_shape_vec((1, window.len()), window.to_vec())
            .map_err(|e| MLError::Prediction(e.to_string()))?;
        let prediction = self.model.predict(&x)?;
        Ok(prediction[0])
    }

    /// 从任意起始窗口滚动预测 `steps` 步
    pub fn rollout(&self, start: &[f64], steps: usize) -> MLResult<Vec<f64>> {
        let window = self.builder.window();
        if start.len() < window {
            return Err(MLError::InsufficientData {
                required: window,
                actual: start.len(),
            });
        }
        let mut history = start.to_vec();
        let mut forecasts = Vec::with_capacity(steps);

        for _ in 0..steps {
            let next = self.predict_next(&history[history.len() - window..])?;
            forecasts.push(next);
            history.push(next);
        }

        Ok(forecasts)
    }
}

impl Forecaster for SlidingWindowRegressor {
    fn fit(&mut self, series: &[f64]) -> MLResult<()> {
        let (x, y) = self.builder.build_windows(series)?;
        self.model.fit(&x, &y)?;
        self.seed = self.builder.last_window(series)?;
        tracing::debug!("Fitted sliding-window regression on {} samples", y.len());
        Ok(())
    }

    fn forecast(&self, steps: usize) -> MLResult<Vec<f64>> {
        if self.seed.is_empty() {
            return Err(MLError::Prediction("模型未训练".to_string()));
        }
        self.rollout(&self.seed, steps)
    }
}

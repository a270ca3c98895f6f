//! 回归与时间序列预测模型

pub mod arima;
pub mod holt_winters;
pub mod linear;

use crate::types::MLResult;
use ndarray::{Array1, Array2};

/// 有监督回归模型接口
pub trait Regressor: Send + Sync {
    /// 训练模型
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> MLResult<()>;

    /// 预测
    fn predict(&self, x: &Array2<f64>) -> MLResult<Array1<f64>>;
}

/// 单变量时间序列模型接口
pub trait Forecaster: Send + Sync {
    /// 在完整历史序列上拟合
    fn fit(&mut self, series: &[f64]) -> MLResult<()>;

    /// 向后预测 `steps` 步，恰好返回 `steps` 个值
    fn forecast(&self, steps: usize) -> MLResult<Vec<f64>>;
}

//! 核心类型定义

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type MLResult<T> = Result<T, MLError>;

#[derive(Debug, Error)]
pub enum MLError {
    #[error("数据量不足: 需要至少 {required} 个观测，实际 {actual} 个")]
    InsufficientData { required: usize, actual: usize },

    #[error("数据维度不匹配: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("模型训练错误: {0}")]
    Training(String),

    #[error("模型预测错误: {0}")]
    Prediction(String),

    #[error("无效的配置: {0}")]
    InvalidConfig(String),
}

/// 评估指标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// 均方误差
    pub mse: f64,
    /// 均方根误差
    pub rmse: f64,
    /// 平均绝对误差
    pub mae: f64,
    /// R² 分数
    pub r2_score: f64,
}

impl Metrics {
    pub fn new(mse: f64, rmse: f64, mae: f64, r2_score: f64) -> Self {
        Self {
            mse,
            rmse,
            mae,
            r2_score,
        }
    }
}

/// 带来源标记的预测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub values: Vec<f64>,
    /// 模型拟合失败、改用最后观测值时为 true
    pub fallback: bool,
}

/// 统计检验结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
    /// 自由度（Welch 检验为非整数）
    pub dof: f64,
}

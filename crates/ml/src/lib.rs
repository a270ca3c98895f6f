//! # ML - 小样本预测与统计检验
//!
//! 为各数据集的分析环节提供模型与统计工具。
//!
//! ## 主要模块
//!
//! - `timeseries`: 滑动窗口、差分与缺口补齐
//! - `models`: 线性回归（滑动窗口滚动预测）、Holt-Winters、ARIMA
//! - `stats`: Welch t 检验、卡方独立性检验、Pearson 相关
//! - `evaluation`: 模型评估指标
//! - `sampling`: 加权不放回抽样

pub mod timeseries;
pub mod models;
pub mod stats;
pub mod evaluation;
pub mod sampling;
pub mod types;

pub use models::arima::{forecast_with_fallback, Arima, ArimaOrder};
pub use models::holt_winters::HoltWinters;
pub use models::linear::{LinearRegression, SlidingWindowRegressor};
pub use models::{Forecaster, Regressor};
pub use types::{Forecast, MLError, MLResult, Metrics, TestResult};

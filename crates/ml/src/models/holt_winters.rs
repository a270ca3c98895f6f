//! 加法趋势 + 加法季节的 Holt-Winters 指数平滑

use crate::models::Forecaster;
use crate::types::{MLError, MLResult};
use serde::{Deserialize, Serialize};

/// 平滑参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedState {
    params: SmoothingParams,
    level: f64,
    trend: f64,
    /// 最近一个完整周期的季节项，按预测先后顺序排列
    seasonals: Vec<f64>,
    sse: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoltWinters {
    period: usize,
    state: Option<FittedState>,
}

impl HoltWinters {
    pub fn new(period: usize) -> Self {
        Self { period, state: None }
    }

    pub fn params(&self) -> Option<SmoothingParams> {
        self.state.as_ref().map(|s| s.params)
    }

    /// 一步预测误差平方和
    pub fn sse(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.sse)
    }

    /// 用前两个周期估计初始水平、趋势和季节项
    fn initial_state(&self, series: &[f64]) -> (f64, f64, Vec<f64>) {
        let m = self.period;
        let first = series[..m].iter().sum::<f64>() / m as f64;
        let second = series[m..2 * m].iter().sum::<f64>() / m as f64;
        let trend = (second - first) / m as f64;
        let center = (m as f64 - 1.0) / 2.0;

        let seasonals = (0..m)
            .map(|i| series[i] - (first + (i as f64 - center) * trend))
            .collect();
        // 第 0 个观测之前一期的水平
        let level = first - (center + 1.0) * trend;

        (level, trend, seasonals)
    }

    fn run(&self, series: &[f64], params: SmoothingParams) -> FittedState {
        let m = self.period;
        let (mut level, mut trend, initial) = self.initial_state(series);
        let mut seasonals = initial;
        seasonals.reserve(series.len());
        let mut sse = 0.0;

        for (t, &y) in series.iter().enumerate() {
            let season = seasonals[t];
            let predicted = level + trend + season;
            sse += (y - predicted).powi(2);

            let new_level = params.alpha * (y - season) + (1.0 - params.alpha) * (level + trend);
            trend = params.beta * (new_level - level) + (1.0 - params.beta) * trend;
            level = new_level;
            seasonals.push(params.gamma * (y - level) + (1.0 - params.gamma) * season);
        }

        let tail = seasonals.split_off(seasonals.len() - m);
        FittedState {
            params,
            level,
            trend,
            seasonals: tail,
            sse,
        }
    }

    fn search(&self, series: &[f64], alphas: &[f64], betas: &[f64], gammas: &[f64]) -> Option<FittedState> {
        let mut best: Option<FittedState> = None;
        for &alpha in alphas {
            for &beta in betas {
                for &gamma in gammas {
                    let state = self.run(series, SmoothingParams { alpha, beta, gamma });
                    if !state.sse.is_finite() {
                        continue;
                    }
                    if best.as_ref().map_or(true, |b| state.sse < b.sse) {
                        best = Some(state);
                    }
                }
            }
        }
        best
    }
}

fn coarse_grid() -> Vec<f64> {
    (1..10).map(|i| i as f64 / 10.0).collect()
}

fn fine_grid(center: f64) -> Vec<f64> {
    (-5..=5)
        .map(|i| center + i as f64 / 100.0)
        .filter(|v| *v > 0.0 && *v < 1.0)
        .collect()
}

impl Forecaster for HoltWinters {
    fn fit(&mut self, series: &[f64]) -> MLResult<()> {
        if self.period < 2 {
            return Err(MLError::InvalidConfig(format!("季节周期必须至少为 2，实际 {}", self.period)));
        }
        if series.len() < 2 * self.period {
            return Err(MLError::InsufficientData {
                required: 2 * self.period,
                actual: series.len(),
            });
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(MLError::Training("序列中存在缺失或非有限值".to_string()));
        }

        let grid = coarse_grid();
        let coarse = self
            .search(series, &grid, &grid, &grid)
            .ok_or_else(|| MLError::Training("平滑参数搜索失败".to_string()))?;

        let p = coarse.params;
        let refined = self
            .search(series, &fine_grid(p.alpha), &fine_grid(p.beta), &fine_grid(p.gamma))
            .filter(|s| s.sse <= coarse.sse)
            .unwrap_or(coarse);

        tracing::debug!(
            "Holt-Winters fitted: alpha={:.2} beta={:.2} gamma={:.2} sse={:.4}",
            refined.params.alpha,
            refined.params.beta,
            refined.params.gamma,
            refined.sse
        );
        self.state = Some(refined);
        Ok(())
    }

    fn forecast(&self, steps: usize) -> MLResult<Vec<f64>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| MLError::Prediction("模型未训练".to_string()))?;

        Ok((1..=steps)
            .map(|h| state.level + h as f64 * state.trend + state.seasonals[(h - 1) % self.period])
            .collect())
    }
}

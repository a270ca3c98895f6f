//! ARIMA(p, d, q)：条件平方和（CSS）拟合，Nelder–Mead 优化

use crate::models::Forecaster;
use crate::timeseries::{difference, undifference};
use crate::types::{Forecast, MLError, MLResult};
use serde::{Deserialize, Serialize};

/// 模型阶数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// 拟合所需的最少观测数
    pub fn min_observations(&self) -> usize {
        self.d + self.p + self.q + 2
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedArima {
    ar: Vec<f64>,
    ma: Vec<f64>,
    /// d = 0 时扣除的均值
    mean: f64,
    history: Vec<f64>,
    /// 差分（去均值）后的序列
    working: Vec<f64>,
    residuals: Vec<f64>,
    css: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arima {
    order: ArimaOrder,
    fitted: Option<FittedArima>,
}

const MAX_ITERATIONS: usize = 2000;
const PENALTY: f64 = 1e300;

impl Arima {
    pub fn new(order: ArimaOrder) -> Self {
        Self { order, fitted: None }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// (AR 系数, MA 系数)
    pub fn coefficients(&self) -> Option<(&[f64], &[f64])> {
        self.fitted.as_ref().map(|f| (f.ar.as_slice(), f.ma.as_slice()))
    }

    fn residuals(&self, z: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
        let p = self.order.p;
        let mut residuals = vec![0.0; z.len()];
        for t in p..z.len() {
            let ar_part: f64 = ar.iter().enumerate().map(|(i, phi)| phi * z[t - 1 - i]).sum();
            let ma_part: f64 = ma
                .iter()
                .enumerate()
                .filter(|(j, _)| t > *j)
                .map(|(j, theta)| theta * residuals[t - 1 - j])
                .sum();
            residuals[t] = z[t] - ar_part - ma_part;
        }
        residuals
    }

    fn css(&self, z: &[f64], params: &[f64]) -> f64 {
        let (ar, ma) = params.split_at(self.order.p);
        // 平稳性与可逆性的充分条件
        if ar.iter().map(|v| v.abs()).sum::<f64>() >= 1.0 || ma.iter().map(|v| v.abs()).sum::<f64>() >= 1.0 {
            return PENALTY;
        }
        self.residuals(z, ar, ma)[self.order.p..]
            .iter()
            .map(|e| e * e)
            .sum()
    }
}

impl Forecaster for Arima {
    fn fit(&mut self, series: &[f64]) -> MLResult<()> {
        let required = self.order.min_observations();
        if series.len() < required {
            return Err(MLError::InsufficientData {
                required,
                actual: series.len(),
            });
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(MLError::Training("序列中存在缺失或非有限值".to_string()));
        }

        let differenced = difference(series, self.order.d);
        let mean = if self.order.d == 0 {
            differenced.iter().sum::<f64>() / differenced.len() as f64
        } else {
            0.0
        };
        let working: Vec<f64> = differenced.iter().map(|v| v - mean).collect();

        let n_params = self.order.p + self.order.q;
        let params = if n_params == 0 {
            Vec::new()
        } else {
            let start = vec![0.0; n_params];
            nelder_mead(|x| self.css(&working, x), &start, 0.1, MAX_ITERATIONS, 1e-12)
        };

        let css = self.css(&working, &params);
        if !css.is_finite() || css >= PENALTY {
            return Err(MLError::Training(format!("CSS 优化未收敛: {}", css)));
        }

        let (ar, ma) = params.split_at(self.order.p);
        let residuals = self.residuals(&working, ar, ma);
        tracing::debug!("ARIMA{:?} fitted: ar={:?} ma={:?} css={:.4}", self.order, ar, ma, css);

        self.fitted = Some(FittedArima {
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            mean,
            history: series.to_vec(),
            working,
            residuals,
            css,
        });
        Ok(())
    }

    fn forecast(&self, steps: usize) -> MLResult<Vec<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| MLError::Prediction("模型未训练".to_string()))?;

        let mut z = fitted.working.clone();
        let mut residuals = fitted.residuals.clone();
        let mut forecasts = Vec::with_capacity(steps);

        for _ in 0..steps {
            let t = z.len();
            let ar_part: f64 = fitted
                .ar
                .iter()
                .enumerate()
                .filter(|(i, _)| t > *i)
                .map(|(i, phi)| phi * z[t - 1 - i])
                .sum();
            let ma_part: f64 = fitted
                .ma
                .iter()
                .enumerate()
                .filter(|(j, _)| t > *j)
                .map(|(j, theta)| theta * residuals[t - 1 - j])
                .sum();
            let next = ar_part + ma_part;
            z.push(next);
            // 未来的扰动取期望 0
            residuals.push(0.0);
            forecasts.push(next + fitted.mean);
        }

        Ok(undifference(&fitted.history, &forecasts, self.order.d))
    }
}

/// 拟合并预测；失败时记录日志并重复最后一个观测值
pub fn forecast_with_fallback(series: &[f64], order: ArimaOrder, steps: usize) -> MLResult<Forecast> {
    let last = *series.last().ok_or(MLError::InsufficientData {
        required: 1,
        actual: 0,
    })?;

    let mut model = Arima::new(order);
    let result = model.fit(series).and_then(|_| model.forecast(steps));
    match result {
        Ok(values) if values.iter().all(|v| v.is_finite()) => Ok(Forecast {
            values,
            fallback: false,
        }),
        Ok(_) => {
            tracing::warn!("ARIMA{:?} produced non-finite forecast, using last value", order);
            Ok(Forecast {
                values: vec![last; steps],
                fallback: true,
            })
        }
        Err(e) => {
            tracing::warn!("ARIMA{:?} fit failed ({}), using last value", order, e);
            Ok(Forecast {
                values: vec![last; steps],
                fallback: true,
            })
        }
    }
}

/// Nelder–Mead 单纯形最小化
fn nelder_mead<F>(f: F, start: &[f64], step: f64, max_iterations: usize, tolerance: f64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((start.to_vec(), f(start)));
    for i in 0..n {
        let mut vertex = start.to_vec();
        vertex[i] += step;
        let value = f(&vertex);
        simplex.push((vertex, value));
    }

    for _ in 0..max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = simplex[0].1;
        let worst = simplex[n].1;
        if (worst - best).abs() <= tolerance * (best.abs() + tolerance) {
            break;
        }

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|(v, _)| v[j]).sum::<f64>() / n as f64)
            .collect();
        let towards = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n].0)
                .map(|(c, w)| c + coef * (w - c))
                .collect()
        };

        let reflected = towards(-1.0);
        let reflected_value = f(&reflected);

        if reflected_value < simplex[0].1 {
            let expanded = towards(-2.0);
            let expanded_value = f(&expanded);
            simplex[n] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
        } else if reflected_value < simplex[n - 1].1 {
            simplex[n] = (reflected, reflected_value);
        } else {
            let contracted = if reflected_value < simplex[n].1 {
                towards(-0.5)
            } else {
                towards(0.5)
            };
            let contracted_value = f(&contracted);
            if contracted_value < simplex[n].1.min(reflected_value) {
                simplex[n] = (contracted, contracted_value);
            } else {
                // 整体向最优点收缩
                let anchor = simplex[0].0.clone();
                for vertex in simplex.iter_mut().skip(1) {
                    let shrunk: Vec<f64> = anchor
                        .iter()
                        .zip(&vertex.0)
                        .map(|(a, v)| a + 0.5 * (v - a))
                        .collect();
                    let value = f(&shrunk);
                    *vertex = (shrunk, value);
                }
            }
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    simplex.swap_remove(0).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nelder_mead_quadratic_bowl() {
        let minimum = nelder_mead(
            |x| (x[0] - 1.0).powi(2) + 3.0 * (x[1] + 2.0).powi(2),
            &[0.0, 0.0],
            0.5,
            MAX_ITERATIONS,
            1e-14,
        );
        assert!((minimum[0] - 1.0).abs() < 1e-4);
        assert!((minimum[1] + 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_ar1_on_differences() {
        // 一阶差分为 8, 4, 2, 1, ...，即 z[t] = 0.5 * z[t-1]
        let mut series = vec![100.0];
        let mut step = 8.0;
        for _ in 0..10 {
            let last = *series.last().unwrap();
            series.push(last + step);
            step *= 0.5;
        }

        let mut model = Arima::new(ArimaOrder::new(1, 1, 0));
        model.fit(&series).unwrap();
        let (ar, ma) = model.coefficients().unwrap();
        assert!((ar[0] - 0.5).abs() < 1e-3);
        assert!(ma.is_empty());

        let last = *series.last().unwrap();
        let last_step = last - series[series.len() - 2];
        let forecast = model.forecast(2).unwrap();
        assert_eq!(forecast.len(), 2);
        assert!((forecast[0] - (last + 0.5 * last_step)).abs() < 1e-3);
    }

    #[test]
    fn test_arima_111_forecast_shape() {
        let series = [412.0, 455.0, 520.0, 498.0, 610.0, 655.0];
        let forecast = forecast_with_fallback(&series, ArimaOrder::new(1, 1, 1), 1).unwrap();
        assert!(!forecast.fallback);
        assert_eq!(forecast.values.len(), 1);
        assert!(forecast.values[0].is_finite());
    }

    #[test]
    fn test_fallback_repeats_last_value() {
        let series = [5.0, 7.0, 9.0];
        let forecast = forecast_with_fallback(&series, ArimaOrder::new(1, 1, 1), 2).unwrap();
        assert!(forecast.fallback);
        assert_eq!(forecast.values, vec![9.0, 9.0]);
    }

    #[test]
    fn test_fallback_needs_one_observation() {
        assert!(forecast_with_fallback(&[], ArimaOrder::new(1, 1, 1), 1).is_err());
    }
}

//! 大连历史天气：月度统计与月均最高温预测

use crate::chart::{ChartKind, ChartSpec};
use crate::report::{num, opt_num, ReportTable};
use crate::JobOutput;
use etl::normalize::{self, extract_wind_level};
use etl::sources::weather::{WeatherConfig, WeatherSource};
use etl::storage::{read_table, write_table};
use etl::{ETLError, ETLResult, FetchConfig, Pipeline, WeatherDayRecord, YearMonth};
use ml::evaluation::Evaluator;
use ml::timeseries::fill_gaps;
use ml::{Forecaster, SlidingWindowRegressor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// 月均最高温走势、各月温度、预测对比
const CHARTS: &[ChartSpec] = &[
    ChartSpec::columns("year_month_max_temp", ChartKind::Line, None, &["平均最高温度"]),
    ChartSpec::columns("monthly_temperature", ChartKind::Line, Some("月"), &["平均最高温度", "平均最低温度"]),
    ChartSpec::columns("max_temp_forecast", ChartKind::Line, None, &["预测平均最高温度", "真实平均最高温度"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherJobConfig {
    pub fetch: FetchConfig,
    /// 用于统计和训练的历史区间
    pub history: WeatherConfig,
    /// 用于对比预测的真实数据区间
    pub actuals: WeatherConfig,
    pub data_file: PathBuf,
    pub output_dir: PathBuf,
    /// 滑动窗口长度（月）
    pub window: usize,
    /// 预测月数
    pub horizon: usize,
}

impl Default for WeatherJobConfig {
    fn default() -> Self {
        let history = WeatherConfig::default();
        let actuals = WeatherConfig {
            begin: YearMonth::new(2025, 1),
            end: YearMonth::new(2025, 6),
            ..WeatherConfig::default()
        };
        Self {
            fetch: FetchConfig::default(),
            history,
            actuals,
            data_file: PathBuf::from("weather_dalian_2022_2024.csv"),
            output_dir: PathBuf::from("results"),
            window: 12,
            horizon: 12,
        }
    }
}

/// 抓取一个月份区间的天气并规范化
pub async fn crawl(pipeline: &Pipeline, config: &WeatherConfig) -> ETLResult<Vec<WeatherDayRecord>> {
    let source = WeatherSource::new(config.clone());
    let collected = pipeline.collect(&source).await?;
    let records = normalize::weather(&collected.records, config.begin, config.end);
    if records.is_empty() {
        return Err(ETLError::NoData(format!("{} {}..{}", config.city, config.begin, config.end)));
    }
    tracing::info!(
        "Weather {}..{}: {} days ({} months failed)",
        config.begin,
        config.end,
        records.len(),
        collected.summary.units_failed
    );
    Ok(records)
}

pub async fn run(config: &WeatherJobConfig) -> anyhow::Result<JobOutput> {
    let pipeline = Pipeline::new(&config.fetch)?;

    println!("=== 抓取 {}..{} 历史天气 ===\n", config.history.begin, config.history.end);
    let history = crawl(&pipeline, &config.history).await?;
    write_table(&config.data_file, &history)?;
    let history: Vec<WeatherDayRecord> = read_table(&config.data_file)?;

    println!("=== 抓取 {}..{} 真实天气 ===\n", config.actuals.begin, config.actuals.end);
    let actuals = match crawl(&pipeline, &config.actuals).await {
        Ok(records) => records,
        Err(ETLError::NoData(what)) => {
            tracing::warn!("No actual weather for {}, forecast is not compared", what);
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    let tables = analyze(&history, &actuals, config);
    crate::write_outputs(&config.data_file, &config.output_dir, &tables, CHARTS)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// 每个年月的平均最高温，按时间排序，缺测月份不出现
pub fn year_month_mean_high(records: &[WeatherDayRecord]) -> Vec<(YearMonth, f64)> {
    let mut groups: BTreeMap<YearMonth, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(high) = record.high_temp {
            groups
                .entry(YearMonth::new(record.year, record.month))
                .or_default()
                .push(high);
        }
    }
    groups
        .into_iter()
        .filter_map(|(month, highs)| mean(&highs).map(|m| (month, m)))
        .collect()
}

pub fn analyze(
    history: &[WeatherDayRecord],
    actuals: &[WeatherDayRecord],
    config: &WeatherJobConfig,
) -> Vec<ReportTable> {
    let mut tables = vec![
        monthly_temperature(history),
        year_month_table("year_month_max_temp", history),
        wind_levels(history),
        weather_condition_days(history),
    ];

    if !actuals.is_empty() {
        tables.push(year_month_table("actual_max_temp", actuals));
    }
    tables.extend(forecast_tables(history, actuals, config));
    tables
}

/// 各月平均最高、最低温
fn monthly_temperature(records: &[WeatherDayRecord]) -> ReportTable {
    let mut groups: BTreeMap<u32, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for record in records {
        let (highs, lows) = groups.entry(record.month).or_default();
        highs.extend(record.high_temp);
        lows.extend(record.low_temp);
    }

    let mut table = ReportTable::new("monthly_temperature", &["月", "平均最高温度", "平均最低温度"]);
    for (month, (highs, lows)) in groups {
        table.push_row(vec![month.to_string(), opt_num(mean(&highs)), opt_num(mean(&lows))]);
    }
    table
}

fn year_month_table(name: &str, records: &[WeatherDayRecord]) -> ReportTable {
    let mut table = ReportTable::new(name, &["年", "月", "平均最高温度"]);
    for (month, high) in year_month_mean_high(records) {
        table.push_row(vec![month.year.to_string(), month.month.to_string(), num(high)]);
    }
    table
}

/// 各月风力等级分布，白天和夜晚的风力都计入
fn wind_levels(records: &[WeatherDayRecord]) -> ReportTable {
    let mut groups: BTreeMap<u32, BTreeMap<String, usize>> = BTreeMap::new();
    for record in records {
        let levels = groups.entry(record.month).or_default();
        for wind in [&record.day_wind, &record.night_wind] {
            if let Some(level) = extract_wind_level(wind) {
                *levels.entry(level).or_insert(0) += 1;
            }
        }
    }

    let mut table = ReportTable::new("wind_levels", &["月", "风力等级", "次数", "占比"]);
    for (month, levels) in groups {
        let total: usize = levels.values().sum();
        for (level, count) in levels {
            table.push_row(vec![
                month.to_string(),
                level,
                count.to_string(),
                num(count as f64 / total as f64),
            ]);
        }
    }
    table
}

/// 各月白天天气状况的出现天数，以及按年份数平均后的天数
fn weather_condition_days(records: &[WeatherDayRecord]) -> ReportTable {
    let years: BTreeSet<i32> = records.iter().map(|r| r.year).collect();
    let mut counts: BTreeMap<(u32, &str), usize> = BTreeMap::new();
    for record in records {
        if record.day_condition.is_empty() {
            continue;
        }
        *counts.entry((record.month, record.day_condition.as_str())).or_insert(0) += 1;
    }

    let mut table = ReportTable::new("weather_condition_days", &["月", "天气", "天数", "平均天数"]);
    for ((month, condition), days) in counts {
        table.push_row(vec![
            month.to_string(),
            condition.to_string(),
            days.to_string(),
            num(days as f64 / years.len() as f64),
        ]);
    }
    table
}

/// 滑动窗口线性回归预测历史之后的月均最高温，并与真实值比较
fn forecast_tables(
    history: &[WeatherDayRecord],
    actuals: &[WeatherDayRecord],
    config: &WeatherJobConfig,
) -> Vec<ReportTable> {
    let series: BTreeMap<YearMonth, f64> = year_month_mean_high(history).into_iter().collect();
    let (Some(first_month), Some(last_month)) = (
        series.keys().next().copied(),
        series.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };
    // 缺测月份插值补齐，保证窗口内的滞后按自然月对齐
    let months: Vec<Option<f64>> = first_month
        .through(last_month)
        .iter()
        .map(|month| series.get(month).copied())
        .collect();
    let observed = months.iter().flatten().count();
    if observed <= config.window {
        tracing::warn!(
            "Temperature forecast skipped: {} observed months, window is {}",
            observed,
            config.window
        );
        return Vec::new();
    }
    let Some((values, filled)) = fill_gaps(&months) else {
        return Vec::new();
    };
    if filled > 0 {
        tracing::warn!("Interpolated {} months without temperature records", filled);
    }

    let mut model = SlidingWindowRegressor::new(config.window);
    let predicted = match model.fit(&values).and_then(|_| model.forecast(config.horizon)) {
        Ok(predicted) => predicted,
        Err(e) => {
            tracing::warn!("Temperature forecast skipped: {}", e);
            return Vec::new();
        }
    };

    let actual: BTreeMap<YearMonth, f64> = year_month_mean_high(actuals).into_iter().collect();
    let mut table = ReportTable::new("max_temp_forecast", &["月份", "预测平均最高温度", "真实平均最高温度"]);
    let (mut y_true, mut y_pred) = (Vec::new(), Vec::new());
    let mut month = last_month;
    for value in predicted {
        month = month.next();
        let real = actual.get(&month).copied();
        if let Some(real) = real {
            y_true.push(real);
            y_pred.push(value);
        }
        table.push_row(vec![month.to_string(), num(value), opt_num(real)]);
    }

    let mut tables = vec![table];
    match Evaluator::evaluate(&y_true, &y_pred) {
        Ok(metrics) => {
            tracing::info!("Forecast MAE {:.3}, RMSE {:.3}", metrics.mae, metrics.rmse);
            let mut errors = ReportTable::new("max_temp_forecast_error", &["指标", "值"]);
            errors.push_row(vec!["MAE".to_string(), num(metrics.mae)]);
            errors.push_row(vec!["RMSE".to_string(), num(metrics.rmse)]);
            tables.push(errors);
        }
        Err(_) => tracing::info!("No overlapping actual months, forecast error not computed"),
    }
    tables
}

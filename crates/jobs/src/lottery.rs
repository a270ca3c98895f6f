//! 大乐透：按开奖日的销售额与号码统计、差异检验、销售额预测与号码推荐

use crate::chart::{ChartKind, ChartSpec};
use crate::report::{matrix_table, num, ReportTable};
use crate::JobOutput;
use chrono::NaiveDate;
use etl::normalize::{self, next_draw_dates, parse_number_list, DrawDay};
use etl::sources::lottery::{LotteryConfig, LotterySource};
use etl::storage::{read_table, write_table};
use etl::{ETLError, ETLResult, FetchConfig, LotteryDrawRecord, Pipeline};
use ml::sampling::{linear_rank_weights, weighted_sample};
use ml::stats::{chi_square_independence, pairwise_matrix, welch_t_test};
use ml::timeseries::fill_gaps;
use ml::{Forecaster, HoltWinters};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 前区号码 01-35
pub const FRONT_RANGE: u32 = 35;
/// 后区号码 01-12
pub const BACK_RANGE: u32 = 12;
/// 推荐号码的默认随机种子，同一份数据每次运行推荐相同
pub const RECOMMEND_SEED: u64 = 20250701;

const CHARTS: &[ChartSpec] = &[
    ChartSpec::columns("sales_by_draw_day", ChartKind::Line, None, &["总销售额"]),
    ChartSpec::columns("front_frequency_by_draw_day", ChartKind::Bar, Some("号码"), &["Mon", "Wed", "Sat"]),
    ChartSpec::columns("back_frequency_by_draw_day", ChartKind::Bar, Some("号码"), &["Mon", "Wed", "Sat"]),
    ChartSpec::columns("sales_forecast", ChartKind::Bar, None, &["预计总销售额"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryJobConfig {
    pub fetch: FetchConfig,
    pub source: LotteryConfig,
    pub data_file: PathBuf,
    pub output_dir: PathBuf,
    /// 销售额的季节周期（每周三期）
    pub season_period: usize,
    pub forecast_steps: usize,
    pub recommend_front: usize,
    pub recommend_back: usize,
    /// 推荐号码的随机种子
    pub seed: u64,
}

impl Default for LotteryJobConfig {
    fn default() -> Self {
        Self {
            fetch: LotterySource::fetch_config(),
            source: LotteryConfig::default(),
            data_file: PathBuf::from("result/大乐透开奖数据统计.csv"),
            output_dir: PathBuf::from("result"),
            season_period: 3,
            forecast_steps: 3,
            recommend_front: 5,
            recommend_back: 2,
            seed: RECOMMEND_SEED,
        }
    }
}

pub async fn crawl(config: &LotteryJobConfig) -> ETLResult<Vec<LotteryDrawRecord>> {
    let pipeline = Pipeline::new(&config.fetch)?;
    let collected = pipeline.collect(&LotterySource::new(config.source.clone())).await?;
    let draws = normalize::lottery(&collected.records, &config.source);
    if draws.is_empty() {
        return Err(ETLError::NoData("zhcw dlt".to_string()));
    }
    tracing::info!("Collected {} draws", draws.len());
    Ok(draws)
}

pub async fn run(config: &LotteryJobConfig) -> anyhow::Result<JobOutput> {
    println!("=== 抓取大乐透开奖数据 ===\n");
    let draws = crawl(config).await?;
    write_table(&config.data_file, &draws)?;
    let draws: Vec<LotteryDrawRecord> = read_table(&config.data_file)?;

    let tables = analyze(&draws, config);
    for table in tables.iter().filter(|t| t.name == "recommended_numbers") {
        for row in &table.rows {
            println!("{} 推荐号码: 前区 {} | 后区 {}", row[0], row[1], row[2]);
        }
    }

    crate::write_outputs(&config.data_file, &config.output_dir, &tables, CHARTS)
}

/// 开奖日：优先取接口给出的星期，其次由日期推出
fn draw_day(draw: &LotteryDrawRecord) -> Option<DrawDay> {
    DrawDay::from_week(&draw.weekday).or_else(|| DrawDay::from_date(draw.draw_date))
}

fn sorted_by_date(draws: &[LotteryDrawRecord]) -> Vec<&LotteryDrawRecord> {
    let mut sorted: Vec<&LotteryDrawRecord> = draws.iter().collect();
    sorted.sort_by_key(|d| d.draw_date);
    sorted
}

/// 号码区
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Front,
    Back,
}

impl Zone {
    fn range(&self) -> u32 {
        match self {
            Zone::Front => FRONT_RANGE,
            Zone::Back => BACK_RANGE,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Zone::Front => "前区",
            Zone::Back => "后区",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            Zone::Front => "front",
            Zone::Back => "back",
        }
    }

    fn numbers_of<'a>(&self, draw: &'a LotteryDrawRecord) -> &'a str {
        match self {
            Zone::Front => &draw.front_numbers,
            Zone::Back => &draw.back_numbers,
        }
    }

    /// 全部号码，两位补零
    fn universe(&self) -> Vec<String> {
        (1..=self.range()).map(|n| format!("{:02}", n)).collect()
    }
}

/// 号码出现次数，按号码顺序
fn frequency<'a>(zone: Zone, draws: impl IntoIterator<Item = &'a LotteryDrawRecord>) -> Vec<usize> {
    let mut counts = vec![0; zone.range() as usize];
    for draw in draws {
        for number in parse_number_list(zone.numbers_of(draw)) {
            match number.parse::<usize>() {
                Ok(n) if (1..=counts.len()).contains(&n) => counts[n - 1] += 1,
                _ => tracing::debug!("Ignoring {} number {:?}", zone.key(), number),
            }
        }
    }
    counts
}

pub fn analyze(draws: &[LotteryDrawRecord], config: &LotteryJobConfig) -> Vec<ReportTable> {
    if draws.is_empty() {
        return Vec::new();
    }
    let by_day: Vec<Vec<&LotteryDrawRecord>> = DrawDay::ALL
        .iter()
        .map(|day| draws.iter().filter(|d| draw_day(d) == Some(*day)).collect())
        .collect();

    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut tables = vec![sales_by_day(draws)];
    for zone in [Zone::Front, Zone::Back] {
        tables.push(frequency_by_day(zone, &by_day));
    }
    tables.push(sales_t_test(&by_day));
    for zone in [Zone::Front, Zone::Back] {
        tables.push(chi_square_by_day(zone, &by_day));
    }
    tables.push(sales_forecast(draws, config));
    tables.push(number_frequency(draws));
    tables.push(recommendation(draws, config, &mut rng));
    tables
}

fn sales_by_day(draws: &[LotteryDrawRecord]) -> ReportTable {
    let mut table = ReportTable::new("sales_by_draw_day", &["开奖日", "开奖日期", "总销售额"]);
    for draw in sorted_by_date(draws) {
        let (Some(day), Some(sales)) = (draw_day(draw), draw.total_sales) else {
            continue;
        };
        table.push_row(vec![day.to_string(), draw.draw_date.to_string(), num(sales)]);
    }
    table
}

fn frequency_by_day(zone: Zone, by_day: &[Vec<&LotteryDrawRecord>]) -> ReportTable {
    let counts: Vec<Vec<usize>> = by_day
        .iter()
        .map(|draws| frequency(zone, draws.iter().copied()))
        .collect();

    let mut headers = vec!["号码".to_string()];
    headers.extend(DrawDay::ALL.iter().map(DrawDay::to_string));
    let mut table = ReportTable::new(&format!("{}_frequency_by_draw_day", zone.key()), &headers);
    for (i, number) in zone.universe().into_iter().enumerate() {
        let mut row = vec![number];
        row.extend(counts.iter().map(|c| c[i].to_string()));
        table.push_row(row);
    }
    table
}

/// 两两开奖日销售额的 Welch t 检验 p 值
fn sales_t_test(by_day: &[Vec<&LotteryDrawRecord>]) -> ReportTable {
    let sales: Vec<Vec<f64>> = by_day
        .iter()
        .map(|draws| draws.iter().filter_map(|d| d.total_sales).collect())
        .collect();

    let matrix = pairwise_matrix(DrawDay::ALL.len(), 1.0, |i, j| {
        match welch_t_test(&sales[i], &sales[j]) {
            Ok(result) => result.p_value,
            Err(e) => {
                tracing::warn!("t-test {} vs {} failed: {}", DrawDay::ALL[i], DrawDay::ALL[j], e);
                f64::NAN
            }
        }
    });
    let labels: Vec<String> = DrawDay::ALL.iter().map(DrawDay::to_string).collect();
    matrix_table("sales_t_test_p_values", "", &labels, &labels, &matrix)
}

/// 两两开奖日号码分布的卡方独立性检验 p 值
fn chi_square_by_day(zone: Zone, by_day: &[Vec<&LotteryDrawRecord>]) -> ReportTable {
    let counts: Vec<Vec<usize>> = by_day
        .iter()
        .map(|draws| frequency(zone, draws.iter().copied()))
        .collect();
    let width = zone.range() as usize;

    let matrix = pairwise_matrix(DrawDay::ALL.len(), 1.0, |i, j| {
        let observed = Array2::from_shape_fn((2, width), |(row, col)| {
            let day = if row == 0 { i } else { j };
            counts[day][col] as f64
        });
        match chi_square_independence(&observed) {
            Ok(result) => result.p_value,
            Err(e) => {
                tracing::warn!(
                    "Chi-square on {} numbers {} vs {} failed: {}",
                    zone.key(),
                    DrawDay::ALL[i],
                    DrawDay::ALL[j],
                    e
                );
                f64::NAN
            }
        }
    });
    let labels: Vec<String> = DrawDay::ALL.iter().map(DrawDay::to_string).collect();
    matrix_table(&format!("{}_chi_square_p_values", zone.key()), "", &labels, &labels, &matrix)
}

/// Holt-Winters 季节模型预测之后几个开奖日的销售额；拟合失败时沿用最后一期。
///
/// 缺销售额的期次按相邻期插值补齐，保持每周三期的季节对齐
fn sales_forecast(draws: &[LotteryDrawRecord], config: &LotteryJobConfig) -> ReportTable {
    let sorted = sorted_by_date(draws);
    let mut table = ReportTable::new("sales_forecast", &["开奖日期", "预计总销售额", "预测方法"]);
    let sales: Vec<Option<f64>> = sorted.iter().map(|d| d.total_sales).collect();
    let (Some(last_draw), Some((series, filled))) = (sorted.last(), fill_gaps(&sales)) else {
        return table;
    };
    if filled > 0 {
        tracing::warn!("Interpolated {} draws without sales before forecasting", filled);
    }
    let last_sales = series.last().copied().unwrap_or_default();

    let mut model = HoltWinters::new(config.season_period);
    let (values, method) = match model
        .fit(&series)
        .and_then(|_| model.forecast(config.forecast_steps))
    {
        Ok(values) => (values, format!("Holt-Winters季节性模型（周期={}）", config.season_period)),
        Err(e) => {
            tracing::warn!("Sales forecast fell back to last value: {}", e);
            (vec![last_sales; config.forecast_steps], "最后观测值".to_string())
        }
    };

    let dates = next_draw_dates(last_draw.draw_date, config.forecast_steps);
    for (date, value) in dates.iter().zip(values) {
        table.push_row(vec![date.to_string(), num(value), method.clone()]);
    }
    table
}

fn number_frequency(draws: &[LotteryDrawRecord]) -> ReportTable {
    let mut table = ReportTable::new("number_frequency", &["区", "号码", "出现次数"]);
    for zone in [Zone::Front, Zone::Back] {
        let counts = frequency(zone, draws);
        for (number, count) in zone.universe().into_iter().zip(counts) {
            table.push_row(vec![zone.label().to_string(), number, count.to_string()]);
        }
    }
    table
}

/// 按“频次 × 冷热权重”抽取推荐号码。
///
/// 号码按最近一次出现的日期升序排名（从未出现的排最前），
/// 权重从 3 线性降到 1，越久没出现权重越高。
pub fn recommend_numbers<R: Rng + ?Sized>(
    draws: &[LotteryDrawRecord],
    zone: Zone,
    k: usize,
    rng: &mut R,
) -> Vec<String> {
    let universe = zone.universe();
    let counts = frequency(zone, draws);

    let mut last_seen: HashMap<String, NaiveDate> = HashMap::new();
    for draw in draws {
        for number in parse_number_list(zone.numbers_of(draw)) {
            let seen = last_seen.entry(number).or_insert(draw.draw_date);
            if draw.draw_date > *seen {
                *seen = draw.draw_date;
            }
        }
    }

    let mut ranked: Vec<usize> = (0..universe.len()).collect();
    ranked.sort_by_key(|&i| last_seen.get(&universe[i]).copied());
    let rank_weights = linear_rank_weights(universe.len(), 3.0, 1.0);
    let mut weights = vec![0.0; universe.len()];
    for (rank, &i) in ranked.iter().enumerate() {
        weights[i] = counts[i] as f64 * rank_weights[rank];
    }

    let mut picked = match weighted_sample(&universe, &weights, k, rng) {
        Ok(picked) => picked,
        Err(e) => {
            tracing::warn!("Not enough drawn {} numbers to sample ({}), using most frequent", zone.key(), e);
            let mut by_count: Vec<usize> = (0..universe.len()).collect();
            by_count.sort_by(|a, b| counts[*b].cmp(&counts[*a]));
            by_count.into_iter().take(k).map(|i| universe[i].clone()).collect()
        }
    };
    picked.sort();
    picked
}

fn recommendation<R: Rng + ?Sized>(
    draws: &[LotteryDrawRecord],
    config: &LotteryJobConfig,
    rng: &mut R,
) -> ReportTable {
    let mut table = ReportTable::new("recommended_numbers", &["开奖日期", "前区", "后区"]);
    let Some(last) = draws.iter().map(|d| d.draw_date).max() else {
        return table;
    };
    let front = recommend_numbers(draws, Zone::Front, config.recommend_front, rng);
    let back = recommend_numbers(draws, Zone::Back, config.recommend_back, rng);
    let next = next_draw_dates(last, 1);

    table.push_row(vec![
        next.first().map(NaiveDate::to_string).unwrap_or_default(),
        front.join(" "),
        back.join(" "),
    ]);
    table
}

//! 胡润百富榜：行业、性别、年龄、地域与财富分布

use crate::chart::{ChartKind, ChartSpec};
use crate::report::{num, value_counts, ReportTable};
use crate::JobOutput;
use etl::normalize::AgeBucket;
use etl::records::UNKNOWN;
use etl::sources::hurun::{HurunConfig, HurunSource};
use etl::storage::{read_table, write_table};
use etl::{ETLResult, FetchConfig, Pipeline, RichPersonRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

const CHARTS: &[ChartSpec] = &[
    ChartSpec::columns("industry_count_top10", ChartKind::Bar, None, &["人数"]),
    ChartSpec::columns("industry_wealth_top10", ChartKind::Bar, None, &["财富总值(亿)"]),
    ChartSpec::columns("age_distribution", ChartKind::Bar, None, &["人数"]),
    ChartSpec::columns("wealth_histogram", ChartKind::Bar, None, &["人数"]),
    ChartSpec::columns("rank_vs_wealth", ChartKind::Scatter, Some("排名"), &["财富(亿)"]),
    ChartSpec::columns("headquarters_province_top15", ChartKind::Bar, None, &["人数"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HurunJobConfig {
    pub fetch: FetchConfig,
    pub source: HurunConfig,
    pub data_file: PathBuf,
    pub output_dir: PathBuf,
    /// 控制台预览的行数
    pub preview_rows: usize,
    pub histogram_bins: usize,
}

impl Default for HurunJobConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default().with_timeout_secs(30),
            source: HurunConfig::default(),
            data_file: PathBuf::from("胡润百富榜2024.csv"),
            output_dir: PathBuf::from("charts"),
            preview_rows: 5,
            histogram_bins: 30,
        }
    }
}

pub async fn crawl(config: &HurunJobConfig) -> ETLResult<Vec<RichPersonRecord>> {
    let pipeline = Pipeline::new(&config.fetch)?;
    let collected = pipeline.collect(&HurunSource::new(config.source.clone())).await?;
    tracing::info!("Collected {} rich list entries", collected.records.len());
    Ok(collected.records)
}

pub async fn run(config: &HurunJobConfig) -> anyhow::Result<JobOutput> {
    println!("=== 抓取胡润百富榜 ===\n");
    let people = crawl(config).await?;
    println!("{}", preview(&people, config.preview_rows));

    write_table(&config.data_file, &people)?;
    let people: Vec<RichPersonRecord> = read_table(&config.data_file)?;

    let tables = analyze(&people, config);
    crate::write_outputs(&config.data_file, &config.output_dir, &tables, CHARTS)
}

/// 前几行的对齐文本预览
pub fn preview(people: &[RichPersonRecord], rows: usize) -> String {
    let headers = ["排名", "姓名", "财富(亿)", "性别", "年龄", "出生地", "公司", "行业", "总部"];
    let mut lines: Vec<Vec<String>> = vec![headers.iter().map(|h| h.to_string()).collect()];
    for person in people.iter().take(rows) {
        lines.push(vec![
            person.rank.to_string(),
            person.name.clone(),
            num(person.wealth),
            person.gender.clone(),
            person.age.map(|a| a.to_string()).unwrap_or_default(),
            person.birthplace.clone(),
            person.company.clone(),
            person.industry.clone(),
            person.headquarters.clone(),
        ]);
    }

    let widths: Vec<usize> = (0..headers.len())
        .map(|col| lines.iter().map(|line| line[col].chars().count()).max().unwrap_or(0))
        .collect();
    lines
        .iter()
        .map(|line| {
            line.iter()
                .zip(&widths)
                .map(|(cell, width)| {
                    let pad = width - cell.chars().count();
                    format!("{}{}", cell, " ".repeat(pad))
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn analyze(people: &[RichPersonRecord], config: &HurunJobConfig) -> Vec<ReportTable> {
    if people.is_empty() {
        return Vec::new();
    }
    vec![
        industry_count(people, 10),
        industry_wealth(people, 10),
        gender_distribution(people),
        age_distribution(people),
        birthplace_top(people, 10),
        wealth_by_age(people),
        industry_age_crosstab(people, 15),
        wealth_histogram(people, config.histogram_bins),
        rank_vs_wealth(people),
        headquarters_province(people, 15),
    ]
}

fn counts_table(name: &str, headers: &[&str], counts: Vec<(&str, usize)>) -> ReportTable {
    let rows = counts
        .into_iter()
        .map(|(key, count)| vec![key.to_string(), count.to_string()])
        .collect();
    ReportTable::new(name, headers).with_rows(rows)
}

fn industry_count(people: &[RichPersonRecord], n: usize) -> ReportTable {
    let mut counts = value_counts(people.iter().map(|p| p.industry.as_str()));
    counts.truncate(n);
    counts_table("industry_count_top10", &["行业", "人数"], counts)
}

fn industry_wealth(people: &[RichPersonRecord], n: usize) -> ReportTable {
    let mut order: Vec<&str> = Vec::new();
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for person in people {
        let industry = person.industry.as_str();
        if !sums.contains_key(industry) {
            order.push(industry);
        }
        *sums.entry(industry).or_insert(0.0) += person.wealth;
    }

    let mut totals: Vec<(&str, f64)> = order.into_iter().map(|i| (i, sums[i])).collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));
    let rows = totals
        .into_iter()
        .take(n)
        .map(|(industry, total)| vec![industry.to_string(), num(total)])
        .collect();
    ReportTable::new("industry_wealth_top10", &["行业", "财富总值(亿)"]).with_rows(rows)
}

fn gender_distribution(people: &[RichPersonRecord]) -> ReportTable {
    let counts = value_counts(people.iter().map(|p| p.gender.as_str()));
    let rows = counts
        .into_iter()
        .map(|(gender, count)| {
            vec![
                gender.to_string(),
                count.to_string(),
                num(count as f64 / people.len() as f64),
            ]
        })
        .collect();
    ReportTable::new("gender_distribution", &["性别", "人数", "占比"]).with_rows(rows)
}

/// 各年龄段人数，按年龄段顺序，空段计 0；没有年龄的不计入
fn age_distribution(people: &[RichPersonRecord]) -> ReportTable {
    let mut counts: BTreeMap<AgeBucket, usize> = AgeBucket::ALL.iter().map(|b| (*b, 0)).collect();
    for bucket in people.iter().filter_map(|p| p.age.and_then(AgeBucket::from_age)) {
        *counts.entry(bucket).or_insert(0) += 1;
    }
    let rows = counts
        .into_iter()
        .map(|(bucket, count)| vec![bucket.to_string(), count.to_string()])
        .collect();
    ReportTable::new("age_distribution", &["年龄段", "人数"]).with_rows(rows)
}

fn birthplace_top(people: &[RichPersonRecord], n: usize) -> ReportTable {
    let mut counts = value_counts(
        people
            .iter()
            .map(|p| p.birthplace.as_str())
            .filter(|b| *b != UNKNOWN),
    );
    counts.truncate(n);
    counts_table("birthplace_top10", &["出生地", "人数"], counts)
}

/// 线性插值分位数，输入须已排序
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

/// 各年龄段的财富分布摘要（箱线图数据）
fn wealth_by_age(people: &[RichPersonRecord]) -> ReportTable {
    let mut groups: BTreeMap<AgeBucket, Vec<f64>> = BTreeMap::new();
    for person in people {
        if let Some(bucket) = person.age.and_then(AgeBucket::from_age) {
            groups.entry(bucket).or_default().push(person.wealth);
        }
    }

    let mut table = ReportTable::new(
        "wealth_by_age_bucket",
        &["年龄段", "人数", "最小值", "下四分位", "中位数", "上四分位", "最大值", "平均值"],
    );
    for (bucket, mut wealth) in groups {
        wealth.sort_by(f64::total_cmp);
        let mean = wealth.iter().sum::<f64>() / wealth.len() as f64;
        table.push_row(vec![
            bucket.to_string(),
            wealth.len().to_string(),
            num(wealth[0]),
            num(quantile(&wealth, 0.25)),
            num(quantile(&wealth, 0.5)),
            num(quantile(&wealth, 0.75)),
            num(wealth[wealth.len() - 1]),
            num(mean),
        ]);
    }
    table
}

/// 人数最多的 n 个行业在各年龄段上的占比（按行归一化）
fn industry_age_crosstab(people: &[RichPersonRecord], n: usize) -> ReportTable {
    let top: Vec<&str> = value_counts(people.iter().map(|p| p.industry.as_str()))
        .into_iter()
        .take(n)
        .map(|(industry, _)| industry)
        .collect();

    let mut headers = vec!["行业".to_string()];
    headers.extend(AgeBucket::ALL.iter().map(AgeBucket::to_string));
    let mut table = ReportTable::new("industry_age_crosstab", &headers);

    for industry in top {
        let mut counts = [0usize; AgeBucket::ALL.len()];
        for person in people.iter().filter(|p| p.industry == industry) {
            if let Some(bucket) = person.age.and_then(AgeBucket::from_age) {
                counts[bucket as usize] += 1;
            }
        }
        let total: usize = counts.iter().sum();
        if total == 0 {
            continue;
        }
        let mut row = vec![industry.to_string()];
        row.extend(counts.iter().map(|c| num(*c as f64 / total as f64)));
        table.push_row(row);
    }
    table
}

/// 等宽直方图；最后一个区间包含右端点，所有值相同时区间取 [v-0.5, v+0.5]
fn wealth_histogram(people: &[RichPersonRecord], bins: usize) -> ReportTable {
    let mut table = ReportTable::new("wealth_histogram", &["区间下限", "区间上限", "人数"]);
    let bins = bins.max(1);
    let min = people.iter().map(|p| p.wealth).fold(f64::INFINITY, f64::min);
    let max = people.iter().map(|p| p.wealth).fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return table;
    }
    let (low, high) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
    let width = (high - low) / bins as f64;

    let mut counts = vec![0usize; bins];
    for person in people {
        let index = (((person.wealth - low) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    for (i, count) in counts.into_iter().enumerate() {
        table.push_row(vec![
            num(low + width * i as f64),
            num(low + width * (i + 1) as f64),
            count.to_string(),
        ]);
    }
    table
}

fn rank_vs_wealth(people: &[RichPersonRecord]) -> ReportTable {
    let rows = people
        .iter()
        .map(|p| vec![p.rank.to_string(), num(p.wealth)])
        .collect();
    ReportTable::new("rank_vs_wealth", &["排名", "财富(亿)"]).with_rows(rows)
}

/// 总部所在省份取第一个空格之前的部分
fn headquarters_province(people: &[RichPersonRecord], n: usize) -> ReportTable {
    let mut counts = value_counts(
        people
            .iter()
            .filter_map(|p| p.headquarters.split(' ').next())
            .filter(|province| !province.is_empty() && *province != UNKNOWN),
    );
    counts.truncate(n);
    counts_table("headquarters_province_top15", &["省份", "人数"], counts)
}

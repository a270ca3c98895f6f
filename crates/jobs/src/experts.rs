//! 彩票论坛大乐透专家：彩龄、发文量与中奖次数的相关性

use crate::chart::{ChartKind, ChartSpec};
use crate::report::{matrix_table, ReportTable};
use crate::JobOutput;
use etl::sources::expert::{expert_fetch_config, ExpertDetailSource, ExpertListConfig, ExpertListSource};
use etl::storage::{read_table, write_table};
use etl::{ETLResult, ExpertRecord, FetchConfig, Pipeline};
use ml::stats::pearson;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CHARTS: &[ChartSpec] = &[ChartSpec::columns(
    "age_vs_articles",
    ChartKind::Scatter,
    Some("彩龄"),
    &["发文量"],
)];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertsJobConfig {
    pub fetch: FetchConfig,
    pub list: ExpertListConfig,
    pub data_file: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for ExpertsJobConfig {
    fn default() -> Self {
        Self {
            fetch: expert_fetch_config(),
            list: ExpertListConfig::default(),
            data_file: PathBuf::from("result4/大乐透专家详情统计.csv"),
            output_dir: PathBuf::from("result4"),
        }
    }
}

/// 先翻列表页收集专家 id，再逐个抓取详情
pub async fn crawl(config: &ExpertsJobConfig) -> ETLResult<Vec<ExpertRecord>> {
    let pipeline = Pipeline::new(&config.fetch)?;

    let ids = pipeline
        .collect(&ExpertListSource::new(config.list.clone()))
        .await?
        .records;
    println!("获取到 {} 个大乐透专家: {}", ids.len(), ids.join(", "));

    let details = pipeline
        .collect(&ExpertDetailSource::new(&config.list.base_url, ids))
        .await?;
    tracing::info!(
        "Collected {} expert details ({} failed)",
        details.records.len(),
        details.summary.units_failed
    );
    Ok(details.records)
}

pub async fn run(config: &ExpertsJobConfig) -> anyhow::Result<JobOutput> {
    println!("=== 抓取大乐透专家数据 ===\n");
    let experts = crawl(config).await?;
    write_table(&config.data_file, &experts)?;
    let experts: Vec<ExpertRecord> = read_table(&config.data_file)?;

    let tables = analyze(&experts);
    crate::write_outputs(&config.data_file, &config.output_dir, &tables, CHARTS)
}

fn as_f64(values: impl Iterator<Item = Option<u32>>) -> Vec<Option<f64>> {
    values.map(|v| v.map(f64::from)).collect()
}

pub fn analyze(experts: &[ExpertRecord]) -> Vec<ReportTable> {
    vec![age_vs_articles(experts), prize_correlation(experts)]
}

fn age_vs_articles(experts: &[ExpertRecord]) -> ReportTable {
    let rows = experts
        .iter()
        .filter_map(|e| match (e.age, e.articles) {
            (Some(age), Some(articles)) => Some(vec![
                e.nickname.clone(),
                age.to_string(),
                articles.to_string(),
            ]),
            _ => None,
        })
        .collect();
    ReportTable::new("age_vs_articles", &["昵称", "彩龄", "发文量"]).with_rows(rows)
}

/// (彩龄, 发文量) × (一、二、三等奖) 的 Pearson 相关矩阵；无法计算的格子为 NaN
fn prize_correlation(experts: &[ExpertRecord]) -> ReportTable {
    let features = [
        ("彩龄", as_f64(experts.iter().map(|e| e.age))),
        ("发文量", as_f64(experts.iter().map(|e| e.articles))),
    ];
    let prizes = [
        ("一等奖", as_f64(experts.iter().map(|e| e.first_prizes))),
        ("二等奖", as_f64(experts.iter().map(|e| e.second_prizes))),
        ("三等奖", as_f64(experts.iter().map(|e| e.third_prizes))),
    ];

    let matrix: Vec<Vec<f64>> = features
        .iter()
        .map(|(_, x)| {
            prizes
                .iter()
                .map(|(_, y)| pearson(x, y).unwrap_or(f64::NAN))
                .collect()
        })
        .collect();

    let rows: Vec<&str> = features.iter().map(|(name, _)| *name).collect();
    let cols: Vec<&str> = prizes.iter().map(|(name, _)| *name).collect();
    matrix_table("prize_correlation", "", &rows, &cols, &matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expert(id: u32, age: Option<u32>, articles: Option<u32>, prizes: [u32; 3]) -> ExpertRecord {
        ExpertRecord {
            id: id.to_string(),
            nickname: format!("专家{}", id),
            age,
            articles,
            first_prizes: Some(prizes[0]),
            second_prizes: Some(prizes[1]),
            third_prizes: Some(prizes[2]),
        }
    }

    #[test]
    fn test_age_vs_articles_skips_incomplete_rows() {
        let experts = vec![
            expert(1, Some(5), Some(120), [0, 1, 3]),
            expert(2, None, Some(80), [0, 0, 1]),
        ];
        let table = analyze(&experts).remove(0);
        assert_eq!(table.rows, vec![vec!["专家1", "5", "120"]]);
    }

    #[test]
    fn test_prize_correlation_matrix() {
        let experts = vec![
            expert(1, Some(1), Some(10), [0, 2, 1]),
            expert(2, Some(2), Some(20), [0, 4, 3]),
            expert(3, Some(3), Some(30), [0, 6, 2]),
            expert(4, Some(4), Some(40), [0, 8, 4]),
        ];
        let table = &analyze(&experts)[1];
        assert_eq!(table.headers, vec!["", "一等奖", "二等奖", "三等奖"]);
        assert_eq!(table.rows[0][0], "彩龄");
        // 一等奖全为 0，相关系数无定义
        assert_eq!(table.rows[0][1], "NaN");
        assert_eq!(table.rows[0][2], "1");
        assert_eq!(table.rows[1][2], "1");
        assert_eq!(table.rows[0][3], "0.8");
    }
}

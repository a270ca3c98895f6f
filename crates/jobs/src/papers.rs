//! 顶会论文：发文量统计、标题关键词与下一年发文量预测

use crate::chart::{ChartKind, ChartSpec};
use crate::report::{value_counts, ReportTable};
use crate::JobOutput;
use etl::normalize::clean_title;
use etl::sources::dblp::{DblpConfig, DblpSource};
use etl::storage::{read_table, write_table};
use etl::{ETLResult, FetchConfig, PaperRecord, Pipeline};
use ml::{forecast_with_fallback, ArimaOrder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

const CHARTS: &[ChartSpec] = &[
    ChartSpec::rows("papers_per_conference_year", ChartKind::Line),
    ChartSpec::columns("top_title_keywords", ChartKind::Bar, None, &["frequency"]),
    ChartSpec::columns("next_year_prediction", ChartKind::Bar, None, &["last_count", "predicted_count"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PapersJobConfig {
    pub fetch: FetchConfig,
    pub dblp: DblpConfig,
    pub data_file: PathBuf,
    pub output_dir: PathBuf,
    pub top_keywords: usize,
    pub order: ArimaOrder,
}

impl Default for PapersJobConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default().with_timeout_secs(20),
            dblp: DblpConfig::default(),
            data_file: PathBuf::from("dblp_papers_2020-2025.csv"),
            output_dir: PathBuf::from("charts"),
            top_keywords: 50,
            order: ArimaOrder::new(1, 1, 1),
        }
    }
}

pub async fn crawl(config: &PapersJobConfig) -> ETLResult<Vec<PaperRecord>> {
    let pipeline = Pipeline::new(&config.fetch)?;
    let collected = pipeline.collect(&DblpSource::new(config.dblp.clone())).await?;
    tracing::info!(
        "Collected {} papers ({} proceedings failed)",
        collected.records.len(),
        collected.summary.units_failed
    );
    Ok(collected.records)
}

/// 已有落盘数据时直接复用，否则重新抓取
pub async fn run(config: &PapersJobConfig) -> anyhow::Result<JobOutput> {
    let papers: Vec<PaperRecord> = if config.data_file.exists() {
        println!("=== 复用已有数据 {} ===\n", config.data_file.display());
        read_table(&config.data_file)?
    } else {
        println!("=== 抓取 DBLP 论文 ===\n");
        let papers = crawl(config).await?;
        write_table(&config.data_file, &papers)?;
        read_table(&config.data_file)?
    };

    let tables = analyze(&papers, config);
    crate::write_outputs(&config.data_file, &config.output_dir, &tables, CHARTS)
}

pub fn analyze(papers: &[PaperRecord], config: &PapersJobConfig) -> Vec<ReportTable> {
    if papers.is_empty() {
        return Vec::new();
    }
    let counts = PaperCounts::from_papers(papers);
    vec![
        counts.table(),
        top_keywords(papers, config.top_keywords),
        counts.predictions(config.order),
    ]
}

/// 会议 × 年份的论文数，未出现的年份计 0
struct PaperCounts {
    /// 按首次出现的顺序
    conferences: Vec<String>,
    years: Vec<i32>,
    counts: BTreeMap<(String, i32), usize>,
}

impl PaperCounts {
    fn from_papers(papers: &[PaperRecord]) -> Self {
        let mut conferences: Vec<String> = Vec::new();
        let mut counts = BTreeMap::new();
        for paper in papers {
            if !conferences.contains(&paper.conference) {
                conferences.push(paper.conference.clone());
            }
            *counts.entry((paper.conference.clone(), paper.year)).or_insert(0) += 1;
        }

        let first = papers.iter().map(|p| p.year).min().unwrap_or_default();
        let last = papers.iter().map(|p| p.year).max().unwrap_or_default();
        Self {
            conferences,
            years: (first..=last).collect(),
            counts,
        }
    }

    fn series(&self, conference: &str) -> Vec<f64> {
        self.years
            .iter()
            .map(|year| {
                self.counts
                    .get(&(conference.to_string(), *year))
                    .copied()
                    .unwrap_or(0) as f64
            })
            .collect()
    }

    fn table(&self) -> ReportTable {
        let mut headers = vec!["conference".to_string()];
        headers.extend(self.years.iter().map(i32::to_string));

        let mut table = ReportTable::new("papers_per_conference_year", &headers);
        for conference in &self.conferences {
            let mut row = vec![conference.clone()];
            row.extend(self.series(conference).iter().map(|c| (*c as usize).to_string()));
            table.push_row(row);
        }
        table
    }

    /// 每个会议下一年的发文量预测，取整
    fn predictions(&self, order: ArimaOrder) -> ReportTable {
        let next_year = self.years.last().map(|y| y + 1).unwrap_or_default();
        let mut table = ReportTable::new(
            "next_year_prediction",
            &["conference", "year", "predicted_count", "last_count", "fallback"],
        );

        for conference in &self.conferences {
            let series = self.series(conference);
            let last = series.last().copied().unwrap_or_default();
            let (predicted, fallback) = match forecast_with_fallback(&series, order, 1) {
                Ok(forecast) => (forecast.values[0], forecast.fallback),
                Err(e) => {
                    tracing::warn!("No forecast for {}: {}", conference, e);
                    (last, true)
                }
            };
            tracing::info!("{} {} predicted {:.1}", conference, next_year, predicted);

            table.push_row(vec![
                conference.clone(),
                next_year.to_string(),
                (predicted.round() as i64).to_string(),
                (last as i64).to_string(),
                fallback.to_string(),
            ]);
        }
        table
    }
}

/// 标题高频词
fn top_keywords(papers: &[PaperRecord], n: usize) -> ReportTable {
    let mut counts = value_counts(papers.iter().flat_map(|p| clean_title(&p.title)));
    // 同频按字母序，保证输出稳定
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let rows = counts
        .into_iter()
        .take(n)
        .map(|(word, count)| vec![word, count.to_string()])
        .collect();
    ReportTable::new("top_title_keywords", &["keyword", "frequency"]).with_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(title: &str, conference: &str, year: i32) -> PaperRecord {
        PaperRecord {
            title: title.to_string(),
            authors: "Alice, Bob".to_string(),
            year,
            conference: conference.to_string(),
            url: String::new(),
        }
    }

    #[test]
    fn test_counts_reindex_missing_years() {
        let papers = vec![
            paper("Graph Neural Networks for Traffic", "KDD", 2020),
            paper("Scalable Graph Mining", "KDD", 2022),
            paper("Diffusion Models Beat GANs", "CVPR", 2020),
            paper("Graph Transformers", "CVPR", 2020),
        ];
        let tables = analyze(&papers, &PapersJobConfig::default());

        let counts = &tables[0];
        assert_eq!(counts.headers, vec!["conference", "2020", "2021", "2022"]);
        assert_eq!(counts.rows[0], vec!["KDD", "1", "0", "1"]);
        assert_eq!(counts.rows[1], vec!["CVPR", "2", "0", "0"]);
    }

    #[test]
    fn test_top_keywords() {
        let papers = vec![
            paper("Graph Neural Networks for Traffic", "KDD", 2020),
            paper("Scalable Graph Mining", "KDD", 2021),
            paper("Graph Transformers with Attention", "CVPR", 2021),
        ];
        let table = top_keywords(&papers, 3);
        assert_eq!(table.rows[0], vec!["graph", "3"]);
        assert_eq!(table.rows.len(), 3);
        assert!(table.column("keyword").unwrap().iter().all(|w| *w != "for" && *w != "with"));
    }

    #[test]
    fn test_short_series_falls_back_to_last_count() {
        let papers = vec![
            paper("Graph Mining", "KDD", 2024),
            paper("Graph Mining Again", "KDD", 2025),
            paper("Graph Mining Thrice", "KDD", 2025),
        ];
        let tables = analyze(&papers, &PapersJobConfig::default());
        let prediction = &tables[2];
        assert_eq!(prediction.rows[0], vec!["KDD", "2026", "2", "2", "true"]);
    }

    #[test]
    fn test_prediction_covers_every_conference() {
        let mut papers = Vec::new();
        for (year, n) in (2018..=2025).zip([10, 12, 15, 14, 18, 20, 23, 25]) {
            for i in 0..n {
                papers.push(paper(&format!("Paper {}", i), "AAAI", year));
            }
            papers.push(paper("Only One", "IJCAI", year));
        }
        let tables = analyze(&papers, &PapersJobConfig::default());
        let prediction = &tables[2];
        assert_eq!(prediction.rows.len(), 2);
        for row in &prediction.rows {
            assert_eq!(row[1], "2026");
            let predicted: i64 = row[2].parse().unwrap();
            assert!(predicted >= 0);
        }
        // 常数序列的预测仍为常数
        assert_eq!(prediction.rows[1][2], "1");
    }
}

//! ETL 管道：逐个工作单元抓取、解码、抽取

use crate::fetch::{decode_with, Fetcher};
use crate::sources::{Page, Source};
use crate::types::{ETLError, ETLResult, FetchConfig};

/// 一次抓取的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub units_ok: usize,
    pub units_failed: usize,
}

/// 抓取结果
#[derive(Debug, Clone)]
pub struct Collected<R> {
    pub records: Vec<R>,
    pub summary: RunSummary,
}

/// ETL 管道
pub struct Pipeline {
    fetcher: Fetcher,
}

impl Pipeline {
    pub fn new(config: &FetchConfig) -> ETLResult<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
        })
    }

    pub fn with_fetcher(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// 按顺序处理数据源的全部工作单元。
    ///
    /// 单元失败只记录并跳过；数据源报告到底或累计记录数达到上限时提前结束。
    /// 一条记录都没有拿到时返回 `NoData`。
    pub async fn collect<S: Source>(&self, source: &S) -> ETLResult<Collected<S::Record>> {
        let units = source.units();
        let limit = source.limit();
        tracing::info!("Collecting {} ({} units)", source.name(), units.len());

        let mut records = Vec::new();
        let mut summary = RunSummary::default();

        for unit in &units {
            let page = match self.fetch_unit(source, &unit.key, &unit.url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Skipping {} {}: {}", source.name(), unit.key, e);
                    summary.units_failed += 1;
                    continue;
                }
            };

            summary.units_ok += 1;
            tracing::info!(
                "Done: {} {} ({} records)",
                source.name(),
                unit.key,
                page.records.len()
            );
            records.extend(page.records);

            if let Some(limit) = limit {
                if records.len() >= limit {
                    records.truncate(limit);
                    tracing::info!("Reached record limit {} for {}", limit, source.name());
                    break;
                }
            }
            if page.exhausted {
                tracing::info!("No more data from {} after {}", source.name(), unit.key);
                break;
            }
        }

        tracing::info!(
            "Collected {} records from {} ({} units ok, {} failed)",
            records.len(),
            source.name(),
            summary.units_ok,
            summary.units_failed
        );

        if records.is_empty() {
            return Err(ETLError::NoData(source.name().to_string()));
        }

        Ok(Collected { records, summary })
    }

    async fn fetch_unit<S: Source>(
        &self,
        source: &S,
        key: &S::Key,
        url: &str,
    ) -> ETLResult<Page<S::Record>> {
        let body = self.fetcher.fetch(url).await?;
        decode_with(&body, source.decoders(), |text| source.extract(key, text))
    }
}

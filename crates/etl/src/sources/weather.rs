//! 天气后报历史天气爬虫（按月 HTML 表格）

use super::{selector, Page, Source, WorkUnit};
use crate::types::{ETLError, ETLResult, YearMonth};
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub base_url: String,
    /// 城市拼音，如 `dalian`
    pub city: String,
    pub begin: YearMonth,
    pub end: YearMonth,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.tianqihoubao.com/lishi".to_string(),
            city: "dalian".to_string(),
            begin: YearMonth::new(2022, 1),
            end: YearMonth::new(2024, 12),
        }
    }
}

/// 表格中的一行原始文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWeatherRow {
    pub date: String,
    /// `白天/夜晚` 天气
    pub weather: String,
    /// `最高/最低` 温度，如 `5℃/-2℃`
    pub temperature: String,
    /// `白天/夜晚` 风力
    pub wind: String,
    pub month: YearMonth,
}

pub struct WeatherSource {
    config: WeatherConfig,
}

impl WeatherSource {
    pub fn new(config: WeatherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }
}

impl Source for WeatherSource {
    type Key = YearMonth;
    type Record = RawWeatherRow;

    fn name(&self) -> &str {
        "tianqihoubao"
    }

    fn units(&self) -> Vec<WorkUnit<YearMonth>> {
        self.config
            .begin
            .through(self.config.end)
            .into_iter()
            .map(|month| WorkUnit {
                url: format!(
                    "{}/{}/month/{}.html",
                    self.config.base_url,
                    self.config.city,
                    month.code()
                ),
                key: month,
            })
            .collect()
    }

    fn extract(&self, month: &YearMonth, body: &str) -> ETLResult<Page<RawWeatherRow>> {
        parse_month_table(body, *month).map(Page::more)
    }
}

/// 解析某月的天气表格：跳过表头，少于 4 列或任一列为空的行直接丢弃
pub fn parse_month_table(html: &str, month: YearMonth) -> ETLResult<Vec<RawWeatherRow>> {
    let document = Html::parse_document(html);
    let table_selector = selector("table.weather-table")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| ETLError::MissingElement(format!("table.weather-table ({})", month)))?;

    let mut rows = Vec::new();
    for tr in table.select(&row_selector).skip(1) {
        let cells: Vec<String> = tr.select(&cell_selector).map(element_text).collect();
        if cells.len() < 4 {
            continue;
        }
        if cells[..4].iter().any(|cell| cell.is_empty()) {
            tracing::debug!("Dropping incomplete weather row in {}", month);
            continue;
        }

        rows.push(RawWeatherRow {
            date: cells[0].clone(),
            weather: cells[1].clone(),
            temperature: cells[2].clone(),
            wind: cells[3].clone(),
            month,
        });
    }

    Ok(rows)
}

/// 拼接元素内的文本片段，每段先去掉首尾空白
fn element_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

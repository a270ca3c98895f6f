//! 中彩网大乐透开奖数据爬虫（JSONP 分页接口）

use super::{LooseValue, Page, Source, WorkUnit};
use crate::fetch::unwrap_jsonp;
use crate::types::{ymd, ETLResult, FetchConfig};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryConfig {
    pub base_url: String,
    /// 彩种 id，大乐透为 281
    pub lottery_id: u32,
    pub begin: NaiveDate,
    pub end: NaiveDate,
    pub page_size: usize,
    /// 最多保留的开奖期数（剔除日期之前计数）
    pub max_records: usize,
    /// 分页上限，防止接口异常时无限翻页
    pub max_pages: usize,
    /// 单独剔除的开奖日期
    pub excluded_dates: Vec<NaiveDate>,
}

const DEFAULT_BEGIN: NaiveDate = ymd(2024, 10, 30);
const DEFAULT_END: NaiveDate = ymd(2025, 7, 1);
/// 该日开奖数据异常，统计时剔除
const EXCLUDED_DRAW: NaiveDate = ymd(2025, 2, 8);

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://jc.zhcw.com/port/client_json.php".to_string(),
            lottery_id: 281,
            begin: DEFAULT_BEGIN,
            end: DEFAULT_END,
            page_size: 30,
            max_records: 100,
            max_pages: 40,
            excluded_dates: vec![EXCLUDED_DRAW],
        }
    }
}

/// 接口返回的一期开奖，全部保留原始文本
#[derive(Debug, Clone, PartialEq)]
pub struct RawDraw {
    pub open_time: String,
    pub week: String,
    pub front: String,
    pub back: String,
    pub sale_money: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DrawResponse {
    #[serde(default)]
    data: Vec<DrawItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawItem {
    open_time: Option<String>,
    week: Option<String>,
    front_winning_num: Option<String>,
    back_winning_num: Option<String>,
    sale_money: Option<LooseValue>,
}

pub struct LotterySource {
    config: LotteryConfig,
}

impl LotterySource {
    pub fn new(config: LotteryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LotteryConfig {
        &self.config
    }

    /// 接口要求的请求头
    pub fn fetch_config() -> FetchConfig {
        FetchConfig::default()
            .with_header("Accept", "*/*")
            .with_header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8")
            .with_header("Host", "jc.zhcw.com")
            .with_header("Referer", "https://www.zhcw.com/")
    }

    fn page_url(&self, page: usize) -> String {
        format!(
            "{}?callback=jQuery112209220184727154788_1751885800538\
             &transactionType=10001001&lotteryId={}&issueCount=1000\
             &startIssue=&endIssue=&startDate=&endDate=&type=0\
             &pageNum={}&pageSize={}&tt=0.7861486523735369&_=1751885800551",
            self.config.base_url, self.config.lottery_id, page, self.config.page_size
        )
    }
}

impl Source for LotterySource {
    type Key = usize;
    type Record = RawDraw;

    fn name(&self) -> &str {
        "zhcw"
    }

    fn units(&self) -> Vec<WorkUnit<usize>> {
        (1..=self.config.max_pages)
            .map(|page| WorkUnit {
                key: page,
                url: self.page_url(page),
            })
            .collect()
    }

    fn extract(&self, page: &usize, body: &str) -> ETLResult<Page<RawDraw>> {
        let response: DrawResponse = serde_json::from_str(unwrap_jsonp(body)?)?;
        let page_draws = parse_draw_page(response, self.config.begin, self.config.end);
        tracing::debug!("Page {} yielded {} draws", page, page_draws.records.len());
        Ok(page_draws)
    }

    fn limit(&self) -> Option<usize> {
        Some(self.config.max_records)
    }
}

/// 接口按开奖日期倒序返回；遇到早于 `begin` 的一期即视为数据到底。
/// 晚于 `end` 的期次跳过，缺少必填字段的期次丢弃。
fn parse_draw_page(response: DrawResponse, begin: NaiveDate, end: NaiveDate) -> Page<RawDraw> {
    if response.data.is_empty() {
        return Page::last(Vec::new());
    }

    let mut draws = Vec::new();
    for item in response.data {
        let (Some(open_time), Some(week), Some(front), Some(back)) = (
            item.open_time,
            item.week,
            item.front_winning_num,
            item.back_winning_num,
        ) else {
            tracing::debug!("Dropping draw with missing fields");
            continue;
        };

        if let Ok(date) = NaiveDate::parse_from_str(open_time.trim(), "%Y-%m-%d") {
            if date < begin {
                return Page::last(draws);
            }
            if date > end {
                continue;
            }
        }

        draws.push(RawDraw {
            open_time,
            week,
            front,
            back,
            sale_money: item.sale_money.map(|v| v.as_text()),
        });
    }

    Page::more(draws)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEGIN: NaiveDate = ymd(2025, 1, 1);
    const END: NaiveDate = ymd(2025, 6, 30);

    fn source() -> LotterySource {
        LotterySource::new(LotteryConfig {
            begin: BEGIN,
            end: END,
            ..LotteryConfig::default()
        })
    }

    #[test]
    fn test_extract_jsonp_page() {
        let body = r#"jQuery1122({"pageNum":1,"data":[
            {"openTime":"2025-07-02","week":"三","frontWinningNum":"01 02 03 04 05","backWinningNum":"06 07","saleMoney":"300,000,000"},
            {"openTime":"2025-06-30","week":"一","frontWinningNum":"1 12 23 30 35","backWinningNum":"2 11","saleMoney":"295,123,456"},
            {"openTime":"2025-06-28","week":"六","frontWinningNum":"03 09 17 21 33"}
        ]});"#;
        let page = source().extract(&1, body).unwrap();
        assert!(!page.exhausted);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].open_time, "2025-06-30");
        assert_eq!(page.records[0].sale_money.as_deref(), Some("295,123,456"));
    }

    #[test]
    fn test_draw_before_begin_exhausts_source() {
        let body = r#"cb({"data":[
            {"openTime":"2025-01-04","week":"六","frontWinningNum":"01 02 03 04 05","backWinningNum":"01 02","saleMoney":1000},
            {"openTime":"2024-12-30","week":"一","frontWinningNum":"01 02 03 04 05","backWinningNum":"01 02","saleMoney":1000}
        ]})"#;
        let page = source().extract(&2, body).unwrap();
        assert!(page.exhausted);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].sale_money.as_deref(), Some("1000"));
    }

    #[test]
    fn test_empty_page_exhausts_source() {
        let page = source().extract(&3, r#"cb({"data":[]})"#).unwrap();
        assert!(page.exhausted);
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_missing_wrapper_is_decode_error() {
        let err = source().extract(&1, "<html>busy</html>").unwrap_err();
        assert_eq!(err.kind(), crate::types::ErrorKind::Decode);
    }

    #[test]
    fn test_default_window() {
        let config = LotteryConfig::default();
        assert_eq!(config.begin.to_string(), "2024-10-30");
        assert_eq!(config.end.to_string(), "2025-07-01");
        assert_eq!(config.excluded_dates, vec![NaiveDate::from_ymd_opt(2025, 2, 8).unwrap()]);
    }

    #[test]
    fn test_page_urls() {
        let units = source().units();
        assert_eq!(units.len(), 40);
        assert!(units[0].url.contains("lotteryId=281"));
        assert!(units[1].url.contains("pageNum=2&pageSize=30"));
    }
}

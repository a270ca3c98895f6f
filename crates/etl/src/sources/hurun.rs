//! 胡润百富榜爬虫（单次 JSON 请求）

use super::{LooseValue, Page, Source, WorkUnit};
use crate::records::{RichPersonRecord, UNKNOWN};
use crate::types::ETLResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HurunConfig {
    pub base_url: String,
    /// 榜单代码
    pub list_code: String,
    /// 单次请求的条目上限
    pub limit: usize,
}

impl Default for HurunConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.hurun.net/zh-CN/Rank/HsRankDetailsList".to_string(),
            list_code: "ODBYW2BI".to_string(),
            limit: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RankResponse {
    #[serde(default)]
    rows: Vec<RankRow>,
}

#[derive(Debug, Default, Deserialize)]
struct RankRow {
    #[serde(rename = "hs_Character", default)]
    characters: Vec<Character>,
    #[serde(rename = "hs_Rank_Rich_Wealth")]
    wealth: Option<LooseValue>,
    #[serde(rename = "hs_Rank_Rich_Industry_Cn")]
    industry: Option<String>,
    #[serde(rename = "hs_Rank_Rich_ComName_Cn")]
    company: Option<String>,
    #[serde(rename = "hs_Rank_Rich_ComHeadquarters_Cn")]
    headquarters: Option<String>,
    #[serde(rename = "hs_Rank_Rich_Ranking")]
    ranking: Option<LooseValue>,
}

#[derive(Debug, Default, Deserialize)]
struct Character {
    #[serde(rename = "hs_Character_Fullname_Cn")]
    fullname: Option<String>,
    #[serde(rename = "hs_Character_Gender")]
    gender: Option<String>,
    #[serde(rename = "hs_Character_Age")]
    age: Option<LooseValue>,
    #[serde(rename = "hs_Character_NativePlace_Cn")]
    native_place: Option<String>,
}

pub struct HurunSource {
    config: HurunConfig,
}

impl HurunSource {
    pub fn new(config: HurunConfig) -> Self {
        Self { config }
    }
}

impl Source for HurunSource {
    type Key = String;
    type Record = RichPersonRecord;

    fn name(&self) -> &str {
        "hurun"
    }

    fn units(&self) -> Vec<WorkUnit<String>> {
        vec![WorkUnit {
            key: self.config.list_code.clone(),
            url: format!(
                "{}?num={}&search=&offset=0&limit={}",
                self.config.base_url, self.config.list_code, self.config.limit
            ),
        }]
    }

    fn extract(&self, _code: &String, body: &str) -> ETLResult<Page<RichPersonRecord>> {
        let response: RankResponse = serde_json::from_str(body)?;
        let records = response.rows.into_iter().filter_map(to_record).collect();
        Ok(Page::last(records))
    }
}

fn or_unknown(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// 排名小于 1（缺失或 0）的条目丢弃；财富缺失记 0；出生地取最后一个 `-` 段
fn to_record(row: RankRow) -> Option<RichPersonRecord> {
    let rank = row.ranking.as_ref().and_then(LooseValue::as_u32).unwrap_or(0);
    if rank < 1 {
        tracing::debug!("Dropping rich-list row without a valid rank");
        return None;
    }

    let person = row.characters.into_iter().next().unwrap_or_default();
    let birthplace = or_unknown(person.native_place);
    let birthplace = birthplace
        .rsplit('-')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string();

    Some(RichPersonRecord {
        name: person.fullname.unwrap_or_default(),
        wealth: row.wealth.as_ref().and_then(LooseValue::as_f64).unwrap_or(0.0),
        gender: or_unknown(person.gender),
        age: person.age.as_ref().and_then(LooseValue::as_u32),
        birthplace,
        company: row.company.unwrap_or_default(),
        industry: or_unknown(row.industry),
        headquarters: row.headquarters.unwrap_or_default(),
        rank,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"total":3,"rows":[
        {"hs_Rank_Rich_Ranking":1,"hs_Rank_Rich_Wealth":4800,"hs_Rank_Rich_Industry_Cn":"饮料",
         "hs_Rank_Rich_ComName_Cn":"农夫山泉","hs_Rank_Rich_ComHeadquarters_Cn":"浙江 杭州",
         "hs_Character":[{"hs_Character_Fullname_Cn":"钟睒睒","hs_Character_Gender":"男",
                          "hs_Character_Age":"69","hs_Character_NativePlace_Cn":"中国-浙江-杭州"}]},
        {"hs_Rank_Rich_Ranking":"2","hs_Rank_Rich_Wealth":null,"hs_Rank_Rich_Industry_Cn":"",
         "hs_Rank_Rich_ComName_Cn":"某公司","hs_Rank_Rich_ComHeadquarters_Cn":"广东 深圳",
         "hs_Character":[{"hs_Character_Fullname_Cn":"张三","hs_Character_Age":"未知"}]},
        {"hs_Rank_Rich_Ranking":0,"hs_Rank_Rich_Wealth":10,"hs_Character":[]}
    ]}"#;

    #[test]
    fn test_extract_rank_rows() {
        let source = HurunSource::new(HurunConfig::default());
        let page = source.extract(&"ODBYW2BI".to_string(), BODY).unwrap();
        assert!(page.exhausted);
        assert_eq!(page.records.len(), 2);

        let first = &page.records[0];
        assert_eq!(first.name, "钟睒睒");
        assert_eq!(first.wealth, 4800.0);
        assert_eq!(first.age, Some(69));
        assert_eq!(first.birthplace, "杭州");
        assert_eq!(first.rank, 1);

        let second = &page.records[1];
        assert_eq!(second.wealth, 0.0);
        assert_eq!(second.gender, UNKNOWN);
        assert_eq!(second.industry, UNKNOWN);
        assert_eq!(second.birthplace, UNKNOWN);
        assert_eq!(second.age, None);
        assert_eq!(second.rank, 2);
    }

    #[test]
    fn test_single_unit_url() {
        let source = HurunSource::new(HurunConfig::default());
        let units = source.units();
        assert_eq!(units.len(), 1);
        assert!(units[0].url.ends_with("num=ODBYW2BI&search=&offset=0&limit=2000"));
    }
}

//! 彩票论坛专家爬虫：先分页拉取专家列表，再逐个拉取详情

use super::{LooseValue, Page, Source, WorkUnit};
use crate::fetch::Decoder;
use crate::records::ExpertRecord;
use crate::types::{ETLResult, FetchConfig};
use serde::{Deserialize, Serialize};

const EXPERT_DECODERS: [Decoder; 2] = [Decoder::Utf8, Decoder::Brotli];

/// 论坛接口要求的请求头
pub fn expert_fetch_config() -> FetchConfig {
    FetchConfig::default()
        .with_header("Accept", "*/*")
        .with_header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8")
        .with_header("Host", "i.cmzj.net")
        .with_header("Origin", "https://www.cmzj.net")
        .with_header("Referer", "https://www.cmzj.net/")
        .with_delay_ms(200)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertListConfig {
    pub base_url: String,
    pub page_size: usize,
    /// 需要收集的专家数
    pub target: usize,
    /// 技能关键字
    pub skill: String,
    pub max_pages: usize,
}

impl Default for ExpertListConfig {
    fn default() -> Self {
        Self {
            base_url: "https://i.cmzj.net/expert".to_string(),
            page_size: 10,
            target: 25,
            skill: "大乐透".to_string(),
            max_pages: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExpertListResponse {
    #[serde(default)]
    data: Vec<ExpertListItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpertListItem {
    expert_id: Option<LooseValue>,
    #[serde(default)]
    skill: Option<String>,
}

/// 专家列表：产出技能包含关键字的专家 id
pub struct ExpertListSource {
    config: ExpertListConfig,
}

impl ExpertListSource {
    pub fn new(config: ExpertListConfig) -> Self {
        Self { config }
    }
}

impl Source for ExpertListSource {
    type Key = usize;
    type Record = String;

    fn name(&self) -> &str {
        "cmzj-list"
    }

    fn units(&self) -> Vec<WorkUnit<usize>> {
        (1..=self.config.max_pages)
            .map(|page| WorkUnit {
                key: page,
                url: format!(
                    "{}/queryExpert?limit={}&page={}&sort=0",
                    self.config.base_url, self.config.page_size, page
                ),
            })
            .collect()
    }

    fn decoders(&self) -> &[Decoder] {
        &EXPERT_DECODERS
    }

    fn extract(&self, _page: &usize, body: &str) -> ETLResult<Page<String>> {
        let response: ExpertListResponse = serde_json::from_str(body)?;
        if response.data.is_empty() {
            return Ok(Page::last(Vec::new()));
        }

        let ids = response
            .data
            .into_iter()
            .filter(|item| has_skill(item.skill.as_deref().unwrap_or(""), &self.config.skill))
            .filter_map(|item| item.expert_id.map(|id| id.as_text()))
            .filter(|id| !id.is_empty())
            .collect();

        Ok(Page::more(ids))
    }

    fn limit(&self) -> Option<usize> {
        Some(self.config.target)
    }
}

/// 技能字段以逗号分隔，任一技能包含关键字即可
fn has_skill(skills: &str, keyword: &str) -> bool {
    skills.split(',').map(str::trim).any(|skill| skill.contains(keyword))
}

#[derive(Debug, Deserialize)]
struct ExpertDetailResponse {
    data: Option<ExpertDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpertDetail {
    name: Option<String>,
    age: Option<LooseValue>,
    articles: Option<LooseValue>,
    dlt_one: Option<LooseValue>,
    dlt_two: Option<LooseValue>,
    dlt_three: Option<LooseValue>,
}

/// 专家详情：每个 id 一个工作单元
pub struct ExpertDetailSource {
    base_url: String,
    ids: Vec<String>,
}

impl ExpertDetailSource {
    pub fn new(base_url: &str, ids: Vec<String>) -> Self {
        Self {
            base_url: base_url.to_string(),
            ids,
        }
    }
}

impl Source for ExpertDetailSource {
    type Key = String;
    type Record = ExpertRecord;

    fn name(&self) -> &str {
        "cmzj-detail"
    }

    fn units(&self) -> Vec<WorkUnit<String>> {
        self.ids
            .iter()
            .map(|id| WorkUnit {
                key: id.clone(),
                url: format!("{}/queryExpertById?expertId={}", self.base_url, id),
            })
            .collect()
    }

    fn decoders(&self) -> &[Decoder] {
        &EXPERT_DECODERS
    }

    fn extract(&self, id: &String, body: &str) -> ETLResult<Page<ExpertRecord>> {
        let response: ExpertDetailResponse = serde_json::from_str(body)?;
        let detail = response.data.unwrap_or_default();

        // 没有大乐透一等奖字段的专家不计入
        let first_prizes = match &detail.dlt_one {
            Some(value) if !value.is_blank() => value.as_u32(),
            _ => {
                tracing::debug!("Expert {} has no first-prize field, skipped", id);
                return Ok(Page::more(Vec::new()));
            }
        };

        let record = ExpertRecord {
            id: id.clone(),
            nickname: detail.name.unwrap_or_default(),
            age: detail.age.as_ref().and_then(LooseValue::as_u32),
            articles: detail.articles.as_ref().and_then(LooseValue::as_u32),
            first_prizes,
            second_prizes: detail.dlt_two.as_ref().and_then(LooseValue::as_u32),
            third_prizes: detail.dlt_three.as_ref().and_then(LooseValue::as_u32),
        };

        Ok(Page::more(vec![record]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filters_by_skill() {
        let source = ExpertListSource::new(ExpertListConfig::default());
        let body = r#"{"code":0,"data":[
            {"expertId":101,"skill":"双色球, 大乐透"},
            {"expertId":"102","skill":"福彩3D"},
            {"expertId":103,"skill":"大乐透"},
            {"expertId":104}
        ]}"#;
        let page = source.extract(&1, body).unwrap();
        assert_eq!(page.records, vec!["101".to_string(), "103".to_string()]);
        assert!(!page.exhausted);
        assert_eq!(source.limit(), Some(25));
    }

    #[test]
    fn test_empty_list_exhausts_source() {
        let source = ExpertListSource::new(ExpertListConfig::default());
        let page = source.extract(&9, r#"{"data":[]}"#).unwrap();
        assert!(page.exhausted);
    }

    #[test]
    fn test_detail_record() {
        let source = ExpertDetailSource::new("http://localhost/expert", vec!["101".to_string()]);
        let body = r#"{"data":{"name":"老王","age":"8","articles":120,"dltOne":2,"dltTwo":"5","dltThree":""}}"#;
        let page = source.extract(&"101".to_string(), body).unwrap();
        assert_eq!(
            page.records,
            vec![ExpertRecord {
                id: "101".to_string(),
                nickname: "老王".to_string(),
                age: Some(8),
                articles: Some(120),
                first_prizes: Some(2),
                second_prizes: Some(5),
                third_prizes: None,
            }]
        );
    }

    #[test]
    fn test_detail_without_first_prize_is_skipped() {
        let source = ExpertDetailSource::new("http://localhost/expert", vec![]);
        let blank = r#"{"data":{"name":"a","dltOne":""}}"#;
        let null = r#"{"data":{"name":"b","dltOne":null}}"#;
        let absent = r#"{"data":{"name":"c"}}"#;
        for body in [blank, null, absent] {
            let page = source.extract(&"1".to_string(), body).unwrap();
            assert!(page.records.is_empty());
        }
    }

    #[test]
    fn test_detail_units() {
        let source =
            ExpertDetailSource::new("http://localhost/expert", vec!["7".to_string(), "9".to_string()]);
        let units = source.units();
        assert_eq!(units[1].url, "http://localhost/expert/queryExpertById?expertId=9");
        assert_eq!(source.decoders(), &[Decoder::Utf8, Decoder::Brotli]);
    }
}

//! DBLP 会议论文爬虫（XML 目录页）

use super::{Page, Source, WorkUnit};
use crate::records::PaperRecord;
use crate::types::{ETLError, ETLResult};
use roxmltree::{Document, Node, ParsingOptions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 会议显示名与 DBLP 代码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub name: String,
    pub code: String,
}

impl Conference {
    pub fn new(name: &str, code: &str) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DblpConfig {
    pub base_url: String,
    pub conferences: Vec<Conference>,
    pub first_year: i32,
    pub last_year: i32,
}

impl Default for DblpConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dblp.org/db/conf".to_string(),
            conferences: vec![
                Conference::new("AAAI", "aaai"),
                Conference::new("CVPR", "cvpr"),
                Conference::new("NeurIPS", "nips"),
                Conference::new("ICML", "icml"),
                Conference::new("IJCAI", "ijcai"),
                Conference::new("KDD", "kdd"),
            ],
            first_year: 2020,
            last_year: 2025,
        }
    }
}

/// 某会议某一年的论文集
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProceedingsKey {
    pub conference: String,
    pub year: i32,
}

impl fmt::Display for ProceedingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.conference, self.year)
    }
}

pub struct DblpSource {
    config: DblpConfig,
}

impl DblpSource {
    pub fn new(config: DblpConfig) -> Self {
        Self { config }
    }
}

impl Source for DblpSource {
    type Key = ProceedingsKey;
    type Record = PaperRecord;

    fn name(&self) -> &str {
        "dblp"
    }

    fn units(&self) -> Vec<WorkUnit<ProceedingsKey>> {
        let mut units = Vec::new();
        for conference in &self.config.conferences {
            for year in self.config.first_year..=self.config.last_year {
                units.push(WorkUnit {
                    key: ProceedingsKey {
                        conference: conference.name.clone(),
                        year,
                    },
                    url: format!(
                        "{}/{code}/{code}{year}.xml",
                        self.config.base_url,
                        code = conference.code,
                        year = year
                    ),
                });
            }
        }
        units
    }

    fn extract(&self, key: &ProceedingsKey, body: &str) -> ETLResult<Page<PaperRecord>> {
        parse_proceedings(body, key).map(Page::more)
    }
}

/// 解析论文集 XML，抽取所有 `article` / `inproceedings` 节点；没有标题的条目丢弃
pub fn parse_proceedings(xml: &str, key: &ProceedingsKey) -> ETLResult<Vec<PaperRecord>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document =
        Document::parse_with_options(xml, options).map_err(|e| ETLError::Decode(e.to_string()))?;

    let papers = document
        .descendants()
        .filter(|node| node.has_tag_name("article") || node.has_tag_name("inproceedings"))
        .filter_map(|node| {
            let title = child(node, "title").map(node_text).unwrap_or_default();
            if title.is_empty() {
                tracing::debug!("Dropping untitled entry in {}", key);
                return None;
            }

            let authors: Vec<String> = node
                .children()
                .filter(|c| c.has_tag_name("author"))
                .map(node_text)
                .collect();

            Some(PaperRecord {
                title,
                authors: authors.join(", "),
                year: key.year,
                conference: key.conference.clone(),
                url: child(node, "ee").map(node_text).unwrap_or_default(),
            })
        })
        .collect();

    Ok(papers)
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(tag))
}

/// 节点下全部文本（标题中可能含 `<i>`、`<sub>` 等子元素）
fn node_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bht key="db/conf/kdd/kdd2023.bht" title="KDD 2023">
  <dblpcites>
    <r><inproceedings key="conf/kdd/A23">
      <author>Alice Zhang</author>
      <author>Bob Li</author>
      <title>Graph <i>Learning</i> at Scale.</title>
      <ee>https://doi.org/10.1145/1</ee>
    </inproceedings></r>
    <r><inproceedings key="conf/kdd/B23">
      <author>Carol Wu</author>
      <title>Streaming Anomaly Detection.</title>
    </inproceedings></r>
    <r><inproceedings key="conf/kdd/C23">
      <author>Nobody</author>
    </inproceedings></r>
  </dblpcites>
</bht>"#;

    fn key() -> ProceedingsKey {
        ProceedingsKey {
            conference: "KDD".to_string(),
            year: 2023,
        }
    }

    #[test]
    fn test_parse_proceedings() {
        let papers = parse_proceedings(XML, &key()).unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "Graph Learning at Scale.");
        assert_eq!(papers[0].authors, "Alice Zhang, Bob Li");
        assert_eq!(papers[0].url, "https://doi.org/10.1145/1");
        assert_eq!(papers[0].conference, "KDD");
        assert_eq!(papers[0].year, 2023);
        assert_eq!(papers[1].url, "");
    }

    #[test]
    fn test_malformed_xml_is_decode_error() {
        let err = parse_proceedings("<bht><r>", &key()).unwrap_err();
        assert!(matches!(err, ETLError::Decode(_)));
    }

    #[test]
    fn test_units_cover_every_conference_year() {
        let source = DblpSource::new(DblpConfig {
            base_url: "http://localhost/db/conf".to_string(),
            conferences: vec![Conference::new("NeurIPS", "nips")],
            first_year: 2022,
            last_year: 2023,
        });
        let units = source.units();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].url, "http://localhost/db/conf/nips/nips2022.xml");
        assert_eq!(units[1].key.to_string(), "NeurIPS 2023");
    }
}

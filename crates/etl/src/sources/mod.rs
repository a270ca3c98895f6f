//! 数据源模块：每个数据集的工作单元划分与文档抽取

pub mod dblp;
pub mod expert;
pub mod hurun;
pub mod lottery;
pub mod weather;

use crate::fetch::Decoder;
use crate::types::{ETLError, ETLResult};
use serde::Deserialize;
use std::fmt::Display;

/// 一个工作单元：一个月、一页或一个实体 id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit<K> {
    pub key: K,
    pub url: String,
}

/// 单个工作单元抽取出的记录
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    /// 数据源已到末尾，后续单元无需再抓
    pub exhausted: bool,
}

impl<R> Page<R> {
    pub fn more(records: Vec<R>) -> Self {
        Self { records, exhausted: false }
    }

    pub fn last(records: Vec<R>) -> Self {
        Self { records, exhausted: true }
    }
}

pub const DEFAULT_DECODERS: [Decoder; 3] = [Decoder::Utf8, Decoder::Brotli, Decoder::Gzip];

/// 数据源接口
pub trait Source: Send + Sync {
    /// 工作单元标识，用于进度日志
    type Key: Display + Send + Sync;
    type Record: Send;

    /// 数据源名称
    fn name(&self) -> &str;

    /// 按抓取顺序排列的全部工作单元（分页数据源给出上限页数）
    fn units(&self) -> Vec<WorkUnit<Self::Key>>;

    /// 响应体解码策略
    fn decoders(&self) -> &[Decoder] {
        &DEFAULT_DECODERS
    }

    /// 从一个已解码文档中抽取记录
    fn extract(&self, key: &Self::Key, body: &str) -> ETLResult<Page<Self::Record>>;

    /// 累计记录数上限，达到后停止抓取
    fn limit(&self) -> Option<usize> {
        None
    }
}

/// 兼容数字与字符串两种写法的 JSON 标量
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl LooseValue {
    pub fn as_text(&self) -> String {
        match self {
            LooseValue::Int(v) => v.to_string(),
            LooseValue::Float(v) => v.to_string(),
            LooseValue::Bool(v) => v.to_string(),
            LooseValue::Text(v) => v.trim().to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LooseValue::Int(v) => Some(*v as f64),
            LooseValue::Float(v) => Some(*v),
            LooseValue::Bool(_) => None,
            LooseValue::Text(v) => v.trim().replace(',', "").parse().ok(),
        }
    }

    /// 非负整数；带小数或负数时视为缺失
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            LooseValue::Int(v) => u32::try_from(*v).ok(),
            LooseValue::Float(v) if v.fract() == 0.0 && *v >= 0.0 && *v <= u32::MAX as f64 => {
                Some(*v as u32)
            }
            LooseValue::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, LooseValue::Text(v) if v.trim().is_empty())
    }
}

pub(crate) fn selector(css: &str) -> ETLResult<scraper::Selector> {
    scraper::Selector::parse(css)
        .map_err(|e| ETLError::Config(format!("无效的选择器 {}: {:?}", css, e)))
}

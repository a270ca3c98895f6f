//! 核心类型定义

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type ETLResult<T> = Result<T, ETLError>;

#[derive(Debug, Error)]
pub enum ETLError {
    #[error("HTTP 请求失败: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP 状态码异常: {status} ({url})")]
    HttpStatus { status: u16, url: String },

    #[error("响应解码失败: {0}")]
    Decode(String),

    #[error("页面缺少预期元素: {0}")]
    MissingElement(String),

    #[error("字段错误: {0}")]
    Field(String),

    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("表格读写失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("未获取到任何数据: {0}")]
    NoData(String),

    #[error("无效的配置: {0}")]
    Config(String),
}

/// 错误分类，调用方据此决定跳过、回退解码还是终止
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Decode,
    Field,
    Storage,
    Empty,
    Config,
}

impl ETLError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ETLError::Transport(_) | ETLError::HttpStatus { .. } => ErrorKind::Transport,
            ETLError::Decode(_) | ETLError::Json(_) => ErrorKind::Decode,
            ETLError::MissingElement(_) | ETLError::Field(_) => ErrorKind::Field,
            ETLError::Csv(_) | ETLError::Io(_) => ErrorKind::Storage,
            ETLError::NoData(_) => ErrorKind::Empty,
            ETLError::Config(_) => ErrorKind::Config,
        }
    }
}

/// 构造固定日期，只用于 `const` 项，非法日期在编译期报错
pub(crate) const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid calendar date"),
    }
}

/// 年月（按月抓取的工作单元）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub const fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    /// 形如 `202201` 的月份代码
    pub fn code(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    pub fn next(&self) -> Self {
        if self.month >= 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// 从 self 到 end（含）的所有月份；end 早于 self 时为空
    pub fn through(self, end: YearMonth) -> Vec<YearMonth> {
        let mut months = Vec::new();
        let mut current = self;
        while current <= end {
            months.push(current);
            current = current.next();
        }
        months
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date) == *self
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// 抓取配置（请求头、超时、请求间隔）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// 固定请求头
    pub headers: Vec<(String, String)>,
    /// 请求超时（秒），超时的单元直接跳过
    pub timeout_secs: u64,
    /// 相邻两次请求之间的最小间隔（毫秒），0 表示不限速
    pub delay_ms: u64,
}

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

impl FetchConfig {
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_delay_ms(mut self, millis: u64) -> Self {
        self.delay_ms = millis;
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            headers: vec![("User-Agent".to_string(), DESKTOP_USER_AGENT.to_string())],
            timeout_secs: 10,
            delay_ms: 1000,
        }
    }
}

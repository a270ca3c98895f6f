//! # ETL - Extract, Transform, Load
//!
//! 从公开网页与 JSON 接口抓取表格型数据集
//!
//! ## 功能
//!
//! - 按工作单元（月份、页码、实体 id）顺序抓取，固定请求间隔
//! - 多种解码策略依次尝试（UTF-8、brotli、gzip）
//! - HTML / XML / JSONP 抽取为定长记录
//! - 类型转换、分组列派生与剔除规则
//! - 表格落盘与读回

pub mod types;
pub mod records;
pub mod fetch;
pub mod sources;
pub mod normalize;
pub mod storage;
pub mod pipeline;

pub use fetch::{Decoder, Fetcher};
pub use pipeline::{Collected, Pipeline, RunSummary};
pub use records::{ExpertRecord, LotteryDrawRecord, PaperRecord, RichPersonRecord, WeatherDayRecord};
pub use sources::{Page, Source, WorkUnit};
pub use types::{ETLError, ETLResult, ErrorKind, FetchConfig, YearMonth};

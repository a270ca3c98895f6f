//! 各数据集的定长记录类型
//!
//! 字段顺序即落盘表格的列顺序，列名由 serde rename 固定。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 单日天气
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDayRecord {
    #[serde(rename = "日期")]
    pub date: NaiveDate,
    #[serde(rename = "白天天气")]
    pub day_condition: String,
    #[serde(rename = "夜晚天气")]
    pub night_condition: String,
    #[serde(rename = "最高温度")]
    pub high_temp: Option<f64>,
    #[serde(rename = "最低温度")]
    pub low_temp: Option<f64>,
    #[serde(rename = "白天风力")]
    pub day_wind: String,
    #[serde(rename = "夜晚风力")]
    pub night_wind: String,
    #[serde(rename = "年")]
    pub year: i32,
    #[serde(rename = "月")]
    pub month: u32,
}

/// 会议论文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    /// 作者列表，以 ", " 连接
    pub authors: String,
    pub year: i32,
    pub conference: String,
    pub url: String,
}

/// 大乐透单期开奖
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotteryDrawRecord {
    #[serde(rename = "开奖日期")]
    pub draw_date: NaiveDate,
    #[serde(rename = "星期")]
    pub weekday: String,
    /// 前区号码，两位补零、空格分隔
    #[serde(rename = "前区号码")]
    pub front_numbers: String,
    #[serde(rename = "后区号码")]
    pub back_numbers: String,
    #[serde(rename = "总销售额")]
    pub total_sales: Option<f64>,
}

/// 彩票论坛专家
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertRecord {
    #[serde(rename = "专家Id")]
    pub id: String,
    #[serde(rename = "昵称")]
    pub nickname: String,
    #[serde(rename = "彩龄")]
    pub age: Option<u32>,
    #[serde(rename = "发文量")]
    pub articles: Option<u32>,
    #[serde(rename = "大乐透一等奖")]
    pub first_prizes: Option<u32>,
    #[serde(rename = "大乐透二等奖")]
    pub second_prizes: Option<u32>,
    #[serde(rename = "大乐透三等奖")]
    pub third_prizes: Option<u32>,
}

/// 富豪榜条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichPersonRecord {
    #[serde(rename = "姓名")]
    pub name: String,
    /// 财富（亿元），缺失时为 0
    #[serde(rename = "财富(亿)")]
    pub wealth: f64,
    #[serde(rename = "性别")]
    pub gender: String,
    #[serde(rename = "年龄")]
    pub age: Option<u32>,
    #[serde(rename = "出生地")]
    pub birthplace: String,
    #[serde(rename = "公司")]
    pub company: String,
    #[serde(rename = "行业")]
    pub industry: String,
    #[serde(rename = "总部")]
    pub headquarters: String,
    #[serde(rename = "排名")]
    pub rank: u32,
}

/// 未知取值的占位
pub const UNKNOWN: &str = "未知";

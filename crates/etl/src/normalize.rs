//! 数据规范化：类型转换、派生分组列与剔除规则

use crate::records::{LotteryDrawRecord, WeatherDayRecord};
use crate::sources::lottery::{LotteryConfig, RawDraw};
use crate::sources::weather::RawWeatherRow;
use crate::types::YearMonth;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// 按分隔符拆成两段。恰好一个分隔符时返回去空白的两半，否则第二段为空
pub fn split_pair(raw: &str, delimiter: char) -> (String, String) {
    let mut parts = raw.split(delimiter);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(second), None) => (first.trim().to_string(), second.trim().to_string()),
        _ => (raw.trim().to_string(), String::new()),
    }
}

/// `"5℃"`、`" -2 "` → 数值；无法解析时为 None
pub fn parse_temperature(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '℃' && !c.is_whitespace())
        .collect();
    cleaned.parse().ok()
}

/// 带千分位的金额
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse().ok()
}

/// `2022年1月1日`、`2022-01-01` 等写法
pub fn parse_cn_date(raw: &str) -> Option<NaiveDate> {
    let normalized: String = raw
        .trim()
        .chars()
        .filter_map(|c| match c {
            '年' | '月' => Some('-'),
            '日' | '.' => None,
            c if c.is_whitespace() => None,
            c => Some(c),
        })
        .collect();
    NaiveDate::parse_from_str(normalized.trim_matches('-'), "%Y-%m-%d").ok()
}

/// 从风力描述中取出等级，如 `东北风 3-4级` → `3-4级`
pub fn extract_wind_level(raw: &str) -> Option<String> {
    static WIND: OnceLock<Regex> = OnceLock::new();
    let pattern = WIND.get_or_init(|| Regex::new(r"\d+\s*[-~]\s*\d+级|\d+级").expect("static regex"));

    pattern
        .find(raw)
        .map(|m| m.as_str().chars().filter(|c| !c.is_whitespace()).collect())
}

/// 空白分隔的号码串，逐个补零到两位
pub fn parse_number_list(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(|n| format!("{:0>2}", n)).collect()
}

pub fn zero_pad_numbers(raw: &str) -> String {
    parse_number_list(raw).join(" ")
}

const TITLE_STOP_WORDS: &[&str] = &[
    "for", "and", "with", "using", "based", "via", "towards", "toward", "learning", "approach",
    "method", "network", "deep", "model", "models", "neural", "new",
];

/// 常见英文虚词，统计关键词时一并剔除
const ENGLISH_STOP_WORDS: &[&str] = &[
    "about", "above", "across", "after", "again", "against", "all", "also", "among", "any",
    "are", "around", "back", "been", "before", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "can", "cannot", "could", "does", "down", "due", "during", "each",
    "either", "else", "even", "every", "few", "from", "further", "get", "had", "has", "have",
    "her", "here", "his", "how", "into", "its", "itself", "last", "less", "many", "more", "most",
    "much", "must", "neither", "next", "nor", "not", "off", "once", "one", "only", "onto",
    "other", "our", "out", "over", "own", "per", "rather", "same", "should", "since", "some",
    "such", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "those", "though", "through", "thus", "too", "two", "under", "until", "upon", "very", "was",
    "well", "were", "what", "when", "where", "whether", "which", "while", "who", "whole", "why",
    "will", "within", "without", "would", "yet", "you", "your",
];

/// 标题分词：只保留字母，转小写，去掉停用词与不超过两个字母的词
pub fn clean_title(title: &str) -> Vec<String> {
    let letters: String = title
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    letters
        .split_whitespace()
        .filter(|word| word.len() > 2)
        .filter(|word| !TITLE_STOP_WORDS.contains(word) && !ENGLISH_STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// 年龄段，左闭右开：[0,30) [30,40) [40,50) [50,60) [60,70) [70,100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeBucket {
    Under30,
    Thirties,
    Forties,
    Fifties,
    Sixties,
    Over70,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 6] = [
        AgeBucket::Under30,
        AgeBucket::Thirties,
        AgeBucket::Forties,
        AgeBucket::Fifties,
        AgeBucket::Sixties,
        AgeBucket::Over70,
    ];

    /// 100 岁及以上不落入任何区间
    pub fn from_age(age: u32) -> Option<Self> {
        match age {
            0..=29 => Some(AgeBucket::Under30),
            30..=39 => Some(AgeBucket::Thirties),
            40..=49 => Some(AgeBucket::Forties),
            50..=59 => Some(AgeBucket::Fifties),
            60..=69 => Some(AgeBucket::Sixties),
            70..=99 => Some(AgeBucket::Over70),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::Under30 => "30岁以下",
            AgeBucket::Thirties => "31-40岁",
            AgeBucket::Forties => "41-50岁",
            AgeBucket::Fifties => "51-60岁",
            AgeBucket::Sixties => "61-70岁",
            AgeBucket::Over70 => "70岁以上",
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 大乐透开奖日
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DrawDay {
    Mon,
    Wed,
    Sat,
}

impl DrawDay {
    pub const ALL: [DrawDay; 3] = [DrawDay::Mon, DrawDay::Wed, DrawDay::Sat];

    /// 接受 `星期一`、`周一`、`一` 等写法
    pub fn from_week(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let day = raw
            .strip_prefix("星期")
            .or_else(|| raw.strip_prefix("周"))
            .unwrap_or(raw);
        match day {
            "一" => Some(DrawDay::Mon),
            "三" => Some(DrawDay::Wed),
            "六" => Some(DrawDay::Sat),
            _ => None,
        }
    }

    pub fn from_date(date: NaiveDate) -> Option<Self> {
        match date.weekday() {
            Weekday::Mon => Some(DrawDay::Mon),
            Weekday::Wed => Some(DrawDay::Wed),
            Weekday::Sat => Some(DrawDay::Sat),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DrawDay::Mon => "Mon",
            DrawDay::Wed => "Wed",
            DrawDay::Sat => "Sat",
        }
    }
}

impl fmt::Display for DrawDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// `after` 之后（不含）的 n 个开奖日
pub fn next_draw_dates(after: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut current = after;
    while dates.len() < n {
        current += Duration::days(1);
        if DrawDay::from_date(current).is_some() {
            dates.push(current);
        }
    }
    dates
}

/// 天气原始行 → 单日记录。
///
/// 日期无法解析或不在 `[begin, end]` 月份范围内的行丢弃，同一天只保留第一行。
pub fn weather(rows: &[RawWeatherRow], begin: YearMonth, end: YearMonth) -> Vec<WeatherDayRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(date) = parse_cn_date(&row.date) else {
            tracing::debug!("Dropping weather row with unparseable date {:?}", row.date);
            continue;
        };
        let month = YearMonth::from_date(date);
        if month < begin || month > end {
            tracing::debug!("Dropping weather row outside range: {}", date);
            continue;
        }
        if !seen.insert(date) {
            continue;
        }

        let (day_condition, night_condition) = split_pair(&row.weather, '/');
        let (high, low) = split_pair(&row.temperature, '/');
        let (day_wind, night_wind) = split_pair(&row.wind, '/');

        records.push(WeatherDayRecord {
            date,
            day_condition,
            night_condition,
            high_temp: parse_temperature(&high),
            low_temp: parse_temperature(&low),
            day_wind,
            night_wind,
            year: date.year(),
            month: date.month(),
        });
    }

    records
}

/// 开奖原始记录 → 开奖记录，只保留 `[begin, end]` 内且不在剔除名单里的期次
pub fn lottery(raws: &[RawDraw], config: &LotteryConfig) -> Vec<LotteryDrawRecord> {
    raws.iter()
        .filter_map(|raw| {
            let Ok(date) = NaiveDate::parse_from_str(raw.open_time.trim(), "%Y-%m-%d") else {
                tracing::debug!("Dropping draw with unparseable date {:?}", raw.open_time);
                return None;
            };
            if date < config.begin || date > config.end {
                return None;
            }
            if config.excluded_dates.contains(&date) {
                tracing::info!("Excluding draw on {}", date);
                return None;
            }

            Some(LotteryDrawRecord {
                draw_date: date,
                weekday: raw.week.trim().to_string(),
                front_numbers: zero_pad_numbers(&raw.front),
                back_numbers: zero_pad_numbers(&raw.back),
                total_sales: raw.sale_money.as_deref().and_then(parse_amount),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair(" 晴 / 多云 ", '/'), ("晴".to_string(), "多云".to_string()));
        assert_eq!(split_pair("晴", '/'), ("晴".to_string(), String::new()));
        assert_eq!(split_pair("a/b/c", '/'), ("a/b/c".to_string(), String::new()));
        assert_eq!(split_pair("", '/'), (String::new(), String::new()));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_temperature("-2℃"), Some(-2.0));
        assert_eq!(parse_temperature("℃"), None);
        assert_eq!(parse_amount("295,123,456.5"), Some(295_123_456.5));
        assert_eq!(parse_cn_date("2022年1月1日"), Some(ymd(2022, 1, 1)));
        assert_eq!(parse_cn_date("2025-02-08"), Some(ymd(2025, 2, 8)));
        assert_eq!(parse_cn_date("昨天"), None);
        assert_eq!(extract_wind_level("东北风 3 - 4级"), Some("3-4级".to_string()));
        assert_eq!(extract_wind_level("微风<3级"), Some("3级".to_string()));
        assert_eq!(extract_wind_level("微风"), None);
        assert_eq!(zero_pad_numbers(" 1 12  5 "), "01 12 05");
    }

    #[test]
    fn test_clean_title() {
        let words = clean_title("Towards Robust Graph-Based Learning for 3D Point Clouds via GNNs");
        assert_eq!(words, vec!["robust", "graphbased", "point", "clouds", "gnns"]);
    }

    #[test]
    fn test_age_bucket_edges() {
        assert_eq!(AgeBucket::from_age(29), Some(AgeBucket::Under30));
        assert_eq!(AgeBucket::from_age(30), Some(AgeBucket::Thirties));
        assert_eq!(AgeBucket::from_age(70), Some(AgeBucket::Over70));
        assert_eq!(AgeBucket::from_age(100), None);
        assert_eq!(AgeBucket::Thirties.label(), "31-40岁");
    }

    #[test]
    fn test_draw_day() {
        assert_eq!(DrawDay::from_week("星期三"), Some(DrawDay::Wed));
        assert_eq!(DrawDay::from_week("六"), Some(DrawDay::Sat));
        assert_eq!(DrawDay::from_week("星期二"), None);
        // 2025-06-30 是周一
        assert_eq!(
            next_draw_dates(ymd(2025, 6, 30), 3),
            vec![ymd(2025, 7, 2), ymd(2025, 7, 5), ymd(2025, 7, 7)]
        );
    }

    #[test]
    fn test_weather_row_is_split_into_day_and_night() {
        let rows = vec![RawWeatherRow {
            date: "2022年1月1日".to_string(),
            weather: "晴/多云".to_string(),
            temperature: "5℃/-2℃".to_string(),
            wind: "3级/2级".to_string(),
            month: YearMonth::new(2022, 1),
        }];
        let records = weather(&rows, YearMonth::new(2022, 1), YearMonth::new(2024, 12));

        assert_eq!(records.len(), 1);
        let day = &records[0];
        assert_eq!(day.date, ymd(2022, 1, 1));
        assert_eq!(day.day_condition, "晴");
        assert_eq!(day.night_condition, "多云");
        assert_eq!(day.high_temp, Some(5.0));
        assert_eq!(day.low_temp, Some(-2.0));
        assert_eq!(day.day_wind, "3级");
        assert_eq!(day.night_wind, "2级");
        assert_eq!((day.year, day.month), (2022, 1));
    }

    #[test]
    fn test_weather_drops_out_of_range_and_duplicates() {
        let row = |date: &str| RawWeatherRow {
            date: date.to_string(),
            weather: "阴".to_string(),
            temperature: "1℃/-3℃".to_string(),
            wind: "2级".to_string(),
            month: YearMonth::new(2022, 1),
        };
        let rows = vec![row("2021年12月31日"), row("2022年1月2日"), row("2022年1月2日"), row("乱码")];
        let records = weather(&rows, YearMonth::new(2022, 1), YearMonth::new(2022, 1));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].night_condition, "");
        assert_eq!(records[0].night_wind, "");
    }

    fn raw_draw(date: &str, week: &str) -> RawDraw {
        RawDraw {
            open_time: date.to_string(),
            week: week.to_string(),
            front: "1 5 12 23 35".to_string(),
            back: "3 11".to_string(),
            sale_money: Some("301,234,567".to_string()),
        }
    }

    #[test]
    fn test_lottery_excludes_anomalous_date() {
        let raws = vec![
            raw_draw("2025-02-10", "一"),
            raw_draw("2025-02-08", "六"),
            raw_draw("2025-02-05", "三"),
        ];
        let records = lottery(&raws, &LotteryConfig::default());

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.draw_date != ymd(2025, 2, 8)));
        assert_eq!(records[0].front_numbers, "01 05 12 23 35");
        assert_eq!(records[0].back_numbers, "03 11");
        assert_eq!(records[0].total_sales, Some(301_234_567.0));
    }

    #[test]
    fn test_lottery_keeps_only_configured_range() {
        let config = LotteryConfig::default();
        let raws = vec![raw_draw("2024-10-28", "一"), raw_draw("2025-07-02", "三"), raw_draw("2025-07-01", "二")];
        let records = lottery(&raws, &config);
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| r.draw_date >= config.begin && r.draw_date <= config.end));
    }
}

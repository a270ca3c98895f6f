//! 表格落盘与读取（CSV）
//!
//! 列名与列顺序由记录类型的字段决定，同样的输入总是写出相同的字节。

use crate::types::{ETLError, ETLResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

fn ensure_parent(path: &Path) -> ETLResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// 写出记录表：表头一行 + 每条记录一行，父目录不存在时自动创建
pub fn write_table<R: Serialize>(path: impl AsRef<Path>, records: &[R]) -> ETLResult<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

/// 读回记录表
pub fn read_table<R: DeserializeOwned>(path: impl AsRef<Path>) -> ETLResult<Vec<R>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<R>, csv::Error>>()?;

    tracing::info!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// 表头（列名集合）
pub fn table_headers(path: impl AsRef<Path>) -> ETLResult<Vec<String>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

/// 写出分析结果表；每行的列数必须与表头一致
pub fn write_rows(
    path: impl AsRef<Path>,
    headers: &[String],
    rows: &[Vec<String>],
) -> ETLResult<()> {
    let path = path.as_ref();
    if let Some(bad) = rows.iter().position(|row| row.len() != headers.len()) {
        return Err(ETLError::Field(format!(
            "{} 第 {} 行有 {} 列，表头有 {} 列",
            path.display(),
            bad + 1,
            rows[bad].len(),
            headers.len()
        )));
    }
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    tracing::debug!("Wrote result table {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{LotteryDrawRecord, WeatherDayRecord};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn weather_rows() -> Vec<WeatherDayRecord> {
        vec![
            WeatherDayRecord {
                date: ymd(2022, 1, 1),
                day_condition: "晴".to_string(),
                night_condition: "多云".to_string(),
                high_temp: Some(5.0),
                low_temp: Some(-2.0),
                day_wind: "3级".to_string(),
                night_wind: "2级".to_string(),
                year: 2022,
                month: 1,
            },
            WeatherDayRecord {
                date: ymd(2022, 1, 2),
                day_condition: "阴".to_string(),
                night_condition: String::new(),
                high_temp: None,
                low_temp: Some(-4.5),
                day_wind: "4-5级".to_string(),
                night_wind: String::new(),
                year: 2022,
                month: 1,
            },
        ]
    }

    #[test]
    fn test_round_trip_keeps_rows_and_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("weather.csv");
        let rows = weather_rows();

        write_table(&path, &rows).unwrap();
        let loaded: Vec<WeatherDayRecord> = read_table(&path).unwrap();

        assert_eq!(loaded, rows);
        assert_eq!(
            table_headers(&path).unwrap(),
            vec!["日期", "白天天气", "夜晚天气", "最高温度", "最低温度", "白天风力", "夜晚风力", "年", "月"]
        );
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.csv");
        let second = dir.path().join("b.csv");
        let draws = vec![LotteryDrawRecord {
            draw_date: ymd(2025, 6, 30),
            weekday: "一".to_string(),
            front_numbers: "01 12 23 30 35".to_string(),
            back_numbers: "02 11".to_string(),
            total_sales: Some(295_123_456.0),
        }];

        write_table(&first, &draws).unwrap();
        write_table(&second, &draws).unwrap();
        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_write_rows_rejects_ragged_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("result.csv");
        let headers = vec!["月".to_string(), "平均最高温度".to_string()];

        write_rows(&path, &headers, &[vec!["1".to_string(), "3.5".to_string()]]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "月,平均最高温度\n1,3.5\n");

        let err = write_rows(&path, &headers, &[vec!["1".to_string()]]).unwrap_err();
        assert!(matches!(err, ETLError::Field(_)));
    }
}

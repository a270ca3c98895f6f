//! 分析结果表
//!
//! 每张表一个 CSV 文件；需要画图的表另由 `chart` 模块绘制 PNG。

use etl::storage::write_rows;
use etl::ETLResult;
use ndarray::Array2;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// 一张结果表
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    /// 文件名（不含扩展名）
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new<S: AsRef<str>>(name: &str, headers: &[S]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn with_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 按列名取某一列
    pub fn column(&self, header: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h == header)?;
        Some(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }

    pub fn write_to(&self, dir: &Path) -> ETLResult<PathBuf> {
        let path = dir.join(self.file_name());
        write_rows(&path, &self.headers, &self.rows)?;
        Ok(path)
    }
}

/// 写出全部结果表，返回写出的文件路径
pub fn write_all(dir: &Path, tables: &[ReportTable]) -> ETLResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let paths = tables
        .iter()
        .map(|table| table.write_to(dir))
        .collect::<ETLResult<Vec<_>>>()?;
    tracing::info!("Wrote {} result tables to {}", paths.len(), dir.display());
    Ok(paths)
}

/// 浮点数输出：最多四位小数，去掉末尾的 0；非有限值写作 NaN
pub fn num(value: f64) -> String {
    if !value.is_finite() {
        return "NaN".to_string();
    }
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

pub fn opt_num(value: Option<f64>) -> String {
    value.map(num).unwrap_or_default()
}

/// 计数并按次数降序排列，次数相同时保持首次出现的顺序
pub fn value_counts<K, I>(values: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut order: Vec<K> = Vec::new();
    let mut counts: HashMap<K, usize> = HashMap::new();
    for value in values {
        let count = counts.entry(value.clone()).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    let mut result: Vec<(K, usize)> = order
        .into_iter()
        .map(|key| {
            let count = counts.get(&key).copied().unwrap_or(0);
            (key, count)
        })
        .collect();
    result.sort_by(|a, b| b.1.cmp(&a.1));
    result
}

/// 带行列标签的矩阵表，首列为行标签
pub fn matrix_table<R: AsRef<str>, C: AsRef<str>>(
    name: &str,
    corner: &str,
    row_labels: &[R],
    col_labels: &[C],
    matrix: &impl Matrix,
) -> ReportTable {
    let mut headers = vec![corner.to_string()];
    headers.extend(col_labels.iter().map(|c| c.as_ref().to_string()));

    let mut table = ReportTable::new(name, &headers);
    for (i, label) in row_labels.iter().enumerate() {
        let mut row = vec![label.as_ref().to_string()];
        row.extend((0..col_labels.len()).map(|j| num(matrix.at(i, j))));
        table.push_row(row);
    }
    table
}

/// 能按下标取值的二维数据
pub trait Matrix {
    fn at(&self, row: usize, col: usize) -> f64;
}

impl Matrix for Array2<f64> {
    fn at(&self, row: usize, col: usize) -> f64 {
        self[[row, col]]
    }
}

impl Matrix for Vec<Vec<f64>> {
    fn at(&self, row: usize, col: usize) -> f64 {
        self[row][col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(3.0), "3");
        assert_eq!(num(2.125), "2.125");
        assert_eq!(num(1.0 / 3.0), "0.3333");
        assert_eq!(num(-0.00001), "0");
        assert_eq!(num(f64::NAN), "NaN");
        assert_eq!(opt_num(None), "");
    }

    #[test]
    fn test_value_counts_orders_by_count_then_first_seen() {
        let counts = value_counts(["制造业", "金融", "地产", "金融", "地产", "医药"]);
        assert_eq!(
            counts,
            vec![("金融", 2), ("地产", 2), ("制造业", 1), ("医药", 1)]
        );
    }

    #[test]
    fn test_matrix_table_and_write() {
        let matrix = vec![vec![1.0, 0.25], vec![0.25, 1.0]];
        let table = matrix_table("p", "", &["Mon", "Wed"], &["Mon", "Wed"], &matrix);
        assert_eq!(table.headers, vec!["", "Mon", "Wed"]);
        assert_eq!(table.rows[0], vec!["Mon", "1", "0.25"]);

        let dir = tempdir().unwrap();
        let paths = write_all(&dir.path().join("out"), &[table]).unwrap();
        let text = std::fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(text, ",Mon,Wed\nMon,1,0.25\nWed,0.25,1\n");
    }
}

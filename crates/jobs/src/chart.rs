//! 结果表的 PNG 图表
//!
//! 每张图取一张结果表里的数值列，用 plotters 的位图后端绘制，
//! 与对应的 CSV 写在同一目录下。

use crate::report::ReportTable;
use anyhow::{anyhow, Context};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

const SIZE: (u32, u32) = (1200, 800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    /// 分组柱状图，同一 x 上的各系列并排
    Bar,
    Scatter,
}

/// 从结果表中取系列的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// 每个数值列一条系列；`x` 为空时按行序号
    Columns {
        x: Option<&'static str>,
        y: &'static [&'static str],
    },
    /// 每一行一条系列，x 取首列之后的表头
    Rows,
}

/// 一张图的绘制计划
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSpec {
    pub table: &'static str,
    pub kind: ChartKind,
    pub layout: Layout,
}

impl ChartSpec {
    pub const fn columns(
        table: &'static str,
        kind: ChartKind,
        x: Option<&'static str>,
        y: &'static [&'static str],
    ) -> Self {
        Self {
            table,
            kind,
            layout: Layout::Columns { x, y },
        }
    }

    pub const fn rows(table: &'static str, kind: ChartKind) -> Self {
        Self {
            table,
            kind,
            layout: Layout::Rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub name: String,
    pub kind: ChartKind,
    pub series: Vec<Series>,
}

/// 无法解析或非有限的格子不参与绘图
fn cell_value(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl Chart {
    pub fn from_table(table: &ReportTable, spec: &ChartSpec) -> Option<Self> {
        let series = match spec.layout {
            Layout::Columns { x, y } => {
                let xs: Vec<Option<f64>> = match x {
                    Some(header) => table
                        .column(header)?
                        .into_iter()
                        .map(cell_value)
                        .collect(),
                    None => (0..table.rows.len()).map(|i| Some(i as f64)).collect(),
                };
                y.iter()
                    .filter_map(|header| {
                        let ys = table.column(header)?;
                        let points = xs
                            .iter()
                            .zip(ys)
                            .filter_map(|(x, y)| Some(((*x)?, cell_value(y)?)))
                            .collect();
                        Some(Series {
                            label: header.to_string(),
                            points,
                        })
                    })
                    .collect()
            }
            Layout::Rows => {
                let xs: Vec<f64> = table
                    .headers
                    .iter()
                    .skip(1)
                    .enumerate()
                    .map(|(i, h)| cell_value(h).unwrap_or(i as f64))
                    .collect();
                table
                    .rows
                    .iter()
                    .map(|row| Series {
                        label: row.first().cloned().unwrap_or_default(),
                        points: xs
                            .iter()
                            .zip(row.iter().skip(1))
                            .filter_map(|(x, cell)| Some((*x, cell_value(cell)?)))
                            .collect(),
                    })
                    .collect()
            }
        };

        Some(Self {
            name: spec.table.to_string(),
            kind: spec.kind,
            series,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}.png", self.name)
    }

    fn points(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.series.iter().flat_map(|s| s.points.iter())
    }

    /// 坐标范围，四周留 5% 空白；柱状图的 y 轴包含 0
    fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let mut points = self.points().peekable();
        points.peek()?;

        let (mut x_lo, mut x_hi, mut y_lo, mut y_hi) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for (x, y) in points {
            x_lo = x_lo.min(*x);
            x_hi = x_hi.max(*x);
            y_lo = y_lo.min(*y);
            y_hi = y_hi.max(*y);
        }
        if self.kind == ChartKind::Bar {
            x_lo -= 0.5;
            x_hi += 0.5;
            y_lo = y_lo.min(0.0);
            y_hi = y_hi.max(0.0);
        }

        let pad = |lo: f64, hi: f64| {
            let span = if hi > lo { hi - lo } else { 1.0 };
            (lo - span * 0.05, hi + span * 0.05)
        };
        Some((pad(x_lo, x_hi), pad(y_lo, y_hi)))
    }

    /// 绘制到 `dir` 下；没有可画的点时返回 `Ok(None)`
    pub fn render(&self, dir: &Path) -> anyhow::Result<Option<PathBuf>> {
        let Some(((x_lo, x_hi), (y_lo, y_hi))) = self.bounds() else {
            tracing::warn!("Chart {} has no numeric points, skipped", self.name);
            return Ok(None);
        };
        let path = dir.join(self.file_name());

        {
            let root = BitMapBackend::new(&path, SIZE).into_drawing_area();
            root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
            let mut chart = ChartBuilder::on(&root)
                .margin(30)
                .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
                .map_err(|e| anyhow!("{:?}", e))?;
            chart
                .configure_mesh()
                .light_line_style(BLACK.mix(0.05))
                .draw()
                .map_err(|e| anyhow!("{:?}", e))?;

            let groups = self.series.len().max(1) as f64;
            for (i, series) in self.series.iter().enumerate() {
                let color = Palette99::pick(i);
                let drawn = match self.kind {
                    ChartKind::Line => chart
                        .draw_series(LineSeries::new(series.points.iter().copied(), color.stroke_width(2)))
                        .map(|_| ()),
                    ChartKind::Scatter => chart
                        .draw_series(
                            series
                                .points
                                .iter()
                                .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
                        )
                        .map(|_| ()),
                    ChartKind::Bar => {
                        let width = 0.8 / groups;
                        chart
                            .draw_series(series.points.iter().map(|&(x, y)| {
                                let left = x - 0.4 + width * i as f64;
                                Rectangle::new([(left, 0.0), (left + width, y)], color.filled())
                            }))
                            .map(|_| ())
                    }
                };
                drawn.map_err(|e| anyhow!("{:?}", e))?;
            }

            root.present().map_err(|e| anyhow!("{:?}", e))?;
        }

        Ok(Some(path))
    }
}

/// 按计划从结果表生成图表，找不到的表跳过
pub fn plan(tables: &[ReportTable], specs: &[ChartSpec]) -> Vec<Chart> {
    specs
        .iter()
        .filter_map(|spec| {
            let table = tables.iter().find(|t| t.name == spec.table)?;
            Chart::from_table(table, spec)
        })
        .collect()
}

/// 绘制全部图表，返回写出的 PNG 路径
pub fn render_all(dir: &Path, charts: &[Chart]) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("创建图表目录 {}", dir.display()))?;
    let mut paths = Vec::new();
    for chart in charts {
        if let Some(path) = chart
            .render(dir)
            .with_context(|| format!("绘制图表 {}", chart.name))?
        {
            paths.push(path);
        }
    }
    tracing::info!("Rendered {} charts to {}", paths.len(), dir.display());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    fn table(name: &str) -> ReportTable {
        ReportTable::new(name, &["月", "高", "低"]).with_rows(vec![
            vec!["1".into(), "3".into(), "-5".into()],
            vec!["2".into(), "6".into(), "".into()],
            vec!["3".into(), "12".into(), "2".into()],
        ])
    }

    #[test]
    fn test_columns_layout_skips_blank_cells() {
        let spec = ChartSpec::columns("monthly", ChartKind::Line, Some("月"), &["高", "低", "缺"]);
        let chart = Chart::from_table(&table("monthly"), &spec).unwrap();

        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].points, vec![(1.0, 3.0), (2.0, 6.0), (3.0, 12.0)]);
        assert_eq!(chart.series[1].points, vec![(1.0, -5.0), (3.0, 2.0)]);
    }

    #[test]
    fn test_rows_layout_uses_headers_as_x() {
        let table = ReportTable::new("papers", &["conference", "2020", "2021"])
            .with_rows(vec![vec!["KDD".into(), "4".into(), "7".into()]]);
        let chart = Chart::from_table(&table, &ChartSpec::rows("papers", ChartKind::Line)).unwrap();

        assert_eq!(chart.series[0].label, "KDD");
        assert_eq!(chart.series[0].points, vec![(2020.0, 4.0), (2021.0, 7.0)]);
    }

    #[test]
    fn test_render_writes_png() {
        let dir = tempdir().unwrap();
        let specs = [
            ChartSpec::columns("line", ChartKind::Line, Some("月"), &["高", "低"]),
            ChartSpec::columns("bar", ChartKind::Bar, None, &["高", "低"]),
            ChartSpec::columns("scatter", ChartKind::Scatter, Some("高"), &["低"]),
            ChartSpec::columns("missing", ChartKind::Bar, None, &["x"]),
        ];
        let tables = [table("line"), table("bar"), table("scatter")];
        let charts = plan(&tables, &specs);
        assert_eq!(charts.len(), 3);

        let paths = render_all(dir.path(), &charts).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(dir.path().join("bar.png").exists());
        for path in &paths {
            let bytes = std::fs::read(path).unwrap();
            assert_eq!(bytes[..8], PNG_MAGIC);
        }
    }

    #[test]
    fn test_chart_without_points_is_skipped() {
        let dir = tempdir().unwrap();
        let empty = ReportTable::new("empty", &["x", "y"]);
        let charts = plan(&[empty], &[ChartSpec::columns("empty", ChartKind::Line, Some("x"), &["y"])]);

        assert!(render_all(dir.path(), &charts).unwrap().is_empty());
        assert!(!dir.path().join("empty.png").exists());
    }
}

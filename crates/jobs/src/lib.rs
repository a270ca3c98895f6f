//! # Jobs - 各数据集的一次性抓取与分析任务
//!
//! 每个任务的流程相同：抓取 → 落盘 → 读回 → 分析 → 写出结果表和图表。
//!
//! - `weather`: 历史天气统计与月均最高温预测
//! - `papers`: DBLP 会议论文统计与发文量预测
//! - `lottery`: 大乐透开奖统计、检验、销售额预测与号码推荐
//! - `experts`: 彩票论坛专家彩龄、发文量与中奖相关性
//! - `hurun`: 胡润百富榜多维统计

pub mod report;
pub mod chart;
pub mod weather;
pub mod papers;
pub mod lottery;
pub mod experts;
pub mod hurun;

use chart::ChartSpec;
use etl::{ETLError, ErrorKind};
use std::path::{Path, PathBuf};

pub use report::ReportTable;

/// 一次任务的产出
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
    /// 落盘的数据表
    pub data_file: PathBuf,
    /// 写出的结果表
    pub tables: Vec<PathBuf>,
    /// 绘制的 PNG 图表
    pub charts: Vec<PathBuf>,
}

/// 写出结果表，再按计划绘制图表
pub(crate) fn write_outputs(
    data_file: &Path,
    output_dir: &Path,
    tables: &[ReportTable],
    charts: &[ChartSpec],
) -> anyhow::Result<JobOutput> {
    let planned = chart::plan(tables, charts);
    let tables = report::write_all(output_dir, tables)?;
    let charts = chart::render_all(output_dir, &planned)?;
    Ok(JobOutput {
        data_file: data_file.to_path_buf(),
        tables,
        charts,
    })
}

/// 错误是否为“没有抓到任何数据”
pub fn is_no_data(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ETLError>()
        .is_some_and(|e| e.kind() == ErrorKind::Empty)
}

/// 任务结束时的统一处理：没有数据只提示，不算失败
pub fn finish(job: &str, result: anyhow::Result<JobOutput>) -> anyhow::Result<()> {
    match result {
        Ok(output) => {
            println!("\n=== {} 完成 ===", job);
            println!("数据表: {}", output.data_file.display());
            for table in &output.tables {
                println!("结果表: {}", table.display());
            }
            for chart in &output.charts {
                println!("图表: {}", chart.display());
            }
            Ok(())
        }
        Err(e) if is_no_data(&e) => {
            println!("{}: 没有获取到任何数据，未生成输出", job);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

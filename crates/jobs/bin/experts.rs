//! 大乐透专家分析

use jobs::experts::{self, ExpertsJobConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== 大乐透专家分析 ===\n");
    let config = ExpertsJobConfig::default();
    jobs::finish("experts", experts::run(&config).await)
}

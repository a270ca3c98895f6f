//! 顶会论文分析

use jobs::papers::{self, PapersJobConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== 顶会论文分析 ===\n");
    let config = PapersJobConfig::default();
    jobs::finish("papers", papers::run(&config).await)
}

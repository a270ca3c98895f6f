//! 胡润百富榜分析

use jobs::hurun::{self, HurunJobConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== 胡润百富榜分析 ===\n");
    let config = HurunJobConfig::default();
    jobs::finish("hurun", hurun::run(&config).await)
}

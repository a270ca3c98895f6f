//! 大乐透开奖分析

use jobs::lottery::{self, LotteryJobConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== 大乐透开奖分析 ===\n");
    jobs::finish("lottery", lottery::run(&LotteryJobConfig::default()).await)
}

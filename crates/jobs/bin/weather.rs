//! 大连历史天气分析

use jobs::weather::{self, WeatherJobConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== 大连历史天气分析 ===\n");
    let config = WeatherJobConfig::default();
    jobs::finish("weather", weather::run(&config).await)
}

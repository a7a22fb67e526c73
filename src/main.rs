use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use hagure::{
    AppState, app,
    config::Config,
    realtime::PgChangeFeed,
    store::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置，缺少远端地址或访问密钥时直接退出
    let config = Config::from_env().inspect_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
    })?;

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    // 连接远端存储
    let store = PgStore::connect(&config).await.inspect_err(|e| {
        tracing::error!("Failed to connect to the remote store: {}", e);
    })?;

    if config.run_migrations {
        store.migrate().await?;
        tracing::info!("Schema migrations applied");
    }

    let feed = PgChangeFeed::new(store.pool().clone());
    let state = AppState::new(config.clone(), Arc::new(store), Arc::new(feed));

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to localhost");
            IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
        }),
        config.server_port,
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}

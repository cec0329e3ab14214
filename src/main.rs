use anyhow::Context;
use clap::Parser;
use shop_banners::domain::ports::ConfigProvider;
use shop_banners::server::{build_app, AppState};
use shop_banners::utils::{logger, validation::Validate};
use shop_banners::{BannerEngine, CliConfig, LocalStorage, TomlConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_logger(cli.verbose, cli.json_logs);

    tracing::info!("Starting shop-banners server");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match cli.config.clone() {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let mut config = TomlConfig::from_file(&path)
                .with_context(|| format!("Failed to load config file '{}'", path))?;
            if cli.monitor {
                config.monitoring.enabled = true;
            }
            serve(config).await
        }
        None => serve(cli).await,
    }
}

async fn serve<C: ConfigProvider + Validate>(config: C) -> anyhow::Result<()> {
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.monitoring_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_dir());
    let engine = BannerEngine::from_config(storage, &config)
        .context("Failed to set up the banner engine")?;
    let state = AppState::new(engine, config.upload_dir());
    let app = build_app(state, config.max_upload_bytes());

    let addr = config.bind_address().to_string();
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Uploads: {}, output: {}", config.upload_dir(), config.output_dir());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

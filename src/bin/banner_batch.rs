use clap::Parser;
use shop_banners::domain::ports::ConfigProvider;
use shop_banners::utils::error::ErrorSeverity;
use shop_banners::utils::{logger, validation::Validate};
use shop_banners::{BannerEngine, CliConfig, LocalStorage, TomlConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "banner-batch")]
#[command(about = "Render storefront banners for every domain in a spreadsheet")]
struct Args {
    /// Spreadsheet with a `domain` column (.csv, .xlsx, .xls, .ods)
    spreadsheet: PathBuf,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    config: CliConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    logger::init_logger(args.config.verbose, args.config.json_logs);
    tracing::info!("Starting banner batch for {}", args.spreadsheet.display());

    let exit_code = match args.config.config.clone() {
        Some(path) => {
            let mut config = match TomlConfig::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    std::process::exit(1);
                }
            };
            if args.config.monitor {
                config.monitoring.enabled = true;
            }
            run_batch(&args, config).await
        }
        None => run_batch(&args, args.config.clone()).await,
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn run_batch<C: ConfigProvider + Validate>(args: &Args, config: C) -> i32 {
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        return 1;
    }

    let storage = LocalStorage::new(config.output_dir());
    let engine = match BannerEngine::from_config(storage, &config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            return 3;
        }
    };

    match engine.run(&args.spreadsheet).await {
        Ok(report) => {
            if args.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("❌ Could not serialize report: {}", e);
                        return 3;
                    }
                }
            } else {
                println!(
                    "✅ {} banners for {} of {} domains",
                    report.entries.len(),
                    report.domains_rendered(),
                    report.domains_total
                );
                for skipped in &report.skipped {
                    println!("   skipped {} ({}): {}", skipped.domain, skipped.kind, skipped.reason);
                }
                for failed in &report.failed_renders {
                    println!("   no {} banner for {}: {}", failed.size, failed.domain, failed.reason);
                }
                println!("📁 Output saved to: {}", report.archive_path);
            }
            0
        }
        Err(e) => {
            tracing::error!(
                "❌ Batch failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            }
        }
    }
}

//! NoiseWatch - GreyNoise enrichment for web server logs
//!
//! Reads recent log files, looks up every client address in the GreyNoise
//! community API and reports how much of the traffic came from known
//! internet scanners.

use anyhow::Result;
use clap::Parser;
use noisewatch::{
    app::App,
    cli::Cli,
    config::Config,
    formatting::{PlainTextFormatter, TextFormatter},
    internal_metrics,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            init_tracing("info");
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level);

    if let Err(err) = run(config).await {
        error!("NoiseWatch failed: {:#}", err);
        std::process::exit(1);
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: Config) -> Result<()> {
    info!("NoiseWatch starting up...");

    // Log the loaded configuration settings for visibility
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    match &config.scan.directory {
        Some(dir) => info!("Log Directory: {}", dir.display()),
        None => info!("Log Directory: Not configured"),
    }
    info!("Max Age: {} days", config.scan.max_age_days);
    info!("GreyNoise API: {}", config.greynoise.base_url);
    info!("Workers: {}", config.enrichment.workers);
    info!("Deadline: {}ms", config.enrichment.deadline_ms);
    info!(
        "Webhook Output: {}",
        if config.output.send_webhook { "Enabled" } else { "Disabled" }
    );
    info!(
        "Email Output: {}",
        if config.output.send_email { "Enabled" } else { "Disabled" }
    );
    info!("-------------------------------------------------------");

    internal_metrics::describe();

    let json = config.output.json;
    let app = App::builder(config).build()?;
    let report = app.run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", PlainTextFormatter.format_report(&report));
    }

    app.notify(&report).await?;
    info!("Done.");
    Ok(())
}

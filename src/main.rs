use std::fs;
use std::io::{self, Write};

use anyhow::{bail, Context};
use candle_features::config::Config;
use candle_features::FeaturePipeline;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "candle_features=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::from_env();
    if config.target_day.is_empty() {
        bail!("TARGET_DAY is not set");
    }
    info!(
        "Featurizing {} for {} from {}",
        config.instrument,
        config.target_day,
        config.input_path.display()
    );

    let pipeline = FeaturePipeline::new(config.pipeline.clone())?;

    let text = fs::read_to_string(&config.input_path)
        .with_context(|| format!("failed to read {}", config.input_path.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", config.input_path.display()))?;

    let rows = pipeline.run(&config.instrument, &raw, &config.target_day)?;
    let output = serde_json::to_string_pretty(&rows)?;

    match &config.output_path {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", output)?;
        }
    }

    Ok(())
}

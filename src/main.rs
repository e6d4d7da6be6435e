use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use skywarn::alerts::{known_countries, AlertFetcher, LocationContext, PipelineOutcome};
use skywarn::config::Config;
use skywarn::util::{plain_text, truncate_to_width};

const TITLE_WIDTH: usize = 96;
const DESCRIPTION_WIDTH: usize = 120;

/// Get the default config file path (~/.config/skywarn/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("skywarn")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "skywarn", about = "Active weather alerts for a country, optionally narrowed to a place")]
struct Args {
    /// Country name as reported by your weather provider (e.g. "Germany")
    #[arg(required_unless_present = "list_countries")]
    country: Option<String>,

    /// Place name used to keep only alerts that mention it
    #[arg(long)]
    name: Option<String>,

    /// Region of the place (state, county, province)
    #[arg(long, requires = "name")]
    region: Option<String>,

    /// Config file (defaults to ~/.config/skywarn/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    /// List countries with a dedicated alert feed and exit
    #[arg(long)]
    list_countries: bool,
}

fn render_text(outcome: &PipelineOutcome) -> String {
    match outcome {
        PipelineOutcome::Alerts(alerts) => alerts
            .iter()
            .map(|alert| {
                let mut line = format!(
                    "[{}] {}  {}",
                    alert.severity,
                    alert.event_type,
                    truncate_to_width(&alert.entry.title, TITLE_WIDTH)
                );
                let description = plain_text(&alert.entry.description);
                if !description.is_empty() {
                    line.push_str("\n    ");
                    line.push_str(&truncate_to_width(&description, DESCRIPTION_WIDTH));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n"),
        PipelineOutcome::NoAlerts => "No active weather alerts.".to_string(),
        PipelineOutcome::TemporarilyUnavailable => {
            "Weather alerts are temporarily unavailable.".to_string()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable with --json
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list_countries {
        for country in known_countries() {
            println!("{country}");
        }
        return Ok(());
    }

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let fetcher = AlertFetcher::from_config(&config).context("Failed to build HTTP client")?;

    let country = args.country.unwrap_or_default();
    let location = args
        .name
        .map(|name| LocationContext::new(name, args.region.unwrap_or_default()));

    let outcome = fetcher.fetch_alerts(&country, location.as_ref()).await;

    if args.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?;
        println!("{json}");
    } else {
        println!("{}", render_text(&outcome));
    }

    Ok(())
}

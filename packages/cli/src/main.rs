#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the public Wi-Fi AP condition toolkit.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use wifi_map_classify::{ClassificationStore, SelectionPolicy};
use wifi_map_dataset::DatasetSnapshot;
use wifi_map_district::PointFilter;
use wifi_map_district_models::ChoroplethMetric;
use wifi_map_speed::SortMode;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "wifi_map",
    about = "Seoul public Wi-Fi AP condition classification and map export"
)]
struct Cli {
    /// AP inventory CSV
    #[arg(long, env = "WIFI_MAP_DATA", default_value = "data/seoul_wifi_ap.csv")]
    data: PathBuf,

    /// TOML file overriding the built-in defaults
    #[arg(long, env = "WIFI_MAP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Narrowing of the listed or exported APs.
#[derive(Args)]
struct FilterArgs {
    /// Only APs with this install type label (e.g. `버스정류소`)
    #[arg(long)]
    install_type: Option<String>,
    /// Only APs in the bottom usage quantile (`district.low_usage_quantile`)
    #[arg(long)]
    low_usage: bool,
}

impl FilterArgs {
    fn into_filter(self, config: &AppConfig) -> PointFilter {
        PointFilter {
            install_type: self.install_type,
            low_usage_quantile: self.low_usage.then_some(config.district.low_usage_quantile),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every AP and list the selected ones
    Classify {
        /// Which APs to list (`all` or `needs-attention`)
        #[arg(long, default_value_t = SelectionPolicy::NeedsAttention)]
        view: SelectionPolicy,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Per-district summaries with aggregate condition
    Districts {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Install counts and low-usage concentration by district
    Stats {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Rank APs in a district by expected speed and distance
    Nearby {
        /// District to search
        #[arg(long)]
        gu: String,
        /// User latitude (defaults to Seoul City Hall)
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        /// User longitude (defaults to Seoul City Hall)
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        /// `nearest`, `fastest`, or `blended`
        #[arg(long, default_value_t = SortMode::Blended)]
        sort: SortMode,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write `GeoJSON` map layers
    Export {
        /// Output directory
        #[arg(long)]
        out: PathBuf,
        /// District boundary `FeatureCollection` (property `SIG_KOR_NM`)
        #[arg(long)]
        boundaries: Option<PathBuf>,
        /// Choropleth statistic (`age`, `usage`, `density`, or `rank`)
        #[arg(long, default_value_t = ChoroplethMetric::Rank)]
        metric: ChoroplethMetric,
        /// Color feature metrics on a log scale
        #[arg(long)]
        log_scale: bool,
        /// Which APs go into the point layer
        #[arg(long, default_value_t = SelectionPolicy::NeedsAttention)]
        view: SelectionPolicy,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show one AP
    Ap {
        /// District the AP is in
        #[arg(long)]
        gu: String,
        /// AP identifier
        ap_id: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let snapshot = DatasetSnapshot::load_csv(&cli.data)?;
    let report = snapshot.report();
    if !report.skipped.is_empty() {
        log::warn!(
            "Skipped {} of {} rows in {}",
            report.skipped.len(),
            report.total_rows,
            snapshot.source()
        );
    }

    let mut store = ClassificationStore::new(config.classify.clone());

    match cli.command {
        Commands::Classify { view, filter, json } => {
            let filter = filter.into_filter(&config);
            commands::classify(&mut store, &snapshot, view, &filter, json)?;
        }
        Commands::Districts { json } => commands::districts(&mut store, &snapshot, json)?,
        Commands::Stats { json } => commands::stats(&snapshot, &config, json)?,
        Commands::Nearby {
            gu,
            lat,
            lon,
            sort,
            json,
        } => commands::nearby(&snapshot, &config, &gu, lat.zip(lon), sort, json)?,
        Commands::Export {
            out,
            boundaries,
            metric,
            log_scale,
            view,
            filter,
        } => {
            let options = wifi_map_generate::ExportOptions {
                policy: view,
                filter: filter.into_filter(&config),
                metric,
                log_scale,
                boundaries,
            };
            commands::export(&mut store, &snapshot, &out, &options)?;
        }
        Commands::Ap { gu, ap_id } => commands::access_point(&mut store, &snapshot, &gu, &ap_id)?,
    }

    Ok(())
}

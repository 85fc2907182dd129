//! Command line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

/// Default catalog location, relative to the working directory.
pub const DEFAULT_CATALOG_PATH: &str = "config/charts.toml";

#[derive(Debug, Parser)]
#[command(
    name = "chartdeck",
    version,
    about = "Chart data registry: list charts, resolve dashboards and fetch datasets"
)]
pub struct Cli {
    /// Registry catalog (TOML).
    #[arg(long, env = "CHARTDECK_CATALOG", default_value = DEFAULT_CATALOG_PATH, global = true)]
    pub catalog: PathBuf,

    /// Directory dataset locations are resolved against. Defaults to the
    /// catalog's parent directory.
    #[arg(long, env = "CHARTDECK_DATA_ROOT", global = true)]
    pub data_root: Option<PathBuf>,

    /// Seconds a fetched dataset is served from cache.
    #[arg(long, env = "CHARTDECK_CACHE_SECS", default_value_t = 300, global = true)]
    pub cache_secs: u64,

    /// Chart types forced production ready, comma separated.
    #[arg(
        long,
        env = "CHARTDECK_PRODUCTION_READY",
        value_delimiter = ',',
        global = true
    )]
    pub production_ready: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_secs)
    }

    /// Resolved data root.
    pub fn data_root(&self) -> PathBuf {
        match &self.data_root {
            Some(root) => root.clone(),
            None => self
                .catalog
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registered charts.
    List {
        /// Only production-ready charts.
        #[arg(long, default_value_t = false)]
        production: bool,
    },
    /// Resolve a dashboard to its charts, in layout order.
    Dashboard {
        /// Dashboard identifier.
        id: String,
    },
    /// Fetch a chart's rows and print them to stdout.
    Fetch {
        /// Chart type (e.g. btc-price).
        chart: String,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Give up (cancel the fetch) after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Refresh a chart and report its cache state and fetch attempts.
    Status {
        /// Chart type.
        chart: String,
    },
    /// Validate the catalog and report unresolved references.
    Check,
    /// Keep every auto-refreshing chart warm until interrupted.
    Watch {
        /// Seconds between cache status reports.
        #[arg(long, default_value_t = 60)]
        report_secs: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch_command() {
        let cli = Cli::try_parse_from([
            "chartdeck",
            "--catalog",
            "/etc/chartdeck/charts.toml",
            "fetch",
            "btc-price",
            "--format",
            "json",
            "--timeout-secs",
            "30",
        ])
        .unwrap();

        assert_eq!(cli.data_root(), PathBuf::from("/etc/chartdeck"));
        match cli.command {
            Command::Fetch {
                chart,
                format,
                timeout_secs,
            } => {
                assert_eq!(chart, "btc-price");
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(timeout_secs, Some(30));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_production_ready_list_is_split() {
        let cli = Cli::try_parse_from([
            "chartdeck",
            "--production-ready",
            "btc-price,equity-curve",
            "list",
        ])
        .unwrap();
        assert_eq!(cli.production_ready, vec!["btc-price", "equity-curve"]);
    }
}

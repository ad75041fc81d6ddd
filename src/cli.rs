//! Command-line interface argument parsing.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::Level;

/// GeoRisk - urban risk assessment for any coordinate
///
/// Examples:
///   georisk report --lat 40.4168 --lon -3.7038
///   georisk report --address "Plaza Mayor, Madrid"
///   georisk report "Analiza la zona 37.3891, -5.9845"
///   georisk risk --lat 39.4699 --lon -0.3763
///   georisk serve --port 8080
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// Defaults to <config dir>/georisk/config.toml
    #[arg(short, long, value_name = "FILE", global = true, env = "GEORISK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Stream the full narrative report to stdout
    Report(ReportArgs),
    /// Print the risk assessment as JSON
    Risk(CoordinateArgs),
    /// Start the web API
    Serve {
        /// Port to listen on (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ReportArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lon: Option<f64>,

    /// Address to geocode
    #[arg(short, long)]
    pub address: Option<String>,

    /// Skip the current weather lookup
    #[arg(long)]
    pub no_weather: bool,

    /// Free-text request, searched for a "<lat>, <lon>" pair
    #[arg(trailing_var_arg = true)]
    pub text: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CoordinateArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// `--verbose` forces debug, otherwise the configured level applies
    pub fn log_level_override(&self) -> Option<Level> {
        self.verbose.then_some(Level::DEBUG)
    }
}

impl ReportArgs {
    pub fn text(&self) -> Option<String> {
        (!self.text.is_empty()).then(|| self.text.join(" "))
    }
}

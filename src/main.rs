//! GeoRisk - geospatial urban risk reports from the command line
//!
//! Exit codes:
//!   0 - Report or assessment produced
//!   1 - Runtime or configuration error
//!   2 - Not enough data to produce a report

mod cli;

use std::io::Write;

use anyhow::{Context, Result};
use cli::{Args, Command, CoordinateArgs, ReportArgs};
use futures::StreamExt;
use georisk::api::AppState;
use georisk::{AssessmentRequest, Coordinate, GeoRiskConfig, GeoRiskError, Orchestrator};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    let config = match GeoRiskConfig::load_from_path(args.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);
    info!("GeoRisk v{}", georisk::VERSION);
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed: {:#}", e);
            match e.downcast_ref::<GeoRiskError>() {
                Some(pipeline_err) if pipeline_err.is_fatal() => {
                    eprintln!("{}", pipeline_err.user_message());
                    std::process::exit(2);
                }
                Some(pipeline_err) => eprintln!("{}", pipeline_err.user_message()),
                None => eprintln!("\n❌ Error: {e:#}"),
            }
            std::process::exit(1);
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(args: &Args, config: &GeoRiskConfig) {
    let level = args
        .log_level_override()
        .map_or_else(|| config.logging.level.clone(), |l| l.as_str().to_lowercase());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = if config.logging.format == "json" {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };
    if let Err(e) = installed {
        eprintln!("Failed to set tracing subscriber: {e}");
    }
}

async fn run(args: Args, config: GeoRiskConfig) -> Result<()> {
    let orchestrator =
        Orchestrator::from_config(&config).with_context(|| "Failed to build upstream clients")?;

    match args.command {
        Command::Report(report_args) => report(&orchestrator, &config, report_args).await,
        Command::Risk(coordinate_args) => risk(&orchestrator, coordinate_args).await,
        Command::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let state = AppState {
                orchestrator,
                report: config.report.clone(),
            };
            georisk::web::run(port, state).await
        }
    }
}

async fn report(orchestrator: &Orchestrator, config: &GeoRiskConfig, args: ReportArgs) -> Result<()> {
    let request = AssessmentRequest {
        lat: args.lat,
        lon: args.lon,
        address: args.address.clone(),
        text: args.text(),
        skip_weather: args.no_weather,
    };

    let bundle = orchestrator.assess(&request).await?;
    let report = georisk::synthesize(&bundle);

    let mut chunks = Box::pin(georisk::paced_stream(
        report,
        config.report.chunk_size,
        config.report.pacing(),
    ));
    let mut stdout = std::io::stdout();
    while let Some(chunk) = chunks.next().await {
        stdout.write_all(chunk.as_bytes())?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}

async fn risk(orchestrator: &Orchestrator, args: CoordinateArgs) -> Result<()> {
    let coordinate = Coordinate::new(args.lat, args.lon)?;
    let assessment = orchestrator.risk(coordinate).await;
    let json = serde_json::to_string_pretty(&assessment)
        .with_context(|| "Failed to serialize risk assessment")?;
    println!("{json}");
    Ok(())
}

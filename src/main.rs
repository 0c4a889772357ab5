mod collectors;
mod config;
mod notify;
mod pipeline;
mod record;
mod score;
mod snapshot;

use clap::Parser;
use collectors::system::HostProbe;
use pipeline::{AlertOutcome, RunOptions};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Takes one host health snapshot, saves it and alerts when it is critical.
#[derive(Parser, Debug)]
#[command(name = "healthsnap")]
#[command(version)]
struct Cli {
    /// Directory holding snapshots; critical ones go to its `critical/` subdirectory.
    #[arg(long, default_value = "./data")]
    data_dir: String,
    /// Env file with SMTP_* settings, read only for critical snapshots.
    #[arg(long, default_value = ".env")]
    env_file: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let opts = RunOptions::new(&cli.data_dir, &cli.env_file);
    info!(data_dir = %cli.data_dir, "starting healthsnap");

    let mut probe = HostProbe::new();
    match pipeline::run(&mut probe, &opts).await {
        Ok(report) => info!(
            artifact = %report.artifact.display(),
            score = report.score,
            classification = report.classification.as_str(),
            alert = report.alert.as_ref().map_or("none", AlertOutcome::as_str),
            "run finished"
        ),
        Err(err) => {
            error!(error = %err, "run aborted");
            println!("{err}");
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

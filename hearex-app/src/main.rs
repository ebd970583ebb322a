mod app;
mod config;
pub use app::App;
use config::ExperimentConfig;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "hearex",
    about = "Adaptive CRM speech-in-noise runs and threshold analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every condition against a simulated listener
    Simulate {
        /// Experiment configuration (JSON); defaults are used when absent
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory receiving trials.jsonl and summary.json
        #[arg(long, default_value = "hearex-out")]
        out_dir: PathBuf,
        /// Overrides the seed from the configuration
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Recompute thresholds from a persisted trial log
    Analyze {
        #[arg(long)]
        log: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to write the summary; printed only when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write the default configuration file
    Config {
        #[arg(long, default_value = "hearex.json")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Simulate {
            config,
            out_dir,
            seed,
        } => {
            let mut config = ExperimentConfig::load(config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let app = App::new(config)?;
            let simulation = app.simulate()?;
            app.write_outputs(&out_dir, &simulation)
                .with_context(|| format!("writing results to {}", out_dir.display()))?;
            app::print_summary(&simulation.summary);
        }
        Commands::Analyze {
            log,
            config,
            output,
        } => {
            let app = App::new(ExperimentConfig::load(config.as_deref())?)?;
            let summary = app.analyze(&log)?;
            if let Some(path) = output {
                app::write_summary(&path, &summary)?;
            }
            app::print_summary(&summary);
        }
        Commands::Config { out } => {
            ExperimentConfig::default().save(&out)?;
            println!("Wrote default configuration to {}", out.display());
        }
    }

    Ok(())
}

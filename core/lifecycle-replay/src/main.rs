//! lifecycle-replay: offline driver for the app lifecycle state machine.
//!
//! Stands in for the host's callback dispatcher: recorded lifecycle callbacks
//! are fed to the same machine and sinks the app uses, which makes field
//! reports of odd background/foreground sequences reproducible.
//!
//! ## Subcommands
//!
//! - `replay`: Feed JSON Lines events (stdin or `--input`) through the machine
//! - `table`: Print the state × event outcome table
//! - `metrics`: Print persisted invalid-transition counters

mod logging;
mod replay;
mod report;
mod table;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lifecycle-replay")]
#[command(about = "Replay app lifecycle events through the lifecycle state machine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay lifecycle events (JSON Lines, reads stdin unless --input is given)
    Replay {
        /// File with one event per line
        #[arg(long, short, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Directory holding lifecycle.toml and the metrics file (default: ~/.lifecycle)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Emit one JSON object per step instead of text
        #[arg(long)]
        json: bool,

        /// Merge rejections into the persisted metrics file
        #[arg(long)]
        save_metrics: bool,
    },

    /// Print the state × event transition table
    Table,

    /// Print persisted invalid-transition metrics
    Metrics {
        /// Metrics file (default: ~/.lifecycle/invalid-transitions.json)
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

fn main() {
    let logging_guard = logging::init();
    let cli = Cli::parse();

    let (label, result) = match cli.command {
        Commands::Replay {
            input,
            root,
            json,
            save_metrics,
        } => {
            let options = replay::ReplayOptions {
                input,
                root,
                json,
                save_metrics,
            };
            ("replay", replay::run(options))
        }
        Commands::Table => {
            table::run();
            ("table", Ok(()))
        }
        Commands::Metrics { file } => ("metrics", report::run(file)),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, command = label, "lifecycle-replay failed");
        // Flush the non-blocking writer before exiting.
        drop(logging_guard);
        std::process::exit(1);
    }
}

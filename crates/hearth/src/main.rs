mod heartbeat;
mod host;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hearth_core::kernel::KernelSettings;

use crate::host::RunOptions;

/// Hearth: an embeddable application kernel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Print "pong" and exit
    #[arg(long)]
    ping: bool,

    /// Kernel settings file (.json or .toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Boot the kernel and drive the main-thread scheduler
    Run {
        /// Number of frames to tick before terminating
        #[arg(long, default_value_t = 3)]
        frames: u32,
        /// Number of worker tasks posting work to the main thread
        #[arg(long, default_value_t = 2)]
        workers: usize,
    },
    /// List the providers the settings would register
    Providers,
}

fn load_settings(path: Option<&PathBuf>) -> Result<KernelSettings, String> {
    let settings = match path {
        Some(path) => KernelSettings::from_path(path).map_err(|e| e.to_string())?,
        None => KernelSettings::default(),
    };
    Ok(host::with_default_providers(settings))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    let settings = match load_settings(args.config.as_ref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let options = match args.command {
        Some(Commands::Providers) => {
            for name in &settings.providers {
                let known = if host::find_provider(name).is_some() { "" } else { " (unknown)" };
                println!("  - {}{}", name, known);
            }
            return ExitCode::SUCCESS;
        }
        Some(Commands::Run { frames, workers }) => RunOptions { frames, workers },
        None => RunOptions {
            frames: 3,
            workers: 2,
        },
    };

    println!("Initializing application...");
    let outcome = host::run(settings, options).await;
    println!("Shutting down application...");

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Application error: {}", e);
            ExitCode::FAILURE
        }
    }
}

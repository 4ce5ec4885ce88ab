use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use simcapture_core::{CaptureConfig, CaptureError, CaptureStore, RecordFormat, Vector3};
use simcapture_manager::commands::{demo, sessions};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simcapture")]
#[command(about = "SimCapture - buffered capture of simulation records")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Capture root (defaults to the platform data directory)
    #[arg(short = 'd', long = "base-dir", global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Configuration file (defaults to .simcapture/config.yaml)
    #[arg(short = 'c', long = "config", global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture one object position and flush it to disk
    Demo {
        /// Destination name
        #[arg(short = 'n', long = "name", default_value = "DataCapture")]
        name: String,

        /// Attempt identifier (defaults to $SIMCAPTURE_ATTEMPT_ID or a new UUID)
        #[arg(short = 'a', long = "attempt-id")]
        attempt_id: Option<String>,

        /// Entry format: jsonl or bin
        #[arg(short = 'f', long = "format")]
        format: Option<RecordFormat>,

        /// Name of the observed object
        #[arg(short = 'l', long = "label", default_value = "ExampleObjectName")]
        label: String,

        /// Object position
        #[arg(
            short = 'p',
            long = "position",
            num_args = 3,
            value_names = ["X", "Y", "Z"],
            allow_negative_numbers = true,
            default_values_t = [0.0, 1.0, 2.0]
        )]
        position: Vec<f32>,
    },

    /// List capture sessions and their destinations
    Sessions,

    /// Print the records of a destination
    Show {
        /// Session (attempt) identifier
        session: String,
        /// Destination name
        name: String,
        /// Entry format to read when the name exists as both jsonl and bin
        #[arg(short = 'f', long = "format")]
        format: Option<RecordFormat>,
        /// Print raw JSON entries instead of summaries
        #[arg(long = "json")]
        json: bool,
    },

    /// Delete a capture session
    Clean {
        /// Session (attempt) identifier
        session: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run_command(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(hint) = retry_hint(&e) {
            eprintln!("{} {}", "hint:".yellow(), hint);
        }
        std::process::exit(1);
    }
}

/// Advice for failures that leave captured records intact
fn retry_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.downcast_ref::<CaptureError>()
        .filter(|e| e.is_retryable())
        .map(|_| "no records were lost; fix the destination and run the command again")
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "simcapture=debug,simcapture_manager=debug,simcapture_core=debug"
    } else {
        "simcapture=warn,simcapture_manager=warn,simcapture_core=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<CaptureConfig> {
    let mut config = match &cli.config {
        Some(path) => CaptureConfig::load(path)?,
        None => CaptureConfig::discover()?,
    };
    if let Some(base_dir) = &cli.base_dir {
        config = config.with_base_dir(base_dir);
    }
    Ok(config)
}

fn run_command(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    let store = CaptureStore::from_config(&config);

    match cli.command {
        Commands::Demo {
            name,
            attempt_id,
            format,
            label,
            position,
        } => {
            if let Some(id) = attempt_id {
                config = config.with_attempt_id(id);
            }
            if let Some(format) = format {
                config = config.with_format(format);
            }

            let options = demo::DemoOptions {
                name,
                label,
                position: position_from_args(&position)?,
            };
            demo::run_demo(&config, &options).map(|_| ())
        }

        Commands::Sessions => sessions::list_sessions(&store).map(|_| ()),

        Commands::Show {
            session,
            name,
            format,
            json,
        } => sessions::show_destination(&store, &session, &name, format, json).map(|_| ()),

        Commands::Clean { session } => sessions::clean_session(&store, &session),
    }
}

fn position_from_args(values: &[f32]) -> Result<Vector3> {
    match values {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => anyhow::bail!("--position takes exactly three values, got {}", values.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_demo_defaults() {
        let cli = Cli::try_parse_from(["simcapture", "demo"]).unwrap();
        match cli.command {
            Commands::Demo {
                name,
                label,
                position,
                format,
                ..
            } => {
                assert_eq!(name, "DataCapture");
                assert_eq!(label, "ExampleObjectName");
                assert_eq!(position, vec![0.0, 1.0, 2.0]);
                assert!(format.is_none());
            }
            _ => panic!("expected demo command"),
        }
    }

    #[test]
    fn test_demo_arguments() {
        let cli = Cli::try_parse_from([
            "simcapture", "demo", "--format", "bin", "--position", "-1.5", "0", "3",
            "--base-dir", "/tmp/captures",
        ])
        .unwrap();
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/captures")));
        match cli.command {
            Commands::Demo {
                format, position, ..
            } => {
                assert_eq!(format, Some(RecordFormat::Binary));
                assert_eq!(
                    position_from_args(&position).unwrap(),
                    Vector3::new(-1.5, 0.0, 3.0)
                );
            }
            _ => panic!("expected demo command"),
        }

        assert!(Cli::try_parse_from(["simcapture", "demo", "--format", "csv"]).is_err());
    }

    #[test]
    fn test_show_format_argument() {
        let cli = Cli::try_parse_from([
            "simcapture", "show", "attempt", "DataCapture", "--format", "jsonl",
        ])
        .unwrap();
        match cli.command {
            Commands::Show { format, json, .. } => {
                assert_eq!(format, Some(RecordFormat::JsonLines));
                assert!(!json);
            }
            _ => panic!("expected show command"),
        }
    }

    #[test]
    fn test_retry_hint_only_for_io_errors() {
        let io = anyhow::Error::new(CaptureError::io(
            "/tmp/capture/DataCapture.jsonl",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        ))
        .context("flush failed");
        assert!(retry_hint(&io).is_some());

        let invalid = anyhow::Error::new(CaptureError::InvalidName("a/b".into()));
        assert!(retry_hint(&invalid).is_none());
        assert!(retry_hint(&anyhow::anyhow!("plain failure")).is_none());
    }

    #[test]
    fn test_position_arity() {
        assert!(position_from_args(&[1.0, 2.0]).is_err());
    }
}

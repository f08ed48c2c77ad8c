#![forbid(unsafe_code)]

mod commands;

use chambers_core::{ExitCode, MachineError, ENV_CHAMBERS_DB_PATH, ENV_CHAMBERS_LOG_LEVEL};
use chambers_store::{StoreError, StoreErrorCode};
use clap::{error::ErrorKind, ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;
use tracing_subscriber::EnvFilter;

pub(crate) const DEFAULT_DB_PATH: &str = "data/chambers.sqlite";
pub(crate) const DEFAULT_UPLOAD_DIR: &str = "data/uploads";
pub(crate) const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "chambers")]
#[command(about = "Chambers site operations CLI")]
#[command(version)]
#[command(
    after_help = "Environment:\n  CHAMBERS_DB_PATH     Default database path\n  CHAMBERS_LOG_LEVEL   Log verbosity override"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, global = true, env = ENV_CHAMBERS_DB_PATH, default_value = DEFAULT_DB_PATH)]
    db: PathBuf,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database or bring its schema up to date.
    InitDb,
    /// Store an image file in the database or the upload directory.
    ImportImage {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = StorageCli::Db)]
        storage: StorageCli,
        #[arg(long, default_value = DEFAULT_UPLOAD_DIR)]
        upload_dir: PathBuf,
        /// Declared MIME type; sniffed from the file signature when omitted.
        #[arg(long)]
        mime: Option<String>,
        #[arg(long, default_value_t = DEFAULT_MAX_IMAGE_BYTES)]
        max_bytes: usize,
    },
    ExportSubscribers {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Include unsubscribed addresses.
        #[arg(long, default_value_t = false)]
        all: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    InspectDb {
        #[arg(long, default_value_t = 5)]
        sample_rows: usize,
    },
    Openapi {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum StorageCli {
    Db,
    Disk,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ExportFormat {
    Csv,
    Json,
}

#[derive(Clone, Copy)]
pub(crate) struct OutputMode {
    pub(crate) json: bool,
}

#[derive(Debug)]
pub(crate) struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl CliError {
    pub(crate) fn usage(message: &str) -> Self {
        Self {
            exit_code: ExitCode::Usage,
            machine: MachineError::new("usage_error", message),
        }
    }

    pub(crate) fn validation(message: &str) -> Self {
        Self {
            exit_code: ExitCode::Validation,
            machine: MachineError::new("validation_error", message),
        }
    }

    pub(crate) fn dependency(message: String) -> Self {
        Self {
            exit_code: ExitCode::DependencyFailure,
            machine: MachineError::new("dependency_failure", &message),
        }
    }

    pub(crate) fn internal(message: String) -> Self {
        Self {
            exit_code: ExitCode::Internal,
            machine: MachineError::new("internal_error", &message),
        }
    }

    pub(crate) fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.machine = self.machine.with_detail(key, value);
        self
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err.code {
            StoreErrorCode::Validation | StoreErrorCode::NotFound | StoreErrorCode::Conflict => {
                Self::validation(&err.message)
            }
            _ => Self::dependency(err.message),
        }
    }
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(CliError::usage("invalid command line arguments")
                    .with_detail("error", &err.to_string()));
            }
        },
    };
    init_logging(cli.quiet, cli.verbose);
    let output_mode = OutputMode { json: cli.json };
    let command = cli
        .command
        .ok_or_else(|| CliError::usage("missing command; see --help"))?;

    match command {
        Commands::InitDb => commands::init_db(&cli.db, output_mode),
        Commands::ImportImage {
            path,
            storage,
            upload_dir,
            mime,
            max_bytes,
        } => commands::import_image(
            &cli.db,
            commands::ImportImageArgs {
                path,
                storage,
                upload_dir,
                mime,
                max_bytes,
            },
            output_mode,
        ),
        Commands::ExportSubscribers { format, all, out } => {
            commands::export_subscribers(&cli.db, format, all, out, output_mode)
        }
        Commands::InspectDb { sample_rows } => {
            commands::inspect_db(&cli.db, sample_rows, output_mode)
        }
        Commands::Openapi { out } => commands::write_openapi(out, output_mode),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(quiet: bool, verbose: u8) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = std::env::var(ENV_CHAMBERS_LOG_LEVEL)
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
    }
}

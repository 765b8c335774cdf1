use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use virus_vault::commands::{
    history_command, journal_command, list_quarantine_command, purge_quarantine_command,
    scan_command,
};
use virus_vault::logging::init_logging;
use virus_vault::{exit_code_for, resolve_config, ConfigOverrides, EXIT_INVALID, EXIT_OK};

/// File-system malware scanner with signature matching and quarantine.
///
/// This CLI is a thin wrapper around `vault-core`. Pass a directory to scan it;
/// known-malicious files are moved into the quarantine directory.
#[derive(Parser, Debug)]
#[command(
    name = "virus-vault",
    version,
    about = "Scan a directory tree for malware and quarantine what is found",
    long_about = None
)]
struct Cli {
    /// Root directory to scan.
    root: Option<PathBuf>,

    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct GlobalOptions {
    /// Config file (.json, .yaml or .yml). Falls back to $VIRUS_VAULT_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Signature list: one SHA-256 hex digest per line.
    #[arg(long, global = true)]
    signatures: Option<PathBuf>,

    /// Directory that receives quarantined files.
    #[arg(long, global = true)]
    quarantine_dir: Option<PathBuf>,

    /// Upper bound for each external detector/extractor/classifier call.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Files decided concurrently (1 = sequential, 0 = one per CPU).
    #[arg(long, global = true)]
    jobs: Option<usize>,

    /// SQLite file recording scan runs and quarantine actions.
    #[arg(long, global = true)]
    history_db: Option<PathBuf>,

    /// Text journal that each scan appends its transcript to.
    #[arg(long, global = true)]
    journal: Option<PathBuf>,

    /// Emit JSON instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Debug-level logging on stderr (RUST_LOG overrides).
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    verbose: bool,

    /// Log as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect or empty the quarantine directory.
    Quarantine {
        #[command(subcommand)]
        action: QuarantineAction,
    },

    /// Show recorded scan runs from the history database.
    History {
        /// Show the quarantine log instead of scan runs.
        #[arg(long, default_value_t = false)]
        quarantined: bool,
    },

    /// Print the scan journal.
    Journal,
}

#[derive(Subcommand, Debug)]
enum QuarantineAction {
    /// List quarantined files.
    List,

    /// Permanently delete quarantined files.
    Purge {
        /// File names inside the quarantine directory.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        names: Vec<String>,

        /// Delete every quarantined file.
        #[arg(long, default_value_t = false)]
        all: bool,

        /// Confirm `--all`.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are not failures.
            let code = if err.use_stderr() { EXIT_INVALID } else { EXIT_OK };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    init_logging(cli.options.verbose, cli.options.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "Run failed");
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let options = cli.options;
    let overrides = ConfigOverrides {
        config: options.config,
        signatures: options.signatures,
        quarantine_dir: options.quarantine_dir,
        timeout_secs: options.timeout_secs,
        jobs: options.jobs,
        history_db: options.history_db,
        journal: options.journal,
    };

    match cli.command {
        Some(Command::Quarantine { action }) => {
            let config = resolve_config(&overrides)?;
            match action {
                QuarantineAction::List => list_quarantine_command(&config.quarantine_dir, options.json),
                QuarantineAction::Purge { names, all, yes } => {
                    purge_quarantine_command(&config.quarantine_dir, &names, all, yes)
                }
            }
        }
        Some(Command::History { quarantined }) => {
            let config = resolve_config(&overrides)?;
            history_command(config.history_db.as_deref(), options.json, quarantined)
        }
        Some(Command::Journal) => {
            let config = resolve_config(&overrides)?;
            journal_command(config.journal.as_deref())
        }
        None => match cli.root {
            Some(root) => {
                let config = resolve_config(&overrides)?;
                scan_command(&root, &config, options.json).map(|_| ())
            }
            None => {
                // No root: usage guidance only, no scan.
                Cli::command().print_help()?;
                println!();
                Ok(())
            }
        },
    }
}

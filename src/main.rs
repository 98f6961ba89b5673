//! # Followup CLI
//!
//! The `followup` binary drives the reminder pipeline: import contacts from
//! a spreadsheet, inspect and filter them, send WhatsApp reminders, or arm
//! the daily schedule.
//!
//! ## Usage
//!
//! ```bash
//! followup --config ./followup.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `followup init` | Write a commented starter configuration |
//! | `followup import <file>` | Decode a spreadsheet and replace the contact list |
//! | `followup list` | Show cached contacts, optionally filtered by elapsed days |
//! | `followup send` | Dispatch reminders through the WhatsApp Cloud API |
//! | `followup verify` | Check the configured credentials against the provider |
//! | `followup schedule` | Arm the daily send timer; Ctrl-C disarms |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use followup::models::ColumnMapping;
use followup::report::ReportMode;
use followup::{config, contacts, dispatch, import, schedule, whatsapp};

/// Followup — spreadsheet-driven WhatsApp visit reminders.
///
/// All commands read settings from a TOML configuration file; run
/// `followup init` once to create it.
#[derive(Parser)]
#[command(
    name = "followup",
    about = "Spreadsheet-driven WhatsApp visit reminders",
    version,
    long_about = "Followup extracts contacts from spreadsheet exports, filters them by days \
    elapsed since the last visit, and sends templated WhatsApp reminders — sequentially and \
    rate-limited, with an optional daily schedule."
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(long, global = true, default_value = "./followup.toml")]
    config: PathBuf,

    /// Progress output on stderr: off, human, or json.
    ///
    /// Defaults to human when stderr is a terminal, off otherwise.
    #[arg(long, global = true)]
    progress: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a commented starter configuration file.
    ///
    /// The file lands at the --config path and refuses to overwrite an
    /// existing one unless --force is given.
    Init {
        /// Overwrite an existing configuration file.
        #[arg(long)]
        force: bool,
    },

    /// Import contacts from a spreadsheet, replacing the cached list.
    ///
    /// The file must be .xlsx or .xlsm with one header row. Every mapped
    /// phone column is scanned per row, and every 10-digit number found in
    /// a cell becomes its own contact. Rows without a name are skipped.
    Import {
        /// Spreadsheet file to import.
        file: PathBuf,

        /// Sheet name; defaults to the first sheet.
        #[arg(long)]
        sheet: Option<String>,

        /// 1-based row number of the column headers.
        #[arg(long, default_value_t = 1)]
        header_row: usize,

        /// Header text of the column holding contact names.
        #[arg(long)]
        name_col: String,

        /// Header text of a phone column; repeat for multiple columns.
        #[arg(long = "phone-col", required = true)]
        phone_cols: Vec<String>,

        /// Header text of the elapsed-days column.
        #[arg(long)]
        days_col: String,
    },

    /// List the cached contacts.
    List {
        /// Only show contacts with exactly this many elapsed days.
        #[arg(long)]
        days: Option<i64>,
    },

    /// Send reminders to the filtered contacts.
    ///
    /// The send filter precedence is: the configured `send.days` value,
    /// then --days, then everyone. Sends run one at a time with a fixed
    /// delay and stop early if the provider rejects the credentials.
    Send {
        /// Ad-hoc elapsed-days filter (overridden by `send.days` in the config).
        #[arg(long)]
        days: Option<i64>,

        /// Show who would receive a message without sending anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check the configured WhatsApp credentials without sending.
    Verify,

    /// Arm the daily send timer and run until Ctrl-C.
    ///
    /// Fires once per day at the configured `schedule.time`, reloading the
    /// contact cache on each fire.
    Schedule {
        /// Ad-hoc elapsed-days filter for scheduled sends (overridden by
        /// `send.days` in the config).
        #[arg(long)]
        days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mode = ReportMode::from_flag(cli.progress.as_deref())?;

    // init runs before config loading: it creates the config
    if let Commands::Init { force } = &cli.command {
        config::scaffold_config(&cli.config, *force)?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),
        Commands::Import {
            file,
            sheet,
            header_row,
            name_col,
            phone_cols,
            days_col,
        } => {
            let mapping = ColumnMapping {
                name_col,
                phone_cols,
                days_col,
            };
            let reporter = mode.reporter();
            import::run_import(
                &cfg,
                &file,
                sheet.as_deref(),
                header_row,
                &mapping,
                reporter.as_ref(),
            )
            .await?;
        }
        Commands::List { days } => {
            contacts::run_list(&cfg, days)?;
        }
        Commands::Send { days, dry_run } => {
            let reporter = mode.reporter();
            dispatch::run_send(&cfg, days, dry_run, reporter.as_ref()).await?;
        }
        Commands::Verify => {
            whatsapp::run_verify(&cfg.whatsapp).await?;
        }
        Commands::Schedule { days } => {
            schedule::run_schedule(&cfg, days, mode).await?;
        }
    }

    Ok(())
}

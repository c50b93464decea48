use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

mod commands;
mod logging;
mod utils;

use commands::{audit, check, table};
use utils::env_paths::EnvPaths;

/// authzctl - inspect and exercise the clinic permission table
#[derive(Parser)]
#[command(name = "authzctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Permission table YAML file (defaults to the built-in clinic table)
    #[arg(long = "table", global = true)]
    table_file: Option<PathBuf>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate requirements for a role through a guard
    Check {
        /// Role to check as (e.g. physician, front-desk)
        #[arg(short, long)]
        role: String,

        /// Requirements as resource:action (e.g. patients:update)
        #[arg(required = true)]
        requirements: Vec<String>,

        /// Grant when any requirement is met instead of all
        #[arg(long)]
        any: bool,

        /// Enterprise recorded on audit entries
        #[arg(long)]
        enterprise: Option<String>,

        /// Site recorded on audit entries
        #[arg(long)]
        site: Option<String>,

        /// Append denials to this hash-chained audit log
        #[arg(long)]
        audit_log: Option<PathBuf>,

        /// Guard configuration YAML (redirect_on_denial)
        #[arg(long)]
        guard_config: Option<PathBuf>,

        /// Navigate here on denial instead of rendering the fallback
        #[arg(long)]
        redirect: Option<String>,

        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the permission table
    Table {
        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the permission table as Cedar policies
    ExportCedar {
        /// Evaluate the policies with Cedar and compare against the table instead of printing
        #[arg(long)]
        verify: bool,
    },

    /// Audit log commands
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
}

#[derive(Subcommand)]
enum AuditAction {
    /// Verify the hash chain of an audit log
    Verify {
        /// Log file (defaults to AUDIT_LOG_PATH)
        path: Option<PathBuf>,
    },

    /// List the entries of an audit log
    Show {
        /// Log file (defaults to AUDIT_LOG_PATH)
        path: Option<PathBuf>,

        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_paths = EnvPaths::load()?;

    let log_dir = cli.log_dir.clone();
    let log_guard = logging::init_logging(cli.verbose, log_dir.as_deref())?;

    let table_path = cli.table_file.clone().or_else(|| env_paths.table_path.clone());

    let code = match run(cli.command, table_path, &env_paths).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            1
        }
    };

    if code != 0 {
        // Flush the file appender before exiting.
        drop(log_guard);
        std::process::exit(code);
    }
    Ok(())
}

async fn run(command: Commands, table_path: Option<PathBuf>, env_paths: &EnvPaths) -> Result<i32> {
    match command {
        Commands::Check {
            role,
            requirements,
            any,
            enterprise,
            site,
            audit_log,
            guard_config,
            redirect,
            format,
        } => {
            let table = commands::load_table(table_path.as_deref())?;
            let allowed = check::execute(
                table,
                check::CheckArgs {
                    role,
                    requirements,
                    any,
                    enterprise,
                    site,
                    format,
                    audit_log: audit_log.or_else(|| env_paths.audit_log_path.clone()),
                    guard_config,
                    redirect,
                },
            )
            .await?;
            Ok(if allowed { 0 } else { 2 })
        }
        Commands::Table { format } => {
            let table = commands::load_table(table_path.as_deref())?;
            table::execute(&table, &format)?;
            Ok(0)
        }
        Commands::ExportCedar { verify } => {
            let table = commands::load_table(table_path.as_deref())?;
            if verify {
                Ok(if table::verify_cedar(&table)? { 0 } else { 1 })
            } else {
                table::export_cedar(&table)?;
                Ok(0)
            }
        }
        Commands::Audit { action } => match action {
            AuditAction::Verify { path } => {
                let path = audit_path(path, env_paths)?;
                Ok(if audit::verify(&path)? { 0 } else { 1 })
            }
            AuditAction::Show { path, format } => {
                let path = audit_path(path, env_paths)?;
                audit::show(&path, &format)?;
                Ok(0)
            }
        },
    }
}

fn audit_path(path: Option<PathBuf>, env_paths: &EnvPaths) -> Result<PathBuf> {
    path.or_else(|| env_paths.audit_log_path.clone())
        .ok_or_else(|| anyhow::anyhow!("No audit log given and AUDIT_LOG_PATH is not set"))
}

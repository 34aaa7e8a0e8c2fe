//! Logs command - view and manage the event log

use anyhow::{anyhow, Result};
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use moveplan_core::services::{EntryPoint, LoggingService};

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days (0 deletes everything)
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List { limit, errors, json } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                return output::print_json(&entries);
            }

            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Entry", "Event", "Mode", "Context", "Error"]);

            for entry in entries {
                let context = [entry.command.as_deref(), entry.hub_id.as_deref()]
                    .iter()
                    .filter_map(|&s| s)
                    .collect::<Vec<_>>()
                    .join(", ");

                let error = match &entry.error_message {
                    Some(msg) => msg.red().to_string(),
                    None => String::new(),
                };

                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.entry_point,
                    entry.event,
                    entry.storage_mode.unwrap_or_default(),
                    context,
                    error,
                ]);
            }

            println!("{}", table);
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            if !force && !json {
                let prompt = if older_than_days == 0 {
                    "Delete all log entries?".to_string()
                } else {
                    format!("Delete logs older than {} days?", older_than_days)
                };
                if !Confirm::new().with_prompt(prompt).default(false).interact()? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = if older_than_days == 0 {
                service.clear()?
            } else {
                let days = i64::try_from(older_than_days)
                    .map_err(|_| anyhow!("--older-than-days is too large"))?;
                let cutoff = Utc::now() - Duration::days(days);
                service.delete_before(cutoff.timestamp_millis())?
            };

            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                println!("Deleted {} log entries", deleted);
            }
        }
        LogsCommands::Stats { json } => {
            let stats = service.stats()?;
            let db_path = service.db_path().map(|p| p.to_path_buf());
            let size_bytes = db_path
                .as_ref()
                .and_then(|p| std::fs::metadata(p).ok())
                .map(|m| m.len())
                .unwrap_or(0);

            if json {
                return output::print_json(&serde_json::json!({
                    "total_entries": stats.total,
                    "error_count": stats.errors,
                    "by_event": stats.by_event,
                    "database_path": db_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                    "database_size_bytes": size_bytes
                }));
            }

            println!("{}", "Log Statistics".bold());
            println!("  Total entries: {}", stats.total);
            println!("  Errors: {}", stats.errors);
            if let Some(path) = &db_path {
                println!("  Database: {}", path.display());
            }
            println!("  Size: {}", output::format_size(size_bytes));
            if !stats.by_event.is_empty() {
                let mut table = output::create_table();
                table.set_header(vec!["Event", "Count"]);
                for (event, count) in &stats.by_event {
                    table.add_row(vec![event.clone(), count.to_string()]);
                }
                println!("{}", table);
            }
        }
    }

    Ok(())
}

//! Migrate command - retry moving guest data into the account

use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use moveplan_core::services::{CollectionStatus, MigrationOutcome, MigrationPhase};

use super::get_context;
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    if !ctx.session.is_signed_in() {
        bail!("Not signed in. Run: mp auth signin --email <email>");
    }

    let outcome = with_spinner(json, ctx.session.retry_pending_migration()).await?;
    match outcome {
        Some(outcome) => report(&outcome, json),
        None if json => output::print_json(&serde_json::json!({ "pending": false })),
        None => {
            output::info("No pending guest data to migrate.");
            Ok(())
        }
    }
}

/// Show a spinner while `fut` runs (hidden for JSON output)
pub async fn with_spinner<F: Future>(json: bool, fut: F) -> F::Output {
    let pb = if json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Moving guest data to your account...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };
    let result = fut.await;
    pb.finish_and_clear();
    result
}

/// Print a migration outcome
pub fn report(outcome: &MigrationOutcome, json: bool) -> Result<()> {
    if json {
        return output::print_json(outcome);
    }

    if outcome.phase == MigrationPhase::NoGuestData {
        output::info("No guest data to migrate.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Collection", "Result"]);
    for (kind, status) in &outcome.collections {
        let result = match status {
            CollectionStatus::Copied(n) => format!("{} copied", n).green().to_string(),
            CollectionStatus::Skipped => "already copied".dimmed().to_string(),
            CollectionStatus::Failed(msg) => msg.red().to_string(),
        };
        table.add_row(vec![kind.to_string(), result]);
    }
    if !outcome.collections.is_empty() {
        println!("{}", table);
    }

    if outcome.success {
        output::success(&format!(
            "Guest data moved to your account ({} records)",
            outcome.records_copied()
        ));
    } else {
        output::error(&format!(
            "Migration failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        ));
        output::info("Your local data is untouched. Retry with: mp migrate");
    }
    Ok(())
}

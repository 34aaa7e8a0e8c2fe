//! CLI command implementations

pub mod auth;
pub mod budget;
pub mod expense;
pub mod inventory;
pub mod logs;
pub mod migrate;
pub mod move_cmd;
pub mod status;
pub mod task;
pub mod timeline;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use rust_decimal::Decimal;

use moveplan_core::services::{EntryPoint, LogEvent};
use moveplan_core::{Hub, MoveDataProvider, MoveplanContext, StorageMode};

use crate::auth::AuthStore;

/// Get the moveplan directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("MOVEPLAN_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".moveplan"))
        .ok_or_else(|| anyhow!("Could not find home directory; set MOVEPLAN_DIR"))
}

/// Open the context and sign the stored user back in
pub fn get_context() -> Result<MoveplanContext> {
    let data_dir = get_data_dir()?;
    let ctx = MoveplanContext::new(&data_dir, EntryPoint::Cli)
        .context("Failed to initialize moveplan context")?;
    if let Some(user) = AuthStore::open(&data_dir).current_user()? {
        ctx.session.restore(user)?;
    }
    Ok(ctx)
}

/// Everything a record command needs: context, hub and provider
pub struct Workspace {
    pub ctx: MoveplanContext,
    pub hub: Hub,
    pub provider: Arc<dyn MoveDataProvider>,
}

impl Workspace {
    pub async fn open(command: &str) -> Result<Self> {
        let ctx = get_context()?;
        let hub = ctx.session.active_hub().await?;
        let provider = ctx.session.provider()?;
        ctx.log(
            LogEvent::new("command")
                .with_command(command)
                .with_mode(provider.mode())
                .with_hub(hub.id.clone()),
        );
        Ok(Self { ctx, hub, provider })
    }

    pub fn hub_id(&self) -> &str {
        &self.hub.id
    }

    /// Hint at signing up once a guest has added enough records
    pub fn nudge_signup(&self) {
        if self.provider.mode() != StorageMode::Local {
            return;
        }
        let threshold = self.ctx.config.signup_prompt_threshold;
        match self.ctx.guest().activity_count() {
            Ok(count) if threshold > 0 && count >= threshold => {
                println!(
                    "{}",
                    format!(
                        "You have added {} items as a guest. Create an account to keep them: mp auth signup --email <you@example.com>",
                        count
                    )
                    .dimmed()
                );
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "could not read guest activity"),
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid date '{}'. Use YYYY-MM-DD", value))
}

pub fn parse_amount(value: &str) -> Result<Decimal> {
    value
        .trim()
        .trim_start_matches('$')
        .parse::<Decimal>()
        .map_err(|_| anyhow!("Invalid amount '{}'", value))
}

/// `--due ""` style clearing: an empty string means "remove the value"
pub fn parse_optional_date(value: Option<String>) -> Result<Option<Option<NaiveDate>>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(Some(None)),
        Some(v) => Ok(Some(Some(parse_date(&v)?))),
    }
}

pub fn parse_optional_amount(value: Option<String>) -> Result<Option<Option<Decimal>>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(Some(None)),
        Some(v) => Ok(Some(Some(parse_amount(&v)?))),
    }
}

pub fn optional_text(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if v.trim().is_empty() { None } else { Some(v) })
}

/// Report whether an update/delete found its record
pub fn report_found(found: bool, what: &str, id: &str, verb: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "id": id, "found": found }));
    } else if found {
        crate::output::success(&format!("{} {} {}", what, id, verb));
    } else {
        crate::output::warning(&format!("No {} with id {}", what.to_lowercase(), id));
    }
    Ok(())
}

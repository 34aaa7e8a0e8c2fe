//! Auth commands - accounts and sessions

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use moveplan_core::services::Activation;

use super::migrate::{report, with_spinner};
use super::{get_context, get_data_dir};
use crate::auth::AuthStore;
use crate::output;

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Create an account; guest data moves over once it is active
    Signup {
        #[arg(long)]
        email: String,
        /// Require confirmation before the account can be used
        #[arg(long)]
        defer: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Confirm a deferred account
    Confirm {
        #[arg(long)]
        email: String,
    },
    /// Sign in (runs any pending guest migration)
    Signin {
        #[arg(long)]
        email: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign out and return to guest mode
    Signout,
    /// Show who is signed in and which storage is used
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: AuthCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    let auth = AuthStore::open(&data_dir);
    let ctx = get_context()?;

    match command {
        AuthCommands::Signup { email, defer, json } => {
            if ctx.session.is_signed_in() {
                bail!("Already signed in. Run: mp auth signout");
            }
            let user = auth.sign_up(&email, !defer)?;
            let activation = if defer {
                Activation::Deferred
            } else {
                Activation::Immediate
            };
            let outcome = with_spinner(json || defer, ctx.session.sign_up(user.clone(), activation)).await?;

            if defer {
                if json {
                    return output::print_json(&serde_json::json!({ "user": user, "confirmed": false }));
                }
                output::success(&format!("Account created for {}", user.email));
                output::info(&format!(
                    "Confirm it with: mp auth confirm --email {}, then sign in",
                    user.email
                ));
                return Ok(());
            }

            match outcome {
                Some(outcome) => report(&outcome, json)?,
                None if json => output::print_json(&serde_json::json!({ "user": user }))?,
                None => output::success(&format!("Signed up as {}", user.email)),
            }
        }
        AuthCommands::Confirm { email } => {
            let user = auth.confirm(&email)?;
            output::success(&format!("{} confirmed", user.email));
            output::info(&format!("Sign in with: mp auth signin --email {}", user.email));
        }
        AuthCommands::Signin { email, json } => {
            let user = auth.sign_in(&email)?;
            let outcome = with_spinner(json, ctx.session.establish_session(user.clone())).await?;
            match outcome {
                Some(outcome) => report(&outcome, json)?,
                None if json => output::print_json(&serde_json::json!({ "user": user }))?,
                None => output::success(&format!("Signed in as {}", user.email)),
            }
        }
        AuthCommands::Signout => {
            auth.sign_out()?;
            match ctx.session.sign_out()? {
                Some(user) => output::success(&format!("Signed out {}", user.email)),
                None => output::info("Not signed in."),
            }
        }
        AuthCommands::Status { json } => {
            let user = ctx.session.current_user()?;
            let guest = ctx.guest();
            let activity = guest.activity_count()?;
            let pending = match &user {
                Some(u) => guest.pending_migration(&u.id)?,
                None => None,
            };

            if json {
                return output::print_json(&serde_json::json!({
                    "user": user,
                    "storageMode": ctx.session.mode(),
                    "guestId": guest.current_guest_id()?,
                    "guestActivity": activity,
                    "pendingMigration": pending.is_some(),
                }));
            }

            match &user {
                Some(u) => println!("{} {}", "Signed in as".bold(), u.email),
                None => println!("{}", "Guest (not signed in)".bold()),
            }
            println!("  Storage: {}", ctx.session.mode());
            if user.is_none() {
                println!("  Items added as guest: {}", activity);
            }
            if pending.is_some() {
                output::warning("  Guest data is waiting to be migrated. Run: mp migrate");
            }
        }
    }

    Ok(())
}

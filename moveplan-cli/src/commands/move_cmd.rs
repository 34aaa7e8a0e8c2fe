//! Move details commands - addresses and moving day

use anyhow::Result;
use chrono::Local;
use clap::Subcommand;
use colored::Colorize;

use moveplan_core::MoveDetailsPatch;

use super::{parse_optional_date, Workspace};
use crate::output;

#[derive(Subcommand)]
pub enum MoveCommands {
    /// Show the move details
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set addresses and/or the move date (empty date clears it)
    Set {
        #[arg(long = "from")]
        current_address: Option<String>,
        #[arg(long = "to")]
        new_address: Option<String>,
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: MoveCommands) -> Result<()> {
    let ws = Workspace::open("move").await?;

    match command {
        MoveCommands::Show { json } => {
            let details = ws.provider.get_move_details(ws.hub_id()).await?;
            if json {
                return output::print_json(&details);
            }
            let Some(details) = details else {
                println!("No move details yet. Use: mp move set --from <address> --to <address> --date <YYYY-MM-DD>");
                return Ok(());
            };
            println!("{}", ws.hub.name.bold());
            println!("  From: {}", details.current_address);
            println!("  To:   {}", details.new_address);
            println!("  Date: {}", output::opt_date(details.move_date));
            if let Some(days) = details.days_until_move(Local::now().date_naive()) {
                match days {
                    d if d > 0 => println!("  {} days to go", d),
                    0 => println!("  {}", "Moving day is today".green()),
                    d => println!("  {}", format!("Moved {} days ago", -d).dimmed()),
                }
            }
        }
        MoveCommands::Set {
            current_address,
            new_address,
            date,
            json,
        } => {
            let patch = MoveDetailsPatch {
                current_address,
                new_address,
                move_date: parse_optional_date(date)?,
                created_date: None,
            };
            let details = ws.provider.save_move_details(ws.hub_id(), patch).await?;
            if json {
                return output::print_json(&details);
            }
            output::success("Move details saved");
        }
    }

    Ok(())
}

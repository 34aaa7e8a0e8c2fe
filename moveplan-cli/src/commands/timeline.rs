//! Timeline commands - dated milestones

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use moveplan_core::{NewTimelineEvent, TimelineEventPatch};

use super::{optional_text, parse_date, report_found, Workspace};
use crate::output;

#[derive(Subcommand)]
pub enum TimelineCommands {
    /// List events in date order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an event
    Add {
        title: String,
        /// Date (YYYY-MM-DD)
        date: String,
        #[arg(long = "type", default_value = "milestone")]
        event_type: String,
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an event
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "type")]
        event_type: Option<String>,
        /// Empty value removes the notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an event
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: TimelineCommands) -> Result<()> {
    let ws = Workspace::open("timeline").await?;

    match command {
        TimelineCommands::List { json } => {
            let events = ws.provider.list_timeline_events(ws.hub_id()).await?;
            if json {
                return output::print_json(&events);
            }
            if events.is_empty() {
                println!("No timeline events yet.");
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["ID", "Date", "Title", "Type", "Notes"]);
            for event in events {
                table.add_row(vec![
                    event.id,
                    event.date.to_string(),
                    event.title,
                    event.event_type,
                    event.notes.unwrap_or_default(),
                ]);
            }
            println!("{}", table);
        }
        TimelineCommands::Add {
            title,
            date,
            event_type,
            notes,
            json,
        } => {
            let mut draft = NewTimelineEvent::new(title, parse_date(&date)?, event_type);
            if let Some(notes) = notes {
                draft = draft.with_notes(notes);
            }
            let event = ws.provider.add_timeline_event(ws.hub_id(), draft).await?;
            if json {
                return output::print_json(&event);
            }
            output::success(&format!("Added event {}", event.id));
            ws.nudge_signup();
        }
        TimelineCommands::Update {
            id,
            title,
            date,
            event_type,
            notes,
            json,
        } => {
            let patch = TimelineEventPatch {
                title,
                date: date.as_deref().map(parse_date).transpose()?,
                event_type,
                notes: optional_text(notes),
            };
            let found = ws
                .provider
                .update_timeline_event(ws.hub_id(), &id, patch)
                .await?;
            report_found(found, "Event", &id, "updated", json)?;
        }
        TimelineCommands::Delete { id, force, json } => {
            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete event {}?", id))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", "Cancelled".dimmed());
                    return Ok(());
                }
            }
            let found = ws.provider.delete_timeline_event(ws.hub_id(), &id).await?;
            report_found(found, "Event", &id, "deleted", json)?;
        }
    }

    Ok(())
}

//! Inventory commands - household items and what happens to them

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use moveplan_core::{Disposition, InventoryItem, InventoryItemPatch, NewInventoryItem};

use super::{optional_text, parse_amount, parse_optional_amount, report_found, Workspace};
use crate::output;

#[derive(Subcommand)]
pub enum InventoryCommands {
    /// List items
    List {
        #[arg(long)]
        room: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item
    Add {
        name: String,
        #[arg(long)]
        room: String,
        /// keep, sell, donate or trash
        #[arg(long, default_value = "keep")]
        disposition: String,
        /// Box label the item is packed in
        #[arg(long = "box")]
        box_label: Option<String>,
        #[arg(long)]
        value: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an item (sale fields only stick for items marked sell)
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        room: Option<String>,
        #[arg(long)]
        disposition: Option<String>,
        #[arg(long = "box")]
        box_label: Option<String>,
        #[arg(long)]
        value: Option<String>,
        #[arg(long)]
        sold: Option<bool>,
        #[arg(long)]
        sold_amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an item
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

pub async fn run(command: InventoryCommands) -> Result<()> {
    let ws = Workspace::open("inventory").await?;

    match command {
        InventoryCommands::List { room, json } => {
            let mut items = ws.provider.list_inventory_items(ws.hub_id()).await?;
            if let Some(room) = room {
                items.retain(|i| i.room.eq_ignore_ascii_case(&room));
            }
            if json {
                return output::print_json(&items);
            }
            print_items(&items);
        }
        InventoryCommands::Add {
            name,
            room,
            disposition,
            box_label,
            value,
            json,
        } => {
            let mut draft = NewInventoryItem::new(name, room)
                .with_disposition(disposition.parse::<Disposition>()?);
            if let Some(box_label) = box_label {
                draft = draft.with_box(box_label);
            }
            if let Some(value) = value {
                draft = draft.with_value(parse_amount(&value)?);
            }
            let item = ws.provider.add_inventory_item(ws.hub_id(), draft).await?;
            if json {
                return output::print_json(&item);
            }
            output::success(&format!("Added item {}", item.id));
            ws.nudge_signup();
        }
        InventoryCommands::Update {
            id,
            name,
            room,
            disposition,
            box_label,
            value,
            sold,
            sold_amount,
            json,
        } => {
            let patch = InventoryItemPatch {
                name,
                room,
                disposition: disposition.map(|d| d.parse::<Disposition>()).transpose()?,
                box_label: optional_text(box_label),
                value: parse_optional_amount(value)?,
                sold: sold.map(Some),
                sold_amount: parse_optional_amount(sold_amount)?,
            };
            let found = ws
                .provider
                .update_inventory_item(ws.hub_id(), &id, patch)
                .await?;
            report_found(found, "Item", &id, "updated", json)?;
        }
        InventoryCommands::Delete { id, force, json } => {
            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete item {}?", id))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", "Cancelled".dimmed());
                    return Ok(());
                }
            }
            let found = ws.provider.delete_inventory_item(ws.hub_id(), &id).await?;
            report_found(found, "Item", &id, "deleted", json)?;
        }
    }

    Ok(())
}

fn print_items(items: &[InventoryItem]) {
    if items.is_empty() {
        println!("No inventory items yet.");
        return;
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Name", "Room", "Disposition", "Box", "Value", "Sold"]);
    for item in items {
        let sold = if item.is_sold() {
            output::opt_money(item.sold_amount).green().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            item.id.clone(),
            item.name.clone(),
            item.room.clone(),
            item.disposition.to_string(),
            item.box_label.clone().unwrap_or_default(),
            output::opt_money(item.value),
            sold,
        ]);
    }
    println!("{}", table);
}

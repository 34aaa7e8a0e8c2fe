//! Status command - dashboard for the active hub

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use moveplan_core::services::StatusService;

use super::Workspace;
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ws = Workspace::open("status").await?;
    let status = StatusService::summary(ws.provider.as_ref(), &ws.hub, Local::now().date_naive()).await;

    if json {
        return output::print_json(&status);
    }

    println!("{} ({} storage)", status.hub_name.bold(), status.storage_mode);
    println!();

    // Vertical key-value summary
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let open = status.tasks_by_status.get("pending").copied().unwrap_or(0)
        + status.tasks_by_status.get("in-progress").copied().unwrap_or(0);
    table.add_row(vec![
        "Tasks".to_string(),
        format!("{} ({} open)", status.total_tasks, open),
    ]);
    table.add_row(vec!["Spent".to_string(), output::money(status.total_spent)]);
    if let (Some(total), Some(remaining)) = (status.budget_total, status.budget_remaining) {
        table.add_row(vec!["Budget".to_string(), output::money(total)]);
        let remaining = if remaining.is_sign_negative() {
            output::money(remaining).red().to_string()
        } else {
            output::money(remaining)
        };
        table.add_row(vec!["Remaining".to_string(), remaining]);
    }
    table.add_row(vec!["Items".to_string(), status.total_items.to_string()]);
    if !status.sold_revenue.is_zero() {
        table.add_row(vec!["Sold".to_string(), output::money(status.sold_revenue)]);
    }
    if let Some(days) = status.days_until_move {
        table.add_row(vec!["Days until move".to_string(), days.to_string()]);
    }
    println!("{}", table);

    if let Some(event) = &status.next_event {
        println!();
        println!("{} {} on {}", "Next up:".bold(), event.title, event.date);
    }

    if !status.urgent_tasks.is_empty() {
        println!();
        println!("{}", "Needs attention".bold());
        for title in &status.urgent_tasks {
            println!("  - {}", title);
        }
    }

    let over_budget: Vec<_> = status
        .categories
        .iter()
        .filter(|c| c.budget.is_some_and(|b| c.spent > b))
        .collect();
    if !over_budget.is_empty() {
        println!();
        for category in over_budget {
            output::warning(&format!(
                "{} is over budget: {} of {}",
                category.category,
                output::money(category.spent),
                output::opt_money(category.budget)
            ));
        }
    }

    ws.nudge_signup();
    Ok(())
}

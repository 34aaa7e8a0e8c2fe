//! Budget commands

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;

use moveplan_core::BudgetPatch;

use super::{parse_amount, Workspace};
use crate::output;

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Show the budget
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the total and/or per-category budgets
    Set {
        #[arg(long)]
        total: Option<String>,
        /// Category budget as name=amount (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Drop all category budgets
        #[arg(long, conflicts_with = "categories")]
        clear_categories: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: BudgetCommands) -> Result<()> {
    let ws = Workspace::open("budget").await?;

    match command {
        BudgetCommands::Show { json } => {
            let budget = ws.provider.get_budget(ws.hub_id()).await?;
            if json {
                return output::print_json(&budget);
            }
            let Some(budget) = budget else {
                println!("No budget set. Use: mp budget set --total <amount>");
                return Ok(());
            };
            println!("{} {}", "Total budget:".bold(), output::money(budget.total_budget));
            if let Some(categories) = budget.category_budgets.filter(|c| !c.is_empty()) {
                let mut table = output::create_table();
                table.set_header(vec!["Category", "Budget"]);
                for (category, amount) in categories {
                    table.add_row(vec![category, output::money(amount)]);
                }
                println!("{}", table);
            }
        }
        BudgetCommands::Set {
            total,
            categories,
            clear_categories,
            json,
        } => {
            let category_budgets = if clear_categories {
                Some(None)
            } else if categories.is_empty() {
                None
            } else {
                Some(Some(parse_categories(&categories)?))
            };
            let patch = BudgetPatch {
                total_budget: total.as_deref().map(parse_amount).transpose()?,
                category_budgets,
            };
            if patch == BudgetPatch::default() {
                output::warning("Nothing to update");
                return Ok(());
            }
            let budget = ws.provider.save_budget(ws.hub_id(), patch).await?;
            if json {
                return output::print_json(&budget);
            }
            output::success(&format!(
                "Budget saved (total {})",
                output::money(budget.total_budget)
            ));
        }
    }

    Ok(())
}

fn parse_categories(values: &[String]) -> Result<BTreeMap<String, Decimal>> {
    values
        .iter()
        .map(|value| {
            let (name, amount) = value
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected name=amount, got '{}'", value))?;
            Ok((name.trim().to_string(), parse_amount(amount)?))
        })
        .collect()
}

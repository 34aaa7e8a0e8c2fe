//! Expense commands

use anyhow::Result;
use chrono::Local;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use rust_decimal::Decimal;

use moveplan_core::{Expense, ExpensePatch, NewExpense};

use super::{optional_text, parse_amount, parse_date, report_found, Workspace};
use crate::output;

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// List expenses, newest first
    List {
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record an expense
    Add {
        description: String,
        amount: String,
        #[arg(long, default_value = "other")]
        category: String,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        vendor: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an expense
    Update {
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
        /// Empty value removes the vendor
        #[arg(long)]
        vendor: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an expense
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

pub async fn run(command: ExpenseCommands) -> Result<()> {
    let ws = Workspace::open("expense").await?;

    match command {
        ExpenseCommands::List { category, json } => {
            let mut expenses = ws.provider.list_expenses(ws.hub_id()).await?;
            if let Some(category) = category {
                expenses.retain(|e| e.category.eq_ignore_ascii_case(&category));
            }
            if json {
                return output::print_json(&expenses);
            }
            print_expenses(&expenses);
        }
        ExpenseCommands::Add {
            description,
            amount,
            category,
            date,
            vendor,
            json,
        } => {
            let date = match date {
                Some(d) => parse_date(&d)?,
                None => Local::now().date_naive(),
            };
            let mut draft = NewExpense::new(description, parse_amount(&amount)?, category, date);
            if let Some(vendor) = vendor {
                draft = draft.with_vendor(vendor);
            }

            let expense = ws.provider.add_expense(ws.hub_id(), draft).await?;
            if json {
                return output::print_json(&expense);
            }
            output::success(&format!(
                "Recorded {} ({})",
                output::money(expense.amount),
                expense.id
            ));
            ws.nudge_signup();
        }
        ExpenseCommands::Update {
            id,
            description,
            amount,
            category,
            date,
            vendor,
            json,
        } => {
            let patch = ExpensePatch {
                description,
                amount: amount.as_deref().map(parse_amount).transpose()?,
                category,
                date: date.as_deref().map(parse_date).transpose()?,
                vendor: optional_text(vendor),
            };
            let found = ws.provider.update_expense(ws.hub_id(), &id, patch).await?;
            report_found(found, "Expense", &id, "updated", json)?;
        }
        ExpenseCommands::Delete { id, force, json } => {
            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete expense {}?", id))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", "Cancelled".dimmed());
                    return Ok(());
                }
            }
            let found = ws.provider.delete_expense(ws.hub_id(), &id).await?;
            report_found(found, "Expense", &id, "deleted", json)?;
        }
    }

    Ok(())
}

fn print_expenses(expenses: &[Expense]) {
    if expenses.is_empty() {
        println!("No expenses yet.");
        return;
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Date", "Description", "Category", "Vendor", "Amount"]);
    for expense in expenses {
        table.add_row(vec![
            expense.id.clone(),
            expense.date.to_string(),
            expense.description.clone(),
            expense.category.clone(),
            expense.vendor.clone().unwrap_or_default(),
            output::money(expense.amount),
        ]);
    }
    println!("{}", table);

    let total: Decimal = expenses.iter().map(|e| e.amount).sum();
    println!("Total: {}", output::money(total).bold());
}

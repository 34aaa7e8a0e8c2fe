//! Task commands - the move checklist

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use moveplan_core::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};

use super::{
    optional_text, parse_date, parse_optional_amount, parse_optional_date, report_found,
    Workspace,
};
use crate::output;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// List tasks
    List {
        /// Only show open tasks
        #[arg(long)]
        open: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a task
    Add {
        title: String,
        /// low, medium, high or urgent
        #[arg(long, default_value = "medium")]
        priority: String,
        #[arg(long)]
        category: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        cost: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of a task (empty values clear optional fields)
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// pending, in-progress, completed or cancelled
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        cost: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a task completed
    Done {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a task
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

pub async fn run(command: TaskCommands) -> Result<()> {
    let ws = Workspace::open("task").await?;

    match command {
        TaskCommands::List { open, json } => {
            let mut tasks = ws.provider.list_tasks(ws.hub_id()).await?;
            if open {
                tasks.retain(Task::is_open);
            }
            if json {
                return output::print_json(&tasks);
            }
            print_tasks(&tasks);
        }
        TaskCommands::Add {
            title,
            priority,
            category,
            due,
            cost,
            description,
            json,
        } => {
            let mut draft = NewTask::new(title).with_priority(priority.parse::<TaskPriority>()?);
            if let Some(category) = category {
                draft = draft.with_category(category);
            }
            if let Some(due) = due {
                draft = draft.with_due_date(parse_date(&due)?);
            }
            if let Some(Some(cost)) = parse_optional_amount(cost)? {
                draft = draft.with_cost(cost);
            }
            if let Some(description) = description {
                draft = draft.with_description(description);
            }

            let task = ws.provider.add_task(ws.hub_id(), draft).await?;
            if json {
                return output::print_json(&task);
            }
            output::success(&format!("Added task {}", task.id));
            ws.nudge_signup();
        }
        TaskCommands::Update {
            id,
            title,
            status,
            priority,
            category,
            due,
            cost,
            description,
            json,
        } => {
            let patch = TaskPatch {
                title,
                description: optional_text(description),
                status: status.map(|s| s.parse::<TaskStatus>()).transpose()?,
                priority: priority.map(|p| p.parse::<TaskPriority>()).transpose()?,
                category,
                due_date: parse_optional_date(due)?,
                cost: parse_optional_amount(cost)?,
            };
            if patch.is_empty() {
                output::warning("Nothing to update");
                return Ok(());
            }
            let found = ws.provider.update_task(ws.hub_id(), &id, patch).await?;
            report_found(found, "Task", &id, "updated", json)?;
        }
        TaskCommands::Done { id, json } => {
            let found = ws
                .provider
                .update_task(ws.hub_id(), &id, TaskPatch::status(TaskStatus::Completed))
                .await?;
            report_found(found, "Task", &id, "completed", json)?;
        }
        TaskCommands::Delete { id, force, json } => {
            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete task {}?", id))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", "Cancelled".dimmed());
                    return Ok(());
                }
            }
            let found = ws.provider.delete_task(ws.hub_id(), &id).await?;
            report_found(found, "Task", &id, "deleted", json)?;
        }
    }

    Ok(())
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks yet.");
        return;
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Title", "Status", "Priority", "Category", "Due"]);
    for task in tasks {
        let status = match task.status {
            TaskStatus::Completed => task.status.to_string().green().to_string(),
            TaskStatus::Cancelled => task.status.to_string().dimmed().to_string(),
            _ => task.status.to_string(),
        };
        let priority = match task.priority {
            TaskPriority::Urgent | TaskPriority::High => task.priority.to_string().red().to_string(),
            _ => task.priority.to_string(),
        };
        table.add_row(vec![
            task.id.clone(),
            task.title.clone(),
            status,
            priority,
            task.category.clone(),
            output::opt_date(task.due_date),
        ]);
    }
    println!("{}", table);
}

//! Status service - dashboard summary for one hub

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{Disposition, Hub, TaskPriority, TaskStatus, TimelineEvent};
use crate::ports::{MoveDataProvider, ReadFallback, StorageMode};

/// Status service for hub summaries
pub struct StatusService;

impl StatusService {
    /// Summarize everything stored for `hub` as of `today`
    ///
    /// Unreadable collections count as empty; the provider's fallback reads
    /// log the underlying error.
    pub async fn summary(
        provider: &dyn MoveDataProvider,
        hub: &Hub,
        today: NaiveDate,
    ) -> StatusSummary {
        let (tasks, expenses, timeline, inventory, budget, details) = tokio::join!(
            provider.tasks_or_empty(&hub.id),
            provider.expenses_or_empty(&hub.id),
            provider.timeline_or_empty(&hub.id),
            provider.inventory_or_empty(&hub.id),
            provider.budget_or_none(&hub.id),
            provider.move_details_or_none(&hub.id),
        );

        let mut tasks_by_status: BTreeMap<String, usize> = TaskStatus::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        for task in &tasks {
            *tasks_by_status.entry(task.status.to_string()).or_default() += 1;
        }
        let urgent_tasks = tasks
            .iter()
            .filter(|t| t.is_open() && t.priority >= TaskPriority::High)
            .map(|t| t.title.clone())
            .collect();

        let total_spent: Decimal = expenses.iter().map(|e| e.amount).sum();
        let mut spent_by_category: BTreeMap<String, Decimal> = BTreeMap::new();
        for expense in &expenses {
            *spent_by_category.entry(expense.category.clone()).or_default() += expense.amount;
        }
        if let Some(categories) = budget.as_ref().and_then(|b| b.category_budgets.as_ref()) {
            for category in categories.keys() {
                spent_by_category.entry(category.clone()).or_default();
            }
        }
        let categories = spent_by_category
            .into_iter()
            .map(|(category, spent)| CategorySpend {
                budget: budget.as_ref().and_then(|b| b.category_budget(&category)),
                category,
                spent,
            })
            .collect();

        let mut inventory_by_disposition: BTreeMap<String, usize> = Disposition::ALL
            .iter()
            .map(|d| (d.to_string(), 0))
            .collect();
        for item in &inventory {
            *inventory_by_disposition
                .entry(item.disposition.to_string())
                .or_default() += 1;
        }
        let sold_revenue = inventory
            .iter()
            .filter(|i| i.is_sold())
            .filter_map(|i| i.sold_amount)
            .sum();

        // Timeline is already date-ascending
        let next_event = timeline.into_iter().find(|e| e.date >= today);

        StatusSummary {
            hub_id: hub.id.clone(),
            hub_name: hub.name.clone(),
            storage_mode: provider.mode(),
            total_tasks: tasks.len(),
            tasks_by_status,
            urgent_tasks,
            total_spent,
            budget_total: budget.as_ref().map(|b| b.total_budget),
            budget_remaining: budget.as_ref().map(|b| b.total_budget - total_spent),
            categories,
            total_items: inventory.len(),
            inventory_by_disposition,
            sold_revenue,
            next_event,
            move_date: details.as_ref().and_then(|d| d.move_date),
            days_until_move: details.as_ref().and_then(|d| d.days_until_move(today)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub hub_id: String,
    pub hub_name: String,
    pub storage_mode: StorageMode,
    pub total_tasks: usize,
    pub tasks_by_status: BTreeMap<String, usize>,
    /// Titles of open high and urgent tasks
    pub urgent_tasks: Vec<String>,
    pub total_spent: Decimal,
    pub budget_total: Option<Decimal>,
    pub budget_remaining: Option<Decimal>,
    pub categories: Vec<CategorySpend>,
    pub total_items: usize,
    pub inventory_by_disposition: BTreeMap<String, usize>,
    pub sold_revenue: Decimal,
    pub next_event: Option<TimelineEvent>,
    pub move_date: Option<NaiveDate>,
    pub days_until_move: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CategorySpend {
    pub category: String,
    pub spent: Decimal,
    pub budget: Option<Decimal>,
}

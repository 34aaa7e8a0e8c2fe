//! Budget domain model (one per hub)

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::normalize_money;
use super::result::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub total_budget: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_budgets: Option<BTreeMap<String, Decimal>>,
}

/// Upsert input for the hub budget
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetPatch {
    pub total_budget: Option<Decimal>,
    pub category_budgets: Option<Option<BTreeMap<String, Decimal>>>,
}

impl BudgetPatch {
    pub fn total(total_budget: Decimal) -> Self {
        Self {
            total_budget: Some(total_budget),
            ..Self::default()
        }
    }
}

impl From<Budget> for BudgetPatch {
    fn from(budget: Budget) -> Self {
        Self {
            total_budget: Some(budget.total_budget),
            category_budgets: Some(budget.category_budgets),
        }
    }
}

impl Budget {
    /// Shallow-merge a patch over the stored budget (if any)
    pub fn merge(existing: Option<Budget>, patch: BudgetPatch) -> Budget {
        let mut budget = existing.unwrap_or(Budget {
            total_budget: Decimal::ZERO,
            category_budgets: None,
        });
        if let Some(total) = patch.total_budget {
            budget.total_budget = total;
        }
        if let Some(categories) = patch.category_budgets {
            budget.category_budgets = categories;
        }
        budget
    }

    /// Round the total and every category budget to cents
    pub fn normalize_money(&mut self) -> Result<()> {
        self.total_budget = normalize_money(self.total_budget)?;
        if let Some(categories) = self.category_budgets.as_mut() {
            for amount in categories.values_mut() {
                *amount = normalize_money(*amount)?;
            }
        }
        Ok(())
    }

    pub fn category_budget(&self, category: &str) -> Option<Decimal> {
        self.category_budgets
            .as_ref()
            .and_then(|c| c.get(category).copied())
    }
}

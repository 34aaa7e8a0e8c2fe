//! Expense domain model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind};
use super::money::normalize_money;
use super::result::Result;

/// Money spent on the move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

/// Input for creating an expense
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    pub date: NaiveDate,
    pub vendor: Option<String>,
}

impl NewExpense {
    pub fn new(
        description: impl Into<String>,
        amount: Decimal,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            description: description.into(),
            amount,
            category: category.into(),
            date,
            vendor: None,
        }
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }
}

impl From<Expense> for NewExpense {
    fn from(expense: Expense) -> Self {
        Self {
            description: expense.description,
            amount: expense.amount,
            category: expense.category,
            date: expense.date,
            vendor: expense.vendor,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpensePatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub vendor: Option<Option<String>>,
}

impl Entity for Expense {
    type Draft = NewExpense;
    type Patch = ExpensePatch;

    const KIND: EntityKind = EntityKind::Expenses;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: NewExpense) -> Self {
        Self {
            id,
            description: draft.description,
            amount: draft.amount,
            category: draft.category,
            date: draft.date,
            vendor: draft.vendor,
        }
    }

    fn normalize_money(&mut self) -> Result<()> {
        self.amount = normalize_money(self.amount)?;
        Ok(())
    }

    fn apply(&mut self, patch: ExpensePatch) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(vendor) = patch.vendor {
            self.vendor = vendor;
        }
    }

    /// Newest first
    fn sort(items: &mut [Self]) {
        items.sort_by(|a, b| b.date.cmp(&a.date));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(id: &str, day: u32) -> Expense {
        Expense::from_draft(
            id.to_string(),
            NewExpense::new(
                "Truck rental",
                Decimal::new(19999, 2),
                "transport",
                NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            ),
        )
    }

    #[test]
    fn test_sort_newest_first() {
        let mut items = vec![expense("a", 1), expense("b", 20), expense("c", 10)];
        Expense::sort(&mut items);
        let ids: Vec<&str> = items.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_amount_accepts_json_numbers() {
        let parsed: Expense = serde_json::from_str(
            r#"{"id":"x","description":"Tape","amount":12.5,"category":"supplies","date":"2024-06-02"}"#,
        )
        .unwrap();
        assert_eq!(parsed.amount, Decimal::new(125, 1));
        assert!(parsed.vendor.is_none());
    }

    #[test]
    fn test_clear_vendor() {
        let mut item = expense("a", 1);
        item.vendor = Some("U-Haul".to_string());
        item.apply(ExpensePatch {
            vendor: Some(None),
            ..ExpensePatch::default()
        });
        assert!(item.vendor.is_none());
        assert_eq!(item.description, "Truck rental");
    }
}

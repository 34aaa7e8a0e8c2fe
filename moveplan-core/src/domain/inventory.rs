//! Inventory item domain model

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind};
use super::money::normalize_optional_money;
use super::result::{Error, Result};

/// What happens to an item on moving day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    #[default]
    Keep,
    Sell,
    Donate,
    Trash,
}

impl Disposition {
    pub const ALL: [Disposition; 4] = [
        Disposition::Keep,
        Disposition::Sell,
        Disposition::Donate,
        Disposition::Trash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Keep => "keep",
            Disposition::Sell => "sell",
            Disposition::Donate => "donate",
            Disposition::Trash => "trash",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disposition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(Disposition::Keep),
            "sell" => Ok(Disposition::Sell),
            "donate" => Ok(Disposition::Donate),
            "trash" => Ok(Disposition::Trash),
            other => Err(Error::validation(format!("unknown disposition '{}'", other))),
        }
    }
}

/// A household item being tracked through the move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub room: String,
    #[serde(default)]
    pub disposition: Disposition,
    /// Box label the item is packed in
    #[serde(rename = "box", default, skip_serializing_if = "Option::is_none")]
    pub box_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_amount: Option<Decimal>,
}

impl InventoryItem {
    /// Sale fields only exist while the item is marked for sale
    fn normalize(&mut self) {
        if self.disposition != Disposition::Sell {
            self.sold = None;
            self.sold_amount = None;
        }
    }

    pub fn is_sold(&self) -> bool {
        self.sold.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInventoryItem {
    pub name: String,
    pub room: String,
    pub disposition: Disposition,
    pub box_label: Option<String>,
    pub value: Option<Decimal>,
    pub sold: Option<bool>,
    pub sold_amount: Option<Decimal>,
}

impl NewInventoryItem {
    pub fn new(name: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            room: room.into(),
            disposition: Disposition::default(),
            box_label: None,
            value: None,
            sold: None,
            sold_amount: None,
        }
    }

    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    pub fn with_box(mut self, box_label: impl Into<String>) -> Self {
        self.box_label = Some(box_label.into());
        self
    }

    pub fn with_value(mut self, value: Decimal) -> Self {
        self.value = Some(value);
        self
    }
}

impl From<InventoryItem> for NewInventoryItem {
    fn from(item: InventoryItem) -> Self {
        Self {
            name: item.name,
            room: item.room,
            disposition: item.disposition,
            box_label: item.box_label,
            value: item.value,
            sold: item.sold,
            sold_amount: item.sold_amount,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryItemPatch {
    pub name: Option<String>,
    pub room: Option<String>,
    pub disposition: Option<Disposition>,
    pub box_label: Option<Option<String>>,
    pub value: Option<Option<Decimal>>,
    pub sold: Option<Option<bool>>,
    pub sold_amount: Option<Option<Decimal>>,
}

impl Entity for InventoryItem {
    type Draft = NewInventoryItem;
    type Patch = InventoryItemPatch;

    const KIND: EntityKind = EntityKind::InventoryItems;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: NewInventoryItem) -> Self {
        let mut item = Self {
            id,
            name: draft.name,
            room: draft.room,
            disposition: draft.disposition,
            box_label: draft.box_label,
            value: draft.value,
            sold: draft.sold,
            sold_amount: draft.sold_amount,
        };
        item.normalize();
        item
    }

    fn normalize_money(&mut self) -> Result<()> {
        self.value = normalize_optional_money(self.value)?;
        self.sold_amount = normalize_optional_money(self.sold_amount)?;
        Ok(())
    }

    fn apply(&mut self, patch: InventoryItemPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(room) = patch.room {
            self.room = room;
        }
        if let Some(disposition) = patch.disposition {
            self.disposition = disposition;
        }
        if let Some(box_label) = patch.box_label {
            self.box_label = box_label;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(sold) = patch.sold {
            self.sold = sold;
        }
        if let Some(sold_amount) = patch.sold_amount {
            self.sold_amount = sold_amount;
        }
        self.normalize();
    }
}

//! Timeline event domain model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind};

/// A dated milestone on the move timeline (movers booked, keys handed over, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTimelineEvent {
    pub title: String,
    pub date: NaiveDate,
    pub event_type: String,
    pub notes: Option<String>,
}

impl NewTimelineEvent {
    pub fn new(title: impl Into<String>, date: NaiveDate, event_type: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date,
            event_type: event_type.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl From<TimelineEvent> for NewTimelineEvent {
    fn from(event: TimelineEvent) -> Self {
        Self {
            title: event.title,
            date: event.date,
            event_type: event.event_type,
            notes: event.notes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineEventPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub event_type: Option<String>,
    pub notes: Option<Option<String>>,
}

impl Entity for TimelineEvent {
    type Draft = NewTimelineEvent;
    type Patch = TimelineEventPatch;

    const KIND: EntityKind = EntityKind::TimelineEvents;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: NewTimelineEvent) -> Self {
        Self {
            id,
            title: draft.title,
            date: draft.date,
            event_type: draft.event_type,
            notes: draft.notes,
        }
    }

    fn apply(&mut self, patch: TimelineEventPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(event_type) = patch.event_type {
            self.event_type = event_type;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }

    /// Earliest first
    fn sort(items: &mut [Self]) {
        items.sort_by(|a, b| a.date.cmp(&b.date));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_field_name() {
        let event = TimelineEvent::from_draft(
            "e1".to_string(),
            NewTimelineEvent::new(
                "Movers arrive",
                NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                "milestone",
            ),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "milestone");
        assert!(json.get("eventType").is_none());
    }

    #[test]
    fn test_sort_earliest_first() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 7, d).unwrap();
        let mut items: Vec<TimelineEvent> = [("late", 30), ("early", 2), ("mid", 15)]
            .into_iter()
            .map(|(id, d)| {
                TimelineEvent::from_draft(id.to_string(), NewTimelineEvent::new(id, day(d), "task"))
            })
            .collect();
        TimelineEvent::sort(&mut items);
        let ids: Vec<&str> = items.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "mid", "late"]);
    }
}

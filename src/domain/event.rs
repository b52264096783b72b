use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use uuid::Uuid;

use crate::domain::new_event::NewEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
}

impl EventStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, EventStatus::Active)
    }

    pub fn parse(status: String) -> Result<EventStatus, String> {
        match status.as_str() {
            "active" => Ok(EventStatus::Active),
            _ => Err(format!("{} is not a valid event status", status)),
        }
    }
}

impl AsRef<str> for EventStatus {
    fn as_ref(&self) -> &str {
        match self {
            EventStatus::Active => "active",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_time")]
    pub time: NaiveTime,
    pub location: String,
    pub category: String,
    pub description: String,
    pub organizer_email: String,
    pub status: EventStatus,
    pub submitted_at: DateTime<Utc>,
}

impl Event {
    /// Turns a validated submission into an active event with a fresh id.
    pub fn publish(new_event: NewEvent) -> Event {
        Event {
            event_id: Uuid::new_v4(),
            title: new_event.title,
            date: new_event.date,
            time: new_event.time,
            location: new_event.location,
            category: new_event.category,
            description: new_event.description,
            organizer_email: new_event.organizer_email,
            status: EventStatus::Active,
            submitted_at: Utc::now(),
        }
    }

    pub fn formatted_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn formatted_time(&self) -> String {
        format_time(&self.time)
    }
}

/// `HH:MM`, with seconds only when the organizer gave them.
fn format_time(time: &NaiveTime) -> String {
    if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

fn serialize_time<S: serde::Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_time(time))
}

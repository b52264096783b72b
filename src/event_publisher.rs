use std::sync::Arc;
use uuid::Uuid;

use crate::domain::event::Event;
use crate::domain::new_event::{NewEvent, NewEventBody};
use crate::notification_fanout::NotificationFanout;
use crate::store::{EventStore, StoreError};

#[derive(thiserror::Error)]
pub enum EventError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Event {0} not found.")]
    NotFound(Uuid),
    #[error("Failed to access the event store.")]
    InternalError(#[from] StoreError),
}

impl std::fmt::Debug for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)?;

        if let EventError::InternalError(err) = self {
            write!(f, "\n\t{:?}", err)?;
        }

        Ok(())
    }
}

pub struct EventPublisher {
    events: Arc<dyn EventStore>,
    fanout: NotificationFanout,
}

impl EventPublisher {
    pub fn new(events: Arc<dyn EventStore>, fanout: NotificationFanout) -> Self {
        Self { events, fanout }
    }

    /// Stores the event, then notifies subscribers once.
    ///
    /// Only the store write can fail the submission; the notification report is logged and
    /// otherwise discarded.
    #[tracing::instrument(name = "Submit a new event", skip(self, body), fields(title = ?body.title))]
    pub async fn submit(&self, body: NewEventBody) -> Result<Event, EventError> {
        let new_event = NewEvent::try_from(body).map_err(EventError::InvalidInput)?;
        let event = Event::publish(new_event);

        self.events.insert(&event).await?;

        let report = self.fanout.notify(&event).await;
        if !report.failed.is_empty() {
            tracing::warn!(
                "{} of {} notifications for event {} failed",
                report.failed.len(),
                report.attempted(),
                event.event_id
            );
        }

        Ok(event)
    }

    #[tracing::instrument(name = "List active events", skip(self))]
    pub async fn list_events(&self) -> Result<Vec<Event>, EventError> {
        Ok(self.events.list_active().await?)
    }

    #[tracing::instrument(name = "Get an event", skip(self))]
    pub async fn get_event(&self, event_id: Uuid) -> Result<Event, EventError> {
        self.events
            .get(event_id)
            .await?
            .ok_or(EventError::NotFound(event_id))
    }
}

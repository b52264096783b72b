use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::event::Event;
use crate::domain::subscriber::Subscriber;
use crate::domain::subscriber_email::SubscriberEmail;

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryEventStore, InMemorySubscriptionStore};
pub use postgres::{PgEventStore, PgSubscriptionStore};

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("The database query failed.")]
    Database(#[from] sqlx::Error),
    #[error("A stored record could not be decoded: {0}")]
    CorruptRecord(String),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)?;

        if let StoreError::Database(err) = self {
            write!(f, "\n\t({})", err)?;
        }

        Ok(())
    }
}

/// One page of an enumeration. `next_cursor` is `None` on the last page.
#[derive(Debug, Default)]
pub struct SubscriberPage {
    pub subscribers: Vec<Subscriber>,
    pub next_cursor: Option<String>,
}

/// Persistence of subscribers, keyed by email.
///
/// `put` is an upsert: the last write for an email wins. Callers that need more than that
/// serialize writes themselves.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get(&self, email: &SubscriberEmail) -> Result<Option<Subscriber>, StoreError>;

    async fn put(&self, subscriber: &Subscriber) -> Result<(), StoreError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, email: &SubscriberEmail) -> Result<bool, StoreError>;

    /// Subscribers ordered by email, strictly after `cursor`.
    async fn scan_page(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<SubscriberPage, StoreError>;

    async fn scan_all(&self, page_size: u32) -> Result<Vec<Subscriber>, StoreError> {
        let mut subscribers = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.scan_page(cursor.as_deref(), page_size.max(1)).await?;

            subscribers.extend(page.subscribers);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(subscribers)
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: &Event) -> Result<(), StoreError>;

    async fn get(&self, event_id: Uuid) -> Result<Option<Event>, StoreError>;

    /// Active events, soonest first.
    async fn list_active(&self) -> Result<Vec<Event>, StoreError>;
}

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::event::Event;
use crate::domain::subscriber::Subscriber;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::store::{EventStore, StoreError, SubscriberPage, SubscriptionStore};

/// Process-local subscriber store. Used by tests and local runs without Postgres.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    subscribers: RwLock<BTreeMap<String, Subscriber>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get(&self, email: &SubscriberEmail) -> Result<Option<Subscriber>, StoreError> {
        Ok(self.subscribers.read().await.get(email.as_ref()).cloned())
    }

    async fn put(&self, subscriber: &Subscriber) -> Result<(), StoreError> {
        self.subscribers
            .write()
            .await
            .insert(subscriber.email.as_ref().to_string(), subscriber.clone());

        Ok(())
    }

    async fn delete(&self, email: &SubscriberEmail) -> Result<bool, StoreError> {
        Ok(self
            .subscribers
            .write()
            .await
            .remove(email.as_ref())
            .is_some())
    }

    async fn scan_page(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<SubscriberPage, StoreError> {
        let subscribers = self.subscribers.read().await;
        let lower = match cursor {
            Some(cursor) => Bound::Excluded(cursor.to_string()),
            None => Bound::Unbounded,
        };
        let page: Vec<Subscriber> = subscribers
            .range((lower, Bound::Unbounded))
            .take(limit as usize)
            .map(|(_, subscriber)| subscriber.clone())
            .collect();
        let next_cursor = match page.last() {
            Some(last) if page.len() == limit as usize => Some(last.email.as_ref().to_string()),
            _ => None,
        };

        Ok(SubscriberPage {
            subscribers: page,
            next_cursor,
        })
    }
}

#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<Uuid, Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        self.events
            .write()
            .await
            .insert(event.event_id, event.clone());

        Ok(())
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.events.read().await.get(&event_id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .await
            .values()
            .filter(|event| event.status.is_active())
            .cloned()
            .collect();

        events.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));

        Ok(events)
    }
}

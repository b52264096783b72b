use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::domain::channel_handle::ChannelHandle;
use crate::domain::event::{Event, EventStatus};
use crate::domain::interests::Interests;
use crate::domain::subscriber::Subscriber;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;
use crate::store::{EventStore, StoreError, SubscriberPage, SubscriptionStore};

pub struct PgSubscriptionStore {
    db_pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    #[tracing::instrument(name = "Fetch a subscriber by email", skip(self), fields(subscriber_email = %email))]
    async fn get(&self, email: &SubscriberEmail) -> Result<Option<Subscriber>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT email, name, interests, subscribed_at, updated_at, channel_handle
            FROM subscriptions
            WHERE email = $1
            "#,
        )
        .bind(email.as_ref())
        .fetch_optional(&self.db_pool)
        .await?;

        row.as_ref().map(subscriber_from_row).transpose()
    }

    #[tracing::instrument(name = "Upsert a subscriber", skip(self, subscriber), fields(subscriber_email = %subscriber.email))]
    async fn put(&self, subscriber: &Subscriber) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (email, name, interests, subscribed_at, updated_at, channel_handle)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                interests = EXCLUDED.interests,
                subscribed_at = EXCLUDED.subscribed_at,
                updated_at = EXCLUDED.updated_at,
                channel_handle = EXCLUDED.channel_handle
            "#,
        )
        .bind(subscriber.email.as_ref())
        .bind(subscriber.name.as_ref())
        .bind(subscriber.interests.to_vec())
        .bind(subscriber.subscribed_at)
        .bind(subscriber.updated_at)
        .bind(
            subscriber
                .channel_handle
                .as_ref()
                .map(|handle| handle.as_ref().to_string()),
        )
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Delete a subscriber", skip(self), fields(subscriber_email = %email))]
    async fn delete(&self, email: &SubscriberEmail) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE email = $1")
            .bind(email.as_ref())
            .execute(&self.db_pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Scan a page of subscribers", skip(self))]
    async fn scan_page(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<SubscriberPage, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT email, name, interests, subscribed_at, updated_at, channel_handle
            FROM subscriptions
            WHERE $1::TEXT IS NULL OR email > $1
            ORDER BY email
            LIMIT $2
            "#,
        )
        .bind(cursor)
        .bind(i64::from(limit))
        .fetch_all(&self.db_pool)
        .await?;

        let subscribers = rows
            .iter()
            .map(subscriber_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let next_cursor = match subscribers.last() {
            Some(last) if subscribers.len() == limit as usize => {
                Some(last.email.as_ref().to_string())
            }
            _ => None,
        };

        Ok(SubscriberPage {
            subscribers,
            next_cursor,
        })
    }
}

fn subscriber_from_row(row: &PgRow) -> Result<Subscriber, StoreError> {
    let channel_handle: Option<String> = row.try_get("channel_handle")?;
    let interests: Vec<String> = row.try_get("interests")?;
    let subscribed_at: DateTime<Utc> = row.try_get("subscribed_at")?;

    Ok(Subscriber {
        email: SubscriberEmail::parse(row.try_get("email")?).map_err(StoreError::CorruptRecord)?,
        name: SubscriberName::parse(row.try_get("name")?).map_err(StoreError::CorruptRecord)?,
        interests: Interests::parse(interests),
        subscribed_at,
        updated_at: row.try_get("updated_at")?,
        channel_handle: channel_handle
            .map(ChannelHandle::parse)
            .transpose()
            .map_err(StoreError::CorruptRecord)?,
    })
}

pub struct PgEventStore {
    db_pool: PgPool,
}

impl PgEventStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    #[tracing::instrument(name = "Insert a new event into the database", skip(self, event), fields(event_id = %event.event_id))]
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO events (event_id, title, event_date, event_time, location, category, description, organizer_email, status, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event.event_id)
        .bind(&event.title)
        .bind(event.date)
        .bind(event.time)
        .bind(&event.location)
        .bind(&event.category)
        .bind(&event.description)
        .bind(&event.organizer_email)
        .bind(event.status.as_ref())
        .bind(event.submitted_at)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Fetch an event by id", skip(self))]
    async fn get(&self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT event_id, title, event_date, event_time, location, category, description, organizer_email, status, submitted_at
            FROM events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.db_pool)
        .await?;

        row.as_ref().map(event_from_row).transpose()
    }

    #[tracing::instrument(name = "Fetch active events", skip(self))]
    async fn list_active(&self) -> Result<Vec<Event>, StoreError> {
        sqlx::query(
            r#"
            SELECT event_id, title, event_date, event_time, location, category, description, organizer_email, status, submitted_at
            FROM events
            WHERE status = 'active'
            ORDER BY event_date, event_time
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?
        .iter()
        .map(event_from_row)
        .collect()
    }
}

fn event_from_row(row: &PgRow) -> Result<Event, StoreError> {
    let date: NaiveDate = row.try_get("event_date")?;
    let time: NaiveTime = row.try_get("event_time")?;

    Ok(Event {
        event_id: row.try_get("event_id")?,
        title: row.try_get("title")?,
        date,
        time,
        location: row.try_get("location")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        organizer_email: row.try_get("organizer_email")?,
        status: EventStatus::parse(row.try_get("status")?).map_err(StoreError::CorruptRecord)?,
        submitted_at: row.try_get("submitted_at")?,
    })
}

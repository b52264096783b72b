use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::channels::{ChannelError, NotificationChannelProvider};
use crate::domain::channel_handle::ChannelHandle;
use crate::domain::new_subscriber::{NewSubscriber, NewSubscriberBody};
use crate::domain::subscriber::{ConfirmedChannel, Subscriber};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::store::{StoreError, SubscriptionStore};

#[derive(thiserror::Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("No subscription found for {0}.")]
    NotFound(String),
    #[error("The notification provider could not complete the request.")]
    ChannelUnavailable(#[source] ChannelError),
    #[error("Failed to access the subscription store.")]
    InternalError(#[from] StoreError),
}

impl std::fmt::Debug for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)?;

        match self {
            SubscriptionError::ChannelUnavailable(err) => write!(f, "\n\t{:?}", err),
            SubscriptionError::InternalError(err) => write!(f, "\n\t{:?}", err),
            _ => Ok(()),
        }
    }
}

#[derive(Debug)]
pub enum SubscribeOutcome {
    Created(Subscriber),
    Updated(Subscriber),
}

impl SubscribeOutcome {
    pub fn subscriber(&self) -> &Subscriber {
        match self {
            SubscribeOutcome::Created(subscriber) | SubscribeOutcome::Updated(subscriber) => {
                subscriber
            }
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SubscribeOutcome::Created(_))
    }
}

/// Sole writer of subscriber records.
///
/// Every write for an email runs while holding that email's lock, so two concurrent
/// subscribes for the same address cannot both request a channel. The store write is
/// authoritative; channel operations are best-effort and never fail a subscribe or an
/// unsubscribe.
pub struct SubscriptionManager {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn NotificationChannelProvider>,
    locks: EmailLocks,
    page_size: u32,
}

impl SubscriptionManager {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn NotificationChannelProvider>,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            provider,
            locks: EmailLocks::default(),
            page_size,
        }
    }

    #[tracing::instrument(
        name = "Subscribe to event notifications",
        skip(self, body),
        fields(
            subscriber_email = ?body.email,
            subscriber_name = ?body.name
        )
    )]
    pub async fn subscribe(
        &self,
        body: NewSubscriberBody,
    ) -> Result<SubscribeOutcome, SubscriptionError> {
        let new_subscriber =
            NewSubscriber::try_from(body).map_err(SubscriptionError::InvalidInput)?;
        let _guard = self.locks.acquire(new_subscriber.email.as_ref()).await;

        if let Some(existing) = self.store.get(&new_subscriber.email).await? {
            let updated = Subscriber {
                name: new_subscriber.name,
                interests: new_subscriber.interests,
                updated_at: Some(Utc::now()),
                ..existing
            };

            self.store.put(&updated).await?;
            tracing::info!("Subscription updated for {}", updated.email);

            return Ok(SubscribeOutcome::Updated(updated));
        }

        let channel_handle = match self.provider.create_channel(&new_subscriber.email).await {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::error!(
                    "Failed to create a notification channel for {}: {:?}",
                    new_subscriber.email,
                    err
                );
                None
            }
        };
        let subscriber = Subscriber {
            email: new_subscriber.email,
            name: new_subscriber.name,
            interests: new_subscriber.interests,
            subscribed_at: Utc::now(),
            updated_at: None,
            channel_handle,
        };

        self.store.put(&subscriber).await?;
        tracing::info!("Subscription created for {}", subscriber.email);

        Ok(SubscribeOutcome::Created(subscriber))
    }

    #[tracing::instrument(name = "List subscriptions", skip(self))]
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscriber>, SubscriptionError> {
        Ok(self.store.scan_all(self.page_size).await?)
    }

    #[tracing::instrument(name = "Unsubscribe from event notifications", skip(self))]
    pub async fn unsubscribe(&self, email: &str) -> Result<(), SubscriptionError> {
        if email.trim().is_empty() {
            return Err(SubscriptionError::InvalidInput(String::from(
                "email is required",
            )));
        }

        let email =
            SubscriberEmail::parse(email.to_string()).map_err(SubscriptionError::InvalidInput)?;
        let _guard = self.locks.acquire(email.as_ref()).await;
        let subscriber = self
            .store
            .get(&email)
            .await?
            .ok_or_else(|| SubscriptionError::NotFound(email.to_string()))?;

        if let Some(handle) = subscriber
            .channel_handle
            .as_ref()
            .and_then(ChannelHandle::confirmed_id)
        {
            if let Err(err) = self.provider.remove_channel(handle).await {
                tracing::error!(
                    "Failed to remove notification channel {} of {}: {:?}",
                    handle,
                    email,
                    err
                );
            }
        }

        self.store.delete(&email).await?;
        tracing::info!("Subscription removed for {}", email);

        Ok(())
    }

    /// Completes a pending opt-in and records the provider's confirmed handle.
    #[tracing::instrument(name = "Confirm a notification channel", skip(self, token))]
    pub async fn confirm_channel(&self, token: &str) -> Result<Subscriber, SubscriptionError> {
        if token.trim().is_empty() {
            return Err(SubscriptionError::InvalidInput(String::from(
                "confirmation token is required",
            )));
        }

        let channel = self
            .provider
            .confirm_channel(token)
            .await
            .map_err(|err| match err {
                ChannelError::UnknownToken => {
                    SubscriptionError::InvalidInput(err.to_string())
                }
                err => SubscriptionError::ChannelUnavailable(err),
            })?;
        let _guard = self.locks.acquire(channel.endpoint.as_ref()).await;

        match self.record_confirmation(&channel).await {
            Err(err @ SubscriptionError::InternalError(_)) => {
                // Nothing was recorded: drop the new channel and let the link be used again.
                self.discard_channel(&channel.handle).await;
                if let Err(err) = self
                    .provider
                    .reopen_confirmation(token, &channel.endpoint)
                    .await
                {
                    tracing::error!(
                        "Failed to reopen the confirmation of {}: {:?}",
                        channel.endpoint,
                        err
                    );
                }
                Err(err)
            }
            outcome => outcome,
        }
    }

    async fn record_confirmation(
        &self,
        channel: &ConfirmedChannel,
    ) -> Result<Subscriber, SubscriptionError> {
        let subscriber = match self.store.get(&channel.endpoint).await? {
            Some(subscriber) => subscriber,
            None => {
                // Unsubscribed before confirming, the new channel has no owner.
                self.discard_channel(&channel.handle).await;
                return Err(SubscriptionError::NotFound(channel.endpoint.to_string()));
            }
        };

        match subscriber.channel_handle {
            Some(ChannelHandle::Pending) => {
                let confirmed = Subscriber {
                    channel_handle: Some(ChannelHandle::Confirmed(channel.handle.clone())),
                    ..subscriber
                };

                self.store.put(&confirmed).await?;
                tracing::info!("Notification channel confirmed for {}", confirmed.email);

                Ok(confirmed)
            }
            _ => {
                tracing::warn!(
                    "Ignoring confirmation for {}, its channel is not pending",
                    subscriber.email
                );
                self.discard_channel(&channel.handle).await;
                Ok(subscriber)
            }
        }
    }

    async fn discard_channel(&self, handle: &str) {
        if let Err(err) = self.provider.remove_channel(handle).await {
            tracing::error!("Failed to remove unused channel {}: {:?}", handle, err);
        }
    }
}

/// One async lock per email with a write in flight. Entries are dropped once nobody holds
/// or waits for them.
#[derive(Default)]
struct EmailLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

struct EmailGuard<'a> {
    locks: &'a EmailLocks,
    email: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl EmailLocks {
    async fn acquire(&self, email: &str) -> EmailGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(email.to_string()).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;

        EmailGuard {
            locks: self,
            email: email.to_string(),
            lock,
            guard: Some(guard),
        }
    }
}

impl Drop for EmailGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self.locks.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this guard are the only owners left: no one is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.email);
        }
    }
}

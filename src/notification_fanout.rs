use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::channels::NotificationChannelProvider;
use crate::domain::event::Event;
use crate::domain::notification::Notification;
use crate::domain::subscriber::ConfirmedChannel;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::store::SubscriptionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub email: SubscriberEmail,
    pub reason: String,
}

/// What happened to each subscriber during one fan-out.
#[derive(Debug, Default)]
pub struct NotificationReport {
    pub delivered: Vec<SubscriberEmail>,
    pub failed: Vec<DeliveryFailure>,
    /// Subscribers without a confirmed channel.
    pub skipped: Vec<SubscriberEmail>,
}

impl NotificationReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// Sends a new event to every subscriber with a confirmed channel.
///
/// Publishes run concurrently and are awaited together; one failing or hanging recipient
/// never prevents delivery to the others. Interests are not consulted.
pub struct NotificationFanout {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn NotificationChannelProvider>,
    deadline: Duration,
    page_size: u32,
}

impl NotificationFanout {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn NotificationChannelProvider>,
        deadline: Duration,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            provider,
            deadline,
            page_size,
        }
    }

    /// Never fails: a store or provider outage shows up in the report and the logs only.
    #[tracing::instrument(
        name = "Notify subscribers of a new event",
        skip(self, event),
        fields(
            event_id = %event.event_id,
            title = %event.title
        )
    )]
    pub async fn notify(&self, event: &Event) -> NotificationReport {
        let subscribers = match self.store.scan_all(self.page_size).await {
            Ok(subscribers) => subscribers,
            Err(err) => {
                tracing::error!("Failed to get subscribers from the store: {:?}", err);
                return NotificationReport::default();
            }
        };

        if subscribers.is_empty() {
            tracing::info!("No subscribers found");
            return NotificationReport::default();
        }

        let notification = Notification::for_event(event);
        let mut report = NotificationReport::default();
        let mut channels: Vec<ConfirmedChannel> = Vec::new();

        for subscriber in subscribers {
            match subscriber.confirmed_channel() {
                Some(channel) => channels.push(channel),
                None => report.skipped.push(subscriber.email),
            }
        }

        let deadline = Instant::now() + self.deadline;
        let outcomes = join_all(channels.into_iter().map(|channel| {
            let notification = &notification;
            async move {
                let outcome =
                    timeout_at(deadline, self.provider.publish(&channel, notification)).await;
                (channel.endpoint, outcome)
            }
        }))
        .await;

        for (email, outcome) in outcomes {
            match outcome {
                Ok(Ok(())) => report.delivered.push(email),
                Ok(Err(err)) => {
                    tracing::error!("Failed to notify {}: {:?}", email, err);
                    report.failed.push(DeliveryFailure {
                        email,
                        reason: err.to_string(),
                    });
                }
                Err(_) => {
                    tracing::error!("Notifying {} did not finish before the deadline", email);
                    report.failed.push(DeliveryFailure {
                        email,
                        reason: String::from("deadline exceeded"),
                    });
                }
            }
        }

        tracing::info!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Notifications sent for event {}",
            event.event_id
        );

        report
    }
}

use chrono::{DateTime, Utc};

use crate::domain::channel_handle::ChannelHandle;
use crate::domain::interests::Interests;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub email: SubscriberEmail,
    pub name: SubscriberName,
    pub interests: Interests,
    pub subscribed_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub channel_handle: Option<ChannelHandle>,
}

/// A channel the provider has confirmed, together with the endpoint it delivers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedChannel {
    pub handle: String,
    pub endpoint: SubscriberEmail,
}

impl Subscriber {
    /// `None` when the subscriber has no channel or is still waiting for confirmation.
    pub fn confirmed_channel(&self) -> Option<ConfirmedChannel> {
        let handle = self.channel_handle.as_ref()?.confirmed_id()?;

        Some(ConfirmedChannel {
            handle: handle.to_string(),
            endpoint: self.email.clone(),
        })
    }
}

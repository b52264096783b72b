use async_trait::async_trait;

use crate::domain::channel_handle::ChannelHandle;
use crate::domain::notification::Notification;
use crate::domain::subscriber::ConfirmedChannel;
use crate::domain::subscriber_email::SubscriberEmail;

pub mod email;

pub use email::EmailChannelProvider;

#[derive(thiserror::Error)]
pub enum ChannelError {
    #[error("The channel registry is unavailable.")]
    Registry(#[from] redis::RedisError),
    #[error("The email API rejected the request.")]
    Delivery(#[from] reqwest::Error),
    #[error("The confirmation token is unknown or has expired.")]
    UnknownToken,
    #[error("Channel {0} is not registered with the provider.")]
    UnknownChannel(String),
    #[error("The provider returned an invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl std::fmt::Debug for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)?;

        match self {
            ChannelError::Registry(err) => write!(f, "\n\t({})", err),
            ChannelError::Delivery(err) => write!(f, "\n\t({})", err),
            _ => Ok(()),
        }
    }
}

/// Opt-in delivery channels for subscribers.
///
/// Every call may fail independently; callers decide whether a failure is fatal. Publishing
/// is a direct send to one recipient's own channel, never a broadcast.
#[async_trait]
pub trait NotificationChannelProvider: Send + Sync {
    /// Registers `endpoint`. The returned handle is `Pending` when the recipient still has to
    /// opt in out-of-band.
    async fn create_channel(&self, endpoint: &SubscriberEmail) -> Result<ChannelHandle, ChannelError>;

    /// Completes the opt-in started by `create_channel`.
    async fn confirm_channel(&self, token: &str) -> Result<ConfirmedChannel, ChannelError>;

    /// Makes a token consumed by `confirm_channel` valid again for `endpoint`.
    async fn reopen_confirmation(
        &self,
        token: &str,
        endpoint: &SubscriberEmail,
    ) -> Result<(), ChannelError>;

    async fn remove_channel(&self, handle: &str) -> Result<(), ChannelError>;

    async fn publish(
        &self,
        channel: &ConfirmedChannel,
        notification: &Notification,
    ) -> Result<(), ChannelError>;
}

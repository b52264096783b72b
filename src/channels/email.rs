use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

use crate::channels::{ChannelError, NotificationChannelProvider};
use crate::domain::channel_handle::ChannelHandle;
use crate::domain::notification::Notification;
use crate::domain::subscriber::ConfirmedChannel;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::email_client::EmailClient;

const CONFIRMATION_TOKEN_TTL_SECS: usize = 48 * 60 * 60;
const CONFIRMATION_TOKEN_LENGTH: usize = 30;

/// Email channels with double opt-in.
///
/// Pending confirmation tokens and confirmed channel registrations live in Redis; the
/// messages themselves go through the transactional email API.
pub struct EmailChannelProvider {
    email_client: EmailClient,
    redis_client: redis::Client,
    base_url: String,
}

impl EmailChannelProvider {
    pub fn new(email_client: EmailClient, redis_client: redis::Client, base_url: String) -> Self {
        Self {
            email_client,
            redis_client,
            base_url,
        }
    }
}

#[async_trait]
impl NotificationChannelProvider for EmailChannelProvider {
    #[tracing::instrument(name = "Create an email channel", skip(self), fields(endpoint = %endpoint))]
    async fn create_channel(&self, endpoint: &SubscriberEmail) -> Result<ChannelHandle, ChannelError> {
        let token = generate_confirmation_token();
        let mut redis_conn = self.redis_client.get_tokio_connection().await?;

        redis::cmd("SET")
            .arg(token_key(&token))
            .arg(endpoint.as_ref())
            .arg("EX")
            .arg(CONFIRMATION_TOKEN_TTL_SECS)
            .query_async::<_, ()>(&mut redis_conn)
            .await?;

        send_confirmation_email(&self.email_client, endpoint, &self.base_url, &token).await?;

        Ok(ChannelHandle::Pending)
    }

    #[tracing::instrument(name = "Confirm an email channel", skip(self, token))]
    async fn confirm_channel(&self, token: &str) -> Result<ConfirmedChannel, ChannelError> {
        let mut redis_conn = self.redis_client.get_tokio_connection().await?;
        let key = token_key(token);

        // Consume the token so a confirmation link only works once
        let (endpoint,): (Option<String>,) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(&key)
            .cmd("DEL")
            .arg(&key)
            .ignore()
            .query_async(&mut redis_conn)
            .await?;

        let endpoint = endpoint.ok_or(ChannelError::UnknownToken)?;
        let endpoint = SubscriberEmail::parse(endpoint).map_err(ChannelError::InvalidEndpoint)?;
        let handle = Uuid::new_v4().to_string();

        redis::cmd("SET")
            .arg(channel_key(&handle))
            .arg(endpoint.as_ref())
            .query_async::<_, ()>(&mut redis_conn)
            .await?;

        tracing::info!("Channel {} confirmed for {}", handle, endpoint);

        Ok(ConfirmedChannel { handle, endpoint })
    }

    #[tracing::instrument(name = "Reopen an email confirmation", skip(self, token), fields(endpoint = %endpoint))]
    async fn reopen_confirmation(
        &self,
        token: &str,
        endpoint: &SubscriberEmail,
    ) -> Result<(), ChannelError> {
        let mut redis_conn = self.redis_client.get_tokio_connection().await?;

        redis::cmd("SET")
            .arg(token_key(token))
            .arg(endpoint.as_ref())
            .arg("EX")
            .arg(CONFIRMATION_TOKEN_TTL_SECS)
            .query_async::<_, ()>(&mut redis_conn)
            .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Remove an email channel", skip(self))]
    async fn remove_channel(&self, handle: &str) -> Result<(), ChannelError> {
        let mut redis_conn = self.redis_client.get_tokio_connection().await?;
        let removed: i64 = redis::cmd("DEL")
            .arg(channel_key(handle))
            .query_async(&mut redis_conn)
            .await?;

        if removed == 0 {
            return Err(ChannelError::UnknownChannel(handle.to_string()));
        }

        Ok(())
    }

    #[tracing::instrument(
        name = "Send a notification email",
        skip(self, channel, notification),
        fields(
            channel = %channel.handle,
            subject = %notification.subject
        )
    )]
    async fn publish(
        &self,
        channel: &ConfirmedChannel,
        notification: &Notification,
    ) -> Result<(), ChannelError> {
        self.email_client
            .send_email(
                &channel.endpoint,
                &notification.subject,
                &notification.html_body(),
                &notification.text_body,
            )
            .await?;

        Ok(())
    }
}

fn token_key(token: &str) -> String {
    format!("channel_token:{}:endpoint", token)
}

fn channel_key(handle: &str) -> String {
    format!("channel:{}:endpoint", handle)
}

#[tracing::instrument(
    name = "Send a confirmation email to a new subscriber",
    fields(base_url = %base_url),
    skip(email_client, endpoint, confirmation_token)
)]
async fn send_confirmation_email(
    email_client: &EmailClient,
    endpoint: &SubscriberEmail,
    base_url: &str,
    confirmation_token: &str,
) -> Result<(), reqwest::Error> {
    let confirmation_link = format!(
        "{}/subscriptions/confirm?token={}",
        base_url, confirmation_token
    );
    let html_body = format!(
        r#"
            <div>
                <h1>Welcome to the community events board!</h1>
                <p>Click <a href="{}">here</a> to start receiving new events.</p>
            </div>
        "#,
        confirmation_link
    );
    let text_body = format!(
        "Welcome to the community events board!\nVisit {} to start receiving new events.",
        confirmation_link
    );

    email_client
        .send_email(
            endpoint,
            "Confirm your community events subscription",
            &html_body,
            &text_body,
        )
        .await
}

fn generate_confirmation_token() -> String {
    let mut rng = rand::thread_rng();

    std::iter::repeat_with(|| rng.sample(rand::distributions::Alphanumeric))
        .map(char::from)
        .take(CONFIRMATION_TOKEN_LENGTH)
        .collect()
}

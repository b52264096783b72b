use async_trait::async_trait;
use chrono::Utc;
use reqwest::Response;
use std::collections::{HashMap, HashSet};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use community_events::channels::{ChannelError, NotificationChannelProvider};
use community_events::domain::channel_handle::ChannelHandle;
use community_events::domain::interests::Interests;
use community_events::domain::new_subscriber::NewSubscriberBody;
use community_events::domain::notification::Notification;
use community_events::domain::subscriber::{ConfirmedChannel, Subscriber};
use community_events::domain::subscriber_email::SubscriberEmail;
use community_events::domain::subscriber_name::SubscriberName;
use community_events::event_publisher::EventPublisher;
use community_events::notification_fanout::NotificationFanout;
use community_events::startup::run;
use community_events::store::{
    EventStore, InMemoryEventStore, InMemorySubscriptionStore, StoreError, SubscriberPage,
    SubscriptionStore,
};
use community_events::subscription_manager::SubscriptionManager;

pub const PAGE_SIZE: u32 = 2;
pub const DEADLINE: Duration = Duration::from_secs(5);

/// Channel provider that records every call instead of talking to a real service.
///
/// New channels are pending; the confirmation token for `email` is `token-{email}` and the
/// confirmed handle is `channel-{email}`.
#[derive(Default)]
pub struct FakeChannelProvider {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    created: Vec<String>,
    removed: Vec<String>,
    published: Vec<(String, Notification)>,
    pending_tokens: HashMap<String, String>,
    fail_create: bool,
    fail_remove: bool,
    failing_endpoints: HashSet<String>,
    delayed_endpoints: HashMap<String, Duration>,
}

impl FakeChannelProvider {
    pub fn fail_channel_creation(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    pub fn fail_channel_removal(&self) {
        self.state.lock().unwrap().fail_remove = true;
    }

    pub fn fail_publish_to(&self, email: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_endpoints
            .insert(email.to_string());
    }

    pub fn delay_publish_to(&self, email: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delayed_endpoints
            .insert(email.to_string(), delay);
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().created.len()
    }

    pub fn removed(&self) -> Vec<String> {
        self.state.lock().unwrap().removed.clone()
    }

    pub fn published(&self) -> Vec<(String, Notification)> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn published_to(&self) -> Vec<String> {
        let mut recipients: Vec<String> = self
            .published()
            .into_iter()
            .map(|(email, _)| email)
            .collect();
        recipients.sort();
        recipients
    }

    pub fn token_for(&self, email: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let token = format!("token-{}", email);

        state.pending_tokens.contains_key(&token).then_some(token)
    }
}

#[async_trait]
impl NotificationChannelProvider for FakeChannelProvider {
    async fn create_channel(&self, endpoint: &SubscriberEmail) -> Result<ChannelHandle, ChannelError> {
        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        state.created.push(endpoint.to_string());

        if state.fail_create {
            return Err(ChannelError::InvalidEndpoint(endpoint.to_string()));
        }

        state
            .pending_tokens
            .insert(format!("token-{}", endpoint), endpoint.to_string());

        Ok(ChannelHandle::Pending)
    }

    async fn confirm_channel(&self, token: &str) -> Result<ConfirmedChannel, ChannelError> {
        let endpoint = self
            .state
            .lock()
            .unwrap()
            .pending_tokens
            .remove(token)
            .ok_or(ChannelError::UnknownToken)?;

        Ok(ConfirmedChannel {
            handle: format!("channel-{}", endpoint),
            endpoint: SubscriberEmail::parse(endpoint).map_err(ChannelError::InvalidEndpoint)?,
        })
    }

    async fn reopen_confirmation(
        &self,
        token: &str,
        endpoint: &SubscriberEmail,
    ) -> Result<(), ChannelError> {
        self.state
            .lock()
            .unwrap()
            .pending_tokens
            .insert(token.to_string(), endpoint.to_string());

        Ok(())
    }

    async fn remove_channel(&self, handle: &str) -> Result<(), ChannelError> {
        let mut state = self.state.lock().unwrap();

        if state.fail_remove {
            return Err(ChannelError::UnknownChannel(handle.to_string()));
        }

        state.removed.push(handle.to_string());

        Ok(())
    }

    async fn publish(
        &self,
        channel: &ConfirmedChannel,
        notification: &Notification,
    ) -> Result<(), ChannelError> {
        let email = channel.endpoint.to_string();
        let delay = self.state.lock().unwrap().delayed_endpoints.get(&email).copied();

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();

        if state.failing_endpoints.contains(&email) {
            return Err(ChannelError::UnknownChannel(channel.handle.clone()));
        }

        state.published.push((email, notification.clone()));

        Ok(())
    }
}

/// In-memory store whose writes or reads can be made to fail. Seed it through `inner`.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemorySubscriptionStore,
    pub fail_get: bool,
    pub fail_put: bool,
    pub fail_delete: bool,
    pub fail_scan: bool,
}

#[async_trait]
impl SubscriptionStore for FlakyStore {
    async fn get(&self, email: &SubscriberEmail) -> Result<Option<Subscriber>, StoreError> {
        if self.fail_get {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        self.inner.get(email).await
    }

    async fn put(&self, subscriber: &Subscriber) -> Result<(), StoreError> {
        if self.fail_put {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        self.inner.put(subscriber).await
    }

    async fn delete(&self, email: &SubscriberEmail) -> Result<bool, StoreError> {
        if self.fail_delete {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        self.inner.delete(email).await
    }

    async fn scan_page(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<SubscriberPage, StoreError> {
        if self.fail_scan {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        self.inner.scan_page(cursor, limit).await
    }
}

pub fn subscriber(email: &str, channel_handle: Option<ChannelHandle>) -> Subscriber {
    Subscriber {
        email: SubscriberEmail::parse(email.to_string()).unwrap(),
        name: SubscriberName::parse("Subscriber".to_string()).unwrap(),
        interests: Interests::default(),
        subscribed_at: Utc::now(),
        updated_at: None,
        channel_handle,
    }
}

pub fn confirmed(handle: &str) -> Option<ChannelHandle> {
    Some(ChannelHandle::Confirmed(handle.to_string()))
}

pub fn subscribe_body(name: &str, email: &str, interests: &[&str]) -> NewSubscriberBody {
    NewSubscriberBody::new(name, email, interests)
}

pub fn event_body(title: &str, date: &str, time: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "date": date,
        "time": time,
        "location": "Town Hall",
        "category": "music",
        "description": "An evening of live music",
        "organizerEmail": "organizer@community.test"
    })
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemorySubscriptionStore>,
    pub events: Arc<InMemoryEventStore>,
    pub provider: Arc<FakeChannelProvider>,
    client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let events = Arc::new(InMemoryEventStore::new());
        let provider = Arc::new(FakeChannelProvider::default());

        let manager = SubscriptionManager::new(store.clone(), provider.clone(), PAGE_SIZE);
        let fanout = NotificationFanout::new(store.clone(), provider.clone(), DEADLINE, PAGE_SIZE);
        let event_store: Arc<dyn EventStore> = events.clone();
        let publisher = EventPublisher::new(event_store, fanout);

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let server = run(listener, manager, publisher).expect("Failed to bind address");

        tokio::spawn(server);

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            store,
            events,
            provider,
            client: reqwest::Client::new(),
        }
    }

    pub async fn post_subscription(&self, body: serde_json::Value) -> Response {
        self.client
            .post(&format!("{}/subscriptions", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_subscriptions(&self) -> Response {
        self.client
            .get(&format!("{}/subscriptions", self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete_subscription(&self, email: &str) -> Response {
        self.client
            .delete(&format!("{}/subscriptions/{}", self.address, email))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn confirm_subscription(&self, token: &str) -> Response {
        self.client
            .get(&format!("{}/subscriptions/confirm", self.address))
            .query(&[("token", token)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_event(&self, body: serde_json::Value) -> Response {
        self.client
            .post(&format!("{}/events", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_events(&self) -> Response {
        self.client
            .get(&format!("{}/events", self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_event(&self, event_id: &str) -> Response {
        self.client
            .get(&format!("{}/events/{}", self.address, event_id))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Subscribes `email` and clicks its confirmation link.
    pub async fn create_confirmed_subscriber(&self, name: &str, email: &str) {
        self.post_subscription(serde_json::json!({ "name": name, "email": email }))
            .await
            .error_for_status()
            .unwrap();

        let token = self.provider.token_for(email).unwrap();

        self.confirm_subscription(&token)
            .await
            .error_for_status()
            .unwrap();
    }
}

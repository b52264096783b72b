use chrono::{NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use community_events::domain::channel_handle::ChannelHandle;
use community_events::domain::event::{Event, EventStatus};
use community_events::domain::interests::Interests;
use community_events::notification_fanout::NotificationFanout;
use community_events::store::{InMemorySubscriptionStore, SubscriptionStore};
use community_events::subscription_manager::SubscriptionManager;

use crate::helpers::{
    confirmed, subscribe_body, subscriber, FakeChannelProvider, FlakyStore, DEADLINE, PAGE_SIZE,
};

fn event(title: &str) -> Event {
    Event {
        event_id: Uuid::new_v4(),
        title: title.to_string(),
        date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
        time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
        location: "Town Hall".to_string(),
        category: "music".to_string(),
        description: "Live jazz".to_string(),
        organizer_email: "organizer@community.test".to_string(),
        status: EventStatus::Active,
        submitted_at: Utc::now(),
    }
}

fn fanout(
    store: Arc<InMemorySubscriptionStore>,
    provider: Arc<FakeChannelProvider>,
    deadline: Duration,
) -> NotificationFanout {
    NotificationFanout::new(store, provider, deadline, PAGE_SIZE)
}

fn emails(report: &[community_events::domain::subscriber_email::SubscriberEmail]) -> Vec<String> {
    let mut emails: Vec<String> = report.iter().map(|email| email.to_string()).collect();
    emails.sort();
    emails
}

#[tokio::test]
async fn one_failing_recipient_does_not_stop_the_others() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let provider = Arc::new(FakeChannelProvider::default());
    for (email, handle) in [
        ("a@x.com", confirmed("channel-a")),
        ("b@x.com", Some(ChannelHandle::Pending)),
        ("c@x.com", confirmed("channel-c")),
        ("d@x.com", confirmed("channel-d")),
    ] {
        store.put(&subscriber(email, handle)).await.unwrap();
    }
    provider.fail_publish_to("d@x.com");

    let report = fanout(store, provider.clone(), DEADLINE)
        .notify(&event("Jazz Night"))
        .await;

    assert_eq!(emails(&report.delivered), vec!["a@x.com", "c@x.com"]);
    assert_eq!(emails(&report.skipped), vec!["b@x.com"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].email.as_ref(), "d@x.com");
    assert_eq!(provider.published_to(), vec!["a@x.com", "c@x.com"]);
}

#[tokio::test]
async fn subscribers_without_a_confirmed_channel_are_skipped() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let provider = Arc::new(FakeChannelProvider::default());
    store.put(&subscriber("none@x.com", None)).await.unwrap();
    store
        .put(&subscriber("pending@x.com", Some(ChannelHandle::Pending)))
        .await
        .unwrap();

    let report = fanout(store, provider.clone(), DEADLINE)
        .notify(&event("Jazz Night"))
        .await;

    assert_eq!(report.attempted(), 0);
    assert_eq!(emails(&report.skipped), vec!["none@x.com", "pending@x.com"]);
    assert!(provider.published().is_empty());
}

#[tokio::test]
async fn every_confirmed_subscriber_gets_exactly_one_message() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let provider = Arc::new(FakeChannelProvider::default());
    for index in 0..5 {
        let email = format!("user{}@x.com", index);
        let handle = confirmed(&format!("channel-{}", index));
        store.put(&subscriber(&email, handle)).await.unwrap();
    }

    let report = fanout(store, provider.clone(), DEADLINE)
        .notify(&event("Jazz Night"))
        .await;

    assert_eq!(report.delivered.len(), 5);
    assert_eq!(
        provider.published_to(),
        vec![
            "user0@x.com",
            "user1@x.com",
            "user2@x.com",
            "user3@x.com",
            "user4@x.com"
        ]
    );
}

#[tokio::test]
async fn interests_do_not_filter_recipients() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let provider = Arc::new(FakeChannelProvider::default());
    let mut sports_fan = subscriber("fan@x.com", confirmed("channel-fan"));
    sports_fan.interests = Interests::parse(vec!["sports".to_string()]);
    store.put(&sports_fan).await.unwrap();

    let report = fanout(store, provider.clone(), DEADLINE)
        .notify(&event("Jazz Night"))
        .await;

    assert_eq!(emails(&report.delivered), vec!["fan@x.com"]);
}

#[tokio::test]
async fn empty_subscriber_set_sends_nothing() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let provider = Arc::new(FakeChannelProvider::default());

    let report = fanout(store, provider.clone(), DEADLINE)
        .notify(&event("Jazz Night"))
        .await;

    assert_eq!(report.attempted(), 0);
    assert!(report.skipped.is_empty());
    assert!(provider.published().is_empty());
}

#[tokio::test]
async fn store_failure_is_reported_as_an_empty_fan_out() {
    let store = Arc::new(FlakyStore {
        fail_scan: true,
        ..Default::default()
    });
    let provider = Arc::new(FakeChannelProvider::default());
    store
        .put(&subscriber("a@x.com", confirmed("channel-a")))
        .await
        .unwrap();

    let report = NotificationFanout::new(store, provider.clone(), DEADLINE, PAGE_SIZE)
        .notify(&event("Jazz Night"))
        .await;

    assert_eq!(report.attempted(), 0);
    assert!(provider.published().is_empty());
}

#[tokio::test]
async fn publishes_run_concurrently() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let provider = Arc::new(FakeChannelProvider::default());
    for index in 0..5 {
        let email = format!("user{}@x.com", index);
        store
            .put(&subscriber(&email, confirmed(&format!("channel-{}", index))))
            .await
            .unwrap();
        provider.delay_publish_to(&email, Duration::from_millis(200));
    }

    let started = Instant::now();
    let report = fanout(store, provider, DEADLINE)
        .notify(&event("Jazz Night"))
        .await;

    assert_eq!(report.delivered.len(), 5);
    assert!(started.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn a_hanging_recipient_is_cut_off_at_the_deadline() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let provider = Arc::new(FakeChannelProvider::default());
    store
        .put(&subscriber("slow@x.com", confirmed("channel-slow")))
        .await
        .unwrap();
    store
        .put(&subscriber("fast@x.com", confirmed("channel-fast")))
        .await
        .unwrap();
    provider.delay_publish_to("slow@x.com", Duration::from_secs(30));

    let started = Instant::now();
    let report = fanout(store, provider, Duration::from_millis(200))
        .notify(&event("Jazz Night"))
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(emails(&report.delivered), vec!["fast@x.com"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].email.as_ref(), "slow@x.com");
    assert_eq!(report.failed[0].reason, "deadline exceeded");
}

#[tokio::test]
async fn confirmed_subscriber_receives_the_formatted_event() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let provider = Arc::new(FakeChannelProvider::default());
    let manager = SubscriptionManager::new(store.clone(), provider.clone(), PAGE_SIZE);

    let created = manager
        .subscribe(subscribe_body("Ann", "ann@x.com", &["music"]))
        .await
        .unwrap();
    assert!(created.is_created());
    assert_eq!(
        created.subscriber().channel_handle,
        Some(ChannelHandle::Pending)
    );

    let updated = manager
        .subscribe(subscribe_body("Ann", "ann@x.com", &["music", "art"]))
        .await
        .unwrap();
    assert!(!updated.is_created());
    assert_eq!(
        updated.subscriber().subscribed_at,
        created.subscriber().subscribed_at
    );
    assert_eq!(updated.subscriber().interests.to_vec(), vec!["art", "music"]);

    let token = provider.token_for("ann@x.com").unwrap();
    manager.confirm_channel(&token).await.unwrap();

    let report = fanout(store, provider.clone(), DEADLINE)
        .notify(&event("Jazz Night"))
        .await;

    assert_eq!(emails(&report.delivered), vec!["ann@x.com"]);
    let published = provider.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "ann@x.com");
    assert!(published[0].1.subject.contains("Jazz Night"));
    assert!(published[0].1.text_body.contains("Jazz Night"));
}

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::io::{Error, ErrorKind};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::channels::{EmailChannelProvider, NotificationChannelProvider};
use crate::config::{DatabaseSettings, Settings};
use crate::email_client::EmailClient;
use crate::event_publisher::EventPublisher;
use crate::notification_fanout::NotificationFanout;
use crate::routes::{
    handle_confirm_subscription, handle_create_subscription, handle_get_event,
    handle_list_events, handle_list_subscriptions, handle_submit_event, handle_unsubscribe,
    health_check,
};
use crate::store::{EventStore, PgEventStore, PgSubscriptionStore, SubscriptionStore};
use crate::subscription_manager::SubscriptionManager;

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, Error> {
        let db_pool = get_connection_db_pool(&config.database);
        let sender_email = config
            .get_email_client_sender()
            .map_err(|err| Error::new(ErrorKind::InvalidInput, err))?;
        let email_client = EmailClient::new(
            config.get_email_client_base_url(),
            sender_email,
            config.get_email_client_api(),
            Some(config.get_email_client_timeout()),
        )
        .map_err(|err| Error::new(ErrorKind::Other, err))?;
        let redis_client = redis::Client::open(config.get_redis_address())
            .map_err(|err| Error::new(ErrorKind::InvalidInput, err))?;

        let provider: Arc<dyn NotificationChannelProvider> = Arc::new(EmailChannelProvider::new(
            email_client,
            redis_client,
            config.get_app_base_url(),
        ));
        let store: Arc<dyn SubscriptionStore> = Arc::new(PgSubscriptionStore::new(db_pool.clone()));
        let events: Arc<dyn EventStore> = Arc::new(PgEventStore::new(db_pool));
        let page_size = config.get_notification_page_size();

        let manager = SubscriptionManager::new(store.clone(), provider.clone(), page_size);
        let fanout = NotificationFanout::new(
            store,
            provider,
            config.get_notification_deadline(),
            page_size,
        );
        let publisher = EventPublisher::new(events, fanout);

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, manager, publisher)?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    manager: SubscriptionManager,
    publisher: EventPublisher,
) -> Result<Server, Error> {
    let manager = web::Data::new(manager);
    let publisher = web::Data::new(publisher);

    let server = HttpServer::new(move || {
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/subscriptions", web::post().to(handle_create_subscription))
            .route("/subscriptions", web::get().to(handle_list_subscriptions))
            .route(
                "/subscriptions/confirm",
                web::get().to(handle_confirm_subscription),
            )
            .route("/subscriptions/{email}", web::delete().to(handle_unsubscribe))
            .route("/events", web::post().to(handle_submit_event))
            .route("/events", web::get().to(handle_list_events))
            .route("/events/{event_id}", web::get().to(handle_get_event))
            .app_data(manager.clone())
            .app_data(publisher.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_db_pool(config: &DatabaseSettings) -> Pool<Postgres> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}

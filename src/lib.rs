pub mod channels;
pub mod config;
pub mod domain;
pub mod email_client;
pub mod event_publisher;
pub mod notification_fanout;
pub mod routes;
pub mod startup;
pub mod store;
pub mod subscription_manager;
pub mod telemetry;

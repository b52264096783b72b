use std::io::{Error, ErrorKind};

use community_events::config::get_configuration;
use community_events::startup::Application;
use community_events::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber(
        String::from("community_events"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber).map_err(|err| Error::new(ErrorKind::Other, err))?;

    let config = get_configuration().map_err(|err| Error::new(ErrorKind::Other, err))?;
    let application = Application::build(config).await?;

    tracing::info!("Server listening on port {}", application.get_port());

    application.run_until_stop().await
}

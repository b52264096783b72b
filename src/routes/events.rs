use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use uuid::Uuid;

use crate::domain::new_event::NewEventBody;
use crate::event_publisher::{EventError, EventPublisher};

#[tracing::instrument(
    name = "Submitting a new event handler",
    skip(body, publisher),
    fields(title = ?body.title)
)]
pub async fn handle_submit_event(
    body: web::Json<NewEventBody>,
    publisher: web::Data<EventPublisher>,
) -> Result<HttpResponse, EventError> {
    let event = publisher.submit(body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Event submitted successfully",
        "eventId": event.event_id,
        "event": event
    })))
}

#[tracing::instrument(name = "Listing events handler", skip(publisher))]
pub async fn handle_list_events(
    publisher: web::Data<EventPublisher>,
) -> Result<HttpResponse, EventError> {
    let events = publisher.list_events().await?;

    Ok(HttpResponse::Ok().json(json!({
        "count": events.len(),
        "events": events
    })))
}

#[tracing::instrument(name = "Getting an event handler", skip(publisher))]
pub async fn handle_get_event(
    event_id: web::Path<String>,
    publisher: web::Data<EventPublisher>,
) -> Result<HttpResponse, EventError> {
    let event_id = Uuid::parse_str(&event_id).map_err(|_| {
        EventError::InvalidInput(format!("{} is not a valid event id", event_id.as_str()))
    })?;
    let event = publisher.get_event(event_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "event": event })))
}

impl ResponseError for EventError {
    fn status_code(&self) -> StatusCode {
        match self {
            EventError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EventError::NotFound(_) => StatusCode::NOT_FOUND,
            EventError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}

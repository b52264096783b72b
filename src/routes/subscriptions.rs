use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;

use crate::domain::new_subscriber::NewSubscriberBody;
use crate::subscription_manager::{SubscriptionError, SubscriptionManager};

#[tracing::instrument(
    name = "Creating or updating a subscriber handler",
    skip(body, manager),
    fields(
        subscriber_email = ?body.email,
        subscriber_name = ?body.name
    )
)]
pub async fn handle_create_subscription(
    body: web::Json<NewSubscriberBody>,
    manager: web::Data<SubscriptionManager>,
) -> Result<HttpResponse, SubscriptionError> {
    let outcome = manager.subscribe(body.into_inner()).await?;
    let email = outcome.subscriber().email.as_ref();

    if outcome.is_created() {
        return Ok(HttpResponse::Created().json(json!({
            "message": "Subscription created successfully",
            "email": email,
            "note": "Please check your email to confirm the subscription"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Subscription updated successfully",
        "email": email
    })))
}

#[tracing::instrument(name = "Listing subscribers handler", skip(manager))]
pub async fn handle_list_subscriptions(
    manager: web::Data<SubscriptionManager>,
) -> Result<HttpResponse, SubscriptionError> {
    let subscriptions = manager.list_subscriptions().await?;

    Ok(HttpResponse::Ok().json(json!({
        "count": subscriptions.len(),
        "subscriptions": subscriptions
    })))
}

#[tracing::instrument(name = "Removing a subscriber handler", skip(manager))]
pub async fn handle_unsubscribe(
    email: web::Path<String>,
    manager: web::Data<SubscriptionManager>,
) -> Result<HttpResponse, SubscriptionError> {
    manager.unsubscribe(&email).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Unsubscribed successfully" })))
}

impl ResponseError for SubscriptionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::NotFound(_) => StatusCode::NOT_FOUND,
            SubscriptionError::ChannelUnavailable(_) => StatusCode::BAD_GATEWAY,
            SubscriptionError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}

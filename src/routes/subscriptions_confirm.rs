use actix_web::{
    web::{self, Query},
    HttpResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::subscription_manager::{SubscriptionError, SubscriptionManager};

#[derive(Deserialize, Debug)]
pub struct Parameters {
    pub token: String,
}

// A missing `token` query parameter is rejected by the extractor with a 400.
#[tracing::instrument(name = "Confirm a subscription channel", skip(manager, parameters))]
pub async fn handle_confirm_subscription(
    manager: web::Data<SubscriptionManager>,
    parameters: Query<Parameters>,
) -> Result<HttpResponse, SubscriptionError> {
    let subscriber = manager.confirm_channel(&parameters.token).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Subscription confirmed",
        "email": subscriber.email.as_ref()
    })))
}

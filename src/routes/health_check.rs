use actix_web::{HttpRequest, HttpResponse};

/// Liveness probe. Does not touch the stores or the channel provider.
#[tracing::instrument(name = "Health check handler", skip(_request))]
pub async fn health_check(_request: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().finish()
}

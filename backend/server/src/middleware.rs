use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{Instrument, info};

/// Runs each request inside an `http.request` span and logs its outcome.
pub async fn request_tracing(request: Request<Body>, next: Next) -> Response {
    let span = tracing::info_span!(
        "http.request",
        method = %request.method(),
        route = %request.uri().path(),
    );

    async move {
        let response = next.run(request).await;
        info!(status = response.status().as_u16(), "Request finished");

        response
    }
    .instrument(span)
    .await
}

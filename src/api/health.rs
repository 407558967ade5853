/// Health check endpoint
use crate::{context::AppContext, response::ApiResponse};
use axum::{routing::get, Router};

pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health))
}

async fn health() -> ApiResponse<&'static str> {
    ApiResponse::ok("OK", "Health check passed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_envelope() {
        let response = health().await;
        assert_eq!(response.status_code, 200);
        assert!(response.success);
        assert_eq!(response.data, "OK");
    }
}

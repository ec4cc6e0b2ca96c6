use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api::{
        handler::{
            create_order, get_credits, get_order_status, health_check, list_subscriptions, verify_payment,
            AppState,
        },
        webhook::clerk_webhook,
    },
    middleware::{create_cors_layer, rate_limit_middleware},
};

/// Upper bound on a request, comfortably above the gateway timeout plus store retries
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Requests running past `limit` are answered with 408
fn timeout_layer(limit: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, limit)
}

pub fn create_app(state: AppState, cors_origins: Option<&str>) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let payment_routes = Router::new()
        .route("/create-order", post(create_order))
        .route("/verify", post(verify_payment))
        .route("/orders/:order_id", get(get_order_status))
        .route("/credits", get(get_credits))
        .route("/subscriptions", get(list_subscriptions))
        .route_layer(from_fn_with_state(state.rate_limiter.clone(), rate_limit_middleware));

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest("/payment", payment_routes)
        .route("/api/webhook/clerk", post(clerk_webhook))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(timeout_layer(REQUEST_TIMEOUT))
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_times_out_with_408() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    "done"
                }),
            )
            .layer(timeout_layer(REQUEST_TIMEOUT));

        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}

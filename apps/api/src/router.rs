use std::sync::Arc;

use axum::{
    Json,
    Router,
    routing::get,
};
use serde_json::{json, Value};

use booking_cell::router::booking_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(health))
        .nest("/bookings", booking_routes(state))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "clinic-booking-api"
    }))
}

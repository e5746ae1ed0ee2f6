// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::booking::BookingService;

pub fn booking_routes(config: Arc<AppConfig>) -> Router {
    let service = Arc::new(BookingService::new(&config));
    booking_routes_with_service(config, service)
}

pub fn booking_routes_with_service(config: Arc<AppConfig>, service: Arc<BookingService>) -> Router {
    // Every booking operation requires a signed-in patient or admin
    Router::new()
        .route("/", get(handlers::list_bookings).post(handlers::create_booking))
        .route("/conflicts/check", post(handlers::check_conflicts))
        .route("/slots", get(handlers::get_available_slots))
        .route("/{booking_id}", get(handlers::get_booking).delete(handlers::delete_booking))
        .route("/{booking_id}/reschedule", patch(handlers::reschedule_booking))
        .route("/{booking_id}/cancel", post(handlers::cancel_booking))
        .route("/{booking_id}/status", patch(handlers::update_booking_status))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(service)
}

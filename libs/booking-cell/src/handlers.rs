// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::Session;
use shared_models::error::AppError;

use crate::models::{
    AvailableSlotsQuery, BookingError, BookingListQuery, ConflictCheckRequest,
    CreateBookingRequest, RescheduleBookingRequest, UpdateStatusRequest,
};
use crate::services::booking::BookingService;

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(msg) => AppError::ValidationError(msg),
            BookingError::TimeParse(msg) => AppError::ValidationError(msg),
            BookingError::ConflictDetected { .. } => {
                AppError::Conflict("This slot is already booked".to_string())
            }
            BookingError::SlotUnavailable(_) => {
                AppError::Conflict("This slot is no longer available".to_string())
            }
            e @ BookingError::InvalidStatusTransition { .. } => AppError::BadRequest(e.to_string()),
            BookingError::NotFound => AppError::NotFound("Booking not found".to_string()),
            BookingError::AccessDenied => {
                AppError::Forbidden("Not authorized to access this booking".to_string())
            }
            BookingError::Unauthorized(msg) => AppError::Auth(msg),
            BookingError::Database(msg) => AppError::Database(msg),
            BookingError::Notification(msg) => AppError::ExternalService(msg),
        }
    }
}

// ==============================================================================
// CONFLICT CHECK AND AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn check_conflicts(
    State(service): State<Arc<BookingService>>,
    Extension(session): Extension<Session>,
    Json(request): Json<ConflictCheckRequest>,
) -> Result<Json<Value>, AppError> {
    let result = service.check_conflicts(&session, &request).await?;
    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(service): State<Arc<BookingService>>,
    Extension(session): Extension<Session>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = service.available_slots(&session, &query).await?;

    Ok(Json(json!({
        "date": query.date,
        "practitioner": query.practitioner,
        "slots": slots,
    })))
}

// ==============================================================================
// BOOKING LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_bookings(
    State(service): State<Arc<BookingService>>,
    Extension(session): Extension<Session>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Value>, AppError> {
    let bookings = service.list_bookings(&session, &query).await?;

    Ok(Json(json!({
        "bookings": bookings,
        "total": bookings.len(),
    })))
}

#[axum::debug_handler]
pub async fn create_booking(
    State(service): State<Arc<BookingService>>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking = service.create_booking(&session, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "booking": booking,
            "message": "Booking request received"
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(service): State<Arc<BookingService>>,
    Extension(session): Extension<Session>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = service.get_booking(&session, booking_id).await?;
    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn reschedule_booking(
    State(service): State<Arc<BookingService>>,
    Extension(session): Extension<Session>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<RescheduleBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = service.reschedule_booking(&session, booking_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Booking rescheduled"
    })))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(service): State<Arc<BookingService>>,
    Extension(session): Extension<Session>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = service.cancel_booking(&session, booking_id).await?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Booking cancelled"
    })))
}

#[axum::debug_handler]
pub async fn update_booking_status(
    State(service): State<Arc<BookingService>>,
    Extension(session): Extension<Session>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = service.update_status(&session, booking_id, request.status).await?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
    })))
}

#[axum::debug_handler]
pub async fn delete_booking(
    State(service): State<Arc<BookingService>>,
    Extension(session): Extension<Session>,
    Path(booking_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.delete_booking(&session, booking_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

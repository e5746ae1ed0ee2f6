// libs/booking-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::services::slot_time::SlotTime;

/// Duration assumed when a booking or candidate does not carry one.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub patient_email: String,
    #[serde(default)]
    pub patient_phone: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub date: NaiveDate,
    /// 12-hour wall-clock time exactly as stored, e.g. "10:00 AM".
    pub time: String,
    pub practitioner: String,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    pub status: BookingStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Stored duration, falling back to the default when missing or not positive.
    pub fn effective_duration(&self) -> u32 {
        match self.duration_minutes {
            Some(minutes) if minutes > 0 => minutes as u32,
            _ => DEFAULT_DURATION_MINUTES,
        }
    }

    /// Half-open `[start, end)` interval in minutes since midnight.
    pub fn interval(&self) -> Result<(u32, u32), BookingError> {
        let start = SlotTime::parse(&self.time).map_err(|_| {
            BookingError::TimeParse(format!(
                "booking {} has unreadable time {:?}",
                self.id, self.time
            ))
        })?;
        Ok((start.minutes(), start.minutes() + self.effective_duration()))
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.patient_id
            .map(|id| id.to_string() == user_id)
            .unwrap_or(false)
    }

    /// Copy with everything identifying the patient removed.
    pub fn redacted(&self) -> Self {
        Self {
            patient_id: None,
            patient_name: String::new(),
            patient_email: String::new(),
            patient_phone: None,
            notes: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        match (self, next) {
            (BookingStatus::Pending, BookingStatus::Confirmed)
            | (BookingStatus::Pending, BookingStatus::Cancelled)
            | (BookingStatus::Pending, BookingStatus::Completed)
            | (BookingStatus::Confirmed, BookingStatus::Cancelled)
            | (BookingStatus::Confirmed, BookingStatus::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

/// Conflict-check input as the front end sends it. Everything is validated
/// by [`SlotCandidate::from_request`] before the check runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckRequest {
    pub date: String,
    pub time: String,
    pub practitioner: String,
    pub duration_minutes: Option<i64>,
    pub exclude_booking_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictCheckResult {
    pub has_conflict: bool,
    pub conflicts: Vec<Booking>,
}

/// A validated slot that is about to be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCandidate {
    pub date: NaiveDate,
    pub start: SlotTime,
    pub practitioner: String,
    pub duration_minutes: u32,
    pub exclude_booking_id: Option<Uuid>,
}

impl SlotCandidate {
    pub fn from_parts(
        date: &str,
        time: &str,
        practitioner: &str,
        duration_minutes: Option<i64>,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<Self, BookingError> {
        let date = parse_date(date)?;

        if time.trim().is_empty() {
            return Err(BookingError::Validation("time is required".to_string()));
        }
        let start = SlotTime::parse(time)?;

        if practitioner.trim().is_empty() {
            return Err(BookingError::Validation("practitioner is required".to_string()));
        }

        let duration_minutes = match duration_minutes {
            None => DEFAULT_DURATION_MINUTES,
            Some(minutes) if minutes <= 0 => {
                return Err(BookingError::Validation(format!(
                    "duration_minutes must be positive, got {}",
                    minutes
                )));
            }
            Some(minutes) => u32::try_from(minutes).map_err(|_| {
                BookingError::Validation(format!("duration_minutes {} is out of range", minutes))
            })?,
        };

        if u64::from(start.minutes()) + u64::from(duration_minutes) >= u64::from(MINUTES_PER_DAY) {
            return Err(BookingError::Validation(format!(
                "a {} minute slot starting at {} runs past midnight",
                duration_minutes, start
            )));
        }

        Ok(Self {
            date,
            start,
            practitioner: practitioner.to_string(),
            duration_minutes,
            exclude_booking_id,
        })
    }

    pub fn from_request(request: &ConflictCheckRequest) -> Result<Self, BookingError> {
        Self::from_parts(
            &request.date,
            &request.time,
            &request.practitioner,
            request.duration_minutes,
            request.exclude_booking_id,
        )
    }

    pub fn end_minutes(&self) -> u32 {
        self.start.minutes() + self.duration_minutes
    }

    /// Whether `booking` belongs to the same practitioner on the same date.
    pub fn shares_scope_with(&self, booking: &Booking) -> bool {
        booking.date == self.date && booking.practitioner == self.practitioner
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, BookingError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(BookingError::Validation("date is required".to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| BookingError::Validation(format!("date {:?} is not YYYY-MM-DD", raw)))
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub service: Option<String>,
    pub notes: Option<String>,
    pub date: String,
    pub time: String,
    pub practitioner: String,
    pub duration_minutes: Option<i64>,
    /// Only honoured for admins booking on a patient's behalf.
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RescheduleBookingRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    pub practitioner: Option<String>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingListQuery {
    pub date: Option<String>,
    pub practitioner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: String,
    pub practitioner: String,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailableSlot {
    pub time: String,
    pub end_time: String,
}

// ==============================================================================
// REPOSITORY MODELS
// ==============================================================================

/// Row to insert; the store assigns `id` and timestamps.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewBooking {
    pub patient_id: Option<Uuid>,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub service: Option<String>,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    pub practitioner: String,
    pub duration_minutes: i32,
    pub status: BookingStatus,
}

/// Partial update; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BookingChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practitioner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    pub date: Option<NaiveDate>,
    pub practitioner: Option<String>,
    pub patient_id: Option<Uuid>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid time: {0}")]
    TimeParse(String),

    #[error("Slot conflicts with {} existing booking(s)", .conflicts.len())]
    ConflictDetected { conflicts: Vec<Booking> },

    #[error("Slot no longer available: {0}")]
    SlotUnavailable(String),

    #[error("Booking cannot move from {from} to {to}")]
    InvalidStatusTransition { from: BookingStatus, to: BookingStatus },

    #[error("Booking not found")]
    NotFound,

    #[error("Not allowed to access this booking")]
    AccessDenied,

    #[error("Storage rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

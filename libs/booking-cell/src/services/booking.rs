// libs/booking-cell/src/services/booking.rs
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Session;

use crate::models::{
    AvailableSlot, AvailableSlotsQuery, Booking, BookingChanges, BookingError, BookingFilter,
    BookingListQuery, BookingStatus, ConflictCheckRequest, ConflictCheckResult,
    CreateBookingRequest, NewBooking, RescheduleBookingRequest, SlotCandidate, parse_date,
};
use crate::services::conflict::{ConflictPolicy, SlotConflictChecker};
use crate::services::locks::SlotLocks;
use crate::services::notification::{
    dispatch, BookingNotice, EdgeFunctionNotifier, NoticeKind, NotificationSender,
};
use crate::services::repository::{BookingRepository, SupabaseBookingRepository};
use crate::services::slot_time::SlotTime;
use crate::services::slots::{available_slots, OpeningHours};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

pub struct BookingService {
    repository: Arc<dyn BookingRepository>,
    notifier: Arc<dyn NotificationSender>,
    checker: SlotConflictChecker,
    opening_hours: OpeningHours,
    locks: SlotLocks,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self::with_components(
            Arc::new(SupabaseBookingRepository::new(Arc::clone(&supabase))),
            Arc::new(EdgeFunctionNotifier::new(supabase, config.booking_email_function.clone())),
            SlotConflictChecker::new(ConflictPolicy {
                cancelled_blocks_slot: config.cancelled_bookings_block_slots,
            }),
            OpeningHours::from_config(config),
        )
    }

    pub fn with_components(
        repository: Arc<dyn BookingRepository>,
        notifier: Arc<dyn NotificationSender>,
        checker: SlotConflictChecker,
        opening_hours: OpeningHours,
    ) -> Self {
        Self {
            repository,
            notifier,
            checker,
            opening_hours,
            locks: SlotLocks::new(),
        }
    }

    // ==============================================================================
    // CONFLICT CHECKS AND AVAILABILITY
    // ==============================================================================

    /// Check a proposed slot against the practitioner's bookings for that day.
    ///
    /// Callers who are not admins get the conflicting bookings back without
    /// patient details.
    pub async fn check_conflicts(
        &self,
        session: &Session,
        request: &ConflictCheckRequest,
    ) -> Result<ConflictCheckResult, BookingError> {
        let candidate = SlotCandidate::from_request(request)?;
        let result = self.check_candidate(session, &candidate).await?;

        if session.is_admin() {
            return Ok(result);
        }
        Ok(ConflictCheckResult {
            has_conflict: result.has_conflict,
            conflicts: result.conflicts.iter()
                .map(|b| if b.is_owned_by(session.user_id()) { b.clone() } else { b.redacted() })
                .collect(),
        })
    }

    pub async fn available_slots(
        &self,
        session: &Session,
        query: &AvailableSlotsQuery,
    ) -> Result<Vec<AvailableSlot>, BookingError> {
        let opening = self.opening_hours.opens.to_string();
        let template = SlotCandidate::from_parts(
            &query.date,
            &opening,
            &query.practitioner,
            query.duration_minutes,
            None,
        )?;

        let existing = self.repository
            .find_by_date_and_practitioner(session, template.date, &template.practitioner)
            .await?;

        available_slots(&self.opening_hours, &self.checker, &template, &existing)
    }

    // ==============================================================================
    // BOOKING LIFECYCLE
    // ==============================================================================

    pub async fn create_booking(
        &self,
        session: &Session,
        request: CreateBookingRequest,
    ) -> Result<Booking, BookingError> {
        validate_contact(&request.patient_name, &request.patient_email)?;

        let candidate = SlotCandidate::from_parts(
            &request.date,
            &request.time,
            &request.practitioner,
            request.duration_minutes,
            None,
        )?;

        let patient_id = if session.is_admin() {
            request.patient_id
        } else {
            Some(session_user_uuid(session)?)
        };

        let new_booking = NewBooking {
            patient_id,
            patient_name: request.patient_name.trim().to_string(),
            patient_email: request.patient_email.trim().to_string(),
            patient_phone: request.patient_phone,
            service: request.service,
            notes: request.notes,
            date: candidate.date,
            time: candidate.start.to_string(),
            practitioner: candidate.practitioner.clone(),
            duration_minutes: candidate.duration_minutes as i32,
            status: BookingStatus::Pending,
        };

        let created = {
            let _guard = self.locks.acquire(&candidate.practitioner, candidate.date).await;
            self.ensure_slot_free(session, &candidate).await?;
            self.repository.create(session, &new_booking).await?
        };

        info!("Booking {} created by {}", created.id, session.user_id());
        self.notify(session, NoticeKind::Created, &created);
        Ok(created)
    }

    pub async fn reschedule_booking(
        &self,
        session: &Session,
        booking_id: Uuid,
        request: RescheduleBookingRequest,
    ) -> Result<Booking, BookingError> {
        let current = self.get_booking(session, booking_id).await?;

        if current.status.is_terminal() {
            return Err(BookingError::Validation(format!(
                "a {} booking cannot be rescheduled",
                current.status
            )));
        }

        let date = request.date.unwrap_or_else(|| current.date.format("%Y-%m-%d").to_string());
        let time = request.time.unwrap_or_else(|| current.time.clone());
        let practitioner = request.practitioner.unwrap_or_else(|| current.practitioner.clone());
        let duration = request.duration_minutes
            .or_else(|| Some(i64::from(current.effective_duration())));

        let candidate = SlotCandidate::from_parts(&date, &time, &practitioner, duration, Some(current.id))?;

        let changes = BookingChanges {
            date: Some(candidate.date),
            time: Some(candidate.start.to_string()),
            practitioner: Some(candidate.practitioner.clone()),
            duration_minutes: Some(candidate.duration_minutes as i32),
            status: None,
        };

        let updated = {
            let _guard = self.locks.acquire(&candidate.practitioner, candidate.date).await;
            self.ensure_slot_free(session, &candidate).await?;
            self.repository.update(session, current.id, &changes).await?
        };

        info!("Booking {} rescheduled to {} {} with {}",
              updated.id, updated.date, updated.time, updated.practitioner);
        self.notify(session, NoticeKind::Updated, &updated);
        Ok(updated)
    }

    pub async fn cancel_booking(&self, session: &Session, booking_id: Uuid) -> Result<Booking, BookingError> {
        let current = self.get_booking(session, booking_id).await?;
        let cancelled = self.transition(session, &current, BookingStatus::Cancelled).await?;

        info!("Booking {} cancelled by {}", cancelled.id, session.user_id());
        self.notify(session, NoticeKind::Cancelled, &cancelled);
        Ok(cancelled)
    }

    /// Admin-only status change (confirm, complete, cancel).
    pub async fn update_status(
        &self,
        session: &Session,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, BookingError> {
        require_admin(session)?;

        let current = self.get_booking(session, booking_id).await?;
        let updated = self.transition(session, &current, status).await?;

        let kind = if status == BookingStatus::Cancelled {
            NoticeKind::Cancelled
        } else {
            NoticeKind::Updated
        };
        self.notify(session, kind, &updated);
        Ok(updated)
    }

    pub async fn delete_booking(&self, session: &Session, booking_id: Uuid) -> Result<(), BookingError> {
        require_admin(session)?;

        // Surface NotFound instead of a silent no-op delete.
        self.get_booking(session, booking_id).await?;
        self.repository.delete(session, booking_id).await
    }

    pub async fn get_booking(&self, session: &Session, booking_id: Uuid) -> Result<Booking, BookingError> {
        debug!("Fetching booking: {}", booking_id);

        let booking = self.repository
            .find_by_id(session, booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if !session.is_admin() && !booking.is_owned_by(session.user_id()) {
            warn!("User {} denied access to booking {}", session.user_id(), booking_id);
            return Err(BookingError::AccessDenied);
        }

        Ok(booking)
    }

    /// Admins see every booking matching the query; patients only their own.
    pub async fn list_bookings(
        &self,
        session: &Session,
        query: &BookingListQuery,
    ) -> Result<Vec<Booking>, BookingError> {
        let filter = BookingFilter {
            date: query.date.as_deref().map(parse_date).transpose()?,
            practitioner: query.practitioner.clone().filter(|p| !p.trim().is_empty()),
            patient_id: if session.is_admin() {
                None
            } else {
                Some(session_user_uuid(session)?)
            },
        };

        let mut bookings = self.repository.list(session, &filter).await?;
        bookings.sort_by_key(|b| {
            (b.date, SlotTime::parse(&b.time).map(SlotTime::minutes).unwrap_or(u32::MAX))
        });
        Ok(bookings)
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn check_candidate(
        &self,
        session: &Session,
        candidate: &SlotCandidate,
    ) -> Result<ConflictCheckResult, BookingError> {
        let existing = self.repository
            .find_by_date_and_practitioner(session, candidate.date, &candidate.practitioner)
            .await?;

        self.checker.check(candidate, &existing)
    }

    async fn ensure_slot_free(&self, session: &Session, candidate: &SlotCandidate) -> Result<(), BookingError> {
        let result = self.check_candidate(session, candidate).await?;
        if result.has_conflict {
            warn!("Conflict detected for {} on {} at {} - {} conflicting bookings",
                  candidate.practitioner, candidate.date, candidate.start, result.conflicts.len());
            return Err(BookingError::ConflictDetected { conflicts: result.conflicts });
        }
        Ok(())
    }

    async fn transition(
        &self,
        session: &Session,
        current: &Booking,
        status: BookingStatus,
    ) -> Result<Booking, BookingError> {
        if !current.status.can_transition_to(status) {
            return Err(BookingError::InvalidStatusTransition { from: current.status, to: status });
        }

        let changes = BookingChanges {
            status: Some(status),
            ..BookingChanges::default()
        };
        self.repository.update(session, current.id, &changes).await
    }

    fn notify(&self, session: &Session, kind: NoticeKind, booking: &Booking) {
        dispatch(
            Arc::clone(&self.notifier),
            session.clone(),
            BookingNotice::new(kind, booking.clone()),
        );
    }
}

fn require_admin(session: &Session) -> Result<(), BookingError> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(BookingError::AccessDenied)
    }
}

fn session_user_uuid(session: &Session) -> Result<Uuid, BookingError> {
    Uuid::parse_str(session.user_id())
        .map_err(|_| BookingError::Validation("session user id is not a UUID".to_string()))
}

fn validate_contact(name: &str, email: &str) -> Result<(), BookingError> {
    if name.trim().is_empty() {
        return Err(BookingError::Validation("patient_name is required".to_string()));
    }
    if !EMAIL.is_match(email.trim()) {
        return Err(BookingError::Validation(format!("{:?} is not a valid email", email)));
    }
    Ok(())
}

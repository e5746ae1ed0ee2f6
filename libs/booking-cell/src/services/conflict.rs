use crate::models::{
    Booking, BookingError, BookingStatus, ConflictCheckRequest, ConflictCheckResult,
    SlotCandidate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictPolicy {
    /// Cancelled bookings keep their slot occupied unless this is false.
    pub cancelled_blocks_slot: bool,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self { cancelled_blocks_slot: true }
    }
}

/// Decides whether a candidate slot overlaps existing bookings.
///
/// The check is pure: it expects the bookings for the candidate's date and
/// practitioner to have been fetched already and never touches storage.
/// Bookings outside that scope are ignored, since they cannot conflict.
#[derive(Debug, Clone, Default)]
pub struct SlotConflictChecker {
    policy: ConflictPolicy,
}

impl SlotConflictChecker {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    /// Validate a raw request and check it.
    pub fn check_request(
        &self,
        request: &ConflictCheckRequest,
        existing: &[Booking],
    ) -> Result<ConflictCheckResult, BookingError> {
        let candidate = SlotCandidate::from_request(request)?;
        self.check(&candidate, existing)
    }

    pub fn check(
        &self,
        candidate: &SlotCandidate,
        existing: &[Booking],
    ) -> Result<ConflictCheckResult, BookingError> {
        let start = candidate.start.minutes();
        let end = candidate.end_minutes();

        let mut conflicts = Vec::new();
        for booking in existing {
            if candidate.exclude_booking_id == Some(booking.id) {
                continue;
            }
            if !candidate.shares_scope_with(booking) {
                continue;
            }
            if !self.policy.cancelled_blocks_slot && booking.status == BookingStatus::Cancelled {
                continue;
            }

            let (booked_start, booked_end) = booking.interval()?;
            if intervals_overlap(start, end, booked_start, booked_end) {
                conflicts.push(booking.clone());
            }
        }

        Ok(ConflictCheckResult {
            has_conflict: !conflicts.is_empty(),
            conflicts,
        })
    }
}

/// Half-open overlap: `[a_start, a_end)` and `[b_start, b_end)` share a minute.
pub fn intervals_overlap(a_start: u32, a_end: u32, b_start: u32, b_end: u32) -> bool {
    a_start < b_end && a_end > b_start
}

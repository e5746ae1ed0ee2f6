use tracing::warn;

use shared_config::AppConfig;

use crate::models::{AvailableSlot, Booking, BookingError, SlotCandidate};
use crate::services::conflict::SlotConflictChecker;
use crate::services::slot_time::SlotTime;

/// The window in which slots are offered on the booking form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHours {
    pub opens: SlotTime,
    pub closes: SlotTime,
    pub step_minutes: u32,
}

impl Default for OpeningHours {
    fn default() -> Self {
        Self {
            opens: SlotTime::from_minutes(9 * 60).unwrap_or(SlotTime::MIDNIGHT),
            closes: SlotTime::from_minutes(17 * 60).unwrap_or(SlotTime::MIDNIGHT),
            step_minutes: 60,
        }
    }
}

impl OpeningHours {
    pub fn new(opens: SlotTime, closes: SlotTime, step_minutes: u32) -> Result<Self, BookingError> {
        if opens >= closes {
            return Err(BookingError::Validation(format!(
                "opening time {} must be before closing time {}",
                opens, closes
            )));
        }
        if step_minutes == 0 {
            return Err(BookingError::Validation("slot step must be positive".to_string()));
        }
        Ok(Self { opens, closes, step_minutes })
    }

    /// Opening hours from config, or the clinic default when they don't parse.
    pub fn from_config(config: &AppConfig) -> Self {
        let parsed = SlotTime::parse(&config.clinic_opening_time).and_then(|opens| {
            let closes = SlotTime::parse(&config.clinic_closing_time)?;
            Self::new(opens, closes, config.slot_step_minutes)
        });

        parsed.unwrap_or_else(|e| {
            warn!("Invalid clinic opening hours ({}), using 9:00 AM - 5:00 PM", e);
            Self::default()
        })
    }

    /// Start times whose whole `[start, start + duration)` fits inside opening hours.
    pub fn starts_for(&self, duration_minutes: u32) -> impl Iterator<Item = SlotTime> + '_ {
        let closes = self.closes.minutes();
        (self.opens.minutes()..closes)
            .step_by(self.step_minutes as usize)
            .filter(move |start| start + duration_minutes <= closes)
            .filter_map(SlotTime::from_minutes)
    }
}

/// Every free start time for `template`'s practitioner and date.
///
/// `template` supplies date, practitioner and duration; its start time is
/// ignored and replaced by each candidate start in turn.
pub fn available_slots(
    hours: &OpeningHours,
    checker: &SlotConflictChecker,
    template: &SlotCandidate,
    existing: &[Booking],
) -> Result<Vec<AvailableSlot>, BookingError> {
    let mut slots = Vec::new();

    for start in hours.starts_for(template.duration_minutes) {
        let candidate = SlotCandidate {
            start,
            ..template.clone()
        };
        if checker.check(&candidate, existing)?.has_conflict {
            continue;
        }

        let end = SlotTime::from_minutes(candidate.end_minutes())
            .ok_or_else(|| BookingError::Validation("slot runs past midnight".to_string()))?;
        slots.push(AvailableSlot {
            time: start.to_string(),
            end_time: end.to_string(),
        });
    }

    Ok(slots)
}

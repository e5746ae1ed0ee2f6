use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::supabase::{return_representation, SupabaseClient, SupabaseError};
use shared_models::auth::Session;

use crate::models::{Booking, BookingChanges, BookingError, BookingFilter, NewBooking};

const BOOKINGS_PATH: &str = "/rest/v1/bookings";

/// Storage for bookings.
///
/// Implementations own the check-then-write race: the conflict check reads
/// through `find_by_date_and_practitioner` and cannot stop a concurrent
/// writer, so `create`/`update` must reject a duplicate slot themselves
/// (for Supabase, a unique constraint on `(practitioner, date, time)`) and
/// report it as [`BookingError::SlotUnavailable`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_date_and_practitioner(
        &self,
        session: &Session,
        date: NaiveDate,
        practitioner: &str,
    ) -> Result<Vec<Booking>, BookingError>;

    async fn find_by_id(&self, session: &Session, id: Uuid) -> Result<Option<Booking>, BookingError>;

    async fn list(&self, session: &Session, filter: &BookingFilter) -> Result<Vec<Booking>, BookingError>;

    async fn create(&self, session: &Session, booking: &NewBooking) -> Result<Booking, BookingError>;

    async fn update(
        &self,
        session: &Session,
        id: Uuid,
        changes: &BookingChanges,
    ) -> Result<Booking, BookingError>;

    async fn delete(&self, session: &Session, id: Uuid) -> Result<(), BookingError>;
}

impl From<SupabaseError> for BookingError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Conflict(body) => BookingError::SlotUnavailable(body),
            SupabaseError::NotFound(_) => BookingError::NotFound,
            SupabaseError::Auth(body) => BookingError::Unauthorized(body),
            other => BookingError::Database(other.to_string()),
        }
    }
}

/// `bookings` table behind Supabase PostgREST.
pub struct SupabaseBookingRepository {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseBookingRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, session: &Session, query: &str) -> Result<Vec<Booking>, BookingError> {
        let path = format!("{}?{}", BOOKINGS_PATH, query);
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(&session.access_token),
            None,
        ).await?;

        decode_rows(rows)
    }

    fn single(rows: Vec<Value>, action: &str) -> Result<Booking, BookingError> {
        let row = rows.into_iter().next()
            .ok_or_else(|| BookingError::Database(format!("{} returned no rows", action)))?;
        serde_json::from_value(row)
            .map_err(|e| BookingError::Database(format!("Failed to parse booking: {}", e)))
    }
}

#[async_trait]
impl BookingRepository for SupabaseBookingRepository {
    async fn find_by_date_and_practitioner(
        &self,
        session: &Session,
        date: NaiveDate,
        practitioner: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        debug!("Fetching bookings for {} on {}", practitioner, date);

        let query = format!(
            "date=eq.{}&practitioner=eq.{}",
            date.format("%Y-%m-%d"),
            urlencoding::encode(practitioner)
        );
        self.fetch(session, &query).await
    }

    async fn find_by_id(&self, session: &Session, id: Uuid) -> Result<Option<Booking>, BookingError> {
        debug!("Fetching booking {}", id);

        let mut rows = self.fetch(session, &format!("id=eq.{}", id)).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn list(&self, session: &Session, filter: &BookingFilter) -> Result<Vec<Booking>, BookingError> {
        let mut query_parts = Vec::new();
        if let Some(date) = filter.date {
            query_parts.push(format!("date=eq.{}", date.format("%Y-%m-%d")));
        }
        if let Some(practitioner) = &filter.practitioner {
            query_parts.push(format!("practitioner=eq.{}", urlencoding::encode(practitioner)));
        }
        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        query_parts.push("order=date.asc".to_string());

        debug!("Listing bookings with filter {:?}", filter);
        self.fetch(session, &query_parts.join("&")).await
    }

    async fn create(&self, session: &Session, booking: &NewBooking) -> Result<Booking, BookingError> {
        let body = serde_json::to_value(booking)
            .map_err(|e| BookingError::Database(format!("Failed to encode booking: {}", e)))?;

        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            BOOKINGS_PATH,
            Some(&session.access_token),
            Some(body),
            Some(return_representation()),
        ).await?;

        let created = Self::single(rows, "insert")?;
        info!("Booking {} created for {} on {} at {}",
              created.id, created.practitioner, created.date, created.time);
        Ok(created)
    }

    async fn update(
        &self,
        session: &Session,
        id: Uuid,
        changes: &BookingChanges,
    ) -> Result<Booking, BookingError> {
        let mut body = serde_json::to_value(changes)
            .map_err(|e| BookingError::Database(format!("Failed to encode changes: {}", e)))?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("updated_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));
        }

        let path = format!("{}?id=eq.{}", BOOKINGS_PATH, id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(&session.access_token),
            Some(body),
            Some(return_representation()),
        ).await?;

        if rows.is_empty() {
            return Err(BookingError::NotFound);
        }
        Self::single(rows, "update")
    }

    async fn delete(&self, session: &Session, id: Uuid) -> Result<(), BookingError> {
        let path = format!("{}?id=eq.{}", BOOKINGS_PATH, id);
        self.supabase.execute(
            Method::DELETE,
            &path,
            Some(&session.access_token),
            None,
        ).await?;

        info!("Booking {} deleted", id);
        Ok(())
    }
}

fn decode_rows(rows: Vec<Value>) -> Result<Vec<Booking>, BookingError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Booking>, _>>()
        .map_err(|e| BookingError::Database(format!("Failed to parse bookings: {}", e)))
}

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use shared_database::supabase::SupabaseClient;
use shared_models::auth::Session;

use crate::models::{Booking, BookingError};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Created,
    Updated,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingNotice {
    pub kind: NoticeKind,
    pub booking: Booking,
}

impl BookingNotice {
    pub fn new(kind: NoticeKind, booking: Booking) -> Self {
        Self { kind, booking }
    }
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, session: &Session, notice: &BookingNotice) -> Result<(), BookingError>;
}

/// Sends booking emails through a Supabase edge function.
pub struct EdgeFunctionNotifier {
    supabase: Arc<SupabaseClient>,
    function_name: String,
}

impl EdgeFunctionNotifier {
    pub fn new(supabase: Arc<SupabaseClient>, function_name: impl Into<String>) -> Self {
        Self {
            supabase,
            function_name: function_name.into(),
        }
    }
}

#[async_trait]
impl NotificationSender for EdgeFunctionNotifier {
    async fn send(&self, session: &Session, notice: &BookingNotice) -> Result<(), BookingError> {
        let payload = json!({
            "type": notice.kind,
            "to": notice.booking.patient_email,
            "booking": notice.booking,
        });

        self.supabase
            .invoke_function(&self.function_name, Some(&session.access_token), payload)
            .await
            .map_err(|e| BookingError::Notification(e.to_string()))
    }
}

/// Send `notice` in the background. Failures are logged and never reach the
/// caller: the booking has already been written by the time this runs.
pub fn dispatch(
    notifier: Arc<dyn NotificationSender>,
    session: Session,
    notice: BookingNotice,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.send(&session, &notice).await {
            Ok(()) => debug!("Sent {:?} notice for booking {}", notice.kind, notice.booking.id),
            Err(e) => warn!("Failed to send {:?} notice for booking {}: {}",
                            notice.kind, notice.booking.id, e),
        }
    })
}

pub mod slot_time;
pub mod conflict;
pub mod slots;
pub mod locks;
pub mod repository;
pub mod notification;
pub mod booking;

pub use slot_time::SlotTime;
pub use conflict::{ConflictPolicy, SlotConflictChecker};
pub use slots::OpeningHours;
pub use repository::{BookingRepository, SupabaseBookingRepository};
pub use notification::{BookingNotice, EdgeFunctionNotifier, NoticeKind, NotificationSender};
pub use booking::BookingService;

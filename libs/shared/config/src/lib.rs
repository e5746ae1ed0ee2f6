use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub booking_email_function: String,
    pub clinic_opening_time: String,
    pub clinic_closing_time: String,
    pub slot_step_minutes: u32,
    pub cancelled_bookings_block_slots: bool,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            booking_email_function: "send-booking-email".to_string(),
            clinic_opening_time: "9:00 AM".to_string(),
            clinic_closing_time: "5:00 PM".to_string(),
            slot_step_minutes: 60,
            cancelled_bookings_block_slots: true,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            booking_email_function: env::var("BOOKING_EMAIL_FUNCTION")
                .unwrap_or(defaults.booking_email_function),
            clinic_opening_time: env::var("CLINIC_OPENING_TIME")
                .unwrap_or(defaults.clinic_opening_time),
            clinic_closing_time: env::var("CLINIC_CLOSING_TIME")
                .unwrap_or(defaults.clinic_closing_time),
            slot_step_minutes: parse_var("CLINIC_SLOT_STEP_MINUTES", defaults.slot_step_minutes),
            cancelled_bookings_block_slots: parse_var(
                "CANCELLED_BOOKINGS_BLOCK_SLOTS",
                defaults.cancelled_bookings_block_slots,
            ),
            port: parse_var("PORT", defaults.port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

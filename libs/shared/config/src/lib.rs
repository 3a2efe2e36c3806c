use std::env;
use std::str::FromStr;

use chrono::NaiveTime;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub supabase_jwt_secret: String,
    pub port: u16,
    pub scheduling: SchedulingConfig,
}

/// Which ledger implementation the API binary wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Memory,
    Supabase,
}

impl FromStr for LedgerBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(LedgerBackend::Memory),
            "supabase" => Ok(LedgerBackend::Supabase),
            other => Err(format!("unknown ledger backend: {}", other)),
        }
    }
}

/// Clinic calendar and booking policy knobs.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    pub clinic_open: NaiveTime,
    pub clinic_close: NaiveTime,
    pub slot_interval_minutes: i64,
    pub lead_time_minutes: i64,
    pub store_timeout_ms: u64,
    pub code_generation_attempts: u32,
    /// When set, a full-day block is refused while active appointments exist that day.
    pub full_day_block_rejects_bookings: bool,
    pub ledger_backend: LedgerBackend,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            clinic_open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            clinic_close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_interval_minutes: 30,
            lead_time_minutes: 120,
            store_timeout_ms: 5_000,
            code_generation_attempts: 5,
            full_day_block_rejects_bookings: false,
            ledger_backend: LedgerBackend::Memory,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            clinic_open: time_var("CLINIC_OPEN", defaults.clinic_open),
            clinic_close: time_var("CLINIC_CLOSE", defaults.clinic_close),
            slot_interval_minutes: parsed_var("SLOT_INTERVAL_MINUTES", defaults.slot_interval_minutes),
            lead_time_minutes: parsed_var("BOOKING_LEAD_TIME_MINUTES", defaults.lead_time_minutes),
            store_timeout_ms: parsed_var("STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            code_generation_attempts: parsed_var(
                "APPOINTMENT_CODE_ATTEMPTS",
                defaults.code_generation_attempts,
            ),
            full_day_block_rejects_bookings: parsed_var(
                "FULL_DAY_BLOCK_REJECTS_BOOKINGS",
                defaults.full_day_block_rejects_bookings,
            ),
            ledger_backend: parsed_var("LEDGER_BACKEND", defaults.ledger_backend),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            port: parsed_var("PORT", 3000),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if config.scheduling.ledger_backend == LedgerBackend::Supabase && !config.is_ledger_configured() {
            warn!("Supabase ledger selected but SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY are missing");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_ledger_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }
}

fn parsed_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn time_var(name: &str, default: NaiveTime) -> NaiveTime {
    match env::var(name) {
        Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default.format("%H:%M"));
            default
        }),
        Err(_) => default,
    }
}

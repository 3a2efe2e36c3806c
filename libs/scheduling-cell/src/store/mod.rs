// libs/scheduling-cell/src/store/mod.rs
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use thiserror::Error;

use shared_database::DatabaseError;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentId, BlockId, ClientId, DateRange, NewAppointment,
    NewBlock, Provider, ProviderId, UnavailabilityBlock,
};

pub mod memory;
pub mod supabase;

pub use memory::MemoryLedger;
pub use supabase::SupabaseLedger;

/// Uniqueness rules the ledger enforces on non-cancelled appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    ProviderSlot,
    ClientSlot,
    AppointmentCode,
    Other,
}

impl UniqueConstraint {
    pub const PROVIDER_SLOT_INDEX: &'static str = "appointments_provider_slot_active_idx";
    pub const CLIENT_SLOT_INDEX: &'static str = "appointments_client_slot_active_idx";
    pub const CODE_KEY: &'static str = "appointments_appointment_code_key";

    pub fn from_name(name: &str) -> Self {
        match name {
            Self::PROVIDER_SLOT_INDEX => UniqueConstraint::ProviderSlot,
            Self::CLIENT_SLOT_INDEX => UniqueConstraint::ClientSlot,
            Self::CODE_KEY => UniqueConstraint::AppointmentCode,
            _ => UniqueConstraint::Other,
        }
    }
}

/// Cross-table rules the ledger enforces at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerGuard {
    /// An active appointment may not be written into a blocked slot.
    SlotBlocked,
    /// A block may not be written over active appointments it is asked to respect.
    BlockOverBookings,
    /// The day is already blocked in full, or the same range is already blocked.
    DuplicateBlock,
    /// A partial block may not intersect another partial block.
    OverlappingBlock,
}

impl LedgerGuard {
    pub const SLOT_BLOCKED: &'static str = "provider_unavailable";
    pub const BLOCK_OVER_BOOKINGS: &'static str = "conflicting_appointments";
    pub const DUPLICATE_BLOCK: &'static str = "duplicate_block";
    pub const OVERLAPPING_BLOCK: &'static str = "overlapping_block";

    pub fn from_message(message: &str) -> Option<Self> {
        [
            (Self::SLOT_BLOCKED, LedgerGuard::SlotBlocked),
            (Self::BLOCK_OVER_BOOKINGS, LedgerGuard::BlockOverBookings),
            (Self::DUPLICATE_BLOCK, LedgerGuard::DuplicateBlock),
            (Self::OVERLAPPING_BLOCK, LedgerGuard::OverlappingBlock),
        ]
        .into_iter()
        .find(|(marker, _)| message.contains(marker))
        .map(|(_, guard)| guard)
    }
}

/// Everything that decides one provider's availability on one date, read from a single snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderDay {
    /// Rows of every status, ordered by time.
    pub appointments: Vec<Appointment>,
    pub blocks: Vec<UnavailabilityBlock>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Unique constraint violated: {0:?}")]
    UniqueViolation(UniqueConstraint),

    #[error("Ledger guard rejected write: {0:?}")]
    GuardViolation(LedgerGuard),

    #[error("Ledger returned malformed data: {0}")]
    Corrupt(String),
}

impl From<DatabaseError> for StoreError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::Unavailable(message) => StoreError::Unavailable(message),
            DatabaseError::UniqueViolation { constraint } => {
                StoreError::UniqueViolation(UniqueConstraint::from_name(&constraint))
            }
            DatabaseError::Raised { message } => match LedgerGuard::from_message(&message) {
                Some(guard) => StoreError::GuardViolation(guard),
                None => StoreError::Corrupt(format!("unexpected database exception: {}", message)),
            },
            DatabaseError::Decode(message) => StoreError::Corrupt(message),
            other => StoreError::Corrupt(other.to_string()),
        }
    }
}

/// Entry point to the appointment/block ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;
}

/// A unit of work against the ledger. Dropping it without `commit` discards its writes.
#[async_trait]
pub trait LedgerTx: Send {
    async fn provider(&mut self, provider_id: ProviderId) -> Result<Option<Provider>, StoreError>;

    /// Ordered by name.
    async fn providers(&mut self) -> Result<Vec<Provider>, StoreError>;

    /// Case-insensitive match, ordered by name.
    async fn providers_by_specialization(
        &mut self,
        specialization: &str,
    ) -> Result<Vec<Provider>, StoreError>;

    async fn appointment(&mut self, appointment_id: AppointmentId) -> Result<Option<Appointment>, StoreError>;

    /// Rows of every status, ordered by date then time. `None` reads the provider's whole history.
    async fn provider_appointments(
        &mut self,
        provider_id: ProviderId,
        range: Option<DateRange>,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Rows of every status, newest first.
    async fn client_appointments(&mut self, client_id: ClientId) -> Result<Vec<Appointment>, StoreError>;

    /// Active appointments occupying a provider slot.
    async fn provider_appointments_at(
        &mut self,
        provider_id: ProviderId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Active appointments the client holds at an exact date and time.
    async fn client_appointments_at(
        &mut self,
        client_id: ClientId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn code_exists(&mut self, code: &str) -> Result<bool, StoreError>;

    async fn insert_appointment(&mut self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    /// Returns the updated row, or `None` when no row has that id.
    async fn update_appointment(
        &mut self,
        appointment_id: AppointmentId,
        changes: &AppointmentChanges,
    ) -> Result<Option<Appointment>, StoreError>;

    async fn provider_day(&mut self, provider_id: ProviderId, date: NaiveDate) -> Result<ProviderDay, StoreError>;

    async fn blocks_on(
        &mut self,
        provider_id: ProviderId,
        date: NaiveDate,
    ) -> Result<Vec<UnavailabilityBlock>, StoreError>;

    /// Blocks dated on or after `from`, ordered by date then start time (full-day first).
    async fn blocks_from(
        &mut self,
        provider_id: ProviderId,
        from: NaiveDate,
    ) -> Result<Vec<UnavailabilityBlock>, StoreError>;

    /// Rejects duplicate and overlapping ranges, and ranges over active appointments when
    /// `block.guard_bookings` is set, atomically with the insert.
    async fn insert_block(&mut self, block: NewBlock) -> Result<UnavailabilityBlock, StoreError>;

    /// Returns the number of rows removed.
    async fn delete_block(&mut self, provider_id: ProviderId, block_id: BlockId) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

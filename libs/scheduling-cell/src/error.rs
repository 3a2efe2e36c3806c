// libs/scheduling-cell/src/error.rs
use chrono::NaiveTime;
use thiserror::Error;

use shared_models::error::AppError;

use crate::models::AppointmentStatus;
use crate::store::{LedgerGuard, StoreError, UniqueConstraint};

/// How a failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    Policy,
    NotFound,
    Unavailable,
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("Invalid slot range: {0}")]
    InvalidRange(String),

    #[error("Invalid block range: {0}")]
    MalformedRange(String),

    #[error("{} is not a bookable slot time", .0.format("%H:%M"))]
    InvalidSlotTime(NaiveTime),

    #[error("{0}")]
    Validation(String),

    #[error("This time slot is already booked. Please choose another time.")]
    SlotTaken,

    #[error("You already have an appointment at this time")]
    ClientConflict,

    #[error("This time is already blocked")]
    DuplicateBlock,

    #[error("Block overlaps an existing blocked time range")]
    OverlappingBlock,

    #[error("Cannot block this time: active appointments exist within the range")]
    ConflictingAppointments,

    #[error("You can only modify appointments at least {minutes} minutes before the scheduled time")]
    LeadTime { minutes: i64 },

    #[error("Provider is not available at this time. Please choose another slot.")]
    ProviderUnavailable,

    #[error("Date is in the past")]
    PastDate,

    #[error("Cannot change a {0} appointment")]
    TerminalState(AppointmentStatus),

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot cancel a completed appointment")]
    AlreadyCompleted,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Scheduling store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Could not generate a unique appointment code after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },

    #[error("Internal scheduling error: {0}")]
    Internal(String),
}

impl SchedulingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SchedulingError::InvalidRange(_)
            | SchedulingError::MalformedRange(_)
            | SchedulingError::InvalidSlotTime(_)
            | SchedulingError::Validation(_) => ErrorCategory::Validation,

            SchedulingError::SlotTaken
            | SchedulingError::ClientConflict
            | SchedulingError::DuplicateBlock
            | SchedulingError::OverlappingBlock
            | SchedulingError::ConflictingAppointments => ErrorCategory::Conflict,

            SchedulingError::LeadTime { .. }
            | SchedulingError::ProviderUnavailable
            | SchedulingError::PastDate
            | SchedulingError::TerminalState(_)
            | SchedulingError::AlreadyCancelled
            | SchedulingError::AlreadyCompleted => ErrorCategory::Policy,

            SchedulingError::NotFound(_) => ErrorCategory::NotFound,
            SchedulingError::StoreUnavailable(_) => ErrorCategory::Unavailable,

            SchedulingError::CodeGenerationExhausted { .. }
            | SchedulingError::Internal(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Unavailable
    }

    pub fn not_found(entity: &str) -> Self {
        SchedulingError::NotFound(entity.to_string())
    }
}

impl From<StoreError> for SchedulingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(message) => SchedulingError::StoreUnavailable(message),
            StoreError::UniqueViolation(UniqueConstraint::ProviderSlot) => SchedulingError::SlotTaken,
            StoreError::UniqueViolation(UniqueConstraint::ClientSlot) => SchedulingError::ClientConflict,
            StoreError::UniqueViolation(constraint) => {
                SchedulingError::Internal(format!("unexpected unique violation on {:?}", constraint))
            }
            StoreError::GuardViolation(LedgerGuard::SlotBlocked) => SchedulingError::ProviderUnavailable,
            StoreError::GuardViolation(LedgerGuard::BlockOverBookings) => {
                SchedulingError::ConflictingAppointments
            }
            StoreError::GuardViolation(LedgerGuard::DuplicateBlock) => SchedulingError::DuplicateBlock,
            StoreError::GuardViolation(LedgerGuard::OverlappingBlock) => SchedulingError::OverlappingBlock,
            StoreError::Corrupt(message) => SchedulingError::Internal(message),
        }
    }
}

impl From<SchedulingError> for AppError {
    fn from(error: SchedulingError) -> Self {
        let message = error.to_string();
        match error.category() {
            ErrorCategory::Validation => AppError::ValidationError(message),
            ErrorCategory::Conflict => AppError::Conflict(message),
            ErrorCategory::Policy => match error {
                SchedulingError::LeadTime { .. } => AppError::Forbidden(message),
                _ => AppError::BadRequest(message),
            },
            ErrorCategory::NotFound => AppError::NotFound(message),
            ErrorCategory::Unavailable => AppError::Unavailable(message),
            ErrorCategory::Internal => AppError::Internal(message),
        }
    }
}

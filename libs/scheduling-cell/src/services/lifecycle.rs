// libs/scheduling-cell/src/services/lifecycle.rs
use chrono::{Duration, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::SchedulingError;
use crate::models::{Appointment, AppointmentStatus};

const ALL_STATUSES: [AppointmentStatus; 5] = [
    AppointmentStatus::Booked,
    AppointmentStatus::Confirmed,
    AppointmentStatus::Completed,
    AppointmentStatus::Cancelled,
    AppointmentStatus::NoShow,
];

/// Appointment state machine and the client-side change policy.
#[derive(Debug, Clone, Copy)]
pub struct AppointmentLifecycleService {
    lead_time: Duration,
}

impl AppointmentLifecycleService {
    pub fn new(lead_time_minutes: i64) -> Self {
        Self { lead_time: Duration::minutes(lead_time_minutes) }
    }

    /// Statuses a provider may set from `current`.
    ///
    /// Any move is allowed out of a non-terminal status; a terminal status may only be
    /// re-applied (to edit notes).
    pub fn valid_transitions(&self, current: AppointmentStatus) -> Vec<AppointmentStatus> {
        if current.is_terminal() {
            vec![current]
        } else {
            ALL_STATUSES.to_vec()
        }
    }

    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        requested: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        debug!("Validating status transition from {} to {}", current, requested);

        if !self.valid_transitions(current).contains(&requested) {
            warn!("Invalid status transition attempted: {} -> {}", current, requested);
            return Err(SchedulingError::TerminalState(current));
        }

        Ok(())
    }

    /// Clients may not edit cancelled or completed bookings.
    pub fn ensure_client_editable(&self, appointment: &Appointment) -> Result<(), SchedulingError> {
        match appointment.status {
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => {
                Err(SchedulingError::TerminalState(appointment.status))
            }
            _ => Ok(()),
        }
    }

    pub fn ensure_cancellable(&self, appointment: &Appointment) -> Result<(), SchedulingError> {
        match appointment.status {
            AppointmentStatus::Cancelled => Err(SchedulingError::AlreadyCancelled),
            AppointmentStatus::Completed => Err(SchedulingError::AlreadyCompleted),
            _ => Ok(()),
        }
    }

    /// Client changes close once `now` reaches `scheduled_at - lead_time`.
    pub fn enforce_lead_time(
        &self,
        scheduled_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<(), SchedulingError> {
        if now >= scheduled_at - self.lead_time {
            warn!(
                "Change rejected: appointment at {} is within {} minutes of {}",
                scheduled_at,
                self.lead_time.num_minutes(),
                now
            );
            return Err(SchedulingError::LeadTime { minutes: self.lead_time.num_minutes() });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 20).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn test_lead_time_gate() {
        let lifecycle = AppointmentLifecycleService::new(120);

        assert_matches!(
            lifecycle.enforce_lead_time(now() + Duration::minutes(90), now()),
            Err(SchedulingError::LeadTime { minutes: 120 })
        );
        assert_matches!(lifecycle.enforce_lead_time(now() + Duration::hours(2), now()), Err(_));
        assert!(lifecycle.enforce_lead_time(now() + Duration::hours(3), now()).is_ok());
    }

    #[test]
    fn test_provider_transitions() {
        let lifecycle = AppointmentLifecycleService::new(120);

        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Booked, AppointmentStatus::NoShow)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Confirmed, AppointmentStatus::Booked)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Completed, AppointmentStatus::Completed)
            .is_ok());
        assert_matches!(
            lifecycle.validate_status_transition(AppointmentStatus::Cancelled, AppointmentStatus::Booked),
            Err(SchedulingError::TerminalState(AppointmentStatus::Cancelled))
        );
    }
}

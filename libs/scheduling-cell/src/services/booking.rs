// libs/scheduling-cell/src/services/booking.rs
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::error::SchedulingError;
use crate::models::{
    Appointment, AppointmentChanges, AppointmentId, AppointmentStatus, BookAppointmentRequest,
    BookingPatch, ClientBookings, ClientId, NewAppointment, ProviderId,
};
use crate::services::code::generate_code;
use crate::services::conflict::{ConflictDetector, SlotCandidate};
use crate::services::lattice::SlotLattice;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::store::{LedgerTx, StoreError, UniqueConstraint};

/// Client bookings and provider status updates, run inside a ledger transaction.
#[derive(Debug, Clone)]
pub struct BookingService {
    lattice: SlotLattice,
    detector: ConflictDetector,
    lifecycle: AppointmentLifecycleService,
    code_attempts: u32,
}

impl BookingService {
    pub fn new(lattice: SlotLattice, lifecycle: AppointmentLifecycleService, code_attempts: u32) -> Self {
        Self {
            lattice,
            detector: ConflictDetector::new(),
            lifecycle,
            code_attempts: code_attempts.max(1),
        }
    }

    pub async fn create(
        &self,
        tx: &mut dyn LedgerTx,
        client_id: ClientId,
        request: BookAppointmentRequest,
        now: NaiveDateTime,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "Booking provider {} for client {} at {} {}",
            request.provider_id, client_id, request.appointment_date, request.appointment_time
        );

        if tx.provider(request.provider_id).await?.is_none() {
            return Err(SchedulingError::not_found("Provider"));
        }

        if !self.lattice.contains(request.appointment_time) {
            return Err(SchedulingError::InvalidSlotTime(request.appointment_time));
        }

        let candidate = SlotCandidate {
            provider_id: request.provider_id,
            client_id,
            date: request.appointment_date,
            time: request.appointment_time,
            exclude_appointment_id: None,
        };
        self.detector.check(tx, &candidate, now.date()).await?;

        let epoch_millis = now.and_utc().timestamp_millis();
        for attempt in 1..=self.code_attempts {
            let code = generate_code(epoch_millis);
            if tx.code_exists(&code).await? {
                debug!("Appointment code {} already issued (attempt {})", code, attempt);
                continue;
            }

            let row = NewAppointment {
                appointment_code: code.clone(),
                provider_id: request.provider_id,
                client_id,
                appointment_date: request.appointment_date,
                appointment_time: request.appointment_time,
                status: AppointmentStatus::Booked,
                reason_for_visit: request.reason_for_visit.clone(),
                created_at: now,
                updated_at: now,
            };

            match tx.insert_appointment(row).await {
                Ok(appointment) => {
                    info!(
                        "Booked appointment {} ({}) for client {} with provider {}",
                        appointment.id, appointment.appointment_code, client_id, request.provider_id
                    );
                    return Ok(appointment);
                }
                Err(StoreError::UniqueViolation(UniqueConstraint::AppointmentCode)) => {
                    debug!("Appointment code {} collided on insert (attempt {})", code, attempt);
                }
                Err(error) => {
                    warn!("Booking insert rejected by ledger: {}", error);
                    return Err(error.into());
                }
            }
        }

        warn!("Exhausted {} attempts to generate an appointment code", self.code_attempts);
        Err(SchedulingError::CodeGenerationExhausted { attempts: self.code_attempts })
    }

    pub async fn update(
        &self,
        tx: &mut dyn LedgerTx,
        client_id: ClientId,
        appointment_id: AppointmentId,
        patch: BookingPatch,
        now: NaiveDateTime,
    ) -> Result<Appointment, SchedulingError> {
        if patch.is_empty() {
            return Err(SchedulingError::Validation("No fields to update".to_string()));
        }

        let appointment = self.client_booking(tx, client_id, appointment_id).await?;
        self.lifecycle.ensure_client_editable(&appointment)?;
        self.lifecycle.enforce_lead_time(appointment.scheduled_at(), now)?;

        if patch.moves_slot() {
            if let Some(time) = patch.appointment_time {
                if !self.lattice.contains(time) {
                    return Err(SchedulingError::InvalidSlotTime(time));
                }
            }

            let candidate = SlotCandidate {
                provider_id: appointment.provider_id,
                client_id,
                date: patch.appointment_date.unwrap_or(appointment.appointment_date),
                time: patch.appointment_time.unwrap_or(appointment.appointment_time),
                exclude_appointment_id: Some(appointment.id),
            };
            self.detector.check(tx, &candidate, now.date()).await?;
        }

        let changes = AppointmentChanges {
            appointment_date: patch.appointment_date,
            appointment_time: patch.appointment_time,
            reason_for_visit: patch.reason_for_visit,
            updated_at: Some(now),
            ..AppointmentChanges::default()
        };

        let updated = tx
            .update_appointment(appointment.id, &changes)
            .await?
            .ok_or_else(|| SchedulingError::not_found("Booking"))?;

        info!("Client {} updated appointment {}", client_id, updated.id);
        Ok(updated)
    }

    pub async fn cancel(
        &self,
        tx: &mut dyn LedgerTx,
        client_id: ClientId,
        appointment_id: AppointmentId,
        now: NaiveDateTime,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.client_booking(tx, client_id, appointment_id).await?;
        self.lifecycle.ensure_cancellable(&appointment)?;
        self.lifecycle.enforce_lead_time(appointment.scheduled_at(), now)?;

        let changes = AppointmentChanges {
            status: Some(AppointmentStatus::Cancelled),
            updated_at: Some(now),
            ..AppointmentChanges::default()
        };

        let cancelled = tx
            .update_appointment(appointment.id, &changes)
            .await?
            .ok_or_else(|| SchedulingError::not_found("Booking"))?;

        info!("Client {} cancelled appointment {}", client_id, cancelled.id);
        Ok(cancelled)
    }

    pub async fn set_status(
        &self,
        tx: &mut dyn LedgerTx,
        provider_id: ProviderId,
        appointment_id: AppointmentId,
        status: AppointmentStatus,
        notes: Option<String>,
        now: NaiveDateTime,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = tx
            .appointment(appointment_id)
            .await?
            .filter(|a| a.provider_id == provider_id)
            .ok_or_else(|| SchedulingError::not_found("Appointment"))?;

        self.lifecycle.validate_status_transition(appointment.status, status)?;

        let changes = AppointmentChanges {
            status: Some(status),
            notes,
            updated_at: Some(now),
            ..AppointmentChanges::default()
        };

        let updated = tx
            .update_appointment(appointment.id, &changes)
            .await?
            .ok_or_else(|| SchedulingError::not_found("Appointment"))?;

        info!(
            "Provider {} set appointment {} status {} -> {}",
            provider_id, updated.id, appointment.status, updated.status
        );
        Ok(updated)
    }

    pub async fn list_client(
        &self,
        tx: &mut dyn LedgerTx,
        client_id: ClientId,
        now: NaiveDateTime,
    ) -> Result<ClientBookings, SchedulingError> {
        let bookings = tx.client_appointments(client_id).await?;
        let total = bookings.len();
        let (upcoming, past): (Vec<Appointment>, Vec<Appointment>) =
            bookings.into_iter().partition(|a| a.scheduled_at() > now);

        Ok(ClientBookings { total, upcoming, past })
    }

    /// Absent and not-owned are indistinguishable to the caller.
    pub async fn client_booking(
        &self,
        tx: &mut dyn LedgerTx,
        client_id: ClientId,
        appointment_id: AppointmentId,
    ) -> Result<Appointment, SchedulingError> {
        tx.appointment(appointment_id)
            .await?
            .filter(|a| a.client_id == client_id)
            .ok_or_else(|| SchedulingError::not_found("Booking"))
    }
}

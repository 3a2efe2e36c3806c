// libs/scheduling-cell/src/engine.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};

use shared_config::SchedulingConfig;

use crate::clock::Clock;
use crate::error::SchedulingError;
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, AvailabilityView, BlockId, BlockSpec,
    BookAppointmentRequest, BookingPatch, ClientBookings, ClientId, ClientStats, Period, PeriodReport, Provider,
    ProviderAgenda, ProviderDashboard, ProviderId, SpecializationSummary, UnavailabilityBlock,
};
use crate::services::{
    AppointmentLifecycleService, AvailabilityResolver, BlockManager, BookingService,
    DirectoryService, ReportService, SlotLattice,
};
use crate::store::LedgerStore;

/// The scheduling core. Every operation runs in one ledger transaction under the store timeout.
pub struct SchedulingEngine {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
    lattice: SlotLattice,
    availability: AvailabilityResolver,
    blocks: BlockManager,
    booking: BookingService,
    reports: ReportService,
    directory: DirectoryService,
}

impl SchedulingEngine {
    pub fn new(
        config: &SchedulingConfig,
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SchedulingError> {
        let lattice = SlotLattice::from_config(config)?;
        let lifecycle = AppointmentLifecycleService::new(config.lead_time_minutes);

        Ok(Self {
            store,
            clock,
            store_timeout: Duration::from_millis(config.store_timeout_ms),
            lattice,
            availability: AvailabilityResolver::new(lattice),
            blocks: BlockManager::new(config.full_day_block_rejects_bookings),
            booking: BookingService::new(lattice, lifecycle, config.code_generation_attempts),
            reports: ReportService::new(),
            directory: DirectoryService::new(),
        })
    }

    pub fn lattice(&self) -> &SlotLattice {
        &self.lattice
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    async fn bounded<T, F>(&self, operation: &str, work: F) -> Result<T, SchedulingError>
    where
        F: Future<Output = Result<T, SchedulingError>>,
    {
        debug!("Running {}", operation);
        match tokio::time::timeout(self.store_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timed out after {:?}", operation, self.store_timeout);
                Err(SchedulingError::StoreUnavailable(format!(
                    "{} timed out after {}ms",
                    operation,
                    self.store_timeout.as_millis()
                )))
            }
        }
    }

    // ==========================================================================
    // AVAILABILITY
    // ==========================================================================

    pub async fn generate_availability(
        &self,
        provider_id: ProviderId,
        date: NaiveDate,
    ) -> Result<AvailabilityView, SchedulingError> {
        self.bounded("generate_availability", async {
            let mut tx = self.store.begin().await?;
            let view = self.availability.resolve(tx.as_mut(), provider_id, date).await?;
            tx.rollback().await?;
            Ok(view)
        })
        .await
    }

    /// Client-facing availability: the provider must exist and the date may not be past.
    pub async fn client_availability(
        &self,
        provider_id: ProviderId,
        date: NaiveDate,
    ) -> Result<AvailabilityView, SchedulingError> {
        let today = self.clock.today();
        self.bounded("client_availability", async {
            let mut tx = self.store.begin().await?;
            if tx.provider(provider_id).await?.is_none() {
                return Err(SchedulingError::not_found("Provider"));
            }
            if date < today {
                return Err(SchedulingError::PastDate);
            }
            let view = self.availability.resolve(tx.as_mut(), provider_id, date).await?;
            tx.rollback().await?;
            Ok(view)
        })
        .await
    }

    // ==========================================================================
    // UNAVAILABILITY BLOCKS
    // ==========================================================================

    pub async fn create_block(
        &self,
        provider_id: ProviderId,
        date: NaiveDate,
        spec: BlockSpec,
        reason: Option<String>,
    ) -> Result<UnavailabilityBlock, SchedulingError> {
        let now = self.clock.now();
        self.bounded("create_block", async {
            let mut tx = self.store.begin().await?;
            let block = self.blocks.create(tx.as_mut(), provider_id, date, spec, reason, now).await?;
            tx.commit().await?;
            Ok(block)
        })
        .await
    }

    pub async fn delete_block(&self, provider_id: ProviderId, block_id: BlockId) -> Result<(), SchedulingError> {
        self.bounded("delete_block", async {
            let mut tx = self.store.begin().await?;
            self.blocks.delete(tx.as_mut(), provider_id, block_id).await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    pub async fn list_blocks(&self, provider_id: ProviderId) -> Result<Vec<UnavailabilityBlock>, SchedulingError> {
        let today = self.clock.today();
        self.bounded("list_blocks", async {
            let mut tx = self.store.begin().await?;
            let blocks = self.blocks.list_upcoming(tx.as_mut(), provider_id, today).await?;
            tx.rollback().await?;
            Ok(blocks)
        })
        .await
    }

    // ==========================================================================
    // BOOKINGS
    // ==========================================================================

    pub async fn create_booking(
        &self,
        client_id: ClientId,
        provider_id: ProviderId,
        date: NaiveDate,
        time: NaiveTime,
        reason: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        let now = self.clock.now();
        let request = BookAppointmentRequest {
            provider_id,
            appointment_date: date,
            appointment_time: time,
            reason_for_visit: reason,
        };

        self.bounded("create_booking", async {
            let mut tx = self.store.begin().await?;
            let appointment = self.booking.create(tx.as_mut(), client_id, request, now).await?;
            tx.commit().await?;
            Ok(appointment)
        })
        .await
    }

    pub async fn update_booking(
        &self,
        client_id: ClientId,
        appointment_id: AppointmentId,
        patch: BookingPatch,
    ) -> Result<Appointment, SchedulingError> {
        let now = self.clock.now();
        self.bounded("update_booking", async {
            let mut tx = self.store.begin().await?;
            let appointment = self.booking.update(tx.as_mut(), client_id, appointment_id, patch, now).await?;
            tx.commit().await?;
            Ok(appointment)
        })
        .await
    }

    pub async fn cancel_booking(
        &self,
        client_id: ClientId,
        appointment_id: AppointmentId,
    ) -> Result<(), SchedulingError> {
        let now = self.clock.now();
        self.bounded("cancel_booking", async {
            let mut tx = self.store.begin().await?;
            self.booking.cancel(tx.as_mut(), client_id, appointment_id, now).await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    pub async fn set_appointment_status(
        &self,
        provider_id: ProviderId,
        appointment_id: AppointmentId,
        status: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        let now = self.clock.now();
        self.bounded("set_appointment_status", async {
            let mut tx = self.store.begin().await?;
            let appointment = self
                .booking
                .set_status(tx.as_mut(), provider_id, appointment_id, status, notes, now)
                .await?;
            tx.commit().await?;
            Ok(appointment)
        })
        .await
    }

    pub async fn list_client_bookings(&self, client_id: ClientId) -> Result<ClientBookings, SchedulingError> {
        let now = self.clock.now();
        self.bounded("list_client_bookings", async {
            let mut tx = self.store.begin().await?;
            let bookings = self.booking.list_client(tx.as_mut(), client_id, now).await?;
            tx.rollback().await?;
            Ok(bookings)
        })
        .await
    }

    pub async fn get_client_booking(
        &self,
        client_id: ClientId,
        appointment_id: AppointmentId,
    ) -> Result<Appointment, SchedulingError> {
        self.bounded("get_client_booking", async {
            let mut tx = self.store.begin().await?;
            let booking = self.booking.client_booking(tx.as_mut(), client_id, appointment_id).await?;
            tx.rollback().await?;
            Ok(booking)
        })
        .await
    }

    /// Visit history summary for one client.
    pub async fn client_stats(&self, client_id: ClientId) -> Result<ClientStats, SchedulingError> {
        let today = self.clock.today();
        self.bounded("client_stats", async {
            let mut tx = self.store.begin().await?;
            let stats = self.reports.client_stats(tx.as_mut(), client_id, today).await?;
            tx.rollback().await?;
            Ok(stats)
        })
        .await
    }

    // ==========================================================================
    // PROVIDER VIEWS
    // ==========================================================================

    pub async fn get_period_report(
        &self,
        provider_id: ProviderId,
        period: Period,
    ) -> Result<PeriodReport, SchedulingError> {
        let today = self.clock.today();
        self.bounded("get_period_report", async {
            let mut tx = self.store.begin().await?;
            let report = self.reports.report(tx.as_mut(), provider_id, period, today).await?;
            tx.rollback().await?;
            Ok(report)
        })
        .await
    }

    pub async fn provider_agenda(
        &self,
        provider_id: ProviderId,
        period: Period,
    ) -> Result<ProviderAgenda, SchedulingError> {
        let today = self.clock.today();
        self.bounded("provider_agenda", async {
            let mut tx = self.store.begin().await?;
            let agenda = self.reports.agenda(tx.as_mut(), provider_id, period, today).await?;
            tx.rollback().await?;
            Ok(agenda)
        })
        .await
    }

    pub async fn provider_dashboard(&self, provider_id: ProviderId) -> Result<ProviderDashboard, SchedulingError> {
        let now = self.clock.now();
        self.bounded("provider_dashboard", async {
            let mut tx = self.store.begin().await?;
            let dashboard = self.reports.dashboard(tx.as_mut(), provider_id, now).await?;
            tx.rollback().await?;
            Ok(dashboard)
        })
        .await
    }

    // ==========================================================================
    // DIRECTORY
    // ==========================================================================

    pub async fn providers_by_specialization(&self, specialization: &str) -> Result<Vec<Provider>, SchedulingError> {
        self.bounded("providers_by_specialization", async {
            let mut tx = self.store.begin().await?;
            let providers = self.directory.providers_by_specialization(tx.as_mut(), specialization).await?;
            tx.rollback().await?;
            Ok(providers)
        })
        .await
    }

    pub async fn specializations(&self) -> Result<Vec<SpecializationSummary>, SchedulingError> {
        self.bounded("specializations", async {
            let mut tx = self.store.begin().await?;
            let specializations = self.directory.specializations(tx.as_mut()).await?;
            tx.rollback().await?;
            Ok(specializations)
        })
        .await
    }
}

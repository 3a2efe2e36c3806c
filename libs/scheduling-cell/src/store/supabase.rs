// libs/scheduling-cell/src/store/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{
    Appointment, AppointmentChanges, AppointmentId, BlockId, BlockRow, ClientId, DateRange,
    NewAppointment, NewBlock, Provider, ProviderId, UnavailabilityBlock,
};
use crate::store::{LedgerStore, LedgerTx, ProviderDay, StoreError};

const PROVIDERS: &str = "/rest/v1/providers";
const APPOINTMENTS: &str = "/rest/v1/appointments";
const BLOCKS: &str = "/rest/v1/unavailability_blocks";
const DAY_SNAPSHOT: &str = "/rest/v1/rpc/provider_day_snapshot";
const CREATE_BLOCK: &str = "/rest/v1/rpc/create_unavailability_block";

/// Ledger backed by PostgREST.
///
/// Every write is a single statement; the partial unique indexes, triggers and functions in
/// `migrations/0001_scheduling_ledger.sql` make each check-then-write atomic on the server.
pub struct SupabaseLedger {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseLedger {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl LedgerStore for SupabaseLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        Ok(Box::new(SupabaseTx { supabase: Arc::clone(&self.supabase) }))
    }
}

pub struct SupabaseTx {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseTx {
    async fn select<T: DeserializeOwned>(&self, path: String) -> Result<Vec<T>, StoreError> {
        let rows: Vec<T> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows)
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        body: Option<Value>,
    ) -> Result<Vec<T>, StoreError> {
        let rows: Vec<T> = self
            .supabase
            .request_with_headers(method, &path, None, body, Some(return_representation()))
            .await?;
        Ok(rows)
    }
}

fn time_param(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn single<T>(rows: Vec<T>, what: &str) -> Result<T, StoreError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::Corrupt(format!("{} write returned no row", what)))
}

#[async_trait]
impl LedgerTx for SupabaseTx {
    async fn provider(&mut self, provider_id: ProviderId) -> Result<Option<Provider>, StoreError> {
        let path = format!("{}?id=eq.{}&select=id,full_name,specialization", PROVIDERS, provider_id);
        Ok(self.select(path).await?.into_iter().next())
    }

    async fn providers(&mut self) -> Result<Vec<Provider>, StoreError> {
        let path = format!("{}?select=id,full_name,specialization&order=full_name.asc", PROVIDERS);
        self.select(path).await
    }

    /// Matched here rather than with `ilike`, which would treat `%`, `_` and `*` as wildcards.
    async fn providers_by_specialization(
        &mut self,
        specialization: &str,
    ) -> Result<Vec<Provider>, StoreError> {
        let mut providers = self.providers().await?;
        providers.retain(|provider| provider.specialization.eq_ignore_ascii_case(specialization));
        Ok(providers)
    }

    async fn appointment(&mut self, appointment_id: AppointmentId) -> Result<Option<Appointment>, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, appointment_id);
        Ok(self.select(path).await?.into_iter().next())
    }

    async fn provider_appointments(
        &mut self,
        provider_id: ProviderId,
        range: Option<DateRange>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut path = format!("{}?provider_id=eq.{}", APPOINTMENTS, provider_id);
        if let Some(range) = range {
            path.push_str(&format!(
                "&appointment_date=gte.{}&appointment_date=lte.{}",
                range.from, range.to
            ));
        }
        path.push_str("&order=appointment_date.asc,appointment_time.asc,id.asc");

        debug!("Loading appointments for provider {}", provider_id);
        self.select(path).await
    }

    async fn client_appointments(&mut self, client_id: ClientId) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?client_id=eq.{}&order=appointment_date.desc,appointment_time.desc,id.desc",
            APPOINTMENTS, client_id
        );
        self.select(path).await
    }

    async fn provider_appointments_at(
        &mut self,
        provider_id: ProviderId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?provider_id=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}&status=neq.cancelled",
            APPOINTMENTS,
            provider_id,
            date,
            time_param(time)
        );
        self.select(path).await
    }

    async fn client_appointments_at(
        &mut self,
        client_id: ClientId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?client_id=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}&status=neq.cancelled",
            APPOINTMENTS,
            client_id,
            date,
            time_param(time)
        );
        self.select(path).await
    }

    async fn code_exists(&mut self, code: &str) -> Result<bool, StoreError> {
        let path = format!(
            "{}?appointment_code=eq.{}&select=id",
            APPOINTMENTS,
            urlencoding::encode(code)
        );
        let rows: Vec<Value> = self.select(path).await?;
        Ok(!rows.is_empty())
    }

    async fn insert_appointment(&mut self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let body = to_body(&appointment)?;
        let rows = self.write(Method::POST, APPOINTMENTS.to_string(), Some(body)).await?;
        single(rows, "appointment insert")
    }

    async fn update_appointment(
        &mut self,
        appointment_id: AppointmentId,
        changes: &AppointmentChanges,
    ) -> Result<Option<Appointment>, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, appointment_id);
        let body = to_body(changes)?;
        let rows: Vec<Appointment> = self.write(Method::PATCH, path, Some(body)).await?;
        Ok(rows.into_iter().next())
    }

    async fn provider_day(&mut self, provider_id: ProviderId, date: NaiveDate) -> Result<ProviderDay, StoreError> {
        let params = json!({ "p_provider_id": provider_id, "p_date": date });
        let day: ProviderDay = self
            .supabase
            .request(Method::POST, DAY_SNAPSHOT, None, Some(params))
            .await?;
        Ok(day)
    }

    async fn blocks_on(
        &mut self,
        provider_id: ProviderId,
        date: NaiveDate,
    ) -> Result<Vec<UnavailabilityBlock>, StoreError> {
        let path = format!(
            "{}?provider_id=eq.{}&block_date=eq.{}&order=start_time.asc.nullsfirst",
            BLOCKS, provider_id, date
        );
        self.select(path).await
    }

    async fn blocks_from(
        &mut self,
        provider_id: ProviderId,
        from: NaiveDate,
    ) -> Result<Vec<UnavailabilityBlock>, StoreError> {
        let path = format!(
            "{}?provider_id=eq.{}&block_date=gte.{}&order=block_date.asc,start_time.asc.nullsfirst,id.asc",
            BLOCKS, provider_id, from
        );
        self.select(path).await
    }

    async fn insert_block(&mut self, block: NewBlock) -> Result<UnavailabilityBlock, StoreError> {
        let row = BlockRow::from(&block);
        let params = json!({
            "p_provider_id": row.provider_id,
            "p_block_date": row.block_date,
            "p_is_full_day": row.is_full_day,
            "p_start_time": row.start_time.map(time_param),
            "p_end_time": row.end_time.map(time_param),
            "p_reason": row.reason,
            "p_created_at": row.created_at,
            "p_guard_bookings": block.guard_bookings,
        });
        let rows = self.write(Method::POST, CREATE_BLOCK.to_string(), Some(params)).await?;
        single(rows, "block insert")
    }

    async fn delete_block(&mut self, provider_id: ProviderId, block_id: BlockId) -> Result<u64, StoreError> {
        let path = format!("{}?id=eq.{}&provider_id=eq.{}", BLOCKS, block_id, provider_id);
        let rows: Vec<Value> = self.write(Method::DELETE, path, None).await?;
        Ok(rows.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

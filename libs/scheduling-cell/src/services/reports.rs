// libs/scheduling-cell/src/services/reports.rs
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::SchedulingError;
use crate::models::{
    AgendaDay, Appointment, AppointmentStatus, ClientAppointmentCounts, ClientId, ClientStats,
    DailyBreakdown, DateRange, NextAppointment, Period, PeriodReport, Provider, ProviderAgenda,
    ProviderDashboard, ProviderId, ProviderVisits, ReasonCount, ReportStats, SpecializationVisits,
    TimeCount, TodaySummary,
};
use crate::store::LedgerTx;

const TOP_N: usize = 5;
const CLIENT_TOP_N: usize = 3;

/// Calendar bounds of `period` around `today`. Weeks start on Sunday.
pub fn period_range(period: Period, today: NaiveDate) -> DateRange {
    match period {
        Period::Day => DateRange { from: today, to: today },
        Period::Week => {
            let from = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
            DateRange { from, to: from + Duration::days(6) }
        }
        Period::Month => {
            let from = today.with_day(1).unwrap_or(today);
            let next_month = if from.month() == 12 {
                NaiveDate::from_ymd_opt(from.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(from.year(), from.month() + 1, 1)
            };
            let to = next_month.and_then(|d| d.pred_opt()).unwrap_or(today);
            DateRange { from, to }
        }
        Period::Year => DateRange {
            from: NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
            to: NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
        },
    }
}

/// Integer percentage, rounded half up; 0 when there is nothing to divide by.
pub fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64) * 100.0 / (total as f64)).round() as u32
}

/// Highest counts first, ties broken by ascending value.
fn top_counts<K: Ord + Hash + Clone>(values: impl Iterator<Item = K>, limit: usize) -> Vec<(K, usize)> {
    let mut counts: HashMap<K, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut ranked: Vec<(K, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

pub fn build_report(
    provider_id: ProviderId,
    period: Period,
    range: DateRange,
    appointments: &[Appointment],
) -> PeriodReport {
    let rows: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.provider_id == provider_id && range.contains(a.appointment_date))
        .collect();

    let count = |status: AppointmentStatus| rows.iter().filter(|a| a.status == status).count();
    let total = rows.len();
    let completed = count(AppointmentStatus::Completed);
    let cancelled = count(AppointmentStatus::Cancelled);

    let stats = ReportStats {
        total_appointments: total,
        completed,
        cancelled,
        booked: count(AppointmentStatus::Booked),
        confirmed: count(AppointmentStatus::Confirmed),
        no_show: count(AppointmentStatus::NoShow),
        unique_clients: rows.iter().map(|a| a.client_id).collect::<HashSet<_>>().len(),
        completion_rate: percentage(completed, total),
        cancellation_rate: percentage(cancelled, total),
    };

    let mut days: BTreeMap<NaiveDate, DailyBreakdown> = BTreeMap::new();
    for appointment in &rows {
        let day = days.entry(appointment.appointment_date).or_insert_with(|| DailyBreakdown {
            date: appointment.appointment_date,
            total: 0,
            completed: 0,
            cancelled: 0,
        });
        day.total += 1;
        match appointment.status {
            AppointmentStatus::Completed => day.completed += 1,
            AppointmentStatus::Cancelled => day.cancelled += 1,
            _ => {}
        }
    }

    let top_reasons = top_counts(rows.iter().filter_map(|a| a.reason_for_visit.clone()), TOP_N)
        .into_iter()
        .map(|(reason, count)| ReasonCount { reason, count })
        .collect();

    let busiest_slots = top_counts(rows.iter().map(|a| a.appointment_time), TOP_N)
        .into_iter()
        .map(|(time, count)| TimeCount { time, count })
        .collect();

    PeriodReport {
        provider_id,
        period,
        date_range: range,
        stats,
        daily_breakdown: days.into_values().collect(),
        top_reasons,
        busiest_slots,
    }
}

/// Non-cancelled appointments grouped by day, each day ordered by time.
pub fn build_agenda(
    provider_id: ProviderId,
    period: Period,
    range: DateRange,
    appointments: &[Appointment],
) -> ProviderAgenda {
    let mut days: BTreeMap<NaiveDate, Vec<Appointment>> = BTreeMap::new();
    for appointment in appointments.iter().filter(|a| {
        a.provider_id == provider_id && a.status.is_active() && range.contains(a.appointment_date)
    }) {
        days.entry(appointment.appointment_date)
            .or_default()
            .push(appointment.clone());
    }

    let days: Vec<AgendaDay> = days
        .into_iter()
        .map(|(date, mut appointments)| {
            appointments.sort_by_key(|a| (a.appointment_time, a.id));
            AgendaDay { date, count: appointments.len(), appointments }
        })
        .collect();

    ProviderAgenda {
        provider_id,
        period,
        date_range: range,
        total_count: days.iter().map(|day| day.count).sum(),
        days,
    }
}

pub fn build_dashboard(
    provider_id: ProviderId,
    appointments: &[Appointment],
    now: NaiveDateTime,
) -> ProviderDashboard {
    let today = now.date();
    let week = period_range(Period::Week, today);
    let month = period_range(Period::Month, today);

    let rows: Vec<&Appointment> = appointments.iter().filter(|a| a.provider_id == provider_id).collect();
    let active_in = |range: DateRange| {
        rows.iter()
            .filter(|a| a.status.is_active() && range.contains(a.appointment_date))
            .count()
    };

    let todays: Vec<&&Appointment> = rows.iter().filter(|a| a.appointment_date == today).collect();
    let today_summary = TodaySummary {
        total: todays.iter().filter(|a| a.status.is_active()).count(),
        completed: todays.iter().filter(|a| a.status == AppointmentStatus::Completed).count(),
        remaining: todays.iter().filter(|a| a.status == AppointmentStatus::Booked).count(),
    };

    let next_appointment = todays
        .iter()
        .filter(|a| a.status == AppointmentStatus::Booked && a.appointment_time > now.time())
        .min_by_key(|a| (a.appointment_time, a.id))
        .map(|a| NextAppointment {
            appointment_id: a.id,
            appointment_code: a.appointment_code.clone(),
            client_id: a.client_id,
            time: a.appointment_time,
        });

    ProviderDashboard {
        today: today_summary,
        week_total: active_in(week),
        month_total: active_in(month),
        total_clients: rows.iter().map(|a| a.client_id).collect::<HashSet<_>>().len(),
        next_appointment,
    }
}

pub fn build_client_stats(
    client_id: ClientId,
    appointments: &[Appointment],
    providers: &[Provider],
    today: NaiveDate,
) -> ClientStats {
    let rows: Vec<&Appointment> = appointments.iter().filter(|a| a.client_id == client_id).collect();
    let count = |status: AppointmentStatus| rows.iter().filter(|a| a.status == status).count();

    let counts = ClientAppointmentCounts {
        total: rows.len(),
        completed: count(AppointmentStatus::Completed),
        cancelled: count(AppointmentStatus::Cancelled),
        booked: count(AppointmentStatus::Booked),
        confirmed: count(AppointmentStatus::Confirmed),
        no_show: count(AppointmentStatus::NoShow),
        upcoming: rows
            .iter()
            .filter(|a| {
                a.appointment_date >= today
                    && !matches!(a.status, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
            })
            .count(),
    };

    let directory: HashMap<ProviderId, &Provider> = providers.iter().map(|p| (p.id, p)).collect();
    let completed: Vec<&&Appointment> = rows
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed)
        .collect();

    let top_providers = top_counts(completed.iter().map(|a| a.provider_id), CLIENT_TOP_N)
        .into_iter()
        .map(|(provider_id, visit_count)| {
            let provider = directory.get(&provider_id);
            ProviderVisits {
                provider_id,
                full_name: provider.map(|p| p.full_name.clone()),
                specialization: provider.map(|p| p.specialization.clone()),
                visit_count,
            }
        })
        .collect();

    let top_specializations = top_counts(
        completed
            .iter()
            .filter_map(|a| directory.get(&a.provider_id).map(|p| p.specialization.clone())),
        CLIENT_TOP_N,
    )
    .into_iter()
    .map(|(specialization, visit_count)| SpecializationVisits { specialization, visit_count })
    .collect();

    ClientStats {
        client_id,
        appointments: counts,
        unique_providers: rows.iter().map(|a| a.provider_id).collect::<HashSet<_>>().len(),
        top_providers,
        top_specializations,
        first_appointment: rows.iter().map(|a| a.appointment_date).min(),
        last_appointment: rows.iter().map(|a| a.appointment_date).max(),
    }
}

/// Read-only provider and client views over the ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportService;

impl ReportService {
    pub fn new() -> Self {
        Self
    }

    pub async fn report(
        &self,
        tx: &mut dyn LedgerTx,
        provider_id: ProviderId,
        period: Period,
        today: NaiveDate,
    ) -> Result<PeriodReport, SchedulingError> {
        let range = period_range(period, today);
        debug!("Building {:?} report for provider {} over {:?}", period, provider_id, range);

        let appointments = tx.provider_appointments(provider_id, Some(range)).await?;
        Ok(build_report(provider_id, period, range, &appointments))
    }

    pub async fn agenda(
        &self,
        tx: &mut dyn LedgerTx,
        provider_id: ProviderId,
        period: Period,
        today: NaiveDate,
    ) -> Result<ProviderAgenda, SchedulingError> {
        let range = period_range(period, today);
        let appointments = tx.provider_appointments(provider_id, Some(range)).await?;
        Ok(build_agenda(provider_id, period, range, &appointments))
    }

    pub async fn dashboard(
        &self,
        tx: &mut dyn LedgerTx,
        provider_id: ProviderId,
        now: NaiveDateTime,
    ) -> Result<ProviderDashboard, SchedulingError> {
        let appointments = tx.provider_appointments(provider_id, None).await?;
        Ok(build_dashboard(provider_id, &appointments, now))
    }

    pub async fn client_stats(
        &self,
        tx: &mut dyn LedgerTx,
        client_id: ClientId,
        today: NaiveDate,
    ) -> Result<ClientStats, SchedulingError> {
        debug!("Building visit stats for client {}", client_id);

        let appointments = tx.client_appointments(client_id).await?;
        if appointments.is_empty() {
            return Ok(ClientStats { client_id, ..ClientStats::default() });
        }

        let providers = tx.providers().await?;
        Ok(build_client_stats(client_id, &appointments, &providers, today))
    }
}

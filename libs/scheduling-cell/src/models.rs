// libs/scheduling-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub type ProviderId = i64;
pub type ClientId = i64;
pub type AppointmentId = i64;
pub type BlockId = i64;

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Every status except `cancelled` occupies its slot.
    pub fn is_active(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "booked" => Ok(AppointmentStatus::Booked),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no_show" => Ok(AppointmentStatus::NoShow),
            other => Err(format!("unknown appointment status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub appointment_code: String,
    pub provider_id: ProviderId,
    pub client_id: ClientId,
    pub appointment_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason_for_visit: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.appointment_time)
    }
}

/// Row handed to the ledger on insert; the store assigns the id.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub appointment_code: String,
    pub provider_id: ProviderId,
    pub client_id: ClientId,
    pub appointment_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason_for_visit: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", with = "hhmm::option")]
    pub appointment_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_for_visit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

impl AppointmentChanges {
    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(date) = self.appointment_date {
            appointment.appointment_date = date;
        }
        if let Some(time) = self.appointment_time {
            appointment.appointment_time = time;
        }
        if let Some(reason) = &self.reason_for_visit {
            appointment.reason_for_visit = Some(reason.clone());
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(notes) = &self.notes {
            appointment.notes = Some(notes.clone());
        }
        if let Some(updated_at) = self.updated_at {
            appointment.updated_at = updated_at;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub provider_id: ProviderId,
    pub appointment_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,
    pub reason_for_visit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    pub appointment_date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option")]
    pub appointment_time: Option<NaiveTime>,
    pub reason_for_visit: Option<String>,
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        self.appointment_date.is_none()
            && self.appointment_time.is_none()
            && self.reason_for_visit.is_none()
    }

    pub fn moves_slot(&self) -> bool {
        self.appointment_date.is_some() || self.appointment_time.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientBookings {
    pub total: usize,
    pub upcoming: Vec<Appointment>,
    pub past: Vec<Appointment>,
}

// ==============================================================================
// UNAVAILABILITY BLOCKS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRange {
    FullDay,
    /// Half-open `[start, end)`.
    Partial { start: NaiveTime, end: NaiveTime },
}

impl BlockRange {
    pub fn covers(&self, time: NaiveTime) -> bool {
        match self {
            BlockRange::FullDay => true,
            BlockRange::Partial { start, end } => *start <= time && time < *end,
        }
    }

    pub fn overlaps(&self, other: &BlockRange) -> bool {
        match (self, other) {
            (BlockRange::FullDay, _) | (_, BlockRange::FullDay) => true,
            (
                BlockRange::Partial { start: a_start, end: a_end },
                BlockRange::Partial { start: b_start, end: b_end },
            ) => a_start < b_end && b_start < a_end,
        }
    }

    pub fn is_full_day(&self) -> bool {
        matches!(self, BlockRange::FullDay)
    }

    pub fn start(&self) -> Option<NaiveTime> {
        match self {
            BlockRange::FullDay => None,
            BlockRange::Partial { start, .. } => Some(*start),
        }
    }

    pub fn end(&self) -> Option<NaiveTime> {
        match self {
            BlockRange::FullDay => None,
            BlockRange::Partial { end, .. } => Some(*end),
        }
    }
}

/// The range a provider asks to block, before validation.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BlockSpec {
    #[serde(default)]
    pub is_full_day: bool,
    #[serde(default, with = "hhmm::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm::option")]
    pub end_time: Option<NaiveTime>,
}

impl BlockSpec {
    pub fn full_day() -> Self {
        Self { is_full_day: true, start_time: None, end_time: None }
    }

    pub fn partial(start: NaiveTime, end: NaiveTime) -> Self {
        Self { is_full_day: false, start_time: Some(start), end_time: Some(end) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRequest {
    pub block_date: NaiveDate,
    #[serde(flatten)]
    pub spec: BlockSpec,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BlockRow", into = "BlockRow")]
pub struct UnavailabilityBlock {
    pub id: BlockId,
    pub provider_id: ProviderId,
    pub block_date: NaiveDate,
    pub range: BlockRange,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewBlock {
    pub provider_id: ProviderId,
    pub block_date: NaiveDate,
    pub range: BlockRange,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
    /// Refuse the write if the range covers an active appointment.
    pub guard_bookings: bool,
}

impl NewBlock {
    pub fn into_block(self, id: BlockId) -> UnavailabilityBlock {
        UnavailabilityBlock {
            id,
            provider_id: self.provider_id,
            block_date: self.block_date,
            range: self.range,
            reason: self.reason,
            created_at: self.created_at,
        }
    }
}

/// Flat column layout shared by the wire format and the `unavailability_blocks` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    pub provider_id: ProviderId,
    pub block_date: NaiveDate,
    pub is_full_day: bool,
    #[serde(default, with = "hhmm::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm::option")]
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<UnavailabilityBlock> for BlockRow {
    fn from(block: UnavailabilityBlock) -> Self {
        Self {
            id: Some(block.id),
            provider_id: block.provider_id,
            block_date: block.block_date,
            is_full_day: block.range.is_full_day(),
            start_time: block.range.start(),
            end_time: block.range.end(),
            reason: block.reason,
            created_at: block.created_at,
        }
    }
}

impl From<&NewBlock> for BlockRow {
    fn from(block: &NewBlock) -> Self {
        Self {
            id: None,
            provider_id: block.provider_id,
            block_date: block.block_date,
            is_full_day: block.range.is_full_day(),
            start_time: block.range.start(),
            end_time: block.range.end(),
            reason: block.reason.clone(),
            created_at: block.created_at,
        }
    }
}

impl TryFrom<BlockRow> for UnavailabilityBlock {
    type Error = String;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        let id = row.id.ok_or_else(|| "block row without id".to_string())?;
        let range = if row.is_full_day {
            BlockRange::FullDay
        } else {
            match (row.start_time, row.end_time) {
                (Some(start), Some(end)) if start < end => BlockRange::Partial { start, end },
                _ => return Err(format!("block {} has an invalid time range", id)),
            }
        };

        Ok(Self {
            id,
            provider_id: row.provider_id,
            block_date: row.block_date,
            range,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityView {
    pub provider_id: ProviderId,
    pub date: NaiveDate,
    pub available: bool,
    pub slots: Vec<SlotView>,
    pub total_slots: usize,
    pub available_count: usize,
    pub booked_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AvailabilityView {
    pub fn available_times(&self) -> Vec<NaiveTime> {
        self.slots
            .iter()
            .filter(|slot| slot.is_available)
            .map(|slot| slot.time)
            .collect()
    }
}

// ==============================================================================
// PROVIDER DIRECTORY
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub full_name: String,
    pub specialization: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecializationSummary {
    pub specialization: String,
    pub provider_count: usize,
}

// ==============================================================================
// REPORTING
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl FromStr for Period {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(format!("unknown period: {}", other)),
        }
    }
}

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportStats {
    pub total_appointments: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub booked: usize,
    pub confirmed: usize,
    pub no_show: usize,
    pub unique_clients: usize,
    pub completion_rate: u32,
    pub cancellation_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub total: usize,
    pub completed: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeCount {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodReport {
    pub provider_id: ProviderId,
    pub period: Period,
    pub date_range: DateRange,
    pub stats: ReportStats,
    pub daily_breakdown: Vec<DailyBreakdown>,
    pub top_reasons: Vec<ReasonCount>,
    pub busiest_slots: Vec<TimeCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgendaDay {
    pub date: NaiveDate,
    pub count: usize,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderAgenda {
    pub provider_id: ProviderId,
    pub period: Period,
    pub date_range: DateRange,
    pub total_count: usize,
    pub days: Vec<AgendaDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TodaySummary {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextAppointment {
    pub appointment_id: AppointmentId,
    pub appointment_code: String,
    pub client_id: ClientId,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDashboard {
    pub today: TodaySummary,
    pub week_total: usize,
    pub month_total: usize,
    pub total_clients: usize,
    pub next_appointment: Option<NextAppointment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientAppointmentCounts {
    pub total: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub booked: usize,
    pub confirmed: usize,
    pub no_show: usize,
    /// Today or later, neither cancelled nor no-show.
    pub upcoming: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderVisits {
    pub provider_id: ProviderId,
    pub full_name: Option<String>,
    pub specialization: Option<String>,
    pub visit_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecializationVisits {
    pub specialization: String,
    pub visit_count: usize,
}

/// A client's visit history. Top lists count completed visits only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientStats {
    pub client_id: ClientId,
    pub appointments: ClientAppointmentCounts,
    pub unique_providers: usize,
    pub top_providers: Vec<ProviderVisits>,
    pub top_specializations: Vec<SpecializationVisits>,
    pub first_appointment: Option<NaiveDate>,
    pub last_appointment: Option<NaiveDate>,
}

// ==============================================================================
// SERDE HELPERS
// ==============================================================================

/// Times of day travel as `HH:MM`; `HH:MM:SS` is accepted on input.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(value: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid time of day: {}", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid time of day: {}", raw))),
                None => Ok(None),
            }
        }
    }
}

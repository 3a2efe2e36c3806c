// libs/scheduling-cell/src/services/lattice.rs
use chrono::{Duration, NaiveTime};

use shared_config::SchedulingConfig;

use crate::error::SchedulingError;

/// Fixed-cadence grid of bookable times for a working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLattice {
    start: NaiveTime,
    end: NaiveTime,
    interval_minutes: i64,
}

impl SlotLattice {
    pub fn new(start: NaiveTime, end: NaiveTime, interval_minutes: i64) -> Result<Self, SchedulingError> {
        if start >= end {
            return Err(SchedulingError::InvalidRange(format!(
                "start {} must be before end {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        if interval_minutes <= 0 {
            return Err(SchedulingError::InvalidRange(format!(
                "interval must be positive, got {} minutes",
                interval_minutes
            )));
        }

        Ok(Self { start, end, interval_minutes })
    }

    pub fn from_config(config: &SchedulingConfig) -> Result<Self, SchedulingError> {
        Self::new(config.clinic_open, config.clinic_close, config.slot_interval_minutes)
    }

    /// `start, start + interval, ...` strictly before `end`.
    pub fn slots(&self) -> Vec<NaiveTime> {
        let step = Duration::minutes(self.interval_minutes);
        let mut slots = Vec::new();
        let mut current = self.start;

        while current < self.end {
            slots.push(current);
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }

        slots
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if time < self.start || time >= self.end {
            return false;
        }
        let offset = (time - self.start).num_milliseconds();
        offset % (self.interval_minutes * 60_000) == 0
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn generate_slots(
    start: NaiveTime,
    end: NaiveTime,
    interval_minutes: i64,
) -> Result<Vec<NaiveTime>, SchedulingError> {
    Ok(SlotLattice::new(start, end, interval_minutes)?.slots())
}

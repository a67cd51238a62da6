//! Timer record and elapsed-time arithmetic
//!
//! Nothing in here reads the clock: every time-dependent method takes `now`
//! explicitly so the registry decides which instant a snapshot belongs to.

use std::{fmt, str::FromStr};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Label used when a timer is started without one
pub const DEFAULT_LABEL: &str = "Unnamed Timer";

/// Registry-assigned timer identifier, never reused within a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(u64);

impl TimerId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The identifier allocated after this one, `None` once the id space is used up
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TimerId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(RegistryError::Validation(format!(
                "Invalid timer ID: {:?} (expected a positive integer)",
                s
            ))),
            Ok(value) => Ok(Self(value)),
        }
    }
}

/// Timer lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Running,
    Stopped,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// Elapsed time in both display and numeric form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElapsedTime {
    /// Zero-padded `HH:MM:SS`
    pub formatted: String,
    pub total_seconds: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl ElapsedTime {
    /// Break whole seconds into hours, minutes and seconds
    pub fn from_seconds(total_seconds: u64) -> Self {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        Self {
            formatted: format!("{:02}:{:02}:{:02}", hours, minutes, seconds),
            total_seconds,
            hours,
            minutes,
            seconds,
        }
    }

    /// Sub-second precision is truncated, negative input clamps to zero
    pub fn from_millis(millis: i64) -> Self {
        Self::from_seconds(millis.max(0) as u64 / 1000)
    }
}

/// A single stopwatch as stored by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: TimerId,
    pub label: String,
    pub status: TimerStatus,
    /// When the current running segment began
    pub start_time: DateTime<Utc>,
    /// Set while stopped, `None` while running
    pub end_time: Option<DateTime<Utc>>,
    /// Elapsed time banked by previous stops
    pub accumulated_seconds: f64,
    pub created_at: DateTime<Utc>,
}

impl Timer {
    /// Create a running timer whose clock starts at `now`
    pub fn new(id: TimerId, label: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            label,
            status: TimerStatus::Running,
            start_time: now,
            end_time: None,
            accumulated_seconds: 0.0,
            created_at: now,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    fn accumulated_millis(&self) -> i64 {
        (self.accumulated_seconds.max(0.0) * 1000.0).round() as i64
    }

    /// Total elapsed milliseconds as of `now`
    pub fn elapsed_millis_at(&self, now: DateTime<Utc>) -> i64 {
        match self.status {
            TimerStatus::Running => {
                let segment = (now - self.start_time).num_milliseconds().max(0);
                self.accumulated_millis() + segment
            }
            TimerStatus::Stopped => self.accumulated_millis(),
        }
    }

    pub fn elapsed_at(&self, now: DateTime<Utc>) -> ElapsedTime {
        ElapsedTime::from_millis(self.elapsed_millis_at(now))
    }

    /// Freeze the clock at `now`. Returns false when the timer was already
    /// stopped, in which case nothing changes.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_running() {
            return false;
        }

        let end = now.max(self.start_time);
        self.accumulated_seconds = self.elapsed_millis_at(end) as f64 / 1000.0;
        self.end_time = Some(end);
        self.status = TimerStatus::Stopped;
        true
    }

    /// Restart from zero at `now`, whatever the current status
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.accumulated_seconds = 0.0;
        self.start_time = now;
        self.end_time = None;
        self.status = TimerStatus::Running;
    }

    /// External representation with elapsed time computed at `now`
    pub fn view_at(&self, now: DateTime<Utc>) -> TimerView {
        TimerView {
            timer: self.clone(),
            elapsed_time: self.elapsed_at(now),
        }
    }
}

/// A timer together with its elapsed time at the moment it was read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    #[serde(flatten)]
    pub timer: Timer,
    pub elapsed_time: ElapsedTime,
}

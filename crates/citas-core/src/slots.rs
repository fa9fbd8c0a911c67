//! Time slots and the fallback availability arithmetic.
//!
//! The primary availability query returns bookable `HH:MM` strings directly.
//! When it is unavailable the slot set is derived from the branch's configured
//! slots minus those already taken by live appointments on the same date.
//! Those two steps live here as pure functions; fetching is done elsewhere.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time of day: {0:?} (expected HH:MM)")]
pub struct TimeParseError(pub String);

/// A time of day at minute precision, rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Parse `HH:MM` or `HH:MM:SS`; seconds are dropped.
    pub fn parse(raw: &str) -> Result<Self, TimeParseError> {
        let raw = raw.trim();
        let time = NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S%.f"))
            .map_err(|_| TimeParseError(raw.to_string()))?;
        Ok(Self::from_naive(time))
    }

    pub fn from_naive(time: NaiveTime) -> Self {
        Self(time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time))
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl std::fmt::Display for SlotTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl std::str::FromStr for SlotTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Ordered, duplicate-free bookable times for one `(date, branch)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotSet(Vec<SlotTime>);

impl SlotSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build from raw strings, skipping malformed entries.
    pub fn from_strings<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw.into_iter()
            .filter_map(|s| match SlotTime::parse(s.as_ref()) {
                Ok(t) => Some(t),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed slot time");
                    None
                }
            })
            .collect()
    }

    pub fn contains(&self, time: &SlotTime) -> bool {
        self.0.binary_search(time).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotTime> {
        self.0.iter()
    }

    /// Keep `selected` only if it is still bookable in this set.
    pub fn retain_selection(&self, selected: Option<SlotTime>) -> Option<SlotTime> {
        selected.filter(|t| self.contains(t))
    }

    /// Remove every time in `taken`.
    pub fn without<'a>(mut self, taken: impl IntoIterator<Item = &'a SlotTime>) -> Self {
        let taken: Vec<&SlotTime> = taken.into_iter().collect();
        self.0.retain(|t| !taken.contains(&t));
        self
    }
}

impl FromIterator<SlotTime> for SlotSet {
    fn from_iter<I: IntoIterator<Item = SlotTime>>(iter: I) -> Self {
        let mut times: Vec<SlotTime> = iter.into_iter().collect();
        times.sort();
        times.dedup();
        Self(times)
    }
}

impl<'a> IntoIterator for &'a SlotSet {
    type Item = &'a SlotTime;
    type IntoIter = std::slice::Iter<'a, SlotTime>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Availability request tag. A resolution is only applied if its query is
/// still the latest one issued for the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotQuery {
    pub seq: u64,
    pub date: NaiveDate,
    pub branch_id: i64,
}

// ── Fallback inputs ──

/// A slot configured for a branch, independent of date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfiguredSlot {
    #[serde(alias = "startTime")]
    pub time: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Appointment as listed by the server for a client or a branch/date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRecord {
    #[serde(alias = "appointmentId")]
    pub id: i64,
    #[serde(default)]
    pub appointment_number: Option<String>,
    #[serde(default)]
    pub client_number: Option<String>,
    pub branch_id: i64,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default, alias = "reasonName")]
    pub appointment_type_name: Option<String>,
    pub appointment_date: String,
    #[serde(default)]
    pub appointment_time: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub observations: Option<String>,
}

impl AppointmentRecord {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.status.trim().to_ascii_lowercase().as_str(),
            "cancelled" | "canceled" | "cancelada"
        )
    }

    /// An appointment holds its slot while active and not cancelled.
    pub fn occupies_slot(&self) -> bool {
        self.is_active && !self.is_cancelled()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        calendar_date(&self.appointment_date)
    }

    /// Time of day from the explicit time field, else from the timestamp.
    pub fn time(&self) -> Option<SlotTime> {
        if let Some(t) = self.appointment_time.as_deref()
            && let Ok(time) = SlotTime::parse(t)
        {
            return Some(time);
        }
        timestamp(&self.appointment_date).map(|dt| SlotTime::from_naive(dt.time()))
    }

    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        Some(self.date()?.and_time(self.time()?.as_naive()))
    }
}

/// Reduce a stored appointment date or timestamp to its calendar date.
///
/// Accepts `YYYY-MM-DD`, naive timestamps with `T` or space separators, and
/// RFC 3339 timestamps (the date in the timestamp's own offset).
pub fn calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    timestamp(raw).map(|dt| dt.date())
}

fn timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Active configured slots, sorted ascending.
pub fn active_configured(configured: &[ConfiguredSlot]) -> SlotSet {
    SlotSet::from_strings(
        configured
            .iter()
            .filter(|s| s.is_active)
            .map(|s| s.time.as_str()),
    )
}

/// Subtract slots taken by live appointments at `branch_id` on `date`.
pub fn subtract_occupied(
    slots: SlotSet,
    appointments: &[AppointmentRecord],
    branch_id: i64,
    date: NaiveDate,
) -> SlotSet {
    let taken: Vec<SlotTime> = appointments
        .iter()
        .filter(|a| a.occupies_slot() && a.branch_id == branch_id && a.date() == Some(date))
        .filter_map(|a| a.time())
        .collect();
    slots.without(&taken)
}

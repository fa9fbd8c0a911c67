//! Bookable time resolution for a date and branch.
//!
//! The primary query encodes the server's calendar rules (holidays, weekly
//! closures, lead-time cutoffs). When it fails we derive a best-effort set
//! from the branch's configured slots minus occupied ones; that path cannot
//! replicate those rules, so an empty fallback result means "no information",
//! not "fully booked".

use std::sync::Arc;

use chrono::NaiveDate;
use citas_api::{ApiError, SchedulingApi};
use citas_core::slots::{active_configured, subtract_occupied};
use citas_core::{ErrorDescriptor, SlotSet};
use tracing::{info, warn};

/// Where a [`Resolution`]'s slots came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// The server's availability query.
    Primary,
    /// Configured slots minus occupied appointments.
    Fallback,
    /// Configured slots only; the occupancy fetch failed.
    FallbackUnfiltered,
    /// Nothing could be fetched.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub slots: SlotSet,
    pub source: SlotSource,
    /// Interpreted error from the primary query, when it carried a message.
    pub error: Option<ErrorDescriptor>,
}

/// Resolves [`SlotSet`]s; never fails.
#[derive(Clone)]
pub struct AvailabilityResolver {
    api: Arc<dyn SchedulingApi>,
}

impl AvailabilityResolver {
    pub fn new(api: Arc<dyn SchedulingApi>) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, date: NaiveDate, branch_id: i64) -> Resolution {
        let primary_err = match self.api.available_times(date, branch_id).await {
            Ok(times) => {
                let slots = SlotSet::from_strings(times);
                info!(%date, branch_id, count = slots.len(), "resolved available times");
                return Resolution {
                    slots,
                    source: SlotSource::Primary,
                    error: None,
                };
            }
            Err(e) => e,
        };

        let error = primary_err.wire_message().map(|_| primary_err.describe());
        match &error {
            Some(d) if d.is_expected_validation => {
                info!(%date, branch_id, code = %d.code, "availability rejected by business rule")
            }
            _ => {
                warn!(%date, branch_id, error = %primary_err, "availability query failed, using fallback")
            }
        }

        let (slots, source) = self.fallback(date, branch_id).await;
        Resolution {
            slots,
            source,
            error,
        }
    }

    async fn fallback(&self, date: NaiveDate, branch_id: i64) -> (SlotSet, SlotSource) {
        let configured = match self.api.configured_slots(branch_id).await {
            Ok(c) => active_configured(&c),
            Err(e) => {
                log_swallowed("configured slots", branch_id, &e);
                return (SlotSet::empty(), SlotSource::Unavailable);
            }
        };

        match self.api.branch_appointments(branch_id, date).await {
            Ok(appointments) => {
                let slots = subtract_occupied(configured, &appointments, branch_id, date);
                info!(%date, branch_id, count = slots.len(), "derived fallback availability");
                (slots, SlotSource::Fallback)
            }
            Err(e) => {
                log_swallowed("branch appointments", branch_id, &e);
                (configured, SlotSource::FallbackUnfiltered)
            }
        }
    }
}

fn log_swallowed(what: &str, branch_id: i64, error: &ApiError) {
    warn!(branch_id, error = %error, "fallback could not fetch {what}");
}

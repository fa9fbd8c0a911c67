//! The three-phase booking state machine: identity, details, confirmation.
//!
//! [`BookingState::transition`] is pure: it takes the current state and an
//! event and returns the next state plus any I/O the caller must perform
//! ([`Effect`]). The async orchestration lives in `citas-booking`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error_code::ErrorDescriptor;
use crate::identity::{ClientIdentity, DocumentType, FieldError, RegistrantField, RegistrantForm};
use crate::slots::{SlotQuery, SlotSet, SlotTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Identity,
    Details,
    Confirmation,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Identity => "identity",
            Self::Details => "details",
            Self::Confirmation => "confirmation",
        })
    }
}

/// Appointment details being chosen in the details phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingDraft {
    pub reason_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub time: Option<SlotTime>,
    pub observations: Option<String>,
}

/// Required draft field that was still empty at submit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Reason,
    Branch,
    Date,
    Time,
}

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Reason => "motivo",
            Self::Branch => "sede",
            Self::Date => "fecha",
            Self::Time => "hora",
        })
    }
}

/// A complete, validated booking ready for the scheduling call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingRequest {
    pub identity: ClientIdentity,
    pub reason_id: i64,
    pub branch_id: i64,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub observations: Option<String>,
}

/// Scannable reference that lets a third party re-check the appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationArtifact {
    pub appointment_number: String,
    pub client_number: String,
    /// Payload to encode (a URL on the public verification endpoint).
    pub payload: String,
}

/// Server-confirmed appointment. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentConfirmation {
    pub ticket_number: String,
    pub issued_at: DateTime<Utc>,
    pub status: Option<String>,
    pub message: Option<String>,
    pub booking: BookingRequest,
    pub artifact: Option<VerificationArtifact>,
}

// ── Phase states ──

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityPhase {
    pub form: RegistrantForm,
    /// Set when the existing-client lookup failed; the UI offers registration.
    pub lookup_error: Option<ErrorDescriptor>,
    slot_seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailsPhase {
    pub identity: ClientIdentity,
    pub draft: BookingDraft,
    pub slots: SlotSet,
    /// Latest availability query still in flight.
    pub pending_slots: Option<SlotQuery>,
    /// Error reported alongside the current slot set, if any.
    pub slot_error: Option<ErrorDescriptor>,
    pub submitting: bool,
    pub error: Option<ErrorDescriptor>,
    slot_seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPhase {
    pub confirmation: AppointmentConfirmation,
    slot_seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingState {
    Identity(IdentityPhase),
    Details(Box<DetailsPhase>),
    Confirmation(Box<ConfirmationPhase>),
}

impl Default for BookingState {
    fn default() -> Self {
        Self::Identity(IdentityPhase::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingEvent {
    RegistrantEdited {
        field: RegistrantField,
        value: String,
    },
    DocumentTypeSelected(DocumentType),
    LookupFailed(ErrorDescriptor),
    IdentityResolved(ClientIdentity),
    ReasonSelected(i64),
    BranchSelected(i64),
    DateSelected(NaiveDate),
    TimeSelected(SlotTime),
    ObservationsChanged(String),
    SlotsResolved {
        query: SlotQuery,
        slots: SlotSet,
        error: Option<ErrorDescriptor>,
    },
    SubmitStarted,
    SubmissionFailed(ErrorDescriptor),
    Booked(Box<AppointmentConfirmation>),
    ErrorDismissed,
    Reset,
}

impl BookingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegistrantEdited { .. } => "registrant_edited",
            Self::DocumentTypeSelected(_) => "document_type_selected",
            Self::LookupFailed(_) => "lookup_failed",
            Self::IdentityResolved(_) => "identity_resolved",
            Self::ReasonSelected(_) => "reason_selected",
            Self::BranchSelected(_) => "branch_selected",
            Self::DateSelected(_) => "date_selected",
            Self::TimeSelected(_) => "time_selected",
            Self::ObservationsChanged(_) => "observations_changed",
            Self::SlotsResolved { .. } => "slots_resolved",
            Self::SubmitStarted => "submit_started",
            Self::SubmissionFailed(_) => "submission_failed",
            Self::Booked(_) => "booked",
            Self::ErrorDismissed => "error_dismissed",
            Self::Reset => "reset",
        }
    }
}

/// I/O the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ResolveSlots(SlotQuery),
    Submit(Box<BookingRequest>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: BookingState,
    pub effect: Option<Effect>,
}

impl Transition {
    fn to(state: BookingState) -> Self {
        Self {
            state,
            effect: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("event {event} is not valid in the {phase} phase")]
    InvalidEvent { phase: Phase, event: &'static str },

    #[error("registrant data is incomplete: {}", join(.0))]
    InvalidRegistrant(Vec<FieldError>),

    #[error("time {0} is not available for the selected date and branch")]
    TimeNotAvailable(SlotTime),

    #[error("missing required fields: {}", join(.0))]
    Incomplete(Vec<MissingField>),

    #[error("availability for the selected date and branch is still loading")]
    SlotsPending,

    #[error("a submission is already in progress")]
    SubmissionInFlight,

    #[error("no submission is in progress")]
    NotSubmitting,
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl BookingState {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Identity(_) => Phase::Identity,
            Self::Details(_) => Phase::Details,
            Self::Confirmation(_) => Phase::Confirmation,
        }
    }

    fn slot_seq(&self) -> u64 {
        match self {
            Self::Identity(p) => p.slot_seq,
            Self::Details(p) => p.slot_seq,
            Self::Confirmation(p) => p.slot_seq,
        }
    }

    /// Compute the next state for `event`.
    pub fn transition(&self, event: BookingEvent) -> Result<Transition, TransitionError> {
        if matches!(event, BookingEvent::Reset) {
            return Ok(Transition::to(Self::Identity(IdentityPhase {
                slot_seq: self.slot_seq(),
                ..IdentityPhase::default()
            })));
        }

        match self {
            Self::Identity(phase) => phase.clone().handle(event),
            Self::Details(phase) => phase.as_ref().clone().handle(event),
            Self::Confirmation(_) => Err(TransitionError::InvalidEvent {
                phase: Phase::Confirmation,
                event: event.name(),
            }),
        }
    }
}

impl IdentityPhase {
    fn handle(mut self, event: BookingEvent) -> Result<Transition, TransitionError> {
        match event {
            BookingEvent::RegistrantEdited { field, value } => {
                self.form.set_field(field, value);
            }
            BookingEvent::DocumentTypeSelected(document_type) => {
                self.form.set_document_type(document_type);
            }
            BookingEvent::LookupFailed(error) => {
                self.lookup_error = Some(error);
            }
            BookingEvent::ErrorDismissed => {
                self.lookup_error = None;
            }
            BookingEvent::IdentityResolved(identity) => {
                if let ClientIdentity::New { registrant } = &identity {
                    let errors: Vec<FieldError> =
                        registrant.errors().into_iter().map(|(_, e)| e).collect();
                    if !errors.is_empty() {
                        return Err(TransitionError::InvalidRegistrant(errors));
                    }
                }
                return Ok(Transition::to(BookingState::Details(Box::new(
                    DetailsPhase {
                        identity,
                        draft: BookingDraft::default(),
                        slots: SlotSet::empty(),
                        pending_slots: None,
                        slot_error: None,
                        submitting: false,
                        error: None,
                        slot_seq: self.slot_seq,
                    },
                ))));
            }
            other => {
                return Err(TransitionError::InvalidEvent {
                    phase: Phase::Identity,
                    event: other.name(),
                });
            }
        }
        Ok(Transition::to(BookingState::Identity(self)))
    }
}

impl DetailsPhase {
    fn handle(mut self, event: BookingEvent) -> Result<Transition, TransitionError> {
        let editing = matches!(
            event,
            BookingEvent::ReasonSelected(_)
                | BookingEvent::BranchSelected(_)
                | BookingEvent::DateSelected(_)
                | BookingEvent::TimeSelected(_)
                | BookingEvent::ObservationsChanged(_)
                | BookingEvent::SubmitStarted
        );
        if editing && self.submitting {
            return Err(TransitionError::SubmissionInFlight);
        }

        let mut effect = None;
        match event {
            BookingEvent::ReasonSelected(id) => self.draft.reason_id = Some(id),
            BookingEvent::BranchSelected(id) => {
                if self.draft.branch_id != Some(id) {
                    self.draft.branch_id = Some(id);
                    effect = self.requery();
                }
            }
            BookingEvent::DateSelected(date) => {
                if self.draft.date != Some(date) {
                    self.draft.date = Some(date);
                    effect = self.requery();
                }
            }
            BookingEvent::TimeSelected(time) => {
                if self.pending_slots.is_some() || !self.slots.contains(&time) {
                    return Err(TransitionError::TimeNotAvailable(time));
                }
                self.draft.time = Some(time);
            }
            BookingEvent::ObservationsChanged(text) => {
                self.draft.observations = if text.trim().is_empty() {
                    None
                } else {
                    Some(text)
                };
            }
            BookingEvent::SlotsResolved {
                query,
                slots,
                error,
            } => {
                if self.pending_slots != Some(query) {
                    tracing::debug!(
                        seq = query.seq,
                        date = %query.date,
                        branch_id = query.branch_id,
                        "discarding stale availability result"
                    );
                    return Ok(Transition::to(BookingState::Details(Box::new(self))));
                }
                self.draft.time = slots.retain_selection(self.draft.time);
                self.slots = slots;
                self.slot_error = error;
                self.pending_slots = None;
            }
            BookingEvent::SubmitStarted => {
                let request = self.ready()?;
                self.submitting = true;
                self.error = None;
                effect = Some(Effect::Submit(Box::new(request)));
            }
            BookingEvent::SubmissionFailed(error) => {
                if !self.submitting {
                    return Err(TransitionError::NotSubmitting);
                }
                self.submitting = false;
                self.error = Some(error);
            }
            BookingEvent::Booked(confirmation) => {
                if !self.submitting {
                    return Err(TransitionError::NotSubmitting);
                }
                return Ok(Transition::to(BookingState::Confirmation(Box::new(
                    ConfirmationPhase {
                        confirmation: *confirmation,
                        slot_seq: self.slot_seq,
                    },
                ))));
            }
            BookingEvent::ErrorDismissed => {
                self.error = None;
                self.slot_error = None;
            }
            other => {
                return Err(TransitionError::InvalidEvent {
                    phase: Phase::Details,
                    event: other.name(),
                });
            }
        }
        Ok(Transition {
            state: BookingState::Details(Box::new(self)),
            effect,
        })
    }

    /// Issue a new availability query for the current date and branch.
    ///
    /// The previous slot set belongs to another pair and is dropped; the
    /// selected time is kept until the new set says otherwise.
    fn requery(&mut self) -> Option<Effect> {
        self.slots = SlotSet::empty();
        self.slot_error = None;
        match (self.draft.date, self.draft.branch_id) {
            (Some(date), Some(branch_id)) => {
                self.slot_seq += 1;
                let query = SlotQuery {
                    seq: self.slot_seq,
                    date,
                    branch_id,
                };
                self.pending_slots = Some(query);
                Some(Effect::ResolveSlots(query))
            }
            _ => {
                self.pending_slots = None;
                self.draft.time = None;
                None
            }
        }
    }

    /// Validate the draft for submission.
    ///
    /// A time kept across a date or branch change is only trusted once the
    /// new slot set has arrived.
    pub fn ready(&self) -> Result<BookingRequest, TransitionError> {
        if self.pending_slots.is_some() {
            return Err(TransitionError::SlotsPending);
        }
        let mut missing = Vec::new();
        if self.draft.reason_id.is_none() {
            missing.push(MissingField::Reason);
        }
        if self.draft.branch_id.is_none() {
            missing.push(MissingField::Branch);
        }
        if self.draft.date.is_none() {
            missing.push(MissingField::Date);
        }
        if self.draft.time.is_none() {
            missing.push(MissingField::Time);
        }

        match (
            self.draft.reason_id,
            self.draft.branch_id,
            self.draft.date,
            self.draft.time,
        ) {
            (Some(reason_id), Some(branch_id), Some(date), Some(time)) => {
                if let ClientIdentity::New { registrant } = &self.identity {
                    let errors: Vec<FieldError> =
                        registrant.errors().into_iter().map(|(_, e)| e).collect();
                    if !errors.is_empty() {
                        return Err(TransitionError::InvalidRegistrant(errors));
                    }
                }
                Ok(BookingRequest {
                    identity: self.identity.clone(),
                    reason_id,
                    branch_id,
                    date,
                    time,
                    observations: self.draft.observations.clone(),
                })
            }
            _ => Err(TransitionError::Incomplete(missing)),
        }
    }
}

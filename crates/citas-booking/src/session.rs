//! Async driver for the booking state machine.
//!
//! [`BookingSession`] owns one [`BookingState`] and performs the effects the
//! pure transitions ask for: availability queries and the final scheduling
//! call. Every state change goes through [`BookingSession::apply`].

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use citas_api::SchedulingApi;
use citas_api::wire::{ScheduleRequest, SimpleRegistrationRequest};
use citas_core::identity::{ClientIdentity, DocumentType, RegistrantField};
use citas_core::{
    AppointmentConfirmation, BookingEvent, BookingRequest, BookingState, Catalogs, ClientConfig,
    Effect, ErrorDescriptor, Phase, SlotQuery, SlotTime, TransitionError, VerificationArtifact,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::availability::{AvailabilityResolver, Resolution};
use crate::identity::{ClientIdentityResolver, IdentityError};
use crate::verification::build_artifact;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("could not load catalogs: {0}")]
    Catalogs(ErrorDescriptor),
    /// The server refused the booking; the draft is kept for a retry.
    #[error("{0}")]
    Rejected(ErrorDescriptor),
}

impl SessionError {
    /// Descriptor for display, when the failure came from the server.
    pub fn descriptor(&self) -> Option<&ErrorDescriptor> {
        match self {
            Self::Identity(e) => Some(e.descriptor()),
            Self::Catalogs(d) | Self::Rejected(d) => Some(d),
            Self::Transition(_) => None,
        }
    }
}

pub struct BookingSession {
    api: Arc<dyn SchedulingApi>,
    identity: ClientIdentityResolver,
    availability: AvailabilityResolver,
    verification_url: String,
    catalogs: Catalogs,
    state: BookingState,
}

impl BookingSession {
    pub fn new(api: Arc<dyn SchedulingApi>, config: &ClientConfig) -> Self {
        Self {
            identity: ClientIdentityResolver::new(api.clone()),
            availability: AvailabilityResolver::new(api.clone()),
            verification_url: config.verification_url(),
            catalogs: Catalogs::default(),
            state: BookingState::default(),
            api,
        }
    }

    /// Load branches and appointment reasons. Both are fetched concurrently
    /// and kept for the lifetime of the session.
    pub async fn start(&mut self) -> Result<&Catalogs, SessionError> {
        let (branches, reasons) = futures::try_join!(self.api.branches(), self.api.reasons())
            .map_err(|e| {
                warn!(error = %e, "could not load catalogs");
                SessionError::Catalogs(e.describe())
            })?;
        info!(branches = branches.len(), reasons = reasons.len(), "catalogs loaded");
        self.catalogs = Catalogs { branches, reasons };
        Ok(&self.catalogs)
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Apply one event; the state is untouched when the transition fails.
    pub fn apply(&mut self, event: BookingEvent) -> Result<Option<Effect>, TransitionError> {
        let name = event.name();
        let from = self.state.phase();
        let transition = self.state.transition(event).inspect_err(|e| {
            debug!(event = name, phase = %from, error = %e, "transition rejected");
        })?;
        self.state = transition.state;
        debug!(event = name, from = %from, to = %self.state.phase(), "transition");
        Ok(transition.effect)
    }

    // ── Identity phase ──

    pub fn edit_registrant(
        &mut self,
        field: RegistrantField,
        value: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.apply(BookingEvent::RegistrantEdited {
            field,
            value: value.into(),
        })
        .map(drop)
    }

    pub fn select_document_type(&mut self, document_type: DocumentType) -> Result<(), TransitionError> {
        self.apply(BookingEvent::DocumentTypeSelected(document_type))
            .map(drop)
    }

    /// Validate an existing client number and move on to details.
    ///
    /// A failed lookup stays in the identity phase with the error recorded
    /// so the caller can offer registration instead.
    pub async fn continue_existing(&mut self, client_number: &str) -> Result<(), SessionError> {
        if self.phase() != Phase::Identity {
            return Err(TransitionError::InvalidEvent {
                phase: self.phase(),
                event: "identity_resolved",
            }
            .into());
        }
        match self.identity.resolve_existing(client_number).await {
            Ok(record) => {
                self.apply(BookingEvent::IdentityResolved(ClientIdentity::existing(&record)))?;
                Ok(())
            }
            Err(e) => {
                self.apply(BookingEvent::LookupFailed(e.descriptor().clone()))?;
                Err(e.into())
            }
        }
    }

    /// Continue with the registrant form as a first-time client.
    pub fn continue_as_new(&mut self) -> Result<(), TransitionError> {
        let BookingState::Identity(phase) = &self.state else {
            return Err(TransitionError::InvalidEvent {
                phase: self.phase(),
                event: "identity_resolved",
            });
        };
        let registrant = phase.form.data().clone();
        self.apply(BookingEvent::IdentityResolved(ClientIdentity::New { registrant }))
            .map(drop)
    }

    // ── Details phase ──

    pub fn select_reason(&mut self, reason_id: i64) -> Result<(), TransitionError> {
        self.apply(BookingEvent::ReasonSelected(reason_id)).map(drop)
    }

    /// Select a branch. Returns the availability query to run, if the
    /// date is also known.
    pub fn select_branch(&mut self, branch_id: i64) -> Result<Option<SlotQuery>, TransitionError> {
        self.apply(BookingEvent::BranchSelected(branch_id))
            .map(slot_query)
    }

    pub fn select_date(&mut self, date: NaiveDate) -> Result<Option<SlotQuery>, TransitionError> {
        self.apply(BookingEvent::DateSelected(date)).map(slot_query)
    }

    /// Resolver handle for running queries outside the session borrow.
    pub fn availability(&self) -> AvailabilityResolver {
        self.availability.clone()
    }

    pub async fn resolve_slots(&self, query: SlotQuery) -> Resolution {
        self.availability.resolve(query.date, query.branch_id).await
    }

    /// Deliver a resolution. Results for superseded queries are dropped.
    pub fn apply_slots(
        &mut self,
        query: SlotQuery,
        resolution: Resolution,
    ) -> Result<(), TransitionError> {
        self.apply(BookingEvent::SlotsResolved {
            query,
            slots: resolution.slots,
            error: resolution.error,
        })
        .map(drop)
    }

    /// Select a branch and wait for its availability.
    pub async fn change_branch(&mut self, branch_id: i64) -> Result<(), TransitionError> {
        if let Some(query) = self.select_branch(branch_id)? {
            let resolution = self.resolve_slots(query).await;
            self.apply_slots(query, resolution)?;
        }
        Ok(())
    }

    /// Select a date and wait for its availability.
    pub async fn change_date(&mut self, date: NaiveDate) -> Result<(), TransitionError> {
        if let Some(query) = self.select_date(date)? {
            let resolution = self.resolve_slots(query).await;
            self.apply_slots(query, resolution)?;
        }
        Ok(())
    }

    pub fn select_time(&mut self, time: SlotTime) -> Result<(), TransitionError> {
        self.apply(BookingEvent::TimeSelected(time)).map(drop)
    }

    pub fn set_observations(&mut self, text: impl Into<String>) -> Result<(), TransitionError> {
        self.apply(BookingEvent::ObservationsChanged(text.into()))
            .map(drop)
    }

    /// Send the booking. Existing clients go through the scheduling
    /// endpoint; first-time clients are registered and booked together.
    pub async fn submit(&mut self) -> Result<&AppointmentConfirmation, SessionError> {
        let request = match self.apply(BookingEvent::SubmitStarted)? {
            Some(Effect::Submit(request)) => *request,
            other => {
                warn!(effect = ?other, "submit produced no request");
                return Err(TransitionError::NotSubmitting.into());
            }
        };

        match self.send(&request).await {
            Ok(confirmation) => {
                info!(
                    ticket = %confirmation.ticket_number,
                    new_client = request.identity.is_new(),
                    "appointment booked"
                );
                self.apply(BookingEvent::Booked(Box::new(confirmation)))?;
                match &self.state {
                    BookingState::Confirmation(phase) => Ok(&phase.confirmation),
                    _ => Err(TransitionError::NotSubmitting.into()),
                }
            }
            Err(descriptor) => {
                self.apply(BookingEvent::SubmissionFailed(descriptor.clone()))?;
                Err(SessionError::Rejected(descriptor))
            }
        }
    }

    async fn send(&self, request: &BookingRequest) -> Result<AppointmentConfirmation, ErrorDescriptor> {
        let result = match &request.identity {
            ClientIdentity::Existing { client_number } => self
                .api
                .schedule(&ScheduleRequest::new(client_number, request))
                .await
                .map(|r| (r.appointment_number, r.status, r.message)),
            ClientIdentity::New { registrant } => self
                .api
                .register_and_schedule(&SimpleRegistrationRequest::new(registrant, request))
                .await
                .map(|r| (r.request_number, r.status, r.message)),
        };

        let (ticket_number, status, message) = result.map_err(|e| {
            let descriptor = e.describe();
            if descriptor.is_expected_validation {
                info!(code = %descriptor.code, "booking rejected by business rule");
            } else {
                warn!(error = %e, "booking failed");
            }
            descriptor
        })?;

        let artifact = self.artifact(&ticket_number, request.identity.reference());
        Ok(AppointmentConfirmation {
            ticket_number,
            issued_at: Utc::now(),
            status,
            message,
            booking: request.clone(),
            artifact,
        })
    }

    /// A confirmation without an artifact is still a confirmation.
    fn artifact(&self, ticket_number: &str, client_reference: &str) -> Option<VerificationArtifact> {
        build_artifact(&self.verification_url, ticket_number, client_reference)
            .inspect_err(|e| warn!(error = %e, "verification artifact omitted"))
            .ok()
    }

    pub fn dismiss_error(&mut self) -> Result<(), TransitionError> {
        self.apply(BookingEvent::ErrorDismissed).map(drop)
    }

    /// Back to an empty identity phase. Catalogs are kept.
    pub fn reset(&mut self) {
        // Reset is accepted from every phase.
        if let Err(e) = self.apply(BookingEvent::Reset) {
            warn!(error = %e, "reset rejected");
        }
    }

    /// Error currently shown to the user, if any.
    pub fn current_error(&self) -> Option<&ErrorDescriptor> {
        match &self.state {
            BookingState::Identity(p) => p.lookup_error.as_ref(),
            BookingState::Details(p) => p.error.as_ref().or(p.slot_error.as_ref()),
            BookingState::Confirmation(_) => None,
        }
    }
}

fn slot_query(effect: Option<Effect>) -> Option<SlotQuery> {
    match effect {
        Some(Effect::ResolveSlots(query)) => Some(query),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, Reply};
    use citas_api::wire::{ScheduleResponse, SimpleRegistrationResponse};
    use citas_core::{ConfiguredSlot, error_code};

    fn config() -> ClientConfig {
        ClientConfig::with_base_url("https://citas.example.gov.co")
    }

    fn jan_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn t(s: &str) -> SlotTime {
        SlotTime::parse(s).unwrap()
    }

    fn booked(ticket: &str) -> Reply<ScheduleResponse> {
        Reply::Ok(ScheduleResponse {
            appointment_number: ticket.into(),
            appointment_date: Some("2024-01-15".into()),
            appointment_time: Some("10:00".into()),
            status: Some("Scheduled".into()),
            message: None,
        })
    }

    fn api() -> Arc<FakeApi> {
        let api = FakeApi::with_catalogs();
        api.add_client("123456789", "Ana Gómez");
        FakeApi::set(&api.available, Reply::Ok(vec!["09:00".into(), "10:00".into()]));
        Arc::new(api)
    }

    /// Session in details with B1, R1 and 2024-01-15 chosen.
    async fn in_details(api: &Arc<FakeApi>) -> BookingSession {
        let mut session = BookingSession::new(api.clone(), &config());
        session.start().await.unwrap();
        session.continue_existing("123456789").await.unwrap();
        session.select_reason(1).unwrap();
        session.change_branch(1).await.unwrap();
        session.change_date(jan_15()).await.unwrap();
        session
    }

    #[tokio::test]
    async fn existing_client_books_end_to_end() {
        let api = api();
        FakeApi::set(&api.schedule, booked("APT-001"));
        let mut session = in_details(&api).await;

        match session.state() {
            BookingState::Details(d) => assert_eq!(d.slots, citas_core::SlotSet::from_strings(["09:00", "10:00"])),
            other => panic!("unexpected {:?}", other.phase()),
        }
        session.select_time(t("10:00")).unwrap();

        let confirmation = session.submit().await.unwrap();
        assert_eq!(confirmation.ticket_number, "APT-001");
        let artifact = confirmation.artifact.as_ref().expect("artifact");
        assert_eq!(
            artifact.payload,
            "https://citas.example.gov.co/api/appointments/verify?appointmentNumber=APT-001&clientNumber=123456789"
        );
        assert_eq!(session.phase(), Phase::Confirmation);

        let sent = api.scheduled.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].client_number, "123456789");
        assert_eq!(sent[0].appointment_date, "2024-01-15");
        assert_eq!(sent[0].appointment_time, "10:00");
    }

    #[tokio::test]
    async fn business_rule_rejection_stays_in_details() {
        let api = api();
        FakeApi::set(
            &api.schedule,
            Reply::Fail(r#"{"message":"SUNDAY_NOT_AVAILABLE|No se atiende los domingos"}"#.into()),
        );
        let mut session = in_details(&api).await;
        session.select_time(t("09:00")).unwrap();

        let err = session.submit().await.unwrap_err();
        let d = err.descriptor().expect("server descriptor");
        assert_eq!(d.code, error_code::SUNDAY_NOT_AVAILABLE);
        assert!(d.is_expected_validation);

        assert_eq!(session.phase(), Phase::Details);
        let shown = session.current_error().expect("error shown");
        assert!(shown.hint().is_some());
        match session.state() {
            BookingState::Details(p) => {
                assert!(!p.submitting);
                assert_eq!(p.draft.time, Some(t("09:00")));
            }
            other => panic!("unexpected {:?}", other.phase()),
        }

        session.dismiss_error().unwrap();
        assert!(session.current_error().is_none());
    }

    #[tokio::test]
    async fn submit_without_time_makes_no_call() {
        let api = api();
        let mut session = in_details(&api).await;

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, SessionError::Transition(TransitionError::Incomplete(_))));
        assert_eq!(api.count("schedule"), 0);
        assert_eq!(api.count("register_and_schedule"), 0);
    }

    #[tokio::test]
    async fn unknown_client_stays_in_identity() {
        let api = api();
        let mut session = BookingSession::new(api.clone(), &config());

        let err = session.continue_existing("999").await.unwrap_err();
        assert!(matches!(err, SessionError::Identity(_)));
        assert_eq!(session.phase(), Phase::Identity);
        assert_eq!(
            session.current_error().map(|d| d.code.as_str()),
            Some(error_code::CLIENT_NOT_FOUND)
        );
    }

    #[tokio::test]
    async fn new_client_registers_and_books() {
        let api = api();
        FakeApi::set(
            &api.register,
            Reply::Ok(SimpleRegistrationResponse {
                request_number: "SOL-9".into(),
                client_number: None,
                appointment_date: None,
                appointment_time: None,
                status: None,
                message: Some("Registro exitoso".into()),
            }),
        );
        let mut session = BookingSession::new(api.clone(), &config());
        session.start().await.unwrap();

        session.select_document_type(DocumentType::CE).unwrap();
        session.edit_registrant(RegistrantField::DocumentNumber, "1032456789").unwrap();
        session.edit_registrant(RegistrantField::FullName, "María Fernanda Ruiz").unwrap();
        session.edit_registrant(RegistrantField::Mobile, "3001234567").unwrap();
        session.edit_registrant(RegistrantField::Email, "maria.ruiz@example.com").unwrap();
        session.continue_as_new().unwrap();

        session.select_reason(1).unwrap();
        session.change_branch(2).await.unwrap();
        session.change_date(jan_15()).await.unwrap();
        session.select_time(t("09:00")).unwrap();
        let confirmation = session.submit().await.unwrap();

        assert_eq!(confirmation.ticket_number, "SOL-9");
        assert_eq!(
            confirmation.artifact.as_ref().map(|a| a.client_number.as_str()),
            Some("1032456789")
        );
        let sent = api.registered.lock().unwrap().clone();
        assert_eq!(sent[0].document_type, "CE");
        assert_eq!(sent[0].branch_id, 2);
        assert_eq!(api.count("schedule"), 0);
    }

    #[tokio::test]
    async fn incomplete_registrant_cannot_continue() {
        let api = api();
        let mut session = BookingSession::new(api.clone(), &config());
        session.edit_registrant(RegistrantField::Mobile, "300").unwrap();

        let err = session.continue_as_new().unwrap_err();
        assert!(matches!(err, TransitionError::InvalidRegistrant(_)));
        assert_eq!(session.phase(), Phase::Identity);
    }

    #[tokio::test]
    async fn superseded_query_result_is_ignored() {
        let api = api();
        let mut session = BookingSession::new(api.clone(), &config());
        session.continue_existing("123456789").await.unwrap();
        session.select_branch(1).unwrap();

        let first = session.select_date(jan_15()).unwrap().expect("query");
        let second = session
            .select_date(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap())
            .unwrap()
            .expect("query");

        let resolver = session.availability();
        let newer = resolver.resolve(second.date, second.branch_id).await;
        session.apply_slots(second, newer).unwrap();

        FakeApi::set(&api.available, Reply::Ok(vec!["07:00".into()]));
        let older = resolver.resolve(first.date, first.branch_id).await;
        session.apply_slots(first, older).unwrap();

        match session.state() {
            BookingState::Details(d) => {
                assert_eq!(d.draft.date, NaiveDate::from_ymd_opt(2024, 1, 16));
                assert!(!d.slots.contains(&t("07:00")));
                assert_eq!(d.slots.len(), 2);
            }
            other => panic!("unexpected {:?}", other.phase()),
        }
    }

    #[tokio::test]
    async fn holiday_rejection_keeps_hint_over_fallback_slots() {
        let api = api();
        FakeApi::set(
            &api.available,
            Reply::Fail(r#"{"message":"HOLIDAY_NOT_AVAILABLE|Día festivo"}"#.into()),
        );
        let configured = ["08:00", "09:00"].map(|time| ConfiguredSlot {
            time: time.into(),
            is_active: true,
        });
        FakeApi::set(&api.configured, Reply::Ok(configured.to_vec()));
        FakeApi::set(&api.branch_appointments, Reply::Ok(vec![]));

        let session = in_details(&api).await;

        let error = session.current_error().expect("holiday error shown");
        assert_eq!(error.code, error_code::HOLIDAY_NOT_AVAILABLE);
        assert!(error.hint().is_some());
        match session.state() {
            BookingState::Details(d) => {
                assert_eq!(d.slots.len(), 2);
                assert!(d.slots.contains(&t("08:00")));
                assert!(d.slots.contains(&t("09:00")));
            }
            other => panic!("unexpected {:?}", other.phase()),
        }
    }

    #[tokio::test]
    async fn reset_keeps_catalogs() {
        let api = api();
        FakeApi::set(&api.schedule, booked("APT-002"));
        let mut session = in_details(&api).await;
        session.select_time(t("09:00")).unwrap();
        session.submit().await.unwrap();

        session.reset();
        assert_eq!(session.phase(), Phase::Identity);
        assert_eq!(session.catalogs().branches.len(), 2);
        assert!(session.catalogs().reason(1).is_some());
        assert!(session.current_error().is_none());
    }

    #[tokio::test]
    async fn catalog_failure_is_reported() {
        let api = Arc::new(FakeApi::default());
        let mut session = BookingSession::new(api, &config());
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, SessionError::Catalogs(_)));
    }
}

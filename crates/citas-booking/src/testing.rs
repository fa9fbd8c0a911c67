//! Scripted in-memory `SchedulingApi` for service and workflow tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use citas_api::wire::{
    CancelRequest, CancelResponse, ScheduleRequest, ScheduleResponse, SimpleRegistrationRequest,
    SimpleRegistrationResponse, VerificationResponse,
};
use citas_api::{ApiError, SchedulingApi};
use citas_core::{AppointmentRecord, BranchRef, ClientRecord, ConfiguredSlot, ReasonRef};

#[derive(Debug, Clone)]
pub(crate) enum Reply<T> {
    Ok(T),
    Fail(String),
    Down,
}

impl<T: Clone> Reply<T> {
    fn get(&self) -> Result<T, ApiError> {
        match self {
            Self::Ok(v) => Ok(v.clone()),
            Self::Fail(body) => Err(ApiError::Server {
                status: 400,
                body: body.clone(),
            }),
            Self::Down => Err(ApiError::Transport("connection refused".into())),
        }
    }
}

impl<T> Default for Reply<T> {
    fn default() -> Self {
        Self::Down
    }
}

/// Every reply defaults to a transport failure until scripted.
#[derive(Default)]
pub(crate) struct FakeApi {
    pub clients: Mutex<HashMap<String, ClientRecord>>,
    pub branches: Mutex<Reply<Vec<BranchRef>>>,
    pub reasons: Mutex<Reply<Vec<ReasonRef>>>,
    pub available: Mutex<Reply<Vec<String>>>,
    pub configured: Mutex<Reply<Vec<ConfiguredSlot>>>,
    pub branch_appointments: Mutex<Reply<Vec<AppointmentRecord>>>,
    pub client_appointments: Mutex<Reply<Vec<AppointmentRecord>>>,
    pub schedule: Mutex<Reply<ScheduleResponse>>,
    pub register: Mutex<Reply<SimpleRegistrationResponse>>,
    pub cancel: Mutex<Reply<CancelResponse>>,
    pub verify: Mutex<Reply<VerificationResponse>>,
    pub settings: Mutex<HashMap<String, String>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub scheduled: Mutex<Vec<ScheduleRequest>>,
    pub registered: Mutex<Vec<SimpleRegistrationRequest>>,
}

impl FakeApi {
    pub fn with_catalogs() -> Self {
        let api = Self::default();
        *api.branches.lock().unwrap() = Reply::Ok(vec![
            BranchRef {
                id: 1,
                name: "B1".into(),
                address: None,
            },
            BranchRef {
                id: 2,
                name: "B2".into(),
                address: None,
            },
        ]);
        *api.reasons.lock().unwrap() = Reply::Ok(vec![ReasonRef {
            id: 1,
            name: "R1".into(),
            icon: None,
        }]);
        api
    }

    pub fn add_client(&self, client_number: &str, name: &str) {
        self.clients.lock().unwrap().insert(
            client_number.to_string(),
            ClientRecord {
                id: 1,
                client_number: client_number.to_string(),
                name: name.to_string(),
                email: None,
                mobile: None,
            },
        );
    }

    pub fn set<T>(slot: &Mutex<Reply<T>>, reply: Reply<T>) {
        *slot.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    fn record(&self, op: &'static str) {
        self.calls.lock().unwrap().push(op);
    }
}

#[async_trait]
impl SchedulingApi for FakeApi {
    async fn validate_client(&self, client_number: &str) -> Result<ClientRecord, ApiError> {
        self.record("validate_client");
        self.clients
            .lock()
            .unwrap()
            .get(client_number)
            .cloned()
            .ok_or_else(|| ApiError::Server {
                status: 404,
                body: String::new(),
            })
    }

    async fn branches(&self) -> Result<Vec<BranchRef>, ApiError> {
        self.record("branches");
        self.branches.lock().unwrap().get()
    }

    async fn reasons(&self) -> Result<Vec<ReasonRef>, ApiError> {
        self.record("reasons");
        self.reasons.lock().unwrap().get()
    }

    async fn available_times(
        &self,
        _date: NaiveDate,
        _branch_id: i64,
    ) -> Result<Vec<String>, ApiError> {
        self.record("available_times");
        self.available.lock().unwrap().get()
    }

    async fn configured_slots(&self, _branch_id: i64) -> Result<Vec<ConfiguredSlot>, ApiError> {
        self.record("configured_slots");
        self.configured.lock().unwrap().get()
    }

    async fn branch_appointments(
        &self,
        _branch_id: i64,
        _date: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, ApiError> {
        self.record("branch_appointments");
        self.branch_appointments.lock().unwrap().get()
    }

    async fn client_appointments(
        &self,
        _client_number: &str,
    ) -> Result<Vec<AppointmentRecord>, ApiError> {
        self.record("client_appointments");
        self.client_appointments.lock().unwrap().get()
    }

    async fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleResponse, ApiError> {
        self.record("schedule");
        self.scheduled.lock().unwrap().push(request.clone());
        self.schedule.lock().unwrap().get()
    }

    async fn register_and_schedule(
        &self,
        request: &SimpleRegistrationRequest,
    ) -> Result<SimpleRegistrationResponse, ApiError> {
        self.record("register_and_schedule");
        self.registered.lock().unwrap().push(request.clone());
        self.register.lock().unwrap().get()
    }

    async fn cancel(
        &self,
        _appointment_id: i64,
        _request: &CancelRequest,
    ) -> Result<CancelResponse, ApiError> {
        self.record("cancel");
        self.cancel.lock().unwrap().get()
    }

    async fn verify(
        &self,
        _appointment_number: &str,
        _client_number: &str,
    ) -> Result<VerificationResponse, ApiError> {
        self.record("verify");
        self.verify.lock().unwrap().get()
    }

    async fn setting(&self, key: &str) -> Result<Option<String>, ApiError> {
        self.record("setting");
        Ok(self.settings.lock().unwrap().get(key).cloned())
    }
}

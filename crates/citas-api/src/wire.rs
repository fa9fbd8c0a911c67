//! JSON request/response bodies exchanged with the scheduling server.
//!
//! The known-client endpoints speak camelCase; the simple-registration
//! endpoint expects PascalCase field names.

use citas_core::{BookingRequest, RegistrantData};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub client_number: String,
    pub branch_id: i64,
    pub appointment_type_id: i64,
    pub appointment_date: String,
    pub appointment_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

impl ScheduleRequest {
    pub fn new(client_number: &str, booking: &BookingRequest) -> Self {
        Self {
            client_number: client_number.to_string(),
            branch_id: booking.branch_id,
            appointment_type_id: booking.reason_id,
            appointment_date: booking.date.format(DATE_FORMAT).to_string(),
            appointment_time: booking.time.to_string(),
            observations: booking.observations.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    #[serde(alias = "ticketNumber", alias = "number")]
    pub appointment_number: String,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub appointment_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Creates the client record and the appointment in one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimpleRegistrationRequest {
    pub document_type: String,
    pub document_number: String,
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub branch_id: i64,
    pub appointment_type_id: i64,
    pub appointment_date: String,
    pub appointment_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

impl SimpleRegistrationRequest {
    pub fn new(registrant: &RegistrantData, booking: &BookingRequest) -> Self {
        Self {
            document_type: registrant.document_type.as_str().to_string(),
            document_number: registrant.document_number.trim().to_string(),
            full_name: registrant.full_name.trim().to_string(),
            email: registrant.email.trim().to_string(),
            mobile: registrant.mobile.trim().to_string(),
            phone: registrant.phone.clone(),
            address: registrant.address.clone(),
            branch_id: booking.branch_id,
            appointment_type_id: booking.reason_id,
            appointment_date: booking.date.format(DATE_FORMAT).to_string(),
            appointment_time: booking.time.to_string(),
            observations: booking.observations.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleRegistrationResponse {
    #[serde(alias = "RequestNumber")]
    pub request_number: String,
    #[serde(default, alias = "ClientNumber")]
    pub client_number: Option<String>,
    #[serde(default, alias = "AppointmentDate")]
    pub appointment_date: Option<String>,
    #[serde(default, alias = "AppointmentTime")]
    pub appointment_time: Option<String>,
    #[serde(default, alias = "Status")]
    pub status: Option<String>,
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub client_number: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    #[serde(default)]
    pub message: String,
}

/// Public verification result: validity plus a denormalized summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    #[serde(alias = "valid")]
    pub is_valid: bool,
    #[serde(default)]
    pub appointment_number: Option<String>,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub appointment_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub client_number: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default, alias = "reasonName")]
    pub appointment_type_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of the settings endpoint: `"24"`, `24`, or `{"key": .., "value": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Text(String),
    Number(serde_json::Number),
    Entry {
        #[serde(default, alias = "Value")]
        value: Option<Box<SettingValue>>,
    },
}

impl SettingValue {
    pub fn into_value(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(n) => Some(n.to_string()),
            Self::Entry { value } => value.and_then(|v| v.into_value()),
        }
    }
}

//! Verification artifacts attached to confirmations.
//!
//! The payload is a URL on the public verification endpoint carrying the
//! appointment number and client number; a scanner resolves it back to the
//! appointment via `SchedulingApi::verify`.

use std::sync::LazyLock;

use citas_core::VerificationArtifact;
use regex::Regex;
use thiserror::Error;

/// References are embedded in the URL without escaping.
static SAFE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._\-]{1,64}$").expect("valid reference regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("verification endpoint is not configured")]
    MissingEndpoint,
    #[error("{field} {value:?} cannot be embedded in a verification reference")]
    UnsafeReference { field: &'static str, value: String },
}

pub fn build_artifact(
    endpoint: &str,
    appointment_number: &str,
    client_number: &str,
) -> Result<VerificationArtifact, VerificationError> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        return Err(VerificationError::MissingEndpoint);
    }
    let appointment_number = checked("appointment number", appointment_number)?;
    let client_number = checked("client number", client_number)?;

    let separator = if endpoint.contains('?') { '&' } else { '?' };
    Ok(VerificationArtifact {
        payload: format!(
            "{endpoint}{separator}appointmentNumber={appointment_number}&clientNumber={client_number}"
        ),
        appointment_number: appointment_number.to_string(),
        client_number: client_number.to_string(),
    })
}

/// Parse a scanned payload back into `(appointment number, client number)`.
pub fn parse_payload(payload: &str) -> Option<(String, String)> {
    let (_, query) = payload.split_once('?')?;
    let mut appointment = None;
    let mut client = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("appointmentNumber", v)) => appointment = Some(v.to_string()),
            Some(("clientNumber", v)) => client = Some(v.to_string()),
            _ => {}
        }
    }
    Some((appointment?, client?))
}

fn checked<'a>(field: &'static str, value: &'a str) -> Result<&'a str, VerificationError> {
    let value = value.trim();
    if SAFE_REFERENCE.is_match(value) {
        Ok(value)
    } else {
        Err(VerificationError::UnsafeReference {
            field,
            value: value.to_string(),
        })
    }
}

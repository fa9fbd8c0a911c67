//! Business-rule error codes carried in server messages.
//!
//! The scheduling server reports rule violations as `"CODE|human message"`.
//! [`parse`] turns that wire string into an [`ErrorDescriptor`], and the
//! companion lookups ([`hint`], [`icon`], [`style_class`]) provide the
//! presentation metadata the UI shows for the calendar-related codes.

use serde::{Deserialize, Serialize};

/// Code used whenever the raw message carries no `CODE|` prefix.
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// Message shown when the server gave us nothing to work with.
pub const GENERIC_MESSAGE: &str = "Ocurrió un error inesperado. Intente nuevamente más tarde.";

// ── Expected business-rule codes ──

pub const HOLIDAY_NOT_AVAILABLE: &str = "HOLIDAY_NOT_AVAILABLE";
pub const SUNDAY_NOT_AVAILABLE: &str = "SUNDAY_NOT_AVAILABLE";
pub const PAST_DATE_NOT_ALLOWED: &str = "PAST_DATE_NOT_ALLOWED";
pub const NO_CAPACITY_AVAILABLE: &str = "NO_CAPACITY_AVAILABLE";
pub const DUPLICATE_APPOINTMENT: &str = "DUPLICATE_APPOINTMENT";
pub const CLIENT_NOT_FOUND: &str = "CLIENT_NOT_FOUND";
pub const OUTSIDE_BUSINESS_HOURS: &str = "OUTSIDE_BUSINESS_HOURS";

/// Closed set of codes that represent normal business-rule rejections.
///
/// Matching is case-sensitive.
pub const EXPECTED_CODES: &[&str] = &[
    HOLIDAY_NOT_AVAILABLE,
    SUNDAY_NOT_AVAILABLE,
    PAST_DATE_NOT_ALLOWED,
    NO_CAPACITY_AVAILABLE,
    DUPLICATE_APPOINTMENT,
    CLIENT_NOT_FOUND,
    OUTSIDE_BUSINESS_HOURS,
];

/// Interpreted server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescriptor {
    pub code: String,
    pub message: String,
    /// True only for members of [`EXPECTED_CODES`].
    pub is_expected_validation: bool,
}

impl ErrorDescriptor {
    /// Descriptor for a failure that carried no usable message.
    pub fn unknown() -> Self {
        Self {
            code: UNKNOWN_ERROR.to_string(),
            message: GENERIC_MESSAGE.to_string(),
            is_expected_validation: false,
        }
    }

    /// Descriptor for a locally detected expected rule violation.
    pub fn expected(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            is_expected_validation: is_expected(code),
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        hint(&self.code)
    }

    pub fn icon(&self) -> Option<&'static str> {
        icon(&self.code)
    }

    /// Presentation bundle for rendering this error.
    pub fn presentation(&self) -> Presentation {
        let tone = if self.is_expected_validation {
            Tone::Warning
        } else {
            Tone::Error
        };
        Presentation {
            tone,
            hint: hint(&self.code),
            icon: icon(&self.code),
            class: style_class(&self.code),
        }
    }
}

impl std::fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Parse a raw server message of the form `"CODE|message"`.
///
/// Only the first `|` splits; any further `|` stays in the message.
pub fn parse(raw: Option<&str>) -> ErrorDescriptor {
    let raw = match raw {
        Some(r) if !r.is_empty() => r,
        _ => return ErrorDescriptor::unknown(),
    };

    match raw.split_once('|') {
        Some((code, message)) => {
            let code = code.trim();
            ErrorDescriptor {
                code: code.to_string(),
                message: message.trim().to_string(),
                is_expected_validation: is_expected(code),
            }
        }
        None => ErrorDescriptor {
            code: UNKNOWN_ERROR.to_string(),
            message: raw.trim().to_string(),
            is_expected_validation: false,
        },
    }
}

/// Whether `code` is one of the expected business-rule codes.
pub fn is_expected(code: &str) -> bool {
    EXPECTED_CODES.contains(&code)
}

// ── Presentation lookups ──

/// Visual tone for an error banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub tone: Tone,
    pub hint: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub class: &'static str,
}

/// User-facing hint for the calendar codes (holiday, Sunday, past date).
pub fn hint(code: &str) -> Option<&'static str> {
    match code {
        HOLIDAY_NOT_AVAILABLE => {
            Some("La fecha seleccionada es un día festivo. Por favor elija un día hábil.")
        }
        SUNDAY_NOT_AVAILABLE => {
            Some("Los domingos no hay atención. Por favor elija un día entre lunes y sábado.")
        }
        PAST_DATE_NOT_ALLOWED => {
            Some("No es posible agendar en fechas pasadas. Seleccione una fecha futura.")
        }
        _ => None,
    }
}

pub fn icon(code: &str) -> Option<&'static str> {
    match code {
        HOLIDAY_NOT_AVAILABLE => Some("calendar-x"),
        SUNDAY_NOT_AVAILABLE => Some("calendar-off"),
        PAST_DATE_NOT_ALLOWED => Some("history"),
        _ => None,
    }
}

/// Styling class; anything outside the calendar codes gets the default.
pub fn style_class(code: &str) -> &'static str {
    match code {
        HOLIDAY_NOT_AVAILABLE => "error-holiday",
        SUNDAY_NOT_AVAILABLE => "error-sunday",
        PAST_DATE_NOT_ALLOWED => "error-past-date",
        _ => "error-default",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_code_and_message() {
        let d = parse(Some(" SUNDAY_NOT_AVAILABLE | Los domingos no se atienden citas "));
        assert_eq!(d.code, "SUNDAY_NOT_AVAILABLE");
        assert_eq!(d.message, "Los domingos no se atienden citas");
        assert!(d.is_expected_validation);
    }

    #[test]
    fn only_first_pipe_splits() {
        let d = parse(Some("X|Y|Z"));
        assert_eq!(d.code, "X");
        assert_eq!(d.message, "Y|Z");
        assert!(!d.is_expected_validation);
    }

    #[test]
    fn absent_or_empty_is_unknown() {
        for raw in [None, Some("")] {
            let d = parse(raw);
            assert_eq!(d.code, UNKNOWN_ERROR);
            assert_eq!(d.message, GENERIC_MESSAGE);
            assert!(!d.is_expected_validation);
        }
    }

    #[test]
    fn no_pipe_keeps_trimmed_message() {
        let d = parse(Some("  connection reset  "));
        assert_eq!(d.code, UNKNOWN_ERROR);
        assert_eq!(d.message, "connection reset");
        assert!(!d.is_expected_validation);
    }

    #[test]
    fn empty_code_before_pipe() {
        let d = parse(Some("|only message"));
        assert_eq!(d.code, "");
        assert_eq!(d.message, "only message");
        assert!(!d.is_expected_validation);
    }

    #[test]
    fn every_expected_code_is_recognised() {
        for code in EXPECTED_CODES {
            let d = parse(Some(&format!("{code}|msg")));
            assert!(d.is_expected_validation, "{code} should be expected");
        }
        assert_eq!(EXPECTED_CODES.len(), 7);
    }

    #[test]
    fn codes_are_case_sensitive() {
        assert!(!parse(Some("sunday_not_available|x")).is_expected_validation);
        assert!(!parse(Some("Holiday_Not_Available|x")).is_expected_validation);
        assert!(!parse(Some("SERVER_EXPLODED|x")).is_expected_validation);
    }

    #[test]
    fn lookups_cover_exactly_calendar_codes() {
        for code in [HOLIDAY_NOT_AVAILABLE, SUNDAY_NOT_AVAILABLE, PAST_DATE_NOT_ALLOWED] {
            assert!(hint(code).is_some());
            assert!(icon(code).is_some());
            assert_ne!(style_class(code), "error-default");
        }
        for code in [
            NO_CAPACITY_AVAILABLE,
            DUPLICATE_APPOINTMENT,
            CLIENT_NOT_FOUND,
            OUTSIDE_BUSINESS_HOURS,
            UNKNOWN_ERROR,
        ] {
            assert!(hint(code).is_none());
            assert!(icon(code).is_none());
            assert_eq!(style_class(code), "error-default");
        }
    }

    #[test]
    fn presentation_tone_follows_expectedness() {
        let expected = parse(Some("NO_CAPACITY_AVAILABLE|Sin cupos"));
        let p = expected.presentation();
        assert_eq!(p.tone, Tone::Warning);
        assert!(p.hint.is_none());

        let unexpected = parse(Some("boom"));
        assert_eq!(unexpected.presentation().tone, Tone::Error);
    }
}

//! Client identity: an existing client number or a first-time registrant.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static DOCUMENT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,15}$").expect("valid document regex"));
static MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("valid mobile regex"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

pub const FULL_NAME_MIN: usize = 3;
pub const FULL_NAME_MAX: usize = 200;

/// Identity document kinds accepted at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    /// Cédula de ciudadanía.
    #[default]
    CC,
    /// Cédula de extranjería.
    CE,
    /// Tarjeta de identidad.
    TI,
    /// Pasaporte.
    PA,
    NIT,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CC => "CC",
            Self::CE => "CE",
            Self::TI => "TI",
            Self::PA => "PA",
            Self::NIT => "NIT",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CC" => Ok(Self::CC),
            "CE" => Ok(Self::CE),
            "TI" => Ok(Self::TI),
            "PA" => Ok(Self::PA),
            "NIT" => Ok(Self::NIT),
            other => Err(format!("unknown document type: {other}")),
        }
    }
}

/// Editable registrant form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrantField {
    DocumentNumber,
    FullName,
    Mobile,
    Email,
    Phone,
    Address,
}

/// Per-field validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("el número de documento debe tener entre 1 y 15 dígitos")]
    DocumentNumber,
    #[error("el nombre completo debe tener entre {FULL_NAME_MIN} y {FULL_NAME_MAX} caracteres")]
    FullName,
    #[error("el celular debe tener exactamente 10 dígitos")]
    Mobile,
    #[error("el correo electrónico no es válido")]
    Email,
}

/// Personal data of a first-time registrant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrantData {
    pub document_type: DocumentType,
    pub document_number: String,
    pub full_name: String,
    pub mobile: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl RegistrantData {
    /// Validate a single field, as done when the field loses focus.
    ///
    /// Optional fields (phone, address) always pass.
    pub fn validate_field(&self, field: RegistrantField) -> Result<(), FieldError> {
        match field {
            RegistrantField::DocumentNumber => {
                if DOCUMENT_NUMBER.is_match(self.document_number.trim()) {
                    Ok(())
                } else {
                    Err(FieldError::DocumentNumber)
                }
            }
            RegistrantField::FullName => {
                let len = self.full_name.trim().chars().count();
                if (FULL_NAME_MIN..=FULL_NAME_MAX).contains(&len) {
                    Ok(())
                } else {
                    Err(FieldError::FullName)
                }
            }
            RegistrantField::Mobile => {
                if MOBILE.is_match(self.mobile.trim()) {
                    Ok(())
                } else {
                    Err(FieldError::Mobile)
                }
            }
            RegistrantField::Email => {
                if EMAIL.is_match(self.email.trim()) {
                    Ok(())
                } else {
                    Err(FieldError::Email)
                }
            }
            RegistrantField::Phone | RegistrantField::Address => Ok(()),
        }
    }

    /// All failing required fields, in form order.
    pub fn errors(&self) -> Vec<(RegistrantField, FieldError)> {
        [
            RegistrantField::DocumentNumber,
            RegistrantField::FullName,
            RegistrantField::Mobile,
            RegistrantField::Email,
        ]
        .into_iter()
        .filter_map(|f| self.validate_field(f).err().map(|e| (f, e)))
        .collect()
    }

    /// Whether the form can be submitted: every required field is valid.
    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }
}

/// Registrant form being filled in during the identity phase.
///
/// The aggregate validity is recomputed on every change so a submit control
/// can follow it without waiting for blur events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrantForm {
    data: RegistrantData,
    submittable: bool,
}

impl RegistrantForm {
    pub fn new(data: RegistrantData) -> Self {
        let submittable = data.is_valid();
        Self { data, submittable }
    }

    pub fn data(&self) -> &RegistrantData {
        &self.data
    }

    pub fn set_document_type(&mut self, document_type: DocumentType) {
        self.data.document_type = document_type;
    }

    /// Update one field and recompute the aggregate predicate.
    ///
    /// Document number, mobile and email are stored trimmed; none of them
    /// may contain whitespace.
    pub fn set_field(&mut self, field: RegistrantField, value: impl Into<String>) {
        let value = value.into();
        match field {
            RegistrantField::DocumentNumber => {
                self.data.document_number = value.trim().to_string();
            }
            RegistrantField::FullName => self.data.full_name = value,
            RegistrantField::Mobile => self.data.mobile = value.trim().to_string(),
            RegistrantField::Email => self.data.email = value.trim().to_string(),
            RegistrantField::Phone => self.data.phone = non_empty(value),
            RegistrantField::Address => self.data.address = non_empty(value),
        }
        self.submittable = self.data.is_valid();
    }

    /// Blur-time validation of one field.
    pub fn blur(&self, field: RegistrantField) -> Result<(), FieldError> {
        self.data.validate_field(field)
    }

    pub fn is_submittable(&self) -> bool {
        self.submittable
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Client record returned by the registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    #[serde(alias = "clientId")]
    pub id: i64,
    pub client_number: String,
    #[serde(alias = "fullName")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
}

/// Normalized identity used for the rest of the booking flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientIdentity {
    Existing { client_number: String },
    New { registrant: RegistrantData },
}

impl ClientIdentity {
    pub fn existing(record: &ClientRecord) -> Self {
        Self::Existing {
            client_number: record.client_number.clone(),
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New { .. })
    }

    /// Reference used to identify the client outside the booking call:
    /// the client number, or the document number for a registrant.
    pub fn reference(&self) -> &str {
        match self {
            Self::Existing { client_number } => client_number,
            Self::New { registrant } => registrant.document_number.trim(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RegistrantData {
        RegistrantData {
            document_type: DocumentType::CC,
            document_number: "1032456789".into(),
            full_name: "María Fernanda Ruiz".into(),
            mobile: "3001234567".into(),
            email: "maria.ruiz@example.com".into(),
            phone: None,
            address: None,
        }
    }

    #[test]
    fn valid_registrant_passes() {
        assert!(valid().is_valid());
        assert!(valid().errors().is_empty());
    }

    #[test]
    fn mobile_must_have_ten_digits() {
        let mut r = valid();
        r.mobile = "300123456".into();
        assert_eq!(
            r.validate_field(RegistrantField::Mobile),
            Err(FieldError::Mobile)
        );
        assert!(!r.is_valid());

        r.mobile = "3001234567".into();
        assert!(r.is_valid());

        r.mobile = "300-123-4567".into();
        assert!(!r.is_valid());

        r.mobile = "٣٠٠١٢٣٤٥٦٧".into();
        assert_eq!(
            r.validate_field(RegistrantField::Mobile),
            Err(FieldError::Mobile),
            "only ASCII digits count"
        );
    }

    #[test]
    fn document_number_digits_only() {
        let mut r = valid();
        r.document_number = "10AB3".into();
        assert!(!r.is_valid());
        r.document_number = "1234567890123456".into();
        assert!(!r.is_valid(), "16 digits is too long");
        r.document_number = "7".into();
        assert!(r.is_valid());
        r.document_number = String::new();
        assert!(!r.is_valid());
        r.document_number = "١٢٣٤٥".into();
        assert_eq!(
            r.validate_field(RegistrantField::DocumentNumber),
            Err(FieldError::DocumentNumber)
        );
    }

    #[test]
    fn full_name_length_bounds() {
        let mut r = valid();
        r.full_name = "Al".into();
        assert!(!r.is_valid());
        r.full_name = "Ana".into();
        assert!(r.is_valid());
        r.full_name = "x".repeat(201);
        assert!(!r.is_valid());
        r.full_name = "x".repeat(200);
        assert!(r.is_valid());
    }

    #[test]
    fn email_pattern() {
        let mut r = valid();
        for bad in ["", "maria", "maria@", "maria@example", "a b@example.com"] {
            r.email = bad.into();
            assert!(!r.is_valid(), "{bad:?} should be rejected");
        }
        r.email = "m.r+citas@sub.example.co".into();
        assert!(r.is_valid());
    }

    #[test]
    fn optional_fields_are_not_validated() {
        let mut r = valid();
        r.phone = Some("abc".into());
        r.address = Some("".into());
        assert!(r.is_valid());
    }

    #[test]
    fn form_recomputes_on_every_change() {
        let mut form = RegistrantForm::default();
        assert!(!form.is_submittable());

        form.set_field(RegistrantField::DocumentNumber, "123456");
        form.set_field(RegistrantField::FullName, "Juan Pérez");
        form.set_field(RegistrantField::Email, "juan@example.com");
        assert!(!form.is_submittable());

        form.set_field(RegistrantField::Mobile, "3109876543");
        assert!(form.is_submittable());

        form.set_field(RegistrantField::Mobile, "310987654");
        assert!(!form.is_submittable());
        assert_eq!(form.blur(RegistrantField::Mobile), Err(FieldError::Mobile));
    }

    #[test]
    fn blank_optional_field_is_cleared() {
        let mut form = RegistrantForm::new(valid());
        form.set_field(RegistrantField::Phone, "6011234567");
        assert_eq!(form.data().phone.as_deref(), Some("6011234567"));
        form.set_field(RegistrantField::Phone, "  ");
        assert!(form.data().phone.is_none());
    }

    #[test]
    fn identifiers_are_stored_trimmed() {
        let mut form = RegistrantForm::default();
        form.set_field(RegistrantField::DocumentNumber, " 1032456789 ");
        form.set_field(RegistrantField::Mobile, "3001234567\t");
        form.set_field(RegistrantField::Email, " ana@example.com");
        form.set_field(RegistrantField::FullName, "Ana ");
        let data = form.data();
        assert_eq!(data.document_number, "1032456789");
        assert_eq!(data.mobile, "3001234567");
        assert_eq!(data.email, "ana@example.com");
        assert_eq!(data.full_name, "Ana ", "names keep typed spacing");

        let new = ClientIdentity::New {
            registrant: RegistrantData {
                document_number: " 77 ".into(),
                ..valid()
            },
        };
        assert_eq!(new.reference(), "77");
    }

    #[test]
    fn identity_reference() {
        let existing = ClientIdentity::Existing {
            client_number: "123456789".into(),
        };
        assert_eq!(existing.reference(), "123456789");
        assert!(!existing.is_new());

        let new = ClientIdentity::New { registrant: valid() };
        assert_eq!(new.reference(), "1032456789");
        assert!(new.is_new());
    }

    #[test]
    fn client_record_accepts_server_aliases() {
        let json = r#"{"clientId": 7, "clientNumber": "123456789", "fullName": "Ana Gómez"}"#;
        let record: ClientRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.name, "Ana Gómez");
        assert!(record.email.is_none());
    }
}

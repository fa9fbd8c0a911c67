pub mod cancellation;
pub mod catalog;
pub mod config;
pub mod error_code;
pub mod identity;
pub mod slots;
pub mod workflow;

pub use cancellation::{CancellationPolicy, CancellationRefused};
pub use catalog::{BranchRef, Catalogs, ReasonRef};
pub use config::{ClientConfig, ConfigError};
pub use error_code::ErrorDescriptor;
pub use identity::{ClientIdentity, ClientRecord, DocumentType, RegistrantData, RegistrantForm};
pub use slots::{AppointmentRecord, ConfiguredSlot, SlotQuery, SlotSet, SlotTime};
pub use workflow::{
    AppointmentConfirmation, BookingDraft, BookingEvent, BookingRequest, BookingState, Effect,
    Phase, Transition, TransitionError, VerificationArtifact,
};

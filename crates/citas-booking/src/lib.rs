//! Booking services: availability with fallback, client lookup, cancellation, and the session driver.

mod availability;
pub use availability::{AvailabilityResolver, Resolution, SlotSource};

mod cancellation;
pub use cancellation::{AppointmentRow, CancelError, CancellationService};

mod identity;
pub use identity::{ClientIdentityResolver, IdentityError};

mod session;
pub use session::{BookingSession, SessionError};

pub mod verification;
pub use verification::VerificationError;

#[cfg(test)]
mod testing;

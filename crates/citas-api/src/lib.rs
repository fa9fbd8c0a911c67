//! Scheduling API layer: the `SchedulingApi` contract, JSON wire bodies, and a reqwest transport.

mod api;
mod error;
pub mod wire;

pub use api::SchedulingApi;
pub use error::ApiError;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpApi;

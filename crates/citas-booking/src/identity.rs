use std::sync::Arc;

use citas_api::SchedulingApi;
use citas_core::error_code::CLIENT_NOT_FOUND;
use citas_core::{ClientRecord, ErrorDescriptor};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Any lookup failure. The caller should offer registration as a new client.
    #[error("client {client_number} was not found")]
    ClientNotFound {
        client_number: String,
        descriptor: ErrorDescriptor,
    },
}

impl IdentityError {
    pub fn descriptor(&self) -> &ErrorDescriptor {
        match self {
            Self::ClientNotFound { descriptor, .. } => descriptor,
        }
    }
}

/// Resolves an existing client number against the registry.
#[derive(Clone)]
pub struct ClientIdentityResolver {
    api: Arc<dyn SchedulingApi>,
}

impl ClientIdentityResolver {
    pub fn new(api: Arc<dyn SchedulingApi>) -> Self {
        Self { api }
    }

    pub async fn resolve_existing(&self, client_number: &str) -> Result<ClientRecord, IdentityError> {
        let client_number = client_number.trim();
        if client_number.is_empty() {
            return Err(not_found(client_number));
        }

        match self.api.validate_client(client_number).await {
            Ok(record) => {
                info!(client = %record.client_number, "client validated");
                Ok(record)
            }
            Err(e) => {
                // Not-found and transport failures are reported the same way.
                debug!(client = %client_number, error = %e, "client lookup failed");
                Err(not_found(client_number))
            }
        }
    }
}

fn not_found(client_number: &str) -> IdentityError {
    IdentityError::ClientNotFound {
        client_number: client_number.to_string(),
        descriptor: ErrorDescriptor::expected(
            CLIENT_NOT_FOUND,
            format!(
                "No encontramos un cliente con el número {client_number}. Puede registrarse como cliente nuevo."
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use citas_core::error_code;

    #[tokio::test]
    async fn known_client_resolves() {
        let api = Arc::new(FakeApi::default());
        api.add_client("123456789", "Ana Gómez");
        let resolver = ClientIdentityResolver::new(api.clone());

        let record = resolver.resolve_existing(" 123456789 ").await.unwrap();
        assert_eq!(record.name, "Ana Gómez");
    }

    #[tokio::test]
    async fn unknown_client_is_not_found() {
        let api = Arc::new(FakeApi::default());
        let resolver = ClientIdentityResolver::new(api.clone());

        let err = resolver.resolve_existing("42").await.unwrap_err();
        let d = err.descriptor();
        assert_eq!(d.code, error_code::CLIENT_NOT_FOUND);
        assert!(d.is_expected_validation);
        assert_eq!(api.count("validate_client"), 1);
    }

    #[tokio::test]
    async fn blank_number_skips_network() {
        let api = Arc::new(FakeApi::default());
        let resolver = ClientIdentityResolver::new(api.clone());

        assert!(resolver.resolve_existing("   ").await.is_err());
        assert!(api.calls().is_empty());
    }
}

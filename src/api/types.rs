//! API response types not owned by an operation

use crate::config::{Capability, ProviderName, ServiceConfig};
use serde::Serialize;

/// One configured service. Credentials are never included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub name: ProviderName,
    pub display_name: &'static str,
    pub enabled: bool,
    pub priority: u32,
    pub capabilities: Vec<Capability>,
}

impl From<&ServiceConfig> for ServiceSummary {
    fn from(service: &ServiceConfig) -> Self {
        Self {
            name: service.name(),
            display_name: service.name().display_name(),
            enabled: service.enabled(),
            priority: service.priority(),
            capabilities: service.capabilities().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<ServiceSummary>,
}

#[derive(Debug, Serialize)]
pub struct HelloResponse {
    pub message: &'static str,
}

/// Error body for failures outside any operation (auth, unknown routes)
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

//! Endpoint registry and by-name delivery.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use flow_core::{Endpoint, Pulse};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Maximum endpoint name length.
pub const MAX_ENDPOINT_NAME_LENGTH: usize = 256;

/// Validate an endpoint name.
///
/// # Errors
///
/// Returns an error message if the name is invalid.
pub fn validate_endpoint_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Endpoint name cannot be empty");
    }
    if name.len() > MAX_ENDPOINT_NAME_LENGTH {
        return Err("Endpoint name too long");
    }
    if name.starts_with('$') {
        return Err("Endpoint names starting with '$' are reserved");
    }
    if !name.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return Err("Endpoint name contains invalid characters");
    }
    Ok(())
}

/// Hub errors.
#[derive(Debug, Error)]
pub enum HubError {
    /// Invalid endpoint name.
    #[error("Invalid endpoint name: {0}")]
    InvalidName(&'static str),

    /// Endpoint not found.
    #[error("Endpoint not found: {0}")]
    NotFound(String),

    /// An endpoint is already registered under this name.
    #[error("Endpoint already registered: {0}")]
    AlreadyRegistered(String),

    /// Maximum endpoints reached.
    #[error("Maximum endpoints reached")]
    MaxEndpointsReached,
}

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of registered endpoints.
    pub max_endpoints: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_endpoints: 10_000,
        }
    }
}

/// A registry of named delivery endpoints.
///
/// Registration and lookup are lock-free; delivery clones the endpoint
/// handle out of the map first, so no map lock is held while a handler
/// runs.
pub struct Hub<T: Send + 'static> {
    /// Endpoints indexed by name.
    endpoints: DashMap<String, Arc<dyn Endpoint<T>>>,
    /// Configuration.
    config: HubConfig,
}

impl<T: Send + 'static> Hub<T> {
    /// Create a new hub with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a new hub with custom configuration.
    #[must_use]
    pub fn with_config(config: HubConfig) -> Self {
        Self {
            endpoints: DashMap::new(),
            config,
        }
    }

    /// Register an endpoint under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid, already taken, or the
    /// endpoint limit is reached.
    pub fn register(
        &self,
        name: impl Into<String>,
        endpoint: Arc<dyn Endpoint<T>>,
    ) -> Result<(), HubError> {
        let name = name.into();
        validate_endpoint_name(&name).map_err(HubError::InvalidName)?;

        if self.endpoints.len() >= self.config.max_endpoints {
            return Err(HubError::MaxEndpointsReached);
        }

        match self.endpoints.entry(name) {
            Entry::Occupied(entry) => Err(HubError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(endpoint = %entry.key(), kind = endpoint.kind(), "Endpoint registered");
                entry.insert(endpoint);
                Ok(())
            }
        }
    }

    /// Remove the endpoint registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if no endpoint is registered under `name`.
    pub fn unregister(&self, name: &str) -> Result<(), HubError> {
        if self.endpoints.remove(name).is_some() {
            debug!(endpoint = %name, "Endpoint unregistered");
            Ok(())
        } else {
            Err(HubError::NotFound(name.to_string()))
        }
    }

    /// Deliver a pulse to the endpoint registered under `name`, waiting
    /// for its handler to complete.
    ///
    /// # Errors
    ///
    /// Returns an error if no endpoint is registered under `name`.
    pub async fn send_to(&self, name: &str, pulse: Pulse<T>) -> Result<(), HubError> {
        let endpoint = self
            .endpoints
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| HubError::NotFound(name.to_string()))?;

        trace!(endpoint = %name, pulse = %pulse.id(), "Routing pulse");
        endpoint.send(pulse).await;
        Ok(())
    }

    /// Check if an endpoint is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    /// Get the flavor of the endpoint registered under `name`.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<&'static str> {
        self.endpoints.get(name).map(|entry| entry.value().kind())
    }

    /// Get the number of registered endpoints.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Check if the hub has no registered endpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Get all registered endpoint names.
    #[must_use]
    pub fn endpoint_names(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.key().clone()).collect()
    }

    /// Get hub statistics.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        let mut channels = 0;
        let mut streams = 0;
        for entry in self.endpoints.iter() {
            match entry.value().kind() {
                "channel" => channels += 1,
                "stream" => streams += 1,
                _ => {}
            }
        }

        HubStats {
            endpoint_count: self.endpoints.len(),
            channels,
            streams,
        }
    }
}

impl<T: Send + 'static> Default for Hub<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hub statistics.
#[derive(Debug, Clone)]
pub struct HubStats {
    /// Number of registered endpoints.
    pub endpoint_count: usize,
    /// How many of them are channels.
    pub channels: usize,
    /// How many of them are streams.
    pub streams: usize,
}

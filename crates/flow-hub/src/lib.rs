//! # flow-hub
//!
//! Named registry of Flow delivery endpoints.
//!
//! A [`Hub`] maps validated string names to endpoints so producers can
//! address pulses by name instead of holding endpoint references directly.
//! The hub adds no delivery semantics of its own: `send_to` looks the
//! endpoint up and delegates to its `send`.

pub mod hub;

pub use hub::{
    validate_endpoint_name, Hub, HubConfig, HubError, HubStats, MAX_ENDPOINT_NAME_LENGTH,
};

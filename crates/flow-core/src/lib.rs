//! # flow-core
//!
//! Immutable message envelopes and single-consumer delivery endpoints.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Pulse** - Immutable envelope carrying a typed payload plus metadata
//! - **Channel** - Delivery endpoint with implicit lifecycle
//! - **Stream** - Delivery endpoint with explicit two-sided release
//! - **Endpoint** - The delivery seam both endpoints implement
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐     ┌───────────┐     ┌──────────────────┐
//! │ Producer │────▶│  Pulse<T> │────▶│ Channel / Stream │────▶ handler
//! └──────────┘     └───────────┘     └──────────────────┘
//! ```
//!
//! A producer builds a pulse (possibly responding to an earlier one, which
//! links the two through a shared trace id and an `echoes` back-reference),
//! then hands it to an endpoint's `send`, which waits for the registered
//! handler to finish. Nothing is queued, retried, or reordered.

pub mod channel;
pub mod endpoint;
pub mod pulse;
pub mod stream;

pub use channel::Channel;
pub use endpoint::{Endpoint, PayloadHandler, ReleaseHandler};
pub use pulse::{Metadata, Priority, Pulse, PulseId, TraceId};
pub use stream::{End, Stream};

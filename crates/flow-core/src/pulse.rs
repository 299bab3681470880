//! Immutable pulse envelopes.
//!
//! A [`Pulse`] wraps a typed payload with identity, timing, and causality
//! metadata. Every metadata operation returns a new envelope; a pulse is
//! never modified after construction, so it can be shared freely across
//! tasks without synchronization.
//!
//! ## Example
//!
//! ```rust
//! use flow_core::Pulse;
//!
//! let ping = Pulse::new("ping").with_tag("health");
//! let pong = ping.respond("pong");
//!
//! assert_eq!(pong.trace(), ping.trace());
//! assert_eq!(pong.echoes(), Some(ping.id()));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Atomic counter for ensuring unique ids even within the same millisecond.
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Low bits of an id reserved for the counter component.
const COUNTER_BITS: u32 = 20;

/// Generate a unique raw id: timestamp in the upper bits, counter in the
/// lower bits.
fn next_raw_id() -> u64 {
    let timestamp = now_millis();
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    (timestamp << COUNTER_BITS) | (counter & ((1 << COUNTER_BITS) - 1))
}

/// Current time as milliseconds since the Unix epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// A unique pulse identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PulseId(u64);

impl PulseId {
    /// Generate a fresh pulse id.
    #[must_use]
    pub fn generate() -> Self {
        Self(next_raw_id())
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PulseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pls_{:x}", self.0)
    }
}

impl From<u64> for PulseId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// An identifier shared by a causally-related family of pulses.
///
/// A trace id is assigned fresh when a pulse is constructed from scratch
/// and copied verbatim when a pulse is derived via [`Pulse::respond`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(u64);

impl TraceId {
    /// Generate a fresh trace id.
    #[must_use]
    pub fn generate() -> Self {
        Self(next_raw_id())
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trc_{:x}", self.0)
    }
}

impl From<u64> for TraceId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Advisory delivery priority.
///
/// Levels are ordered (`Low < Normal < High < Critical`) so consumers can
/// compare them, but nothing in this crate schedules or filters by
/// priority.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Metadata attached to every pulse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Advisory priority.
    pub priority: Priority,
    /// Free-form categorization tags.
    pub tags: HashSet<String>,
    /// Name of the originating component, if any.
    pub source: Option<String>,
    /// Marks the pulse for enhanced diagnostic visibility.
    pub debug: bool,
    /// Shared by this pulse and everything derived from it.
    pub trace: TraceId,
    /// Id of the immediate causal predecessor, if any.
    pub echoes: Option<PulseId>,
}

impl Metadata {
    /// Default metadata with a freshly generated trace id.
    #[must_use]
    pub fn fresh() -> Self {
        Self {
            priority: Priority::Normal,
            tags: HashSet::new(),
            source: None,
            debug: false,
            trace: TraceId::generate(),
            echoes: None,
        }
    }
}

/// An immutable message envelope.
///
/// The payload and the identity fields (`id`, `created_at`) are fixed at
/// construction. The `with_*` builders consume the pulse and return a new
/// one with a single metadata field changed; identity and payload are
/// carried over untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pulse<T> {
    id: PulseId,
    created_at: u64,
    payload: T,
    metadata: Metadata,
}

impl<T> Pulse<T> {
    /// Create a new pulse carrying `payload`.
    ///
    /// The pulse gets a fresh id, a fresh trace id, and default metadata:
    /// normal priority, no tags, no source, debug off, no predecessor.
    #[must_use]
    pub fn new(payload: T) -> Self {
        Self {
            id: PulseId::generate(),
            created_at: now_millis(),
            payload,
            metadata: Metadata::fresh(),
        }
    }

    /// Get the pulse id.
    #[must_use]
    pub fn id(&self) -> PulseId {
        self.id
    }

    /// Get the creation time as milliseconds since the Unix epoch.
    #[must_use]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Borrow the payload.
    #[must_use]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Consume the pulse and take the payload.
    #[must_use]
    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Borrow the full metadata record.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Get the advisory priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.metadata.priority
    }

    /// Borrow the tag set.
    #[must_use]
    pub fn tags(&self) -> &HashSet<String> {
        &self.metadata.tags
    }

    /// Check whether the pulse carries a tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata.tags.contains(tag)
    }

    /// Get the originating component, if one was named.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.metadata.source.as_deref()
    }

    /// Whether the pulse is marked for enhanced diagnostic visibility.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.metadata.debug
    }

    /// Get the trace id shared by this pulse's causal family.
    #[must_use]
    pub fn trace(&self) -> TraceId {
        self.metadata.trace
    }

    /// Get the id of the immediate causal predecessor, if any.
    #[must_use]
    pub fn echoes(&self) -> Option<PulseId> {
        self.metadata.echoes
    }

    /// Set the advisory priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.metadata.priority = priority;
        self
    }

    /// Add a single tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.insert(tag.into());
        self
    }

    /// Add tags to the existing set.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Name the originating component.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    /// Mark the pulse for enhanced diagnostic visibility.
    ///
    /// Endpoints log delivery of a debug pulse at debug level instead of
    /// trace level; the flag has no other effect in this crate.
    #[must_use]
    pub fn with_debug(mut self) -> Self {
        self.metadata.debug = true;
        self
    }

    /// Derive a response pulse.
    ///
    /// The response gets a fresh id and timestamp, carries `payload`,
    /// shares this pulse's trace id, and records this pulse's id as its
    /// causal predecessor. Priority, tags, source, and the debug flag
    /// start from defaults; copy them explicitly if a response should
    /// inherit them.
    #[must_use]
    pub fn respond<U>(&self, payload: U) -> Pulse<U> {
        Pulse {
            id: PulseId::generate(),
            created_at: now_millis(),
            payload,
            metadata: Metadata {
                priority: Priority::Normal,
                tags: HashSet::new(),
                source: None,
                debug: false,
                trace: self.metadata.trace,
                echoes: Some(self.id),
            },
        }
    }
}

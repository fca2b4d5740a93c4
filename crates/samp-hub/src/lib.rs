//! # samp-hub
//!
//! The hub core (§4.4): client registry, subscription matching,
//! message routing (`notify`/`call`/`callAndWait`/`reply`), call tracking,
//! and lifecycle broadcasts. Wire-independent: profiles decode SAMP
//! values into the typed arguments these methods expect and encode the
//! results back.
//!
//! ## Module organization
//!
//! - [`hub`]: [`Hub`], the public contract of §4.4's method table
//! - [`registry`]: client records, callback sinks, Web pull-queues
//! - [`subscriptions`]: MType wildcard matching
//! - [`tracking`]: outstanding-call bookkeeping
//! - [`observer`]: pluggable [`HubObserver`]s, replacing a deep
//!   inheritance hierarchy with composition

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod dispatch;
pub mod hub;
pub mod observer;
pub mod registry;
pub mod subscriptions;
pub mod tracking;

pub use dispatch::build_dispatcher;
pub use hub::{Hub, RegisterOutcome};
pub use observer::{HubEvent, HubObserver, LoggingObserver};
pub use registry::{CallbackSink, ClientRecord, PullQueue};
pub use subscriptions::SubscriptionIndex;
pub use tracking::{CallTrackingEntry, MsgId, TrackingTable};

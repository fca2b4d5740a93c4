//! # samp-standard
//!
//! The Standard Profile (§4.5): lockfile-based discovery and an
//! XML-RPC loopback server. Every profile-agnostic `samp.hub.*` method is
//! bound once via `samp_hub::build_dispatcher`; this crate adds only what
//! is specific to this profile: the shared-secret check on `register`,
//! `declareCallback`, and the lockfile's lifecycle.

#![warn(missing_debug_implementations, rust_2018_idioms)]

mod server;

pub use server::{StandardProfile, StandardProfileError, StandardProfileHandle};

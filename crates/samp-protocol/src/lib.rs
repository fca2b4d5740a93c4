//! # samp-protocol
//!
//! Wire-independent SAMP protocol pieces shared by the hub and both
//! profiles: the lockfile codec, client identifiers, the MType/message
//! envelope, hub-wide configuration, and the error taxonomy of §7.
//!
//! Nothing in this crate knows about XML-RPC or HTTP; that's
//! [`samp_transport`](https://docs.rs/samp-transport)'s job.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod ids;
pub mod lockfile;
pub mod message;

pub use config::HubConfig;
pub use error::{SampError, SampResult};
pub use ids::{ClientId, ClientIdAllocator, PrivateKey};
pub use lockfile::{LockInfo, LockfileError};
pub use message::{MType, Message};

//! # samp-client
//!
//! A client runtime for both SAMP profiles. [`Core`] carries every
//! profile-agnostic RPC method (`notify`, `call`, subscriptions, ...);
//! [`StandardClient`] and [`WebClient`] wrap it with each profile's own
//! registration and callback-delivery mechanics, mirroring the
//! `samp-hub`/`samp-standard`/`samp-web` split on the server side.

#![warn(missing_debug_implementations, rust_2018_idioms)]

mod core;
mod handler;
mod standard;
mod web;

pub use crate::core::Core;
pub use handler::{MessageHandler, NoopHandler};
pub use standard::{StandardClient, StandardConnectError};
pub use web::{WebClient, WebConnectError};

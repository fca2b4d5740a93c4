//! # samp-web
//!
//! The Web Profile (§4.6): a single HTTP endpoint multiplexing every
//! browser-origin client, gated by a pluggable [`ClientAuthorizer`] and an
//! [`OriginAuthorizer`] for CORS. Shares the `samp-hub` dispatch table for
//! every method except `register` and `pullCallbacks`, which differ here
//! from the Standard Profile's shapes.

#![warn(missing_debug_implementations, rust_2018_idioms)]

mod authorizer;
mod origin;
mod server;

pub use authorizer::{AllowAllAuthorizer, ClientAuthorizer, PromptAuthorizer};
pub use origin::{AllowAnyOrigin, OriginAuthorizer};
pub use server::{WebProfile, WebProfileError, WebProfileHandle};

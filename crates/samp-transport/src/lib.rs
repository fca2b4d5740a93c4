//! # samp-transport
//!
//! The transport-adapter layer (§4.3): a uniform "method name +
//! SAMP-value arguments -> result or fault" surface that both the Standard
//! Profile (XML-RPC) and the Web Profile (JSON-framed HTTP) dispatch
//! through, so `samp-hub` never has to know which wire carried a call.
//!
//! - [`dispatch`]: the inbound handler-map abstraction ([`MethodDispatcher`])
//! - [`xmlrpc`]: a minimal XML-RPC 1.0 codec restricted to SAMP's
//!   string/array/struct type set, with numeric/boolean coercion on decode
//! - [`outbound`]: the outbound callback client used to push
//!   `samp.client.*` notifications to Standard Profile clients
//! - [`fault`]: the `RemoteFailure`/`TransportFailure` shapes exposed to C4

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod dispatch;
pub mod fault;
pub mod outbound;
pub mod xmlrpc;

pub use dispatch::{HandlerFn, MethodDispatcher};
pub use fault::RemoteFault;
pub use outbound::OutboundClient;

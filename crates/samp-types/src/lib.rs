//! # samp-types
//!
//! The SAMP value model: a recursive tree of strings, lists, and ordered
//! mappings, plus validation, diagnostic pretty-printing, and a strict
//! JSON codec that mirrors SAMP's "strings only" wire discipline.
//!
//! ## Module organization
//!
//! - [`value`]: the [`SampValue`] type and its accessors/validation
//! - [`json`]: `to_json`/`from_json`
//! - [`pretty`]: `format_pretty` diagnostic rendering
//! - [`error`]: [`ValueError`] and [`SampResult`]

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod error;
pub mod json;
pub mod pretty;
pub mod value;

pub use error::{SampResult, ValueError};
pub use json::{from_json, to_json};
pub use pretty::format_pretty;
pub use value::{SampMap, SampValue};

/// The SAMP string that marks the hub's own reserved public id.
pub const HUB_SELF_ID: &str = "hub";

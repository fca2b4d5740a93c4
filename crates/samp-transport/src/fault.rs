//! The wire-level fault shape both profiles translate `SampError` into.

use samp_protocol::SampError;
use samp_types::SampValue;

/// An XML-RPC-style fault: a numeric code plus message (§4.3: "a
/// single generic code suffices"). Both profiles render a `SampError` to
/// this shape at their transport edge; `samp-hub` never constructs one.
#[derive(Debug, Clone)]
pub struct RemoteFault {
    /// The fault code. Every `SampError` maps to the same generic code
    /// per §4.3; the distinguishing information lives in `message`
    /// and `samp_code`.
    pub code: i32,
    /// Human-readable fault message.
    pub message: String,
    /// The `samp.code` taxonomy string (§6 "Error surface").
    pub samp_code: &'static str,
}

impl RemoteFault {
    /// Build the fault shape for a hub error.
    pub fn from_error(err: &SampError) -> Self {
        Self {
            code: SampError::XMLRPC_FAULT_CODE,
            message: err.to_string(),
            samp_code: err.samp_code(),
        }
    }

    /// Render as the `{"samp.errortxt": ..., "samp.code": ...}` mapping
    /// (§6) carried in synthetic `samp.error` responses and JSON
    /// fault bodies.
    pub fn to_samp_value(&self) -> SampValue {
        let mut m = SampValue::map();
        m.insert("samp.errortxt", SampValue::string(self.message.clone()));
        m.insert("samp.code", SampValue::string(self.samp_code));
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fault_mapping() {
        let fault = RemoteFault::from_error(&SampError::AuthFailure);
        let v = fault.to_samp_value();
        assert_eq!(v.get("samp.code").unwrap().as_str(), Some("samp.error.auth"));
    }
}

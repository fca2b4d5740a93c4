//! A minimal XML-RPC 1.0 codec restricted to the type set SAMP actually
//! uses: `<string>`, `<array>`, and `<struct>` (§4.3/§6: "SAMP scalars
//! are `<string>`; maps are `<struct>`; lists are `<array>`"). Numeric and
//! boolean XML-RPC scalars (`<i4>`/`<int>`, `<double>`, `<boolean>`) are
//! accepted on decode and coerced into their SAMP string form, since a
//! peer library may emit them even though SAMP never requires them.
//!
//! This is the "library primitive" treated as an external collaborator
//! rather than a general-purpose facility; it's implemented here only to
//! the depth the hub's two profiles actually exercise.

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

use samp_types::SampValue;

use crate::fault::RemoteFault;

/// Errors decoding XML-RPC text.
#[derive(Debug, Error)]
pub enum XmlRpcError {
    /// The XML itself was not well-formed.
    #[error("malformed XML: {0}")]
    Xml(String),
    /// The document didn't have the expected `methodCall`/`methodResponse`
    /// shape.
    #[error("unexpected XML-RPC structure: {0}")]
    Shape(String),
}

/// The decoded body of a `methodResponse`: either a result or a fault.
#[derive(Debug, Clone)]
pub enum MethodResponse {
    /// A successful `<params><param><value>...</value></param></params>`.
    Success(SampValue),
    /// A `<fault>` with a code and message.
    Fault(RemoteFault),
}

/// Encode a `methodCall` document for `method` with positional `params`.
pub fn encode_method_call(method: &str, params: &[SampValue]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall>\n");
    out.push_str(&format!("  <methodName>{}</methodName>\n", escape(method)));
    out.push_str("  <params>\n");
    for p in params {
        out.push_str("    <param><value>");
        write_value(p, &mut out);
        out.push_str("</value></param>\n");
    }
    out.push_str("  </params>\n</methodCall>\n");
    out
}

/// Encode a successful `methodResponse` document.
pub fn encode_method_response_success(result: &SampValue) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodResponse>\n  <params><param><value>");
    write_value(result, &mut out);
    out.push_str("</value></param></params>\n</methodResponse>\n");
    out
}

/// Encode a `methodResponse` fault document (§4.3: a single generic
/// fault code suffices).
pub fn encode_method_response_fault(fault: &RemoteFault) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse>\n  <fault><value><struct>\n    <member><name>faultCode</name><value><int>{}</int></value></member>\n    <member><name>faultString</name><value><string>{}</string></value></member>\n  </struct></value></fault>\n</methodResponse>\n",
        fault.code,
        escape(&fault.message),
    )
}

/// Decode a `methodCall` document into its method name and positional args.
pub fn decode_method_call(xml: &str) -> Result<(String, Vec<SampValue>), XmlRpcError> {
    let tree = parse_tree(xml)?;
    let root = tree
        .find("methodCall")
        .ok_or_else(|| XmlRpcError::Shape("missing methodCall".into()))?;
    let method_name = root
        .find("methodName")
        .and_then(|n| n.text.clone())
        .ok_or_else(|| XmlRpcError::Shape("missing methodName".into()))?;
    let params = root
        .find("params")
        .map(|p| {
            p.children
                .iter()
                .filter(|c| c.tag == "param")
                .filter_map(|param| param.find("value"))
                .map(node_to_value)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    Ok((method_name, params))
}

/// Decode a `methodResponse` document into a result or fault.
pub fn decode_method_response(xml: &str) -> Result<MethodResponse, XmlRpcError> {
    let tree = parse_tree(xml)?;
    let root = tree
        .find("methodResponse")
        .ok_or_else(|| XmlRpcError::Shape("missing methodResponse".into()))?;

    if let Some(fault) = root.find("fault") {
        let value = fault
            .find("value")
            .ok_or_else(|| XmlRpcError::Shape("fault missing value".into()))?;
        let decoded = node_to_value(value);
        let code = decoded
            .get("faultCode")
            .and_then(|v| v.as_i64())
            .unwrap_or(samp_protocol::SampError::XMLRPC_FAULT_CODE as i64) as i32;
        let message = decoded
            .get("faultString")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        return Ok(MethodResponse::Fault(RemoteFault {
            code,
            message,
            samp_code: "samp.error.remote",
        }));
    }

    let value = root
        .find("params")
        .and_then(|p| p.find("param"))
        .and_then(|p| p.find("value"))
        .ok_or_else(|| XmlRpcError::Shape("missing params/param/value".into()))?;
    Ok(MethodResponse::Success(node_to_value(value)))
}

fn write_value(value: &SampValue, out: &mut String) {
    match value {
        SampValue::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s));
            out.push_str("</string>");
        }
        SampValue::List(items) => {
            out.push_str("<array><data>");
            for item in items {
                out.push_str("<value>");
                write_value(item, out);
                out.push_str("</value>");
            }
            out.push_str("</data></array>");
        }
        SampValue::Map(entries) => {
            out.push_str("<struct>");
            for (k, v) in entries {
                out.push_str("<member><name>");
                out.push_str(&escape(k));
                out.push_str("</name><value>");
                write_value(v, out);
                out.push_str("</value></member>");
            }
            out.push_str("</struct>");
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Convert a decoded `<value>` node into a SAMP value, coercing bare
/// numeric/boolean XML-RPC scalars into their SAMP string convention
/// (§4.3).
fn node_to_value(value_node: &XmlNode) -> SampValue {
    if let Some(array) = value_node.find("array") {
        let items = array
            .find("data")
            .map(|d| {
                d.children
                    .iter()
                    .filter(|c| c.tag == "value")
                    .map(node_to_value)
                    .collect()
            })
            .unwrap_or_default();
        return SampValue::List(items);
    }
    if let Some(strct) = value_node.find("struct") {
        let entries = strct
            .children
            .iter()
            .filter(|c| c.tag == "member")
            .filter_map(|member| {
                let name = member.find("name")?.text.clone().unwrap_or_default();
                let value = member.find("value")?;
                Some((name, node_to_value(value)))
            })
            .collect();
        return SampValue::Map(entries);
    }
    for tag in ["string", "i4", "int", "double", "boolean"] {
        if let Some(scalar) = value_node.find(tag) {
            let text = scalar.text.clone().unwrap_or_default();
            return match tag {
                "boolean" => SampValue::string(if text.trim() == "1" { "1" } else { "0" }),
                _ => SampValue::string(text),
            };
        }
    }
    // Bare text with no scalar tag is an implicit `<string>` in XML-RPC.
    SampValue::string(value_node.text.clone().unwrap_or_default())
}

/// A tiny DOM-ish tree, just deep enough for XML-RPC's shallow grammar.
#[derive(Debug, Default, Clone)]
struct XmlNode {
    tag: String,
    text: Option<String>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn find(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.tag == tag)
    }
}

fn parse_tree(xml: &str) -> Result<XmlNode, XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root = XmlNode {
        tag: "#root".to_string(),
        ..Default::default()
    };
    let mut stack: Vec<XmlNode> = vec![];
    let mut current = &mut root;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push(std::mem::take(current));
                *current = XmlNode {
                    tag,
                    ..Default::default()
                };
            }
            Ok(Event::End(_)) => {
                let finished = std::mem::take(current);
                *current = stack.pop().ok_or_else(|| {
                    XmlRpcError::Xml("unbalanced closing tag".to_string())
                })?;
                current.children.push(finished);
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| XmlRpcError::Xml(e.to_string()))?
                    .into_owned();
                current.text = Some(match current.text.take() {
                    Some(mut existing) => {
                        existing.push_str(&text);
                        existing
                    }
                    None => text,
                });
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(XmlRpcError::Xml(e.to_string())),
        }
    }
    if !stack.is_empty() {
        return Err(XmlRpcError::Xml("unclosed element".to_string()));
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_method_call() {
        let mut params = SampValue::map();
        params.insert("mtype", SampValue::string("test.ping"));
        let xml = encode_method_call("samp.hub.notify", &[SampValue::string("key"), params.clone()]);
        let (method, args) = decode_method_call(&xml).unwrap();
        assert_eq!(method, "samp.hub.notify");
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].as_str(), Some("key"));
        assert_eq!(args[1].get("mtype").unwrap().as_str(), Some("test.ping"));
    }

    #[test]
    fn round_trips_nested_array_and_struct() {
        let mut inner = SampValue::map();
        inner.insert("a", SampValue::list([SampValue::string("1"), SampValue::string("2")]));
        let xml = encode_method_call("m", std::slice::from_ref(&inner));
        let (_, args) = decode_method_call(&xml).unwrap();
        assert_eq!(args[0], inner);
    }

    #[test]
    fn decodes_success_response() {
        let xml = encode_method_response_success(&SampValue::string("ok"));
        match decode_method_response(&xml).unwrap() {
            MethodResponse::Success(v) => assert_eq!(v.as_str(), Some("ok")),
            MethodResponse::Fault(_) => panic!("expected success"),
        }
    }

    #[test]
    fn decodes_fault_response() {
        let fault = RemoteFault {
            code: 1,
            message: "boom".into(),
            samp_code: "samp.error.auth",
        };
        let xml = encode_method_response_fault(&fault);
        match decode_method_response(&xml).unwrap() {
            MethodResponse::Fault(f) => {
                assert_eq!(f.code, 1);
                assert_eq!(f.message, "boom");
            }
            MethodResponse::Success(_) => panic!("expected fault"),
        }
    }

    #[test]
    fn coerces_numeric_and_boolean_scalars_to_strings() {
        let xml = "<?xml version=\"1.0\"?><methodCall><methodName>m</methodName><params><param><value><i4>42</i4></value></param><param><value><boolean>1</boolean></value></param></params></methodCall>";
        let (_, args) = decode_method_call(xml).unwrap();
        assert_eq!(args[0].as_str(), Some("42"));
        assert_eq!(args[1].as_str(), Some("1"));
    }

    #[test]
    fn escapes_reserved_characters() {
        let xml = encode_method_call("m", &[SampValue::string("a < b & c > d")]);
        let (_, args) = decode_method_call(&xml).unwrap();
        assert_eq!(args[0].as_str(), Some("a < b & c > d"));
    }
}

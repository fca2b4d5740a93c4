//! Deterministic, non-round-trippable diagnostic rendering.

use crate::value::SampValue;

/// Render a SAMP value as an indented multiline string for logs and error
/// messages. This is deliberately not JSON and not meant to be parsed back.
pub fn format_pretty(value: &SampValue, indent: usize) -> String {
    let mut out = String::new();
    write_pretty(value, indent, 0, &mut out);
    out
}

fn write_pretty(value: &SampValue, indent: usize, depth: usize, out: &mut String) {
    let pad = " ".repeat(indent * depth);
    match value {
        SampValue::String(s) => out.push_str(&format!("{pad}\"{s}\"")),
        SampValue::List(items) => {
            if items.is_empty() {
                out.push_str(&format!("{pad}[]"));
                return;
            }
            out.push_str(&format!("{pad}[\n"));
            for (i, item) in items.iter().enumerate() {
                write_pretty(item, indent, depth + 1, out);
                if i + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&format!("{pad}]"));
        }
        SampValue::Map(entries) => {
            if entries.is_empty() {
                out.push_str(&format!("{pad}{{}}"));
                return;
            }
            out.push_str(&format!("{pad}{{\n"));
            for (i, (k, v)) in entries.iter().enumerate() {
                let child_pad = " ".repeat(indent * (depth + 1));
                out.push_str(&format!("{child_pad}{k} ="));
                match v {
                    SampValue::String(_) => {
                        out.push(' ');
                        write_pretty(v, indent, 0, out);
                    }
                    _ => {
                        out.push('\n');
                        write_pretty(v, indent, depth + 2, out);
                    }
                }
                if i + 1 < entries.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&format!("{pad}}}"));
        }
    }
}

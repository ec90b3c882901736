//! Canonical JSON encoding for deterministic serialization.
//!
//! The canonical form is plain JSON text with these rules:
//! - Object keys sorted lexicographically (byte order), recursively
//! - Arrays keep element order
//! - No insignificant whitespace
//! - Strings use minimal JSON escaping
//! - Numbers render the way ECMAScript `Number#toString` does; non-finite
//!   numbers render as `null`
//!
//! The same bytes are hashed for the content hash and signed by the key
//! custodian, so signature validity and hash validity are defined over one
//! encoding.
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break every stored hash
//! and signature.

use std::fmt::Write as _;

use crate::crypto::Sha256Hash;
use crate::value::{CanonicalValue, Number};

/// Encode a value to its canonical string.
pub fn canonicalize(value: &CanonicalValue) -> String {
    let mut buf = String::new();
    encode_value(&mut buf, value);
    buf
}

/// Canonicalize a `serde_json::Value` (lowered through [`CanonicalValue`]).
pub fn canonicalize_json(value: &serde_json::Value) -> String {
    canonicalize(&CanonicalValue::from(value))
}

/// SHA-256 of a canonical string.
pub fn content_hash(canonical: &str) -> Sha256Hash {
    Sha256Hash::hash(canonical.as_bytes())
}

fn encode_value(buf: &mut String, value: &CanonicalValue) {
    match value {
        CanonicalValue::Null => buf.push_str("null"),
        CanonicalValue::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        CanonicalValue::Number(n) => encode_number(buf, n),
        CanonicalValue::String(s) => encode_string(buf, s),
        CanonicalValue::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                encode_value(buf, item);
            }
            buf.push(']');
        }
        CanonicalValue::Object(map) => {
            // BTreeMap iterates in key order already
            buf.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                encode_string(buf, key);
                buf.push(':');
                encode_value(buf, item);
            }
            buf.push('}');
        }
    }
}

fn encode_number(buf: &mut String, n: &Number) {
    match n {
        Number::Int(i) => {
            let _ = write!(buf, "{i}");
        }
        Number::UInt(u) => {
            let _ = write!(buf, "{u}");
        }
        Number::Float(f) => encode_float(buf, *f),
    }
}

/// Render a float with ECMAScript `Number#toString` layout.
///
/// Rust's `{:e}` gives the shortest round-trip digits; only the placement
/// of the decimal point and exponent differs between the two languages.
fn encode_float(buf: &mut String, f: f64) {
    if !f.is_finite() {
        buf.push_str("null");
        return;
    }
    if f == 0.0 {
        // covers -0
        buf.push('0');
        return;
    }
    if f < 0.0 {
        buf.push('-');
    }

    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exp + 1;

    if k <= n && n <= 21 {
        buf.push_str(&digits);
        buf.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        buf.push_str(int_part);
        buf.push('.');
        buf.push_str(frac_part);
    } else if -6 < n && n <= 0 {
        buf.push_str("0.");
        buf.extend(std::iter::repeat('0').take((-n) as usize));
        buf.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        buf.push_str(first);
        if !rest.is_empty() {
            buf.push('.');
            buf.push_str(rest);
        }
        let e = n - 1;
        let _ = write!(buf, "e{}{}", if e >= 0 { '+' } else { '-' }, e.abs());
    }
}

fn encode_string(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\u{08}' => buf.push_str("\\b"),
            '\u{0c}' => buf.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(buf, "\\u{:04x}", c as u32);
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
}

//! Response framing (§4.8).
//!
//! Turns a [`ResponseObject`] plus an optional codec selection into the raw
//! bytes of an HTTP/1.1 response: status line, fixed headers, merged content
//! headers, blank line, body. Callers write the result through
//! [`crate::transport::write_all_checked`] in bounded chunks themselves —
//! this module only builds the bytes.

use crate::codec::{Codec, CodecHooks};
use crate::error::SendError;
use crate::value::{ResponseObject, Value};

/// The largest single chunk a worker should pass to one `write` call, mirroring
/// the source's `2^31 - 1` byte ceiling per write.
pub const MAX_WRITE_CHUNK: usize = i32::MAX as usize;

/// Renders a full HTTP/1.1 response for `response` against `codec_hooks`.
///
/// `method_name` and `command_type` are forwarded to
/// [`CodecHooks::serialize_xml`] verbatim; JSON serialization ignores them.
/// `date` is the already-formatted RFC-1123 date string (so callers can
/// share one [`crate::date::DateService`] reading across every response).
pub fn render(
    response: &ResponseObject,
    codec: Codec,
    codec_hooks: &dyn CodecHooks,
    method_name: &str,
    command_type: &str,
    server_name: &str,
    date: &str,
) -> Result<Vec<u8>, SendError> {
    let (content_type, body) = if response.is_raw() {
        raw_body(response)?
    } else {
        codec_body(response, codec, codec_hooks, method_name, command_type)?
    };

    let mut out = Vec::with_capacity(body.len() + 256);
    out.extend_from_slice(b"HTTP/1.1 200 OK\r\n");
    push_header(&mut out, "Date", date);
    push_header(&mut out, "Vary", "Accept-Encoding");
    push_header(&mut out, "Connection", "close");
    push_header(&mut out, "Cache-Control", "no-store");
    push_header(&mut out, "Expires", date);
    push_header(&mut out, "Server", server_name);

    if let Some(content_type) = content_type {
        push_header(&mut out, "Content-Type", &content_type);
    }
    push_header(&mut out, "Content-Length", &body.len().to_string());

    if response.is_raw() {
        for (key, value) in response.header_entries() {
            if key == "Content-Type" {
                continue;
            }
            if let Some(text) = value_as_header_text(value) {
                push_header(&mut out, key, &text);
            }
        }
    }

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&body);
    Ok(out)
}

fn raw_body(response: &ResponseObject) -> Result<(Option<String>, Vec<u8>), SendError> {
    let content_type = response.get("Content-Type").and_then(Value::as_str);
    crate::ensure!(content_type.is_some(), SendError::invalid_response("raw-mode response's Content-Type is not a string"));

    let body = response.body_bytes().map(<[u8]>::to_vec).unwrap_or_default();
    Ok((content_type.map(str::to_owned), body))
}

fn codec_body(
    response: &ResponseObject,
    codec: Codec,
    codec_hooks: &dyn CodecHooks,
    method_name: &str,
    command_type: &str,
) -> Result<(Option<String>, Vec<u8>), SendError> {
    let body = match codec {
        Codec::Xml => codec_hooks.serialize_xml(method_name, response, command_type),
        Codec::Json => codec_hooks.serialize_json(response),
    }
    .ok_or_else(|| SendError::invalid_response("no codec available to serialize response"))?;

    Ok((Some(codec.response_content_type().to_owned()), body))
}

fn value_as_header_text(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Int(n) => Some(n.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn push_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// Renders the zero-length "miss" response the framer emits when neither a
/// static file nor a dispatch match was found (§4.9 step 4): `200 OK` with an
/// empty body, faithfully reproducing the source's non-404 miss behavior.
pub fn render_empty_miss(server_name: &str, date: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"HTTP/1.1 200 OK\r\n");
    push_header(&mut out, "Date", date);
    push_header(&mut out, "Vary", "Accept-Encoding");
    push_header(&mut out, "Connection", "close");
    push_header(&mut out, "Cache-Control", "no-store");
    push_header(&mut out, "Expires", date);
    push_header(&mut out, "Server", server_name);
    push_header(&mut out, "Content-Length", "0");
    out.extend_from_slice(b"\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::NullCodec;

    struct EchoCodec;
    impl CodecHooks for EchoCodec {
        fn serialize_json(&self, response: &ResponseObject) -> Option<Vec<u8>> {
            let body = response.get("message")?.as_str()?.to_owned();
            Some(format!("{{\"message\":\"{body}\"}}").into_bytes())
        }
    }

    #[test]
    fn codec_mode_sets_json_content_type_and_length() {
        let mut resp = ResponseObject::new();
        resp.insert("message", "hi");
        let out = render(&resp, Codec::Json, &EchoCodec, "echo", "Request", "rws/0.1", "Tue, 01 Jan 2030 00:00:00 GMT").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: application/json; charset=utf-8\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("{\"message\":\"hi\"}"));
    }

    #[test]
    fn raw_mode_emits_caller_headers_and_skips_codec() {
        let mut resp = ResponseObject::new();
        resp.insert("Content-Type", "text/html");
        resp.insert("X-Custom", "yes");
        resp.insert("body", Value::Bytes(b"<html/>".to_vec()));
        let out = render(&resp, Codec::Json, &NullCodec, "", "", "rws/0.1", "Tue, 01 Jan 2030 00:00:00 GMT").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Type: text/html\r\n"));
        assert!(text.contains("X-Custom: yes\r\n"));
        assert!(text.ends_with("<html/>"));
    }

    #[test]
    fn missing_codec_hook_is_a_send_error() {
        let resp = ResponseObject::new();
        let err = render(&resp, Codec::Xml, &NullCodec, "echo", "Request", "rws/0.1", "x").unwrap_err();
        assert!(matches!(err, SendError::InvalidResponse { .. }));
    }

    #[test]
    fn empty_miss_has_zero_length_body() {
        let out = render_empty_miss("rws/0.1", "x");
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("Content-Length: 0\r\n\r\n"));
    }
}

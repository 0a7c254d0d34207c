//! Per-connection worker logic (§4.2, §4.6, §4.7).

use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::ServerConfig;
use rws_http::codec::Codec;
use rws_http::header::find_header_terminator;
use rws_http::{static_file, ParsedHeader, RequestObject, ResponseObject};
use tracing::{info, warn};

use crate::config::{ListenerConfig, TransportMode};
use crate::context::ConnectionContext;

/// Per-read and per-body wall-clock budget (§4.2).
const READ_BUDGET: Duration = Duration::from_secs(3);
const READ_CHUNK: usize = 8192;

/// Owns one accepted connection end to end: handshake (if TLS), read,
/// parse, dispatch, respond, close. Never propagates an error upward beyond
/// a log line — the listener's accept loop treats this function as
/// infallible.
pub fn serve(stream: TcpStream, config: &ListenerConfig, tls_config: Option<Arc<ServerConfig>>, date_reader: rws_http::date::DateReader) {
    let mut transport = match &config.transport {
        TransportMode::Plain => rws_http::transport::Transport::Plain(stream),
        TransportMode::Tls { .. } => {
            let Some(tls_config) = tls_config else {
                warn!("TLS listener has no loaded server config; dropping connection");
                return;
            };
            match rws_http::tls::accept(tls_config, stream, rws_http::tls::DEFAULT_HANDSHAKE_TIMEOUT) {
                Ok(stream) => rws_http::transport::Transport::Tls(Box::new(stream)),
                Err(err) => {
                    warn!(cause = %err, "TLS handshake failed");
                    return;
                }
            }
        }
    };

    let Some((header, body)) = read_request(&mut transport) else {
        return;
    };

    let scheme = match config.transport {
        TransportMode::Plain => "http",
        TransportMode::Tls { .. } => "https",
    };

    let cookies = header
        .get_str("Cookie")
        .map(|raw| rws_http::cookie::parse_cookies(raw, header.get_str("Host").unwrap_or_default()))
        .unwrap_or_default();
    if let Some(hook) = &config.cookies_handler {
        hook(&cookies);
    }

    let ctx = ConnectionContext {
        root: config.root.clone(),
        server_name: config.server_name.clone(),
        scheme,
        dispatch: Arc::clone(&config.dispatch),
        redirect: config.redirect_snapshot(),
        header,
        cookies,
        body,
    };

    match ctx.header.command() {
        "GET" => handle_get(&mut transport, &ctx, config, &date_reader),
        "POST" => handle_post(&mut transport, &ctx, config, &date_reader),
        other => {
            info!(command = other, "unsupported method; closing without a reply");
        }
    }
}

/// Reads until the header terminator is found (and, if `Content-Length` is
/// present, until the body is fully buffered too), each phase under its own
/// fresh 3-second budget. Returns `None` on budget exhaustion with nothing
/// received, peer close with nothing received, or a malformed header.
fn read_request(transport: &mut rws_http::transport::Transport) -> Option<(ParsedHeader, Vec<u8>)> {
    let mut buf = Vec::new();
    fill_until(transport, &mut buf, READ_BUDGET, |buf| find_header_terminator(buf).is_some());
    if buf.is_empty() {
        return None;
    }
    let header_end = find_header_terminator(&buf)?;

    let header = rws_http::header::parse_header(&buf[..header_end])?;

    let content_length = header.content_length().ok().flatten().unwrap_or(0);
    if content_length > 0 {
        fill_until(transport, &mut buf, READ_BUDGET, |buf| buf.len() >= header_end + content_length);
    }

    let body = buf[header_end..(header_end + content_length).min(buf.len())].to_vec();
    Some((header, body))
}

/// Reads into `buf` in `READ_CHUNK`-sized pieces until `done(buf)` is `true`,
/// `budget` elapses, or the peer closes the connection.
fn fill_until(transport: &mut rws_http::transport::Transport, buf: &mut Vec<u8>, budget: Duration, done: impl Fn(&[u8]) -> bool) {
    let deadline = Instant::now() + budget;
    let mut chunk = [0u8; READ_CHUNK];

    while !done(buf) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        let _ = transport.set_read_timeout(Some(remaining));

        match transport.read(&mut chunk) {
            Ok(0) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(err) if matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => return,
            Err(_) => return,
        }
    }
}

/// §4.6.
fn handle_get(transport: &mut rws_http::transport::Transport, ctx: &ConnectionContext, config: &ListenerConfig, date_reader: &rws_http::date::DateReader) {
    if let Some(url) = rws_http::redirect::resolve_target(&ctx.redirect, &ctx.header, &ctx.body, true) {
        write_response(transport, rws_http::redirect::render_redirect_response(&url));
        return;
    }

    let location = ctx.header.location();
    if let Some((namespace, rest)) = location.trim_start_matches('/').split_once('/') {
        let (function, query) = rest.split_once('?').unwrap_or((rest, ""));
        if let Some(f) = ctx.dispatch.lookup(namespace, function) {
            let params = parse_get_params(query);
            if let Some(response) = f.call(ctx, &params) {
                respond(transport, ctx, config, &response, Codec::Json, date_reader);
                return;
            }
        }
    }

    serve_static(transport, ctx, config, date_reader);
}

/// Decodes `&`-separated `key=value` pairs and prefixes every key with
/// `GET:` so handlers can distinguish attacker-forgeable GET params from
/// POST body params (§4.6 step 2).
fn parse_get_params(query: &str) -> RequestObject {
    let mut params = RequestObject::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_decode(key);
        let value = percent_decode(value);
        params.insert(format!("GET:{key}"), value);
    }
    params
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or(""), 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// §4.7.
fn handle_post(transport: &mut rws_http::transport::Transport, ctx: &ConnectionContext, config: &ListenerConfig, date_reader: &rws_http::date::DateReader) {
    if let Some(url) = rws_http::redirect::resolve_target(&ctx.redirect, &ctx.header, &ctx.body, false) {
        write_response(transport, rws_http::redirect::render_redirect_response(&url));
        return;
    }

    let Some((namespace, function)) = resolve_soap_target(ctx) else {
        info!("POST request had no resolvable namespace/function; closing without a reply");
        return;
    };

    let codec = ctx.header.get_str("Content-Type").and_then(Codec::from_content_type);
    let params = codec.and_then(|c| decode_body(ctx, config, c));

    if let Some(params) = &params {
        if let Some(hook) = &config.request_object_handler {
            hook(params);
        }
    }

    let Some(f) = ctx.dispatch.lookup(&namespace, &function) else {
        info!(%namespace, %function, "no function registered; closing without a reply");
        return;
    };

    let params = params.unwrap_or_default();
    let Some(response) = f.call(ctx, &params) else {
        info!(%namespace, %function, "handler declined to respond; closing without a reply");
        return;
    };

    respond(transport, ctx, config, &response, codec.unwrap_or(Codec::Json), date_reader);
}

/// Prefers `SOAPAction: "{Host}/{namespace}/{function}"` (or its two-line
/// wrapped variant), falling back to parsing `_httpLocation` the way GET
/// does (§4.7 step 2).
fn resolve_soap_target(ctx: &ConnectionContext) -> Option<(String, String)> {
    if let Some(action) = ctx.header.get_str("SOAPAction") {
        let trimmed = action.trim().trim_matches('"');
        let rest = trimmed.strip_prefix(ctx.host()).unwrap_or(trimmed);
        // The header parser joins a wrapped quoted value with a single
        // space where the line break was (see `header::parse_header`), so
        // the namespace/function boundary can have a stray space around it.
        let rest = rest.trim_start_matches('/').replace(' ', "");
        if let Some((namespace, function)) = rest.rsplit_once('/') {
            if !namespace.is_empty() && !function.is_empty() {
                return Some((namespace.to_owned(), function.to_owned()));
            }
        }
    }

    let path = ctx.header.location().split('?').next().unwrap_or("");
    let path = path.trim_start_matches('/');
    let (namespace, function) = path.split_once('/')?;
    let function = function.rsplit('/').next().unwrap_or(function);
    if namespace.is_empty() || function.is_empty() {
        return None;
    }
    Some((namespace.to_owned(), function.to_owned()))
}

fn decode_body(ctx: &ConnectionContext, config: &ListenerConfig, codec: Codec) -> Option<RequestObject> {
    let text = std::str::from_utf8(&ctx.body).ok()?;
    match codec {
        Codec::Xml => config.codec_hooks.deserialize_xml(text),
        Codec::Json => config.codec_hooks.deserialize_json(text),
    }
}

fn respond(
    transport: &mut rws_http::transport::Transport,
    ctx: &ConnectionContext,
    config: &ListenerConfig,
    response: &ResponseObject,
    codec: Codec,
    date_reader: &rws_http::date::DateReader,
) {
    let date = date_reader.current();
    match rws_http::response::render(response, codec, config.codec_hooks.as_ref(), "", "Request", &ctx.server_name, &date) {
        Ok(bytes) => write_response(transport, bytes),
        Err(err) => warn!(cause = %err, "failed to render response"),
    }
}

fn serve_static(transport: &mut rws_http::transport::Transport, ctx: &ConnectionContext, _config: &ListenerConfig, date_reader: &rws_http::date::DateReader) {
    let raw_path = ctx.header.location().split('?').next().unwrap_or("");
    let namespace = raw_path.trim_start_matches('/').split('/').next().unwrap_or("");
    let path = percent_decode(raw_path);
    let date = date_reader.current();

    match static_file::resolve(&ctx.root, &path, ctx.scheme, ctx.host(), namespace) {
        static_file::StaticOutcome::Found { body, content_type } => {
            write_response(transport, raw_ok_response(&body, content_type, &ctx.server_name, &date));
        }
        static_file::StaticOutcome::RedirectToTrailingSlash { html_body } => {
            write_response(transport, raw_ok_response(&html_body, "text/html", &ctx.server_name, &date));
        }
        static_file::StaticOutcome::Miss => {
            write_response(transport, rws_http::response::render_empty_miss(&ctx.server_name, &date));
        }
    }
}

fn raw_ok_response(body: &[u8], content_type: &str, server_name: &str, date: &str) -> Vec<u8> {
    let mut response = ResponseObject::new();
    response.insert("Content-Type", content_type);
    response.insert("body", rws_http::Value::Bytes(body.to_vec()));
    rws_http::response::render(&response, Codec::Json, &rws_http::NullCodec, "", "", server_name, date).unwrap_or_default()
}

/// Writes `bytes` in chunks no larger than `i32::MAX`, matching the source's
/// atomic-write contract (§4.8); logs and aborts on a short write.
fn write_response(transport: &mut rws_http::transport::Transport, bytes: Vec<u8>) {
    for chunk in bytes.chunks(rws_http::response::MAX_WRITE_CHUNK) {
        if let Err(err) = rws_http::transport::write_all_checked(transport, chunk) {
            warn!(cause = %err, "write failed; aborting response");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_decode_handles_plus_and_escapes() {
        assert_eq!(percent_decode("hi+there%21"), "hi there!");
    }

    #[test]
    fn get_params_are_prefixed() {
        let params = parse_get_params("q=hi&empty");
        assert_eq!(params.get("GET:q").and_then(rws_http::Value::as_str), Some("hi"));
        assert_eq!(params.get("GET:empty").and_then(rws_http::Value::as_str), Some(""));
    }
}

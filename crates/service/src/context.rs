//! Per-connection state handed to dispatched functions (§3 "Connection Context").

use std::path::PathBuf;
use std::sync::Arc;

use rws_http::cookie::CookieMap;
use rws_http::redirect::RedirectConfig;
use rws_http::ParsedHeader;

use crate::dispatch::DispatchTable;

/// Everything a worker assembles once per connection and hands to the
/// dispatched function and the static-file/response-framing steps.
///
/// Every field here is either owned or an `Arc` clone, so the whole context
/// (and everything it reaches) is freed by ordinary `Drop` when the worker
/// returns — no explicit teardown step is needed.
pub struct ConnectionContext {
    pub root: PathBuf,
    pub server_name: String,
    pub scheme: &'static str,
    pub dispatch: Arc<DispatchTable>,
    pub redirect: RedirectConfig,
    pub header: ParsedHeader,
    pub cookies: CookieMap,
    pub body: Vec<u8>,
}

impl ConnectionContext {
    pub fn host(&self) -> &str {
        self.header.get_str("Host").unwrap_or("")
    }
}

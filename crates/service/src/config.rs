//! Listener configuration and its builder.
//!
//! Mirrors the teacher's `ServerBuilder`/`ServerBuildError` shape: a fluent
//! builder validated once at `build()`, returning a `thiserror` enum rather
//! than panicking on a missing required field.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use rws_http::redirect::RedirectConfig;
use rws_http::{CodecHooks, NullCodec};
use thiserror::Error;

use crate::dispatch::{DispatchTable, Namespace};

/// How a listener's socket is wrapped.
#[derive(Clone, Debug)]
pub enum TransportMode {
    Plain,
    Tls { cert_path: PathBuf, key_path: PathBuf },
}

/// A pre-invoke hook over a parsed request object, called before the
/// dispatched function runs (§6 "request_object_handler").
pub type RequestObjectHook = Arc<dyn Fn(&rws_http::RequestObject) + Send + Sync>;

/// A hook over the parsed cookie map, called once per connection when
/// cookies are present (§6 "cookies_handler"). The return value is ignored
/// by the core, matching the source's contract.
pub type CookiesHook = Arc<dyn Fn(&rws_http::cookie::CookieMap) + Send + Sync>;

/// Immutable-after-start configuration for one [`crate::listener::Listener`].
pub struct ListenerConfig {
    pub root: PathBuf,
    pub bind_addr: String,
    pub server_name: String,
    pub accept_retry_timeout: Duration,
    pub transport: TransportMode,
    /// Redirect settings, swappable at runtime without restarting the
    /// listener; a worker reads one snapshot of this at accept time and
    /// carries it for the life of the connection (§4.5).
    pub redirect: Arc<ArcSwapOption<RedirectConfig>>,
    pub dispatch: Arc<DispatchTable>,
    pub codec_hooks: Arc<dyn CodecHooks>,
    pub cookies_handler: Option<CookiesHook>,
    pub request_object_handler: Option<RequestObjectHook>,
}

impl std::fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("root", &self.root)
            .field("bind_addr", &self.bind_addr)
            .field("server_name", &self.server_name)
            .field("accept_retry_timeout", &self.accept_retry_timeout)
            .field("transport", &self.transport)
            .field("dispatch", &self.dispatch)
            .field("cookies_handler", &self.cookies_handler.is_some())
            .field("request_object_handler", &self.request_object_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl ListenerConfig {
    /// Replaces the live redirect configuration. Connections already in
    /// flight keep the snapshot they captured at accept time.
    pub fn set_redirect(&self, redirect: RedirectConfig) {
        self.redirect.store(Some(Arc::new(redirect)));
    }

    /// Snapshots the current redirect configuration for a newly accepted
    /// connection, defaulting to an unconfigured [`RedirectConfig`].
    pub fn redirect_snapshot(&self) -> RedirectConfig {
        self.redirect.load().as_deref().cloned().unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("root directory must be set")]
    MissingRoot,

    #[error("bind address must be set")]
    MissingBindAddr,

    #[error("TLS transport requires both a certificate and a key path")]
    IncompleteTlsMaterial,
}

/// Builder for [`ListenerConfig`].
pub struct ListenerConfigBuilder {
    root: Option<PathBuf>,
    bind_addr: Option<String>,
    server_name: String,
    accept_retry_timeout: Duration,
    transport: TransportMode,
    redirect: Option<RedirectConfig>,
    namespaces: Vec<Namespace>,
    codec_hooks: Arc<dyn CodecHooks>,
    cookies_handler: Option<CookiesHook>,
    request_object_handler: Option<RequestObjectHook>,
}

impl Default for ListenerConfigBuilder {
    fn default() -> Self {
        Self {
            root: None,
            bind_addr: None,
            server_name: "rws/0.1".to_owned(),
            accept_retry_timeout: Duration::ZERO,
            transport: TransportMode::Plain,
            redirect: None,
            namespaces: Vec::new(),
            codec_hooks: Arc::new(NullCodec),
            cookies_handler: None,
            request_object_handler: None,
        }
    }
}

impl ListenerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// `Duration::ZERO` retries binding forever.
    pub fn accept_retry_timeout(mut self, timeout: Duration) -> Self {
        self.accept_retry_timeout = timeout;
        self
    }

    pub fn tls(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        self.transport = TransportMode::Tls { cert_path: cert_path.into(), key_path: key_path.into() };
        self
    }

    pub fn redirect(mut self, redirect: RedirectConfig) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespaces.push(namespace);
        self
    }

    pub fn codec_hooks(mut self, hooks: Arc<dyn CodecHooks>) -> Self {
        self.codec_hooks = hooks;
        self
    }

    pub fn cookies_handler(mut self, hook: CookiesHook) -> Self {
        self.cookies_handler = Some(hook);
        self
    }

    pub fn request_object_handler(mut self, hook: RequestObjectHook) -> Self {
        self.request_object_handler = Some(hook);
        self
    }

    pub fn build(self) -> Result<ListenerConfig, ConfigError> {
        let root = self.root.ok_or(ConfigError::MissingRoot)?;
        let bind_addr = self.bind_addr.ok_or(ConfigError::MissingBindAddr)?;
        if let TransportMode::Tls { ref cert_path, ref key_path } = self.transport {
            if cert_path.as_os_str().is_empty() || key_path.as_os_str().is_empty() {
                return Err(ConfigError::IncompleteTlsMaterial);
            }
        }

        Ok(ListenerConfig {
            root,
            bind_addr,
            server_name: self.server_name,
            accept_retry_timeout: self.accept_retry_timeout,
            transport: self.transport,
            redirect: Arc::new(ArcSwapOption::new(self.redirect.map(Arc::new))),
            dispatch: Arc::new(DispatchTable::build(self.namespaces)),
            codec_hooks: self.codec_hooks,
            cookies_handler: self.cookies_handler,
            request_object_handler: self.request_object_handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_root_and_bind_addr() {
        let err = ListenerConfigBuilder::new().build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRoot));

        let err = ListenerConfigBuilder::new().root("/tmp").build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingBindAddr));
    }

    #[test]
    fn tls_without_both_paths_is_rejected() {
        let err = ListenerConfigBuilder::new().root("/tmp").bind_addr("127.0.0.1:0").tls("", "").build().unwrap_err();
        assert!(matches!(err, ConfigError::IncompleteTlsMaterial));
    }

    #[test]
    fn minimal_config_builds() {
        let config = ListenerConfigBuilder::new().root("/tmp").bind_addr("127.0.0.1:0").build().unwrap();
        assert_eq!(config.server_name, "rws/0.1");
    }
}

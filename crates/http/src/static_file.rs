//! Static-file resolution (§4.9).
//!
//! Given a percent-decoded request path, resolves it against a configured
//! root, rejecting traversal, falling back to `index.html` for directories,
//! and rewriting `<<TARGET_NAMESPACE>>` in served `.wsdl`/`.xsd` files so a
//! single static document can serve multiple namespace deployments.

use std::fs;
use std::path::{Path, PathBuf};

use crate::mime_resolver;

/// The outcome of a static-file lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticOutcome {
    /// File bytes plus the content type to serve them under.
    Found { body: Vec<u8>, content_type: &'static str },
    /// The request hit a directory without a trailing slash; send the
    /// client back with one so relative URLs inside the page resolve.
    RedirectToTrailingSlash { html_body: Vec<u8> },
    /// Neither the literal path nor its `index.html` fallback exists.
    Miss,
}

/// Resolves `request_path` (already percent-decoded, query string stripped)
/// against `root`. `host` and `namespace` are used only for the WSDL/XSD
/// `<<TARGET_NAMESPACE>>` substitution (step 7).
pub fn resolve(root: &Path, request_path: &str, scheme: &str, host: &str, namespace: &str) -> StaticOutcome {
    if request_path.contains("../") {
        tracing::warn!(%request_path, "rejected static-file request containing a traversal sequence");
        return StaticOutcome::Miss;
    }

    let ends_with_slash = request_path.ends_with('/');
    let primary = join_root(root, request_path, ends_with_slash);

    if let Ok(body) = fs::read(&primary) {
        let content_type = mime_resolver::resolve_path(&primary);
        let body = substitute_target_namespace(&primary, body, scheme, host, namespace);
        return StaticOutcome::Found { body, content_type };
    }

    let fallback = join_root(root, &format!("{}/index.html", request_path.trim_end_matches('/')), false);
    match fs::read(&fallback).ok() {
        Some(body) => {
            if ends_with_slash {
                let content_type = mime_resolver::resolve_path(&fallback);
                let body = substitute_target_namespace(&fallback, body, scheme, host, namespace);
                StaticOutcome::Found { body, content_type }
            } else {
                StaticOutcome::RedirectToTrailingSlash {
                    html_body: format!("<meta http-equiv=\"refresh\" content=\"0;URL='{request_path}/'\">").into_bytes(),
                }
            }
        }
        None => StaticOutcome::Miss,
    }
}

fn join_root(root: &Path, request_path: &str, ends_with_slash: bool) -> PathBuf {
    let suffix = request_path.trim_start_matches('/');
    let mut path = root.join(suffix);
    if ends_with_slash {
        path = root.join(format!("{}index.html", request_path.trim_start_matches('/')));
    }
    path
}

/// Replaces `<<TARGET_NAMESPACE>>` with the reconstructed service URL when
/// serving a `.wsdl` or `.xsd` file (§4.9 step 7).
fn substitute_target_namespace(path: &Path, body: Vec<u8>, scheme: &str, host: &str, namespace: &str) -> Vec<u8> {
    let is_wsdl_or_xsd = matches!(path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(), Some("wsdl") | Some("xsd"));
    if !is_wsdl_or_xsd {
        return body;
    }
    let Ok(text) = String::from_utf8(body.clone()) else { return body };
    let target_url = format!("{scheme}://{host}/{namespace}");
    text.replace("<<TARGET_NAMESPACE>>", &target_url).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, rel: &str, contents: &[u8]) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::File::create(path).unwrap().write_all(contents).unwrap();
    }

    #[test]
    fn serves_file_hit() {
        let dir = tempfile_dir();
        write_file(&dir, "index.html", b"Hello world!");
        let outcome = resolve(&dir, "/", "http", "127.0.0.1:8999", "");
        assert_eq!(outcome, StaticOutcome::Found { body: b"Hello world!".to_vec(), content_type: "text/html" });
    }

    #[test]
    fn missing_file_is_a_miss() {
        let dir = tempfile_dir();
        write_file(&dir, "index.html", b"Hello world!");
        let outcome = resolve(&dir, "/marklar", "http", "x", "");
        assert_eq!(outcome, StaticOutcome::Miss);
    }

    #[test]
    fn path_traversal_is_rejected() {
        let dir = tempfile_dir();
        let outcome = resolve(&dir, "/../etc/passwd", "http", "x", "");
        assert_eq!(outcome, StaticOutcome::Miss);
    }

    #[test]
    fn directory_without_trailing_slash_redirects() {
        let dir = tempfile_dir();
        write_file(&dir, "docs/index.html", b"doc page");
        let outcome = resolve(&dir, "/docs", "http", "x", "");
        match outcome {
            StaticOutcome::RedirectToTrailingSlash { html_body } => {
                assert!(String::from_utf8(html_body).unwrap().contains("URL='/docs/'"));
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn wsdl_gets_target_namespace_substituted() {
        let dir = tempfile_dir();
        write_file(&dir, "service.wsdl", b"<ns>targetNamespace=\"<<TARGET_NAMESPACE>>\"</ns>");
        let outcome = resolve(&dir, "/service.wsdl", "https", "example.com", "webService");
        match outcome {
            StaticOutcome::Found { body, .. } => {
                assert_eq!(String::from_utf8(body).unwrap(), "<ns>targetNamespace=\"https://example.com/webService\"</ns>");
            }
            other => panic!("expected found, got {other:?}"),
        }
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rws-static-test-{:?}", std::thread::current().id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }
}

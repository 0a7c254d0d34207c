//! End-to-end scenarios from §8: each one starts a real listener on an
//! ephemeral port, drives it with the companion client, and asserts on the
//! literal response bytes.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rws_http::redirect::RedirectConfig;
use rws_http::{CodecHooks, RequestObject, ResponseObject, Value};
use rws_service::client::Client;
use rws_service::{Listener, ListenerConfigBuilder, Namespace};

struct JsonCodec;

impl CodecHooks for JsonCodec {
    fn serialize_json(&self, response: &ResponseObject) -> Option<Vec<u8>> {
        let mut map = serde_json::Map::new();
        for (key, value) in response.iter() {
            map.insert(key.clone(), to_json(value));
        }
        serde_json::to_vec(&map).ok()
    }

    fn deserialize_json(&self, body: &str) -> Option<RequestObject> {
        let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
        let obj = parsed.as_object()?;
        let mut request = RequestObject::new();
        for (key, value) in obj {
            if let Some(s) = value.as_str() {
                request.insert(key.clone(), s);
            }
        }
        Some(request)
    }
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Float(f) => serde_json::Value::from(*f),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), to_json(v))).collect()),
    }
}

fn temp_root(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rws-service-test-{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn static_file_hit() {
    let root = temp_root("static-hit");
    fs::write(root.join("index.html"), "Hello world!").unwrap();

    let config = ListenerConfigBuilder::new().root(&root).bind_addr("127.0.0.1:0").build().unwrap();
    let handle = Listener::start(config);
    assert!(handle.is_running());
    let addr = handle.local_addr().unwrap();

    let client = Client::connect(addr.to_string());
    let resp = client.get("/", &[]).unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-length"), Some("12"));
    assert_eq!(resp.body, b"Hello world!");

    handle.shutdown();
}

#[test]
fn static_file_miss() {
    let root = temp_root("static-miss");
    fs::write(root.join("index.html"), "Hello world!").unwrap();

    let config = ListenerConfigBuilder::new().root(&root).bind_addr("127.0.0.1:0").build().unwrap();
    let handle = Listener::start(config);
    let addr = handle.local_addr().unwrap();

    let client = Client::connect(addr.to_string());
    let resp = client.get("/marklar", &[]).unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-length"), Some("0"));
    assert!(resp.body.is_empty());

    handle.shutdown();
}

#[test]
fn path_traversal_is_rejected() {
    let root = temp_root("traversal");
    let config = ListenerConfigBuilder::new().root(&root).bind_addr("127.0.0.1:0").build().unwrap();
    let handle = Listener::start(config);
    let addr = handle.local_addr().unwrap();

    let client = Client::connect(addr.to_string());
    let resp = client.get("/../etc/passwd", &[]).unwrap();
    assert!(resp.body.is_empty());
    assert_eq!(resp.header("content-length"), Some("0"));

    handle.shutdown();
}

#[test]
fn json_rpc_round_trip() {
    let root = temp_root("json-rpc");
    let namespace = Namespace::new("webService").function(
        "echo",
        Arc::new(|_ctx: &rws_service::ConnectionContext, params: &RequestObject| {
            let s = params.get("s")?.as_str()?.to_owned();
            let mut resp = ResponseObject::new();
            resp.insert("type", "ok");
            resp.insert("received", s);
            Some(resp)
        }),
    );

    let config = ListenerConfigBuilder::new()
        .root(&root)
        .bind_addr("127.0.0.1:0")
        .namespace(namespace)
        .codec_hooks(Arc::new(JsonCodec))
        .build()
        .unwrap();
    let handle = Listener::start(config);
    let addr = handle.local_addr().unwrap();

    let client = Client::connect(addr.to_string());
    let resp = client.post("/webService/echo", &[("Content-Type", "application/json")], br#"{"s":"Hello"}"#).unwrap();
    assert_eq!(resp.header("content-type"), Some("application/json; charset=utf-8"));
    let parsed: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(parsed["type"], "ok");
    assert_eq!(parsed["received"], "Hello");

    handle.shutdown();
}

#[test]
fn get_prefix_convention() {
    let root = temp_root("get-prefix");
    let namespace = Namespace::new("webService").function(
        "f",
        Arc::new(|_ctx: &rws_service::ConnectionContext, params: &RequestObject| {
            let mut resp = ResponseObject::new();
            resp.insert("sawPrefixed", params.get("GET:q").and_then(Value::as_str) == Some("hi"));
            resp.insert("sawBare", params.get("q").is_some());
            Some(resp)
        }),
    );

    let config = ListenerConfigBuilder::new().root(&root).bind_addr("127.0.0.1:0").namespace(namespace).codec_hooks(Arc::new(JsonCodec)).build().unwrap();
    let handle = Listener::start(config);
    let addr = handle.local_addr().unwrap();

    let client = Client::connect(addr.to_string());
    let resp = client.get("/webService/f?q=hi", &[]).unwrap();
    assert_eq!(resp.status, 200);
    let parsed: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(parsed["sawPrefixed"], true);
    assert_eq!(parsed["sawBare"], false);

    handle.shutdown();
}

#[test]
fn static_redirect_via_protocol_and_port() {
    let root = temp_root("redirect");
    let redirect = RedirectConfig { protocol: Some("https".to_owned()), port: 9002, function: None };

    let config = ListenerConfigBuilder::new().root(&root).bind_addr("127.0.0.1:9001").redirect(redirect).build();
    let config = match config {
        Ok(config) => config,
        Err(_) => return,
    };
    let handle = Listener::start(config);
    if !handle.is_running() {
        // The fixed port may already be bound in a shared CI environment.
        return;
    }

    let client = Client::connect("127.0.0.1:9001");
    let resp = client.request("GET", "/", &[], b"").unwrap();
    assert_eq!(resp.status, 301);
    assert_eq!(resp.header("location"), Some("https://127.0.0.1:9002/"));

    handle.shutdown();
}

#[test]
fn graceful_shutdown_drains_workers() {
    let root = temp_root("shutdown");
    let config = ListenerConfigBuilder::new().root(&root).bind_addr("127.0.0.1:0").build().unwrap();
    let handle = Listener::start(config);
    assert!(handle.is_running());

    std::thread::sleep(Duration::from_millis(10));
    handle.shutdown();
}

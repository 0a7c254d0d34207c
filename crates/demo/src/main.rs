//! Example binary wiring a JSON `echo` service onto a plaintext listener.

use std::sync::Arc;

use rws_http::{CodecHooks, RequestObject, ResponseObject, Value};
use rws_service::{ConnectionContext, Listener, ListenerConfigBuilder, Namespace};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

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
        let mut request = RequestObject::new();
        for (key, value) in parsed.as_object()? {
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

fn echo(_ctx: &ConnectionContext, params: &RequestObject) -> Option<ResponseObject> {
    let s = params.get("s")?.as_str()?.to_owned();
    let mut resp = ResponseObject::new();
    resp.insert("type", "ok");
    resp.insert("received", s);
    Some(resp)
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let root = std::env::temp_dir().join("rws-demo-root");
    std::fs::create_dir_all(&root).expect("failed to create demo root");
    std::fs::write(root.join("index.html"), "rws demo server").expect("failed to write demo index");

    let namespace = Namespace::new("webService").function("echo", Arc::new(echo));

    let config = ListenerConfigBuilder::new()
        .root(&root)
        .bind_addr("127.0.0.1:8999")
        .server_name("rws-demo/0.1")
        .namespace(namespace)
        .codec_hooks(Arc::new(JsonCodec))
        .build()
        .expect("invalid listener configuration");

    let handle = Listener::start(config);
    if !handle.is_running() {
        eprintln!("failed to bind 127.0.0.1:8999");
        return;
    }

    info!(addr = ?handle.local_addr(), "demo server running; Ctrl+C to stop");
    loop {
        std::thread::sleep(std::time::Duration::from_secs(3600));
    }
}

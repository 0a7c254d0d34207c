//! Namespace/function dispatch table (§4 component E).
//!
//! Built once at listener start from a declarative list of [`Namespace`]
//! descriptions and shared read-only by every worker thereafter — no lock
//! needed once it's wrapped in an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use rws_http::{RequestObject, ResponseObject};

use crate::context::ConnectionContext;

/// A registered remote-procedure function.
///
/// Returning `None` means "not this function" (§7): on POST this ends the
/// connection with no reply; on GET it falls through to the static-file
/// responder.
pub trait RpcFunction: Send + Sync {
    fn call(&self, ctx: &ConnectionContext, params: &RequestObject) -> Option<ResponseObject>;
}

impl<F> RpcFunction for F
where
    F: Fn(&ConnectionContext, &RequestObject) -> Option<ResponseObject> + Send + Sync,
{
    fn call(&self, ctx: &ConnectionContext, params: &RequestObject) -> Option<ResponseObject> {
        self(ctx, params)
    }
}

/// One namespace's declarative function list, consumed by
/// [`DispatchTable::build`].
pub struct Namespace {
    pub name: String,
    pub functions: Vec<(String, Arc<dyn RpcFunction>)>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), functions: Vec::new() }
    }

    pub fn function(mut self, name: impl Into<String>, f: Arc<dyn RpcFunction>) -> Self {
        self.functions.push((name.into(), f));
        self
    }
}

/// Two-level `namespace → function name → callable` mapping. Case-sensitive
/// keys, matching `HashMap`'s default.
#[derive(Default)]
pub struct DispatchTable {
    namespaces: HashMap<String, HashMap<String, Arc<dyn RpcFunction>>>,
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field(
                "namespaces",
                &self
                    .namespaces
                    .iter()
                    .map(|(name, fns)| (name.clone(), fns.keys().cloned().collect::<Vec<_>>()))
                    .collect::<HashMap<_, _>>(),
            )
            .finish()
    }
}

impl DispatchTable {
    pub fn build(namespaces: Vec<Namespace>) -> Self {
        let mut table = HashMap::new();
        for ns in namespaces {
            let functions = ns.functions.into_iter().collect();
            table.insert(ns.name, functions);
        }
        Self { namespaces: table }
    }

    pub fn lookup(&self, namespace: &str, function: &str) -> Option<&Arc<dyn RpcFunction>> {
        self.namespaces.get(namespace)?.get(function)
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rws_http::Value;

    fn echo(_ctx: &ConnectionContext, params: &RequestObject) -> Option<ResponseObject> {
        let s = params.get("s")?.as_str()?.to_owned();
        let mut resp = ResponseObject::new();
        resp.insert("received", Value::Str(s));
        Some(resp)
    }

    #[test]
    fn looks_up_registered_function() {
        let table = DispatchTable::build(vec![Namespace::new("webService").function("echo", Arc::new(echo))]);
        assert!(table.lookup("webService", "echo").is_some());
        assert!(table.lookup("webService", "missing").is_none());
        assert!(table.lookup("otherNs", "echo").is_none());
    }

    #[test]
    fn empty_table_has_no_namespaces() {
        let table = DispatchTable::build(vec![]);
        assert!(table.is_empty());
    }
}

//! The value model shared by request and response objects.
//!
//! The source library passes application data across the codec boundary
//! through a family of untyped containers carrying both a value pointer and
//! a runtime type descriptor (`TypeDescriptor`). This crate replaces that
//! with a single tagged union plus two newtypes (`RequestObject`,
//! `ResponseObject`) wrapping an ordered `BTreeMap<String, Value>` — ordered
//! by key, which is the only ordering the source's dictionary ever promised.

use std::collections::BTreeMap;

/// A single application value as handed across the [`crate::CodecHooks`] boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// Request parameters handed to a registered function.
///
/// Built by query/body deserialization before the function is invoked, and
/// consulted by [`crate::codec::CodecHooks::get_request_value`] accessors
/// during the call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestObject(BTreeMap<String, Value>);

/// The object a registered function returns.
///
/// Two modes, distinguished structurally rather than by a flag: if the map
/// contains a `"Content-Type"` entry it is raw mode (§4.8); otherwise it is
/// codec mode and gets serialized by whichever codec the request selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseObject(BTreeMap<String, Value>);

macro_rules! impl_dict_ops {
    ($name:ident) => {
        impl $name {
            pub fn new() -> Self {
                Self(BTreeMap::new())
            }

            pub fn get(&self, key: &str) -> Option<&Value> {
                self.0.get(key)
            }

            pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
                self.0.insert(key.into(), value.into());
                self
            }

            pub fn remove(&mut self, key: &str) -> Option<Value> {
                self.0.remove(key)
            }

            pub fn contains_key(&self, key: &str) -> bool {
                self.0.contains_key(key)
            }

            pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
                self.0.iter()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }
        }

        impl FromIterator<(String, Value)> for $name {
            fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
                Self(BTreeMap::from_iter(iter))
            }
        }
    };
}

impl_dict_ops!(RequestObject);
impl_dict_ops!(ResponseObject);

impl ResponseObject {
    /// `true` when this response carries its own `Content-Type` and should be
    /// emitted verbatim (raw mode) rather than run through a codec.
    pub fn is_raw(&self) -> bool {
        self.contains_key("Content-Type")
    }

    /// The raw body bytes, present only in raw mode.
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.get("body").and_then(Value::as_bytes)
    }

    /// Every header-shaped entry other than `body` itself, for raw mode.
    pub fn header_entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.iter().filter(|(k, _)| k.as_str() != "body")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_object_detects_raw_mode() {
        let mut resp = ResponseObject::new();
        resp.insert("Content-Type", "text/html");
        resp.insert("body", Value::Bytes(b"hi".to_vec()));
        assert!(resp.is_raw());
        assert_eq!(resp.body_bytes(), Some(&b"hi"[..]));
        assert_eq!(resp.header_entries().count(), 1);
    }

    #[test]
    fn response_object_codec_mode_by_default() {
        let mut resp = ResponseObject::new();
        resp.insert("received", "hello");
        assert!(!resp.is_raw());
    }
}

//! The pluggable codec-hook contract.
//!
//! The source treats XML/JSON (de)serialization as an external collaborator:
//! the core only holds function references and calls through them. This
//! crate models that as a single object-safe trait rather than four loose
//! function pointers, so a host can't register an encode half without its
//! matching decode half — the "codec hooks must be pair-complete" invariant
//! from the data model becomes a property of the trait's shape instead of a
//! runtime check.

use crate::value::{RequestObject, ResponseObject};

/// Converts between wire bytes and [`RequestObject`]/[`ResponseObject`]
/// values for one or both of the XML (SOAP) and JSON wire formats.
///
/// A host that only wants JSON can leave the XML methods at their default
/// (`None`/no-op) implementations; the dispatcher falls back to "no codec
/// available for this content type" behavior (§4.7 step 3) in that case.
pub trait CodecHooks: Send + Sync {
    /// Serializes a response for the SOAP/XML wire format.
    fn serialize_xml(&self, _method_name: &str, _response: &ResponseObject, _command_type: &str) -> Option<Vec<u8>> {
        None
    }

    /// Parses an XML request body into a [`RequestObject`].
    fn deserialize_xml(&self, _body: &str) -> Option<RequestObject> {
        None
    }

    /// Serializes a response for the JSON wire format.
    fn serialize_json(&self, _response: &ResponseObject) -> Option<Vec<u8>> {
        None
    }

    /// Parses a JSON request body into a [`RequestObject`].
    fn deserialize_json(&self, _body: &str) -> Option<RequestObject> {
        None
    }
}

/// A [`CodecHooks`] implementation that serializes/deserializes nothing.
///
/// Useful as a default for listeners that only ever serve static files or
/// raw-mode responses and never need a codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCodec;

impl CodecHooks for NullCodec {}

/// Which wire format a request selected, resolved from `Content-Type` per §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Xml,
    Json,
}

impl Codec {
    /// Resolves the codec from a request's `Content-Type` header value.
    ///
    /// `text/xml` or any value containing `soap` selects XML; `application/json`
    /// selects JSON; anything else has no codec (§4.7 step 3, §7 "unknown content type").
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let lower = content_type.to_ascii_lowercase();
        if lower.contains("soap") || lower.starts_with("text/xml") {
            Some(Codec::Xml)
        } else if lower.starts_with("application/json") {
            Some(Codec::Json)
        } else {
            None
        }
    }

    /// The `Content-Type` value the framer sets for a codec-mode response (§4.8).
    pub fn response_content_type(self) -> &'static str {
        match self {
            Codec::Xml => "application/soap+xml; charset=utf-8",
            Codec::Json => "application/json; charset=utf-8",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_json_content_type() {
        assert_eq!(Codec::from_content_type("application/json"), Some(Codec::Json));
        assert_eq!(Codec::from_content_type("application/json; charset=utf-8"), Some(Codec::Json));
    }

    #[test]
    fn resolves_xml_content_type() {
        assert_eq!(Codec::from_content_type("text/xml"), Some(Codec::Xml));
        assert_eq!(Codec::from_content_type("application/soap+xml"), Some(Codec::Xml));
    }

    #[test]
    fn unknown_content_type_has_no_codec() {
        assert_eq!(Codec::from_content_type("text/plain"), None);
    }

    #[test]
    fn null_codec_encodes_nothing() {
        let codec = NullCodec;
        assert!(codec.serialize_json(&ResponseObject::new()).is_none());
        assert!(codec.deserialize_xml("<a/>").is_none());
    }
}

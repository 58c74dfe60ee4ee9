//! Request and response body formats.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Body encoding used on the wire.
///
/// `Json` is the textual form; `Cbor` is the binary-tagged form. Revisions
/// are strings in both and decode to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// `application/json`.
    #[default]
    Json,
    /// `application/cbor`.
    Cbor,
}

impl WireFormat {
    /// Returns the MIME type for this format.
    pub fn content_type(self) -> &'static str {
        match self {
            WireFormat::Json => "application/json",
            WireFormat::Cbor => "application/cbor",
        }
    }

    /// Maps a `Content-Type` header value to a format, ignoring parameters.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let mime = value.split(';').next().unwrap_or_default().trim();
        if mime.eq_ignore_ascii_case("application/json") {
            Some(WireFormat::Json)
        } else if mime.eq_ignore_ascii_case("application/cbor") {
            Some(WireFormat::Cbor)
        } else {
            None
        }
    }

    /// Serializes a value into a body.
    pub fn to_vec<T: Serialize + ?Sized>(self, value: &T) -> CodecResult<Vec<u8>> {
        match self {
            WireFormat::Json => {
                serde_json::to_vec(value).map_err(|e| CodecError::encoding_failed(e.to_string()))
            }
            WireFormat::Cbor => {
                let mut buf = Vec::new();
                ciborium::ser::into_writer(value, &mut buf)
                    .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
                Ok(buf)
            }
        }
    }

    /// Deserializes a body.
    pub fn from_slice<T: DeserializeOwned>(self, bytes: &[u8]) -> CodecResult<T> {
        match self {
            WireFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
            }
            WireFormat::Cbor => ciborium::de::from_reader(bytes)
                .map_err(|e| CodecError::decoding_failed(e.to_string())),
        }
    }

    /// Splits an array body into one independently decodable body per element.
    pub fn split_array(self, bytes: &[u8]) -> CodecResult<Vec<Vec<u8>>> {
        match self {
            WireFormat::Json => self
                .from_slice::<Vec<serde_json::Value>>(bytes)?
                .iter()
                .map(|element| self.to_vec(element))
                .collect(),
            WireFormat::Cbor => self
                .from_slice::<Vec<ciborium::Value>>(bytes)?
                .iter()
                .map(|element| self.to_vec(element))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RevisionId;

    #[test]
    fn content_type_mapping() {
        assert_eq!(
            WireFormat::from_content_type("application/json; charset=utf-8"),
            Some(WireFormat::Json)
        );
        assert_eq!(
            WireFormat::from_content_type("Application/CBOR"),
            Some(WireFormat::Cbor)
        );
        assert_eq!(WireFormat::from_content_type("text/plain"), None);
        assert_eq!(WireFormat::default().content_type(), "application/json");
    }

    #[test]
    fn revisions_survive_both_formats() {
        let revisions = vec![RevisionId::new(1), RevisionId::new(4096), RevisionId::ZERO];
        for format in [WireFormat::Json, WireFormat::Cbor] {
            let body = format.to_vec(&revisions).unwrap();
            let decoded: Vec<RevisionId> = format.from_slice(&body).unwrap();
            assert_eq!(decoded, revisions);
        }
    }

    #[test]
    fn split_array_keeps_order() {
        for format in [WireFormat::Json, WireFormat::Cbor] {
            let body = format
                .to_vec(&serde_json::json!([{"n": 1}, {"n": 2}, "x"]))
                .unwrap();
            let parts = format.split_array(&body).unwrap();
            assert_eq!(parts.len(), 3);
            let first: serde_json::Value = format.from_slice(&parts[0]).unwrap();
            assert_eq!(first["n"], 1);
            let last: String = format.from_slice(&parts[2]).unwrap();
            assert_eq!(last, "x");
        }
    }

    #[test]
    fn split_array_rejects_objects() {
        let body = WireFormat::Json.to_vec(&serde_json::json!({"n": 1})).unwrap();
        assert!(WireFormat::Json.split_array(&body).is_err());
    }

    #[test]
    fn truncated_body_is_an_error() {
        let err = WireFormat::Json
            .from_slice::<Vec<RevisionId>>(b"[\"_\"")
            .unwrap_err();
        assert!(matches!(err, CodecError::DecodingFailed { .. }));

        let err = WireFormat::Cbor
            .from_slice::<Vec<RevisionId>>(&[0x82, 0x61])
            .unwrap_err();
        assert!(matches!(err, CodecError::DecodingFailed { .. }));
    }
}

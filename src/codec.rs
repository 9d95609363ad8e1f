//! Payload serialization.
//!
//! The engine treats payloads as opaque bytes; an [`ObjectCodec`] supplied at
//! open time translates between caller values and those bytes. Codecs must be
//! pure: encoding a value and decoding the result yields an equal value, and
//! neither direction may depend on store state.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Translates values to and from their on-disk byte representation.
pub trait ObjectCodec {
    /// The value type this codec handles.
    type Value;

    /// Appends the encoded form of `value` to `dst`.
    fn encode(&self, value: &Self::Value, dst: &mut Vec<u8>) -> Result<()>;

    /// Decodes a value from the exact bytes previously produced by
    /// [`encode`](Self::encode).
    fn decode(&self, src: &[u8]) -> Result<Self::Value>;
}

/// Identity codec for raw byte payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl ObjectCodec for BytesCodec {
    type Value = Vec<u8>;

    fn encode(&self, value: &Vec<u8>, dst: &mut Vec<u8>) -> Result<()> {
        dst.extend_from_slice(value);
        Ok(())
    }

    fn decode(&self, src: &[u8]) -> Result<Vec<u8>> {
        Ok(src.to_vec())
    }
}

/// UTF-8 string codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl ObjectCodec for StringCodec {
    type Value = String;

    fn encode(&self, value: &String, dst: &mut Vec<u8>) -> Result<()> {
        dst.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn decode(&self, src: &[u8]) -> Result<String> {
        String::from_utf8(src.to_vec())
            .map_err(|e| StoreError::Codec(format!("invalid UTF-8 payload: {e}")))
    }
}

/// JSON codec for any serde-serializable type.
#[derive(Debug)]
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> ObjectCodec for JsonCodec<T> {
    type Value = T;

    fn encode(&self, value: &T, dst: &mut Vec<u8>) -> Result<()> {
        serde_json::to_writer(&mut *dst, value)
            .map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn decode(&self, src: &[u8]) -> Result<T> {
        serde_json::from_slice(src).map_err(|e| StoreError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[test]
    fn bytes_codec_is_identity() {
        let codec = BytesCodec;
        let payload = vec![0x01, 0x02, 0x03];
        let mut dst = Vec::new();
        codec.encode(&payload, &mut dst).unwrap();
        assert_eq!(dst, payload);
        assert_eq!(codec.decode(&dst).unwrap(), payload);
    }

    #[test]
    fn string_codec_round_trips() {
        let codec = StringCodec;
        let mut dst = Vec::new();
        codec.encode(&"grüße".to_string(), &mut dst).unwrap();
        assert_eq!(codec.decode(&dst).unwrap(), "grüße");
    }

    #[test]
    fn string_codec_rejects_invalid_utf8() {
        let err = StringCodec.decode(&[0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
    }

    #[test]
    fn encode_appends_to_existing_bytes() {
        let mut dst = vec![0xAA];
        StringCodec.encode(&"b".to_string(), &mut dst).unwrap();
        assert_eq!(dst, vec![0xAA, b'b']);
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        given_name: String,
        mail: String,
    }

    #[test]
    fn json_codec_round_trips_structs() {
        let codec = JsonCodec::<Person>::new();
        let person = Person {
            given_name: "max".into(),
            mail: "max@domain.com".into(),
        };
        let mut dst = Vec::new();
        codec.encode(&person, &mut dst).unwrap();
        assert_eq!(codec.decode(&dst).unwrap(), person);
    }

    #[test]
    fn json_codec_surfaces_decode_failures() {
        let codec = JsonCodec::<Person>::new();
        let err = codec.decode(b"{\"given_name\":").unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
    }
}

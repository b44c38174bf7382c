//! Marshal / Unmarshal Strategies
//!
//! Values are turned into bytes by an explicit strategy object chosen at the
//! call site. [`Json`] is the default used by `Cache::set` / `Cache::get`,
//! [`Raw`] passes byte buffers through untouched and [`FnCodec`] wraps a
//! caller-supplied encode/decode pair.

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Turns a value into bytes
pub trait Marshaler<T: ?Sized> {
    /// Encode `value`
    fn marshal(&self, value: &T) -> Result<Vec<u8>>;
}

/// Rebuilds a value from bytes
pub trait Unmarshaler<T> {
    /// Decode `data`
    fn unmarshal(&self, data: &[u8]) -> Result<T>;
}

// =============================================================================
// JSON
// =============================================================================

/// Generic structured serializer (serde_json)
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl<T: Serialize + ?Sized> Marshaler<T> for Json {
    fn marshal(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }
}

impl<T: DeserializeOwned> Unmarshaler<T> for Json {
    fn unmarshal(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

// =============================================================================
// Raw bytes
// =============================================================================

/// Byte buffer passthrough
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl Marshaler<[u8]> for Raw {
    fn marshal(&self, value: &[u8]) -> Result<Vec<u8>> {
        Ok(value.to_vec())
    }
}

impl Marshaler<Vec<u8>> for Raw {
    fn marshal(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }
}

impl Marshaler<Bytes> for Raw {
    fn marshal(&self, value: &Bytes) -> Result<Vec<u8>> {
        Ok(value.to_vec())
    }
}

impl Unmarshaler<Vec<u8>> for Raw {
    fn unmarshal(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

impl Unmarshaler<Bytes> for Raw {
    fn unmarshal(&self, data: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(data))
    }
}

// =============================================================================
// Function pair
// =============================================================================

/// Custom encoding from an encode/decode function pair
pub struct FnCodec<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnCodec<E, D> {
    /// Create a codec from the given functions
    pub fn new(encode: E, decode: D) -> Self {
        Self { encode, decode }
    }
}

impl<T, E, D> Marshaler<T> for FnCodec<E, D>
where
    E: Fn(&T) -> Result<Vec<u8>>,
{
    fn marshal(&self, value: &T) -> Result<Vec<u8>> {
        (self.encode)(value)
    }
}

impl<T, E, D> Unmarshaler<T> for FnCodec<E, D>
where
    D: Fn(&[u8]) -> Result<T>,
{
    fn unmarshal(&self, data: &[u8]) -> Result<T> {
        (self.decode)(data)
    }
}

impl<E, D> std::fmt::Debug for FnCodec<E, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCodec").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Data {
        name: String,
        count: u32,
    }

    #[test]
    fn test_json_roundtrip() {
        let data = Data {
            name: "tree".into(),
            count: 3,
        };
        let buf = Json.marshal(&data).unwrap();
        assert_eq!(buf, br#"{"name":"tree","count":3}"#);

        let decoded: Data = Json.unmarshal(&buf).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_json_unmarshal_error() {
        let result: Result<Data> = Json.unmarshal(b"not json");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_raw_passthrough() {
        let data = b"\x00\x01binary".to_vec();
        assert_eq!(Raw.marshal(&data).unwrap(), data);
        assert_eq!(Raw.marshal(data.as_slice()).unwrap(), data);

        let bytes: Bytes = Raw.unmarshal(&data).unwrap();
        assert_eq!(bytes.as_ref(), data.as_slice());
    }

    #[test]
    fn test_fn_codec() {
        let codec = FnCodec::new(
            |v: &u32| -> Result<Vec<u8>> { Ok(v.to_le_bytes().to_vec()) },
            |data: &[u8]| -> Result<u32> {
                let raw: [u8; 4] = data
                    .try_into()
                    .map_err(|_| Error::Marshal(format!("expected 4 bytes, got {}", data.len())))?;
                Ok(u32::from_le_bytes(raw))
            },
        );

        let buf = codec.marshal(&0xdead_beef_u32).unwrap();
        assert_eq!(buf.len(), 4);
        let value: u32 = codec.unmarshal(&buf).unwrap();
        assert_eq!(value, 0xdead_beef);

        let err = Unmarshaler::<u32>::unmarshal(&codec, b"xy").unwrap_err();
        assert!(err.is_codec());
    }
}

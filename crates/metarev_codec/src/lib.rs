//! # metarev codec
//!
//! Metadata value type and CBOR encoding for metarev.
//!
//! Every metadata key holds an ordered sequence of [`Value`]s. Values are
//! persisted as CBOR through `ciborium`; the same bytes feed snapshot
//! fingerprints, so encoding is deterministic for a given value (map pair
//! order is part of the value).
//!
//! ## Usage
//!
//! ```
//! use metarev_codec::{decode_value, encode_value, Value};
//!
//! let value = Value::array(["img1", "img1", "img2"]);
//! let bytes = encode_value(&value).unwrap();
//! assert_eq!(decode_value(&bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod encoding;
mod error;
mod value;

pub use encoding::{decode_value, encode_value};
pub use error::{CodecError, CodecResult};
pub use value::Value;

/// Trait for types that can be encoded to CBOR.
pub trait Encode {
    /// Encode this value to CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from CBOR.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        encode_value(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        decode_value(bytes)
    }
}

impl Encode for [Value] {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        encode_value(&Value::Array(self.to_vec()))
    }
}

impl Decode for Vec<Value> {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        match decode_value(bytes)? {
            Value::Array(items) => Ok(items),
            _ => Err(CodecError::unexpected_shape("array of values")),
        }
    }
}

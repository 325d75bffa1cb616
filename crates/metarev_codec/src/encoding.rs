//! CBOR encoding for metadata values.
//!
//! Values are converted to `ciborium`'s value tree and written with its
//! serializer. Decoding goes the other way and rejects the CBOR items that
//! have no metadata equivalent (floats, tags, out-of-range integers).

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use ciborium::value::{Integer, Value as Cbor};

/// Encode a value to CBOR bytes.
///
/// # Errors
///
/// Returns an error if the CBOR writer fails.
pub fn encode_value(value: &Value) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::ser::into_writer(&to_cbor(value), &mut buffer)
        .map_err(|e| CodecError::encoding_failed(format!("{e:?}")))?;
    Ok(buffer)
}

/// Decode a value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR or contain items that
/// cannot be represented as a [`Value`].
pub fn decode_value(bytes: &[u8]) -> CodecResult<Value> {
    let cbor: Cbor = ciborium::de::from_reader(bytes)
        .map_err(|e| CodecError::decoding_failed(format!("{e:?}")))?;
    from_cbor(cbor)
}

fn to_cbor(value: &Value) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Integer(n) => Cbor::Integer(Integer::from(*n)),
        Value::Bytes(b) => Cbor::Bytes(b.clone()),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Array(items) => Cbor::Array(items.iter().map(to_cbor).collect()),
        Value::Map(pairs) => Cbor::Map(
            pairs
                .iter()
                .map(|(k, v)| (to_cbor(k), to_cbor(v)))
                .collect(),
        ),
    }
}

fn from_cbor(cbor: Cbor) -> CodecResult<Value> {
    Ok(match cbor {
        Cbor::Null => Value::Null,
        Cbor::Bool(b) => Value::Bool(b),
        Cbor::Integer(n) => {
            Value::Integer(i64::try_from(n).map_err(|_| CodecError::IntegerOverflow)?)
        }
        Cbor::Bytes(b) => Value::Bytes(b),
        Cbor::Text(s) => Value::Text(s),
        Cbor::Float(_) => return Err(CodecError::FloatForbidden),
        Cbor::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_cbor)
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        Cbor::Map(pairs) => Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| Ok((from_cbor(k)?, from_cbor(v)?)))
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        Cbor::Tag(tag, _) => return Err(CodecError::unsupported_type(format!("tag {tag}"))),
        _ => return Err(CodecError::unsupported_type("unknown item")),
    })
}

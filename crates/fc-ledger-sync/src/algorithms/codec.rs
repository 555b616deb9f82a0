//! # Account Codec
//!
//! Discriminator-checked decoding of raw account buffers.
//!
//! Checks run in a fixed order: discriminator, then exact size, then the
//! field bytes. A buffer shorter than the discriminator cannot carry the
//! tag and is reported as a discriminator mismatch.

use crate::domain::{AccountRecord, CodecError, DISCRIMINATOR_LEN};

/// Outcome of classifying a buffer against one record kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded<T> {
    /// Buffer is a valid `T`.
    Record(T),
    /// Tag belongs to some other record kind.
    NotThisKind,
    /// Tag matches but the length is wrong.
    SizeMismatch {
        /// Fixed record size.
        expected: usize,
        /// Buffer length.
        actual: usize,
    },
    /// Tag and length match but a field is unreadable.
    Malformed(String),
}

/// Decode `buf` as `T`.
pub fn decode<T: AccountRecord>(buf: &[u8]) -> Result<T, CodecError> {
    if buf.len() < DISCRIMINATOR_LEN || buf[..DISCRIMINATOR_LEN] != T::DISCRIMINATOR {
        return Err(CodecError::DiscriminatorMismatch { kind: T::KIND });
    }
    if buf.len() != T::SIZE {
        return Err(CodecError::SizeMismatch {
            kind: T::KIND,
            expected: T::SIZE,
            actual: buf.len(),
        });
    }
    bincode::deserialize(&buf[DISCRIMINATOR_LEN..]).map_err(|e| CodecError::Malformed {
        kind: T::KIND,
        reason: e.to_string(),
    })
}

/// Classify `buf` without treating a foreign kind as an error.
pub fn classify<T: AccountRecord>(buf: &[u8]) -> Decoded<T> {
    match decode::<T>(buf) {
        Ok(record) => Decoded::Record(record),
        Err(CodecError::DiscriminatorMismatch { .. }) => Decoded::NotThisKind,
        Err(CodecError::SizeMismatch {
            expected, actual, ..
        }) => Decoded::SizeMismatch { expected, actual },
        Err(CodecError::Malformed { reason, .. }) => Decoded::Malformed(reason),
    }
}

/// Encode `record` with its discriminator.
pub fn encode<T: AccountRecord>(record: &T) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(T::SIZE);
    out.extend_from_slice(&T::DISCRIMINATOR);
    bincode::serialize_into(&mut out, record).map_err(|e| CodecError::Malformed {
        kind: T::KIND,
        reason: e.to_string(),
    })?;
    if out.len() != T::SIZE {
        return Err(CodecError::SizeMismatch {
            kind: T::KIND,
            expected: T::SIZE,
            actual: out.len(),
        });
    }
    Ok(out)
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed-width opaque identifiers for participants and endpoints.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GraphError;

/// Storage width of a [`Gid`] in bytes.
pub const GID_STORAGE_SIZE: usize = 24;

/// Opaque global identifier of a participant or endpoint.
///
/// A `Gid` is never interpreted: equality and ordering are plain byte
/// comparisons. Participant and endpoint ids share this representation but the
/// cache never compares one category against the other.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Gid(pub [u8; GID_STORAGE_SIZE]);

impl Gid {
    /// Build a gid from exactly [`GID_STORAGE_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidGidLength`] for any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, GraphError> {
        let data: [u8; GID_STORAGE_SIZE] = bytes
            .try_into()
            .map_err(|_| GraphError::InvalidGidLength { len: bytes.len() })?;
        Ok(Self(data))
    }

    /// Build a gid from a shorter prefix, zero-filling the remaining bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidGidLength`] when `prefix` is longer than
    /// [`GID_STORAGE_SIZE`].
    pub fn from_prefix(prefix: &[u8]) -> Result<Self, GraphError> {
        if prefix.len() > GID_STORAGE_SIZE {
            return Err(GraphError::InvalidGidLength { len: prefix.len() });
        }
        let mut data = [0u8; GID_STORAGE_SIZE];
        data[..prefix.len()].copy_from_slice(prefix);
        Ok(Self(data))
    }

    /// View the gid as a byte array.
    pub fn as_bytes(&self) -> &[u8; GID_STORAGE_SIZE] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Gid {
    type Error = GraphError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

impl From<[u8; GID_STORAGE_SIZE]> for Gid {
    fn from(data: [u8; GID_STORAGE_SIZE]) -> Self {
        Self(data)
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gid({self})")
    }
}

// Encoded as a byte string so peers see a compact, length-checked field.
impl Serialize for Gid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

struct GidVisitor;

impl<'de> Visitor<'de> for GidVisitor {
    type Value = Gid;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a byte string of exactly {GID_STORAGE_SIZE} bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Gid, E> {
        Gid::from_slice(v).map_err(|_| E::invalid_length(v.len(), &self))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Gid, E> {
        self.visit_bytes(&v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Gid, A::Error> {
        let mut data = [0u8; GID_STORAGE_SIZE];
        let mut len = 0usize;
        while let Some(byte) = seq.next_element::<u8>()? {
            if len == GID_STORAGE_SIZE {
                return Err(de::Error::invalid_length(len + 1, &self));
            }
            data[len] = byte;
            len += 1;
        }
        if len != GID_STORAGE_SIZE {
            return Err(de::Error::invalid_length(len, &self));
        }
        Ok(Gid(data))
    }
}

impl<'de> Deserialize<'de> for Gid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(GidVisitor)
    }
}

use super::error::CryptoError;
use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

pub const ADDRESS_SIZE: usize = 32;

// Account address, derived from the account public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    // Copy of this address with `index` written big endian in the first 8 bytes
    // Used to derive a distinct destination per generated transaction
    pub fn with_index(&self, index: u64) -> Self {
        let mut bytes = self.0;
        bytes[..8].copy_from_slice(&index.to_be_bytes());
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let len = bytes.len();
        let bytes: [u8; ADDRESS_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidAddressLength {
                len,
                expected: ADDRESS_SIZE,
            })?;
        Ok(Self(bytes))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serializer for Address {
    fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self(reader.read_bytes_32()?))
    }

    fn size(&self) -> usize {
        ADDRESS_SIZE
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(SerdeError::custom)
    }
}

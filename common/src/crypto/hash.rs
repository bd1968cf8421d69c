use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use blake3::hash as blake3_hash;
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    convert::TryInto,
    fmt::{Display, Error, Formatter},
    hash::Hasher,
    str::FromStr,
};

pub const HASH_SIZE: usize = 32; // 32 bytes / 256 bits

#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Debug)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    pub const fn zero() -> Self {
        Hash::new([0; HASH_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Hash {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| "Invalid hex string")?;
        let bytes: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| "Invalid hash")?;
        Ok(Hash::new(bytes))
    }
}

// Hash a byte array using the blake3 algorithm
#[inline(always)]
pub fn hash(value: &[u8]) -> Hash {
    let result: [u8; HASH_SIZE] = blake3_hash(value).into();
    Hash(result)
}

impl Serializer for Hash {
    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_hash()
    }

    fn write(&self, writer: &mut Writer) {
        writer.write_hash(self);
    }

    fn size(&self) -> usize {
        HASH_SIZE
    }
}

impl std::hash::Hash for Hash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", &self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let hex = String::deserialize(deserializer)?;
        if hex.len() != HASH_SIZE * 2 {
            return Err(SerdeError::custom("Invalid hex length"));
        }

        let decoded_hex = hex::decode(hex).map_err(SerdeError::custom)?;
        let bytes: [u8; HASH_SIZE] = decoded_hex
            .try_into()
            .map_err(|_| SerdeError::custom("Could not transform hex to bytes array for Hash"))?;
        Ok(Hash::new(bytes))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash(b"txbench"), hash(b"txbench"));
        assert_ne!(hash(b"txbench"), hash(b"txbench!"));
    }

    #[test]
    fn test_hex_parsing() {
        let value = hash(b"payload");
        let parsed: Hash = value.to_hex().parse().unwrap();
        assert_eq!(parsed, value);
        assert!("abcd".parse::<Hash>().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let value = Hash::zero();
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, format!("\"{}\"", "00".repeat(HASH_SIZE)));

        let decoded: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, value);
        assert!(serde_json::from_str::<Hash>("\"00\"").is_err());
    }
}

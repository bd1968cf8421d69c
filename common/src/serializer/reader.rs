use crate::crypto::{Hash, HASH_SIZE};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    #[error("Invalid size")]
    InvalidSize,
    #[error("Invalid value")]
    InvalidValue,
    #[error("Invalid hex")]
    InvalidHex,
    #[error("Error while reading string: not valid UTF-8")]
    InvalidString,
    #[error("Bytes size {0} exceeds the maximum allowed {1}")]
    ExceedsMaxBytesSize(usize, usize),
    #[error("Array size {0} exceeds the maximum allowed {1}")]
    ExceedsMaxArraySize(usize, usize),
}

// Reader over a byte slice, used by every Serializer implementation
// Numbers are read in big endian
pub struct Reader<'a> {
    bytes: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, total: 0 }
    }

    pub fn read_bool(&mut self) -> Result<bool, ReaderError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    pub fn read_bytes_ref(&mut self, n: usize) -> Result<&'a [u8], ReaderError> {
        if n > self.bytes.len() {
            return Err(ReaderError::InvalidSize);
        }

        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        self.total += n;
        Ok(head)
    }

    pub fn read_bytes<T>(&mut self, n: usize) -> Result<T, ReaderError>
    where
        T: for<'b> TryFrom<&'b [u8]>,
    {
        let bytes = self.read_bytes_ref(n)?;
        T::try_from(bytes).map_err(|_| ReaderError::InvalidValue)
    }

    pub fn read_bytes_32(&mut self) -> Result<[u8; 32], ReaderError> {
        self.read_bytes(32)
    }

    pub fn read_bytes_64(&mut self) -> Result<[u8; 64], ReaderError> {
        self.read_bytes(64)
    }

    pub fn read_hash(&mut self) -> Result<Hash, ReaderError> {
        let bytes: [u8; HASH_SIZE] = self.read_bytes(HASH_SIZE)?;
        Ok(Hash::new(bytes))
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        let bytes: [u8; 1] = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReaderError> {
        Ok(u16::from_be_bytes(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        Ok(u32::from_be_bytes(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ReaderError> {
        Ok(u64::from_be_bytes(self.read_bytes(8)?))
    }

    // Strings are prefixed by their length on one byte
    pub fn read_string(&mut self) -> Result<String, ReaderError> {
        let size = self.read_u8()? as usize;
        self.read_string_with_size(size)
    }

    pub fn read_string_with_size(&mut self, size: usize) -> Result<String, ReaderError> {
        let bytes = self.read_bytes_ref(size)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ReaderError::InvalidString)
    }

    // Variable sized blob prefixed by a u32 length
    pub fn read_blob(&mut self, max: usize) -> Result<Vec<u8>, ReaderError> {
        let size = self.read_u32()? as usize;
        if size > max {
            return Err(ReaderError::ExceedsMaxBytesSize(size, max));
        }

        Ok(self.read_bytes_ref(size)?.to_vec())
    }

    // Remaining bytes to read
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    // Total bytes consumed so far
    pub fn total_read(&self) -> usize {
        self.total
    }
}

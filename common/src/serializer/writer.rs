use crate::crypto::Hash;

// Writer appending big endian encoded values to a byte buffer
pub struct Writer<'a> {
    bytes: &'a mut Vec<u8>,
    // Length of the buffer when the writer was created
    start: usize,
}

impl<'a> Writer<'a> {
    pub fn new(bytes: &'a mut Vec<u8>) -> Self {
        let start = bytes.len();
        Self { bytes, start }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_hash(&mut self, hash: &Hash) {
        self.write_bytes(hash.as_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_be_bytes());
    }

    // Length is encoded on one byte, longer strings must be rejected by the caller
    pub fn write_string(&mut self, value: &str) {
        debug_assert!(
            value.len() <= u8::MAX as usize,
            "string of {} bytes does not fit a u8 length",
            value.len()
        );
        self.write_u8(value.len() as u8);
        self.write_bytes(value.as_bytes());
    }

    pub fn write_blob(&mut self, value: &[u8]) {
        self.write_u32(value.len() as u32);
        self.write_bytes(value);
    }

    // Bytes written by this writer only
    pub fn total_write(&self) -> usize {
        self.bytes.len() - self.start
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[self.start..]
    }
}

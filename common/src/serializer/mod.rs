mod reader;
mod writer;

pub use reader::{Reader, ReaderError};
pub use writer::Writer;

// Maximum number of elements accepted when decoding a Vec
pub const MAX_ARRAY_SIZE: usize = u16::MAX as usize;

pub trait Serializer {
    fn write(&self, writer: &mut Writer);

    fn read(reader: &mut Reader) -> Result<Self, ReaderError>
    where
        Self: Sized;

    // Encoded size in bytes
    fn size(&self) -> usize {
        self.to_bytes().len()
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        self.write(&mut writer);
        buffer
    }

    fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    // Decode the value, rejecting any trailing byte
    fn from_bytes(bytes: &[u8]) -> Result<Self, ReaderError>
    where
        Self: Sized,
    {
        let mut reader = Reader::new(bytes);
        let value = Self::read(&mut reader)?;
        if reader.size() != 0 {
            return Err(ReaderError::InvalidSize);
        }

        Ok(value)
    }

    fn from_hex(hex: &str) -> Result<Self, ReaderError>
    where
        Self: Sized,
    {
        let bytes = hex::decode(hex).map_err(|_| ReaderError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }
}

impl Serializer for u8 {
    fn write(&self, writer: &mut Writer) {
        writer.write_u8(*self);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_u8()
    }

    fn size(&self) -> usize {
        1
    }
}

impl Serializer for u16 {
    fn write(&self, writer: &mut Writer) {
        writer.write_u16(*self);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_u16()
    }

    fn size(&self) -> usize {
        2
    }
}

impl Serializer for u32 {
    fn write(&self, writer: &mut Writer) {
        writer.write_u32(*self);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_u32()
    }

    fn size(&self) -> usize {
        4
    }
}

impl Serializer for u64 {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(*self);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_u64()
    }

    fn size(&self) -> usize {
        8
    }
}

impl Serializer for bool {
    fn write(&self, writer: &mut Writer) {
        writer.write_bool(*self);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_bool()
    }

    fn size(&self) -> usize {
        1
    }
}

impl Serializer for String {
    fn write(&self, writer: &mut Writer) {
        writer.write_string(self);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_string()
    }

    fn size(&self) -> usize {
        1 + self.len()
    }
}

impl<T: Serializer> Serializer for Option<T> {
    fn write(&self, writer: &mut Writer) {
        match self {
            Some(value) => {
                writer.write_bool(true);
                value.write(writer);
            }
            None => writer.write_bool(false),
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        if reader.read_bool()? {
            Ok(Some(T::read(reader)?))
        } else {
            Ok(None)
        }
    }

    fn size(&self) -> usize {
        1 + self.as_ref().map(|v| v.size()).unwrap_or(0)
    }
}

// Vec is prefixed by its element count on two bytes
impl<T: Serializer> Serializer for Vec<T> {
    fn write(&self, writer: &mut Writer) {
        writer.write_u16(self.len() as u16);
        for item in self {
            item.write(writer);
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let count = reader.read_u16()? as usize;
        if count > MAX_ARRAY_SIZE {
            return Err(ReaderError::ExceedsMaxArraySize(count, MAX_ARRAY_SIZE));
        }

        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(T::read(reader)?);
        }
        Ok(values)
    }

    fn size(&self) -> usize {
        2 + self.iter().map(Serializer::size).sum::<usize>()
    }
}

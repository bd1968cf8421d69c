use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum TxVersion {
    // Single native invocation per transaction
    #[default]
    V0 = 0,
}

impl TryFrom<u8> for TxVersion {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TxVersion::V0),
            _ => Err(()),
        }
    }
}

impl From<TxVersion> for u8 {
    fn from(val: TxVersion) -> Self {
        val as u8
    }
}

impl Serializer for TxVersion {
    fn write(&self, writer: &mut Writer) {
        writer.write_u8((*self).into());
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let id = reader.read_u8()?;
        Self::try_from(id).map_err(|_| ReaderError::InvalidValue)
    }

    fn size(&self) -> usize {
        1
    }
}

impl fmt::Display for TxVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TxVersion::V0 => write!(f, "V0"),
        }
    }
}

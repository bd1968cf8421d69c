use crate::{
    config::{MAX_TRANSACTION_SIZE, PROTOCOL_VERSION, VERSION},
    serializer::*,
};
use bytes::Bytes;

const HANDSHAKE_ID: u8 = 0;
const TRANSACTION_ID: u8 = 1;
const GET_CHAIN_HEIGHT_ID: u8 = 2;
const CHAIN_HEIGHT_ID: u8 = 3;
const PING_ID: u8 = 4;

// Node tag length is encoded on one byte
pub const MAX_NODE_TAG_SIZE: usize = u8::MAX as usize;

// First packet sent on every connection, in both directions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handshake {
    pub version: u16,
    // Free text identifying the software of the peer
    pub node_tag: String,
    // Whether the peer wants its transactions on the consensus lane
    pub consensus: bool,
}

impl Handshake {
    pub fn new(node_tag: &str, consensus: bool) -> Self {
        let mut node_tag = format!("{}/{}", node_tag, VERSION);
        if node_tag.len() > MAX_NODE_TAG_SIZE {
            let mut end = MAX_NODE_TAG_SIZE;
            while !node_tag.is_char_boundary(end) {
                end -= 1;
            }
            node_tag.truncate(end);
        }

        Self {
            version: PROTOCOL_VERSION,
            node_tag,
            consensus,
        }
    }
}

impl Serializer for Handshake {
    fn write(&self, writer: &mut Writer) {
        writer.write_u16(self.version);
        writer.write_string(&self.node_tag);
        writer.write_bool(self.consensus);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            version: reader.read_u16()?,
            node_tag: reader.read_string()?,
            consensus: reader.read_bool()?,
        })
    }

    fn size(&self) -> usize {
        2 + 1 + self.node_tag.len() + 1
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    Handshake(Handshake),
    // Serialized transaction, not decoded on the sending side
    Transaction(Bytes),
    GetChainHeight,
    ChainHeight(u64),
    Ping,
}

impl Packet {
    pub fn id(&self) -> u8 {
        match self {
            Packet::Handshake(_) => HANDSHAKE_ID,
            Packet::Transaction(_) => TRANSACTION_ID,
            Packet::GetChainHeight => GET_CHAIN_HEIGHT_ID,
            Packet::ChainHeight(_) => CHAIN_HEIGHT_ID,
            Packet::Ping => PING_ID,
        }
    }
}

impl Serializer for Packet {
    fn write(&self, writer: &mut Writer) {
        writer.write_u8(self.id());
        match self {
            Packet::Handshake(handshake) => handshake.write(writer),
            Packet::Transaction(bytes) => writer.write_blob(bytes),
            Packet::ChainHeight(height) => writer.write_u64(*height),
            Packet::GetChainHeight | Packet::Ping => {}
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(match reader.read_u8()? {
            HANDSHAKE_ID => Packet::Handshake(Handshake::read(reader)?),
            TRANSACTION_ID => Packet::Transaction(Bytes::from(
                reader.read_blob(MAX_TRANSACTION_SIZE)?,
            )),
            GET_CHAIN_HEIGHT_ID => Packet::GetChainHeight,
            CHAIN_HEIGHT_ID => Packet::ChainHeight(reader.read_u64()?),
            PING_ID => Packet::Ping,
            _ => return Err(ReaderError::InvalidValue),
        })
    }

    fn size(&self) -> usize {
        1 + match self {
            Packet::Handshake(handshake) => handshake.size(),
            Packet::Transaction(bytes) => 4 + bytes.len(),
            Packet::ChainHeight(_) => 8,
            Packet::GetChainHeight | Packet::Ping => 0,
        }
    }
}

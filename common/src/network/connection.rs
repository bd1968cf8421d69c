//! Length prefixed framing of packets over a byte stream.
//!
//! A frame is the packet size as a big endian `u32`, followed by the packet itself.

use super::{ConnectionError, Packet};
use crate::{config::MAX_PACKET_SIZE, serializer::Serializer};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// Encode a packet into a ready to send frame
pub fn encode_frame(packet: &Packet) -> Result<Bytes, ConnectionError> {
    let size = packet.size();
    if size > MAX_PACKET_SIZE {
        return Err(ConnectionError::PacketTooLarge(size, MAX_PACKET_SIZE));
    }

    let mut buffer = BytesMut::with_capacity(4 + size);
    buffer.put_u32(size as u32);
    buffer.put_slice(&packet.to_bytes());
    Ok(buffer.freeze())
}

// Read the next frame and decode its packet
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, ConnectionError>
where
    R: AsyncRead + Unpin,
{
    let size = match reader.read_u32().await {
        Ok(size) => size as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ConnectionError::Closed)
        }
        Err(e) => return Err(e.into()),
    };

    if size == 0 {
        return Err(ConnectionError::EmptyPacket);
    }

    if size > MAX_PACKET_SIZE {
        return Err(ConnectionError::PacketTooLarge(size, MAX_PACKET_SIZE));
    }

    let mut buffer = vec![0u8; size];
    reader.read_exact(&mut buffer).await?;
    Ok(Packet::from_bytes(&buffer)?)
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(packet)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

use crate::serializer::ReaderError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Connection closed by peer")]
    Closed,
    #[error("Packet size {0} exceeds the maximum allowed {1}")]
    PacketTooLarge(usize, usize),
    #[error("Empty packet received")]
    EmptyPacket,
    #[error("Invalid packet: {0}")]
    InvalidPacket(#[from] ReaderError),
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

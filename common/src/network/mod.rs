mod connection;
mod error;
mod packet;

pub use connection::{encode_frame, read_packet, write_packet};
pub use error::ConnectionError;
pub use packet::{Handshake, Packet};

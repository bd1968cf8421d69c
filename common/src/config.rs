use crate::crypto::Hash;

pub const VERSION: &str = env!("BUILD_VERSION");

// Network protocol version sent in the handshake
pub const PROTOCOL_VERSION: u16 = 1;

// Default port of a node peer listener
pub const DEFAULT_NODE_PORT: u16 = 20338;

// Native transfer contract
// Every transfer is an invocation of the "transfer" method on it
pub const NATIVE_TRANSFER_CONTRACT: Hash = Hash::new([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
]);

// Method invoked on the native transfer contract
pub const TRANSFER_METHOD: &str = "transfer";

// 1 KB = 1024 bytes
pub const BYTES_PER_KB: usize = 1024;

// Max size of the encoded contract invocation arguments
pub const MAX_INSTRUCTION_SIZE: usize = 64 * BYTES_PER_KB;

// Max transaction size in bytes
pub const MAX_TRANSACTION_SIZE: usize = BYTES_PER_KB * BYTES_PER_KB; // 1 MB

// Max size of a single framed packet, length prefix excluded
pub const MAX_PACKET_SIZE: usize = MAX_TRANSACTION_SIZE + BYTES_PER_KB;

// Max number of pending outgoing frames per peer
pub const PEER_SEND_CHANNEL_SIZE: usize = 4096;

// Static checks
const _: () = assert!(
    MAX_INSTRUCTION_SIZE < MAX_TRANSACTION_SIZE,
    "Max instruction size must be less than max transaction size"
);
const _: () = assert!(
    MAX_TRANSACTION_SIZE < MAX_PACKET_SIZE,
    "A transaction must always fit in a packet"
);

//! The seam to the packet transport.
//!
//! Framing, the handshake and reply correlation on the socket belong to the
//! transport; the mirror layer only needs "send this command, give me its
//! reply".

use async_trait::async_trait;
use thiserror::Error;

/// One outbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPacket {
    /// Correlation id; the transport must answer with a reply carrying the same id.
    pub id: u32,
    pub command_set: u8,
    pub command: u8,
    pub data: Vec<u8>,
}

/// The reply correlated with a [`CommandPacket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPacket {
    pub id: u32,
    pub error_code: u16,
    pub data: Vec<u8>,
}

impl ReplyPacket {
    pub fn ok(id: u32, data: Vec<u8>) -> Self {
        Self {
            id,
            error_code: 0,
            data,
        }
    }

    pub fn error(id: u32, error_code: u16) -> Self {
        Self {
            id,
            error_code,
            data: Vec::new(),
        }
    }

    pub fn error_code(&self) -> u16 {
        self.error_code
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    ConnectionClosed,
    /// The transport was shut down deliberately (detach).
    #[error("transport disconnected")]
    Disconnected,
    #[error("reply id {actual} does not match command id {expected}")]
    MismatchedReply { expected: u32, actual: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Sends commands to one attached target runtime.
///
/// Implementations must allow concurrent calls; each call is answered with the
/// reply for its own packet id.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_command(&self, packet: CommandPacket) -> Result<ReplyPacket, TransportError>;
}

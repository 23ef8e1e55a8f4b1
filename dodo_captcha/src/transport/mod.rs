/*!
 * Transport layer — how messages travel to and from the backend.
 *
 * The endpoint only assumes a bidirectional, message-oriented connection
 * with ordered text delivery and an open/close lifecycle. That contract is
 * the `Transport` trait plus the `TransportEvent` stream; `ws` provides
 * the real WebSocket implementation.
 */

pub mod ws;

pub use ws::WsTransport;

use crate::error::TransportError;

/**
 * The outbound half of a connection, as seen by the endpoint.
 *
 * Implementations deliver their inbound half as a FIFO stream of
 * `TransportEvent`s (see `WsTransport::events`); tests substitute a
 * recording mock.
 */
pub trait Transport {
    /// Transmits one text message.
    fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Requests connection closure. Infallible — a connection that is
    /// already gone has nothing left to close.
    fn close(&mut self);
}

/**
 * Lifecycle and message events delivered by a transport, in the order the
 * connection produced them.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and ready to carry messages.
    Opened,

    /// One inbound text message.
    Message(String),

    /// The connection closed (either side).
    Closed,

    /// The connection failed. No further events follow.
    Error(String),
}

/*!
 * Error taxonomy for the SDK.
 *
 * Two layers, matching the two places things can go wrong:
 * - `ClientError` — protocol-level failures surfaced by the endpoint
 *   (malformed inbound payloads, outbound encoding, explicit sends).
 * - `TransportError` — connection-level failures surfaced by a `Transport`
 *   implementation.
 *
 * Decode failures are deliberately loud: an inbound payload that is not
 * well-formed protocol JSON, or whose `type` tag is unknown, fails that
 * single message without mutating any endpoint state.
 */

use thiserror::Error;

/**
 * Errors surfaced by `CaptchaClient` operations.
 */
#[derive(Debug, Error)]
pub enum ClientError {
    /// Inbound payload was not a well-formed protocol message.
    /// The message is dropped; no state transition occurred.
    #[error("malformed protocol message: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outgoing message could not be serialized.
    #[error("failed to encode outgoing message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The transport rejected an explicit send.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/**
 * Errors surfaced by `Transport` implementations.
 */
#[derive(Debug, Error)]
pub enum TransportError {
    /// Establishing the connection failed (TCP or WebSocket handshake).
    #[error("websocket connection failed: {0}")]
    Connect(String),

    /// The connection is gone — the I/O worker has shut down.
    #[error("connection is closed")]
    Closed,

    /// Socket configuration or I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

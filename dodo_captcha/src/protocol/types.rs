/**
 * Wire types for the DodoCaptcha protocol.
 *
 * These structures mirror the JSON format expected by the DodoCaptcha
 * backend, matching the TypeScript client's message shape 1:1:
 * ```json
 * { "type": "captcha.challenge", "params": "<div>...</div>" }
 * ```
 *
 * `type` is one of a closed set of six kinds; `params` is an optional
 * opaque string whose meaning depends on the kind. Decoding a payload with
 * an unknown `type` is a hard error — serde rejects unknown enum variants,
 * so no coercion into a known state is possible.
 */
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

// ---------------------------------------------------------------------------
// MessageType — the closed enumeration of wire kinds
// ---------------------------------------------------------------------------

/**
 * The six message kinds of the DodoCaptcha protocol.
 *
 * Direction is a convention, not an enforcement: the codec decodes any of
 * the six, and the endpoint simply has no transition for the two
 * client-emitted kinds when they arrive inbound.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// Client → server: request a (new) challenge.
    #[serde(rename = "captcha.get.challenge")]
    GetChallenge,

    /// Server → client: a challenge was issued; `params` carries its
    /// opaque markup representation.
    #[serde(rename = "captcha.challenge")]
    Challenge,

    /// Server → client: the current challenge expired; `params` carries
    /// the superseded representation (with expiry information).
    #[serde(rename = "captcha.expired")]
    Expired,

    /// Client → server: submit a solution; `params` carries the code.
    #[serde(rename = "captcha.check.result")]
    CheckResult,

    /// Server → client: the solution was correct; `params` carries the
    /// issued verification token.
    #[serde(rename = "captcha.verified")]
    Verified,

    /// Server → client: the solution was incorrect.
    #[serde(rename = "captcha.not.verified")]
    NotVerified,
}

// ---------------------------------------------------------------------------
// CaptchaMessage — the wire envelope
// ---------------------------------------------------------------------------

/**
 * A single protocol message. Immutable once constructed.
 *
 * `params` is omitted from the serialized form when absent, matching the
 * TypeScript client (`params?: string`).
 */
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaMessage {
    /// The message kind.
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Optional opaque payload; meaning determined by `kind`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params: Option<String>,
}

impl CaptchaMessage {
    /**
     * Creates a message with no parameters.
     */
    pub fn new(kind: MessageType) -> Self {
        Self { kind, params: None }
    }

    /**
     * Creates a message carrying a parameter string.
     */
    pub fn with_params(kind: MessageType, params: impl Into<String>) -> Self {
        Self {
            kind,
            params: Some(params.into()),
        }
    }

    /**
     * The `captcha.get.challenge` request — sent on open (when configured)
     * and automatically after a rejected verification.
     */
    pub fn request_challenge() -> Self {
        Self::new(MessageType::GetChallenge)
    }

    /**
     * The `captcha.check.result` request carrying a solution code.
     */
    pub fn check_result(code: impl Into<String>) -> Self {
        Self::with_params(MessageType::CheckResult, code)
    }

    /**
     * Decodes a message from its JSON wire form.
     *
     * Fails with `ClientError::Decode` if the payload is not valid JSON,
     * is missing the `type` field, or carries an unknown kind.
     */
    pub fn decode(raw: &str) -> Result<Self, ClientError> {
        serde_json::from_str(raw).map_err(ClientError::Decode)
    }

    /**
     * Encodes the message into its JSON wire form.
     */
    pub fn encode(&self) -> Result<String, ClientError> {
        serde_json::to_string(self).map_err(ClientError::Encode)
    }
}

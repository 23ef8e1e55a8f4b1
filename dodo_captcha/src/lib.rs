/*!
 * DodoCaptcha client SDK.
 *
 * This crate is the client-side endpoint of the DodoCaptcha verification
 * protocol: a small challenge/response exchange carried over a persistent
 * WebSocket connection. The endpoint tracks two pieces of server-asserted
 * state — the current challenge markup and the current verification token —
 * and fans out every change to attached observers.
 *
 * # Module structure
 *
 * - `protocol/` — what goes over the wire: message kinds and the JSON codec
 * - `transport/` — how it travels: the `Transport` seam, WebSocket worker
 * - `observer` — the change-notification registry
 * - `client` — the protocol endpoint: state machine, callbacks, lifecycle
 *
 * # Example
 * ```ignore
 * use std::rc::Rc;
 * use dodo_captcha::{CaptchaClient, Options, WsTransport};
 *
 * let transport = WsTransport::connect("ws://localhost:8080")?;
 * let events = transport.events().clone();
 *
 * let mut client = CaptchaClient::new(transport, Options {
 *     fetch_on_open: true,
 *     verification_callback: Some(Rc::new(|ok| println!("verified: {ok}"))),
 *     ..Default::default()
 * });
 *
 * client.observer().attach(Rc::new(|html, token| {
 *     println!("challenge: {html:?}, token: {token:?}");
 * }));
 * client.add_message_listener();
 *
 * while let Ok(event) = events.recv() {
 *     client.handle_event(event)?;
 * }
 * ```
 */

mod client;
mod error;
mod observer;
mod protocol;
mod transport;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use client::{CaptchaClient, Options};
pub use error::{ClientError, TransportError};
pub use observer::{CaptchaObserver, Observer};
pub use protocol::types::{CaptchaMessage, MessageType};
pub use transport::{Transport, TransportEvent, WsTransport};

/*!
 * WebSocket transport for the DodoCaptcha backend.
 *
 * Uses `tungstenite` — the blocking WebSocket client — with no async
 * runtime. The socket is owned by a single background I/O thread; the
 * handle exchanged with the endpoint is a pair of crossbeam channels:
 *
 * ```text
 *  ┌──────────────┐    WsCommand     ┌────────────────┐
 *  │   endpoint    │ ───────────────► │  I/O thread     │ ◄──► socket
 *  │ (any thread)  │ ◄─────────────── │  (single)       │
 *  └──────────────┘  TransportEvent  └────────────────┘
 * ```
 *
 * Design decisions:
 * - **Blocking I/O** — the I/O thread is a dedicated background thread,
 *   so blocking reads are fine. The socket gets a short read timeout so
 *   the loop can interleave outbound commands with inbound frames.
 * - **Text frames only** — the protocol is JSON text; binary, ping and
 *   pong frames are ignored at this layer (tungstenite answers pings
 *   internally).
 * - **No reconnect** — a failed connection surfaces one terminal event
 *   and the worker exits; recovery is the host's concern.
 */

use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::{Transport, TransportEvent};
use crate::error::TransportError;

/// How long a socket read may block before the I/O loop checks for
/// pending outbound commands.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// WsCommand — outbound requests from the endpoint to the I/O thread
// ---------------------------------------------------------------------------

enum WsCommand {
    /// Transmit one text frame.
    Send(String),

    /// Close the connection and shut the worker down.
    Close,
}

// ---------------------------------------------------------------------------
// WsTransport — the endpoint-facing handle
// ---------------------------------------------------------------------------

/**
 * A live WebSocket connection to a DodoCaptcha backend.
 *
 * Created with `connect`; the inbound side is consumed via `events()`.
 * Exactly one endpoint owns a `WsTransport` for its lifetime.
 */
pub struct WsTransport {
    commands: Sender<WsCommand>,
    events: Receiver<TransportEvent>,
}

impl WsTransport {
    /**
     * Opens a WebSocket connection to `url` (e.g. `ws://localhost:8080`)
     * and spawns the background I/O thread.
     *
     * The connection is established before this returns, so the event
     * stream always starts with `TransportEvent::Opened`.
     */
    pub fn connect(url: &str) -> Result<Self, TransportError> {
        let (socket, _response) =
            tungstenite::connect(url).map_err(|e| TransportError::Connect(e.to_string()))?;

        /*
         * Short read timeout so the I/O loop wakes up regularly to drain
         * outbound commands even when the server is quiet.
         */
        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            stream.set_read_timeout(Some(READ_TIMEOUT))?;
        }

        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        /*
         * The handshake already completed, so Opened is queued before the
         * worker can deliver any frame — the stream stays in order.
         */
        let _ = event_tx.send(TransportEvent::Opened);

        thread::Builder::new()
            .name("dodo-captcha-ws".into())
            .spawn(move || run_loop(socket, command_rx, event_tx))
            .map_err(|e| TransportError::Connect(format!("failed to spawn I/O thread: {e}")))?;

        debug!("connected to {url}");

        Ok(Self {
            commands: command_tx,
            events: event_rx,
        })
    }

    /**
     * The inbound event stream: `Opened`, then messages in delivery
     * order, terminated by `Closed` or `Error`.
     *
     * The receiver is cheaply cloneable, so callers can hold one while
     * the transport itself is owned by the endpoint.
     */
    pub fn events(&self) -> &Receiver<TransportEvent> {
        &self.events
    }
}

impl Transport for WsTransport {
    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.commands
            .send(WsCommand::Send(text.to_owned()))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        /* If the worker already exited, there is nothing left to close. */
        let _ = self.commands.send(WsCommand::Close);
    }
}

// ---------------------------------------------------------------------------
// The I/O loop
// ---------------------------------------------------------------------------

/**
 * Runs until the connection closes, fails, or the handle goes away.
 *
 * Each iteration drains all pending outbound commands, then polls the
 * socket for one inbound frame. A dropped command channel counts as a
 * close request so an abandoned handle cannot leak the thread.
 */
fn run_loop(
    mut socket: WebSocket<MaybeTlsStream<TcpStream>>,
    commands: Receiver<WsCommand>,
    events: Sender<TransportEvent>,
) {
    loop {
        loop {
            match commands.try_recv() {
                Ok(WsCommand::Send(text)) => {
                    if let Err(err) = socket.send(Message::Text(text)) {
                        warn!("websocket send failed: {err}");
                        let _ = events.send(TransportEvent::Error(err.to_string()));
                        return;
                    }
                }
                Ok(WsCommand::Close) | Err(TryRecvError::Disconnected) => {
                    debug!("closing websocket");
                    let _ = socket.close(None);
                    let _ = events.send(TransportEvent::Closed);
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                let _ = events.send(TransportEvent::Message(text));
            }
            Ok(Message::Close(_)) => {
                debug!("server closed the connection");
                let _ = events.send(TransportEvent::Closed);
                return;
            }
            Ok(_) => {} // binary / ping / pong — not part of this protocol
            Err(tungstenite::Error::Io(err)) if is_timeout(&err) => continue,
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                let _ = events.send(TransportEvent::Closed);
                return;
            }
            Err(err) => {
                warn!("websocket read failed: {err}");
                let _ = events.send(TransportEvent::Error(err.to_string()));
                return;
            }
        }
    }
}

/// The read-timeout wakeup shows up as WouldBlock on Unix and TimedOut
/// on Windows.
fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

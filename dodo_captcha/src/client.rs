/**
 * The DodoCaptcha protocol endpoint — owns one transport connection and
 * runs the verification state machine over it.
 *
 * Lifecycle:
 * 1. Open a transport (e.g. `WsTransport::connect`) and hand it to
 *    `CaptchaClient::new` together with `Options`.
 * 2. Feed the transport's event stream into `handle_event` (after
 *    `add_message_listener`), or wire inbound text to `handle_message`
 *    manually.
 * 3. Observe `(html, token)` changes via the attached `CaptchaObserver`.
 * 4. `close()` tears the state down and releases the transport.
 *
 * The endpoint is single-threaded: every transition happens synchronously
 * inside the handler invoked with a transport event, in delivery order.
 */
use std::rc::Rc;

use log::{debug, warn};

use crate::error::ClientError;
use crate::observer::CaptchaObserver;
use crate::protocol::types::{CaptchaMessage, MessageType};
use crate::transport::{Transport, TransportEvent};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/**
 * Configuration for a `CaptchaClient`, fixed at construction.
 *
 * All fields default to "off" via `Default`.
 *
 * # Example
 * ```ignore
 * use std::rc::Rc;
 *
 * let options = dodo_captcha::Options {
 *     fetch_on_open: true,
 *     verification_callback: Some(Rc::new(|status| {
 *         println!("{}", if status { "verified" } else { "not verified" });
 *     })),
 *     ..Default::default()
 * };
 * ```
 */
#[derive(Default)]
pub struct Options {
    /// Automatically send `captcha.get.challenge` once the transport
    /// signals open. Fires at most once per connection.
    pub fetch_on_open: bool,

    /// Invoked with the verification outcome: `true` on
    /// `captcha.verified`, `false` on `captcha.not.verified`.
    pub verification_callback: Option<Rc<dyn Fn(bool)>>,

    /// Invoked with every successfully decoded inbound message, after its
    /// type-specific handling. A lower-level channel than the observer
    /// registry — it sees protocol traffic, not state snapshots.
    pub on_message_callback: Option<Rc<dyn Fn(&CaptchaMessage)>>,
}

// ---------------------------------------------------------------------------
// CaptchaClient
// ---------------------------------------------------------------------------

/**
 * The client-side endpoint of the DodoCaptcha protocol.
 *
 * Owns the transport for its lifetime and tracks the two pieces of
 * server-asserted state: the current challenge markup (`html`) and the
 * current verification token (`token`). The token is present only while
 * the client counts as verified; any expiry transition clears it.
 */
pub struct CaptchaClient<T: Transport> {
    /// Registry of `(html, token)` observers. Entries are managed by the
    /// host, never by the endpoint itself.
    observer: CaptchaObserver,

    config: Options,
    html: Option<String>,
    token: Option<String>,

    /// The connection. `None` once `close()` has released it.
    transport: Option<T>,

    /// Whether the endpoint's own inbound handler is bound to the
    /// transport's message events.
    listener_bound: bool,

    /// One-shot latch for the on-open challenge request.
    fetch_armed: bool,
}

impl<T: Transport> CaptchaClient<T> {
    /**
     * Creates an endpoint over an already-opened transport.
     *
     * The default message handler starts unbound — call
     * `add_message_listener` to route `TransportEvent::Message` through
     * `handle_message`, or wire inbound text manually.
     */
    pub fn new(transport: T, options: Options) -> Self {
        let fetch_armed = options.fetch_on_open;

        Self {
            observer: CaptchaObserver::new(),
            config: options,
            html: None,
            token: None,
            transport: Some(transport),
            listener_bound: false,
            fetch_armed,
        }
    }

    // -- accessors ----------------------------------------------------------

    /**
     * The last known challenge markup, if any.
     */
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    /**
     * The verification token, present only while verified.
     */
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /**
     * The underlying transport, until `close()` releases it.
     */
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /**
     * The observer registry for `(html, token)` change notifications.
     */
    pub fn observer(&self) -> &CaptchaObserver {
        &self.observer
    }

    // -- listener management ------------------------------------------------

    /**
     * Binds the endpoint's own handler: from now on,
     * `TransportEvent::Message` events given to `handle_event` are decoded
     * and applied via `handle_message`.
     */
    pub fn add_message_listener(&mut self) {
        self.listener_bound = true;
    }

    /**
     * Unbinds the handler bound by `add_message_listener`. Message events
     * are ignored again until rebound; `handle_message` remains callable
     * directly for hosts that wire the transport themselves.
     */
    pub fn remove_message_listener(&mut self) {
        self.listener_bound = false;
    }

    // -- event handling -----------------------------------------------------

    /**
     * Routes one transport event.
     *
     * - `Opened` — triggers the one-shot challenge request if
     *   `fetch_on_open` was set; a repeated open signal does not resend.
     * - `Message` — forwarded to `handle_message` while the listener is
     *   bound, ignored otherwise.
     * - `Closed` / `Error` — logged only; connection failures are the
     *   transport's contract, not a protocol transition.
     */
    pub fn handle_event(&mut self, event: TransportEvent) -> Result<(), ClientError> {
        match event {
            TransportEvent::Opened => {
                if self.fetch_armed {
                    self.fetch_armed = false;
                    self.send(&CaptchaMessage::request_challenge())?;
                }
                Ok(())
            }
            TransportEvent::Message(text) => {
                if self.listener_bound {
                    self.handle_message(&text)?;
                }
                Ok(())
            }
            TransportEvent::Closed => {
                debug!("transport closed");
                Ok(())
            }
            TransportEvent::Error(reason) => {
                warn!("transport error: {reason}");
                Ok(())
            }
        }
    }

    /**
     * Decodes and applies one inbound protocol message.
     *
     * Transitions:
     * - `captcha.challenge` — `html` takes the new markup, the token is
     *   left as-is, observers are notified.
     * - `captcha.expired` — `html` takes the expired markup, the token is
     *   cleared, observers are notified.
     * - `captcha.verified` — the token is stored, the verification
     *   callback fires with `true`, observers are notified.
     * - `captcha.not.verified` — the verification callback fires with
     *   `false` and a fresh `captcha.get.challenge` goes out. No observer
     *   notification; the protocol-level retry replaces it.
     * - client-direction kinds — no transition.
     *
     * Every decoded message, whatever its kind, is then forwarded once to
     * `on_message_callback`.
     *
     * An undecodable payload fails fast with `ClientError::Decode`: no
     * state change, no notification, no callback.
     */
    pub fn handle_message(&mut self, raw: &str) -> Result<CaptchaMessage, ClientError> {
        let parsed = CaptchaMessage::decode(raw)?;

        match parsed.kind {
            MessageType::Challenge => {
                self.html = parsed.params.clone();
                self.observer
                    .notify(self.html.as_deref(), self.token.as_deref());
            }
            MessageType::Expired => {
                /* A challenge-changing transition invalidates the token. */
                self.html = parsed.params.clone();
                self.token = None;
                self.observer.notify(self.html.as_deref(), None);
            }
            MessageType::Verified => {
                self.token = parsed.params.clone();
                if let Some(callback) = &self.config.verification_callback {
                    callback(true);
                }
                self.observer
                    .notify(self.html.as_deref(), self.token.as_deref());
            }
            MessageType::NotVerified => {
                if let Some(callback) = &self.config.verification_callback {
                    callback(false);
                }

                /*
                 * Protocol-level retry: ask for a fresh challenge. A send
                 * failure must not swallow the message we just handled,
                 * so it is logged instead of propagated.
                 */
                if let Err(err) = self.send(&CaptchaMessage::request_challenge()) {
                    warn!("failed to re-request challenge after rejection: {err}");
                }
            }
            MessageType::GetChallenge | MessageType::CheckResult => {
                /* Client-direction kinds carry no inbound transition. */
            }
        }

        if let Some(callback) = &self.config.on_message_callback {
            callback(&parsed);
        }

        Ok(parsed)
    }

    // -- outbound -----------------------------------------------------------

    /**
     * Serializes and transmits a protocol message.
     *
     * A silent no-op once `close()` has released the transport — the
     * handle may legitimately already be gone.
     */
    pub fn send(&mut self, message: &CaptchaMessage) -> Result<(), ClientError> {
        let Some(transport) = self.transport.as_mut() else {
            return Ok(());
        };

        let text = message.encode()?;
        transport.send_text(&text)?;
        Ok(())
    }

    /**
     * Clears the challenge and token and releases the transport,
     * requesting connection closure.
     *
     * Idempotent: a second call finds the same terminal state and no
     * transport to close. Attached observers stay attached and receive no
     * final notification.
     */
    pub fn close(&mut self) {
        self.html = None;
        self.token = None;

        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::cell::RefCell;

    /// Transport double that records outbound frames and close calls.
    struct MockTransport {
        sent: Rc<RefCell<Vec<String>>>,
        closed: Rc<RefCell<u32>>,
    }

    impl MockTransport {
        fn new() -> (Self, Rc<RefCell<Vec<String>>>, Rc<RefCell<u32>>) {
            let sent = Rc::new(RefCell::new(Vec::new()));
            let closed = Rc::new(RefCell::new(0));
            (
                Self {
                    sent: sent.clone(),
                    closed: closed.clone(),
                },
                sent,
                closed,
            )
        }
    }

    impl Transport for MockTransport {
        fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
            self.sent.borrow_mut().push(text.to_owned());
            Ok(())
        }

        fn close(&mut self) {
            *self.closed.borrow_mut() += 1;
        }
    }

    /// A client with the default handler bound, plus the sent-frame log.
    fn wired_client(options: Options) -> (CaptchaClient<MockTransport>, Rc<RefCell<Vec<String>>>) {
        let (transport, sent, _) = MockTransport::new();
        let mut client = CaptchaClient::new(transport, options);
        client.add_message_listener();
        (client, sent)
    }

    /// Attaches an observer that records every notified snapshot.
    fn record_notifications(
        client: &CaptchaClient<MockTransport>,
    ) -> Rc<RefCell<Vec<(Option<String>, Option<String>)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        client.observer().attach({
            let log = log.clone();
            Rc::new(move |html, token| {
                log.borrow_mut()
                    .push((html.map(str::to_owned), token.map(str::to_owned)));
            })
        });
        log
    }

    /**
     * Scenario A: with `fetch_on_open`, the open signal sends exactly one
     * challenge request, and a repeated open signal does not resend.
     */
    #[test]
    fn test_fetch_on_open_fires_once() {
        let (mut client, sent) = wired_client(Options {
            fetch_on_open: true,
            ..Default::default()
        });

        client.handle_event(TransportEvent::Opened).unwrap();
        client.handle_event(TransportEvent::Opened).unwrap();

        assert_eq!(*sent.borrow(), vec![r#"{"type":"captcha.get.challenge"}"#]);
    }

    /**
     * Without `fetch_on_open`, the open signal sends nothing.
     */
    #[test]
    fn test_open_without_fetch_sends_nothing() {
        let (mut client, sent) = wired_client(Options::default());

        client.handle_event(TransportEvent::Opened).unwrap();

        assert!(sent.borrow().is_empty());
    }

    /**
     * Scenario B: a challenge message sets the markup, leaves the token
     * absent, and notifies once.
     */
    #[test]
    fn test_challenge_sets_html_and_notifies() {
        let (mut client, _) = wired_client(Options::default());
        let notified = record_notifications(&client);

        client
            .handle_message(r#"{"type":"captcha.challenge","params":"<div>1</div>"}"#)
            .unwrap();

        assert_eq!(client.html(), Some("<div>1</div>"));
        assert_eq!(client.token(), None);
        assert_eq!(
            *notified.borrow(),
            vec![(Some("<div>1</div>".to_owned()), None)]
        );
    }

    /**
     * Scenario C: verification stores the token, reports `true`, and
     * notifies with the unchanged challenge alongside the new token.
     */
    #[test]
    fn test_verified_sets_token_and_reports_true() {
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let (mut client, _) = wired_client(Options {
            verification_callback: Some({
                let statuses = statuses.clone();
                Rc::new(move |status| statuses.borrow_mut().push(status))
            }),
            ..Default::default()
        });

        client
            .handle_message(r#"{"type":"captcha.challenge","params":"<div>1</div>"}"#)
            .unwrap();
        let notified = record_notifications(&client);
        client
            .handle_message(r#"{"type":"captcha.verified","params":"tok-123"}"#)
            .unwrap();

        assert_eq!(client.token(), Some("tok-123"));
        assert_eq!(*statuses.borrow(), vec![true]);
        assert_eq!(
            *notified.borrow(),
            vec![(Some("<div>1</div>".to_owned()), Some("tok-123".to_owned()))]
        );
    }

    /**
     * Scenario D: expiry replaces the markup and clears the token.
     */
    #[test]
    fn test_expired_clears_token() {
        let (mut client, _) = wired_client(Options::default());

        client
            .handle_message(r#"{"type":"captcha.challenge","params":"<div>1</div>"}"#)
            .unwrap();
        client
            .handle_message(r#"{"type":"captcha.verified","params":"tok-123"}"#)
            .unwrap();
        let notified = record_notifications(&client);
        client
            .handle_message(r#"{"type":"captcha.expired","params":"<div>expired</div>"}"#)
            .unwrap();

        assert_eq!(client.html(), Some("<div>expired</div>"));
        assert_eq!(client.token(), None);
        assert_eq!(
            *notified.borrow(),
            vec![(Some("<div>expired</div>".to_owned()), None)]
        );
    }

    /**
     * Scenario E: a rejected verification reports `false` and re-requests
     * a challenge exactly once, with no observer notification.
     */
    #[test]
    fn test_not_verified_reports_false_and_rerequests() {
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let (mut client, sent) = wired_client(Options {
            verification_callback: Some({
                let statuses = statuses.clone();
                Rc::new(move |status| statuses.borrow_mut().push(status))
            }),
            ..Default::default()
        });
        let notified = record_notifications(&client);

        client
            .handle_message(r#"{"type":"captcha.not.verified"}"#)
            .unwrap();

        assert_eq!(*statuses.borrow(), vec![false]);
        assert_eq!(*sent.borrow(), vec![r#"{"type":"captcha.get.challenge"}"#]);
        assert!(notified.borrow().is_empty());
    }

    /**
     * A fresh challenge leaves an existing token in place — only expiry
     * clears it.
     */
    #[test]
    fn test_challenge_preserves_existing_token() {
        let (mut client, _) = wired_client(Options::default());

        client
            .handle_message(r#"{"type":"captcha.verified","params":"tok-123"}"#)
            .unwrap();
        let notified = record_notifications(&client);
        client
            .handle_message(r#"{"type":"captcha.challenge","params":"<div>2</div>"}"#)
            .unwrap();

        assert_eq!(client.token(), Some("tok-123"));
        assert_eq!(
            *notified.borrow(),
            vec![(Some("<div>2</div>".to_owned()), Some("tok-123".to_owned()))]
        );
    }

    /**
     * The generic message callback sees every decoded message once, after
     * its type-specific handling.
     */
    #[test]
    fn test_on_message_callback_sees_every_message() {
        let kinds = Rc::new(RefCell::new(Vec::new()));
        let (mut client, _) = wired_client(Options {
            on_message_callback: Some({
                let kinds = kinds.clone();
                Rc::new(move |message: &CaptchaMessage| kinds.borrow_mut().push(message.kind))
            }),
            ..Default::default()
        });

        client
            .handle_message(r#"{"type":"captcha.challenge","params":"<div>1</div>"}"#)
            .unwrap();
        client
            .handle_message(r#"{"type":"captcha.not.verified"}"#)
            .unwrap();
        client
            .handle_message(r#"{"type":"captcha.get.challenge"}"#)
            .unwrap();

        assert_eq!(
            *kinds.borrow(),
            vec![
                MessageType::Challenge,
                MessageType::NotVerified,
                MessageType::GetChallenge,
            ]
        );
    }

    /**
     * An undecodable payload propagates a decode error and leaves the
     * endpoint untouched: no transition, no notification.
     */
    #[test]
    fn test_decode_failure_leaves_state_untouched() {
        let (mut client, _) = wired_client(Options::default());
        client
            .handle_message(r#"{"type":"captcha.challenge","params":"<div>1</div>"}"#)
            .unwrap();
        let notified = record_notifications(&client);

        let result = client.handle_message(r#"{"type":"captcha.glitch"}"#);

        assert!(matches!(result, Err(ClientError::Decode(_))));
        assert_eq!(client.html(), Some("<div>1</div>"));
        assert!(notified.borrow().is_empty());
    }

    /**
     * Message events are routed through the default handler only while it
     * is bound; manual `handle_message` keeps working either way.
     */
    #[test]
    fn test_listener_binding_controls_routing() {
        let (transport, _, _) = MockTransport::new();
        let mut client = CaptchaClient::new(transport, Options::default());
        let challenge = r#"{"type":"captcha.challenge","params":"<div>1</div>"}"#;

        /* Unbound by default: the event is ignored. */
        client
            .handle_event(TransportEvent::Message(challenge.into()))
            .unwrap();
        assert_eq!(client.html(), None);

        client.add_message_listener();
        client
            .handle_event(TransportEvent::Message(challenge.into()))
            .unwrap();
        assert_eq!(client.html(), Some("<div>1</div>"));

        client.remove_message_listener();
        client
            .handle_event(TransportEvent::Message(
                r#"{"type":"captcha.expired","params":"<div>x</div>"}"#.into(),
            ))
            .unwrap();
        assert_eq!(client.html(), Some("<div>1</div>"));

        /* Manual wiring bypasses the binding entirely. */
        client.handle_message(challenge).unwrap();
        assert_eq!(client.html(), Some("<div>1</div>"));
    }

    /**
     * `close` clears both fields, closes the transport exactly once, and
     * is safe to call again.
     */
    #[test]
    fn test_close_is_idempotent() {
        let (transport, _, closed) = MockTransport::new();
        let mut client = CaptchaClient::new(transport, Options::default());
        client.add_message_listener();
        client
            .handle_message(r#"{"type":"captcha.verified","params":"tok-123"}"#)
            .unwrap();

        client.close();
        client.close();

        assert_eq!(client.html(), None);
        assert_eq!(client.token(), None);
        assert_eq!(*closed.borrow(), 1);
        assert!(client.transport().is_none());
    }

    /**
     * Sending after close is a guarded no-op, not an error.
     */
    #[test]
    fn test_send_after_close_is_noop() {
        let (transport, sent, _) = MockTransport::new();
        let mut client = CaptchaClient::new(transport, Options::default());

        client.close();
        client.send(&CaptchaMessage::check_result("1234")).unwrap();

        assert!(sent.borrow().is_empty());
    }
}

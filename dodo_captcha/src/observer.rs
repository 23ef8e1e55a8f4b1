/**
 * Change-notification registry for the captcha state.
 *
 * Decouples "the state changed" from "who cares": the registry holds an
 * ordered list of observer callbacks and fans out `(html, token)`
 * snapshots to all of them on demand. It knows nothing about the protocol.
 *
 * Observers are compared by reference identity (`Rc::ptr_eq`) — two
 * structurally identical closures are distinct registrations. The same
 * `Rc` may be attached twice and will then be invoked twice per
 * notification.
 */
use std::cell::RefCell;
use std::rc::Rc;

/**
 * An observer callback. Receives the current challenge markup and the
 * current verification token, either of which may be absent.
 */
pub type Observer = Rc<dyn Fn(Option<&str>, Option<&str>)>;

/**
 * Ordered registry of observers, fan-out on `notify`.
 *
 * The list lives behind a `RefCell` so a callback running inside `notify`
 * may attach or detach (including detaching itself) without violating
 * borrow rules.
 */
#[derive(Default)]
pub struct CaptchaObserver {
    observers: RefCell<Vec<Observer>>,
}

impl CaptchaObserver {
    /**
     * Creates an empty registry.
     */
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Appends an observer. No replay of the current state occurs — the
     * observer only sees changes from the next `notify` on.
     */
    pub fn attach(&self, observer: Observer) {
        self.observers.borrow_mut().push(observer);
    }

    /**
     * Removes every registration that is reference-equal to `observer`.
     * A no-op if it was never attached.
     */
    pub fn detach(&self, observer: &Observer) {
        self.observers
            .borrow_mut()
            .retain(|registered| !Rc::ptr_eq(registered, observer));
    }

    /**
     * Invokes every currently-registered observer, in attachment order,
     * with the given snapshot.
     *
     * The list is snapshotted before delivery starts: an observer that
     * mutates the registry mid-notify does not affect who receives this
     * call, only subsequent ones.
     *
     * Observers are not isolated from each other — a panicking observer
     * propagates and aborts delivery to the observers after it.
     */
    pub fn notify(&self, html: Option<&str>, token: Option<&str>) {
        let snapshot: Vec<Observer> = self.observers.borrow().clone();

        for observer in snapshot {
            observer(html, token);
        }
    }
}

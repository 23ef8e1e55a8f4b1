/*!
 * Protocol layer — the wire format spoken with the DodoCaptcha backend.
 *
 * Everything related to *what* goes over the connection:
 * - `types` — CaptchaMessage envelope, MessageType enumeration, JSON codec
 */

pub mod types;

/**
 * Minimal interactive harness for the DodoCaptcha Rust client.
 *
 * Point it at a running DodoCaptcha backend and it will fetch a challenge
 * on connect, print the challenge markup and token as they change, and
 * submit any solution code typed on stdin:
 *
 *   cargo run -p dodo_captcha_demo                       # ws://127.0.0.1:8080
 *   cargo run -p dodo_captcha_demo -- ws://host:port
 */
use std::io::BufRead;
use std::rc::Rc;
use std::thread;

use crossbeam_channel::{select, unbounded};
use dodo_captcha::{CaptchaClient, CaptchaMessage, Options, TransportEvent, WsTransport};

/// Default backend address; override with the first CLI argument.
const DEFAULT_URL: &str = "ws://127.0.0.1:8080";

fn main() {
    init_logger();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_URL.to_owned());

    let transport = match WsTransport::connect(&url) {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("[demo] could not connect to {url}: {err}");
            std::process::exit(1);
        }
    };
    let events = transport.events().clone();

    /*
     * Fetch the challenge as soon as the connection is open, and print
     * verification outcomes as they arrive.
     */
    let mut client = CaptchaClient::new(
        transport,
        Options {
            fetch_on_open: true,
            verification_callback: Some(Rc::new(|status| {
                println!(
                    "[demo] verification {}",
                    if status { "accepted" } else { "rejected" }
                );
            })),
            ..Default::default()
        },
    );

    client.observer().attach(Rc::new(|html, token| {
        if let Some(html) = html {
            println!("[demo] challenge:\n{html}");
        }
        match token {
            Some(token) => println!("[demo] token: {token}"),
            None => println!("[demo] no token"),
        }
    }));
    client.add_message_listener();

    /*
     * stdin lines become solution submissions. The reader thread hands
     * lines over a channel so the main loop can multiplex them with
     * transport events.
     */
    let (line_tx, line_rx) = unbounded::<String>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let code = line.trim().to_owned();
            if !code.is_empty() && line_tx.send(code).is_err() {
                break;
            }
        }
    });

    println!("[demo] connected to {url} — type a solution code and press enter");

    let mut lines = line_rx;
    loop {
        select! {
            recv(events) -> event => {
                let Ok(event) = event else { break };
                let finished = matches!(&event, TransportEvent::Closed | TransportEvent::Error(_));

                if let Err(err) = client.handle_event(event) {
                    eprintln!("[demo] protocol error: {err}");
                }
                if finished {
                    break;
                }
            }
            recv(lines) -> line => {
                match line {
                    Ok(code) => {
                        println!("[demo] submitting solution: {code}");
                        if let Err(err) = client.send(&CaptchaMessage::check_result(code)) {
                            eprintln!("[demo] send failed: {err}");
                        }
                    }
                    /* stdin closed — stop selecting on it. */
                    Err(_) => lines = crossbeam_channel::never(),
                }
            }
        }
    }

    client.close();
    println!("[demo] connection closed");
}

/// Route the library's `log` output to stderr.
fn init_logger() {
    let _ = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}", record.level(), message));
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stderr())
        .apply();
}

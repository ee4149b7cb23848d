//! Salt Channel v2 loopback demo.
//!
//! # What this does
//!
//! 1. Spawn a server thread listening on a loopback TCP socket.
//! 2. The server accepts one connection, runs the M1–M4 handshake, and
//!    echoes every application message back until it sees `last=true`.
//! 3. The client connects, runs the same handshake, sends a couple of
//!    messages, and prints what the server echoes back.
//!
//! # Run
//! ```text
//! cargo run -p saltchannel-connect
//! ```

use std::net::{TcpListener, TcpStream};
use std::thread;

use saltchannel_core::time::{NullTimeChecker, NullTimeKeeper};
use saltchannel_core::{client, server, LengthPrefixed};
use saltchannel_crypto::SigningKeyPair;

fn run_server(listener: TcpListener, sig_keys: SigningKeyPair) {
    let (stream, peer) = match listener.accept() {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("accept failed: {e}");
            return;
        }
    };
    log::info!("accepted connection from {peer}");
    let transport = LengthPrefixed::new(stream);
    let mut keeper = NullTimeKeeper;
    let mut checker = NullTimeChecker;
    let accepted = match server::accept(transport, &sig_keys, &mut keeper, &mut checker, false) {
        Ok(accepted) => accepted,
        Err(e) => {
            log::error!("handshake failed: {e}");
            return;
        }
    };
    let mut app = match accepted {
        server::Accepted::Channel(app) => app,
        server::Accepted::Discovered => {
            log::info!("client only performed discovery, nothing to echo");
            return;
        }
    };
    log::info!("handshake complete, echoing application messages");
    loop {
        let message = match app.read() {
            Ok(message) => message,
            Err(e) => {
                log::info!("session ended: {e}");
                return;
            }
        };
        let last = app.last_flag();
        if let Err(e) = app.write(&mut keeper, &message, last) {
            log::error!("echo write failed: {e}");
            return;
        }
        if last {
            return;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let server_keys = SigningKeyPair::generate();
    let server_handle = {
        let sig_keys = server_keys.clone();
        thread::spawn(move || run_server(listener, sig_keys))
    };

    let stream = TcpStream::connect(addr)?;
    let transport = LengthPrefixed::new(stream);
    let client_keys = SigningKeyPair::generate();
    let mut keeper = NullTimeKeeper;
    let mut checker = NullTimeChecker;
    let mut app = client::handshake(
        transport,
        &client_keys,
        None,
        &mut keeper,
        &mut checker,
        false,
    )?;
    log::info!("client handshake complete");

    app.write(&mut keeper, b"hello salt channel", false)?;
    let echoed = app.read()?;
    println!("server echoed: {}", String::from_utf8_lossy(&echoed));

    app.write(&mut keeper, b"goodbye", true)?;
    let echoed = app.read()?;
    println!("server echoed: {}", String::from_utf8_lossy(&echoed));
    assert!(app.last_flag());

    server_handle.join().expect("server thread panicked");
    Ok(())
}

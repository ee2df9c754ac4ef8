// TCP server and main event loop for the battle relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per peer): call `read_frame()` in a loop and send
//   each `ClientMessage` as `InternalEvent::MessageFrom`. On error/EOF, send
//   `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Session` and dispatches events one at a time.
//   Because every forwarded update passes through this single loop, guests
//   receive host envelopes in exactly the order the host sent them.
//
// The main thread is the only writer to peer TCP streams (via
// `Session::broadcast`/`send_to`). Reader threads only read.
//
// Shutdown: the main loop wakes every `POLL_INTERVAL` to check the
// `keep_running` flag, which `RelayHandle::stop` clears.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use skirmish_protocol::{ClientMessage, FrameError, PeerId, ServerMessage, read_frame, write_frame};
use tracing::{debug, info, warn};

use crate::session::Session;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        peer_id: PeerId,
        message: ClientMessage,
    },
    Disconnected {
        peer_id: PeerId,
    },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.wait();
    }

    /// Block until the relay exits on its own.
    pub fn join(mut self) {
        self.wait();
    }

    fn wait(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("relay thread panicked");
        }
    }
}

/// Configuration for starting a relay server.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub port: u16,
    pub session_name: String,
    pub password: Option<String>,
    pub max_peers: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 7979,
            session_name: "skirmish-battle".into(),
            password: None,
            max_peers: 2,
        }
    }
}

/// Start the relay server on a background thread. Returns a handle for
/// stopping it and the actual bound address (port 0 lets the OS pick).
pub fn start_relay(config: RelayConfig) -> std::io::Result<(RelayHandle, SocketAddr)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    info!(%addr, session = %config.session_name, "relay listening");
    let thread = thread::spawn(move || {
        run_relay(listener, config, keep_running_clone);
    });

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main relay loop. Runs until `keep_running` is set to false.
fn run_relay(listener: TcpListener, config: RelayConfig, keep_running: Arc<AtomicBool>) {
    let mut session = Session::new(config.session_name, config.password, config.max_peers);

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    if let Err(e) = listener.set_nonblocking(true) {
        warn!(error = %e, "could not make listener non-blocking");
    }

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    debug!(%addr, "accepted connection");
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed, listener exiting");
                    break;
                }
            }
        }
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => handle_event(&mut session, event, &tx, &keep_running),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    info!("relay stopped");
}

fn handle_event(
    session: &mut Session,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(session, stream, tx, keep_running);
        }
        InternalEvent::MessageFrom { peer_id, message } => {
            handle_message(session, peer_id, message);
        }
        InternalEvent::Disconnected { peer_id } => {
            session.remove_peer(peer_id);
        }
    }
}

/// Read the Hello handshake, add the peer to the session, and spawn a
/// reader thread.
fn handle_new_connection(
    session: &mut Session,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).ok();

    let mut reader = match stream.try_clone() {
        Ok(s) => BufReader::new(s),
        Err(e) => {
            warn!(error = %e, "could not clone peer stream");
            return;
        }
    };

    let hello: ClientMessage = match read_frame(&mut reader) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(error = %e, "handshake read failed");
            return;
        }
    };

    let ClientMessage::Hello {
        protocol_version,
        peer_name,
        content_hash,
        session_password,
    } = hello
    else {
        debug!("first message was not Hello, dropping connection");
        return;
    };

    let write_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "could not clone peer stream");
            return;
        }
    };

    match session.add_peer(
        peer_name.clone(),
        protocol_version,
        content_hash,
        session_password,
        write_stream,
    ) {
        Ok(peer_id) => {
            stream.set_read_timeout(None).ok();
            let tx_reader = tx.clone();
            let keep_running_reader = keep_running.clone();
            thread::spawn(move || {
                reader_loop(reader, peer_id, tx_reader, keep_running_reader);
            });
        }
        Err(rejection) => {
            info!(peer = %peer_name, %rejection, "join rejected");
            let rejected = ServerMessage::Rejected {
                reason: rejection.to_string(),
            };
            let mut writer = BufWriter::new(stream);
            let _ = write_frame(&mut writer, &rejected);
        }
    }
}

/// Reader loop for a single peer. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    peer_id: PeerId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_frame::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::Goodbye) => break,
            Ok(message) => {
                if tx.send(InternalEvent::MessageFrom { peer_id, message }).is_err() {
                    return;
                }
            }
            Err(e) => {
                log_read_error(peer_id, &e);
                break;
            }
        }
    }
    let _ = tx.send(InternalEvent::Disconnected { peer_id });
}

fn log_read_error(peer_id: PeerId, e: &FrameError) {
    if e.is_disconnect() {
        debug!(peer = peer_id.0, "peer disconnected");
    } else {
        warn!(peer = peer_id.0, error = %e, "malformed frame, dropping peer");
    }
}

fn handle_message(session: &mut Session, peer_id: PeerId, message: ClientMessage) {
    match message {
        ClientMessage::Update { envelope } => session.forward_update(peer_id, envelope),
        ClientMessage::Checksum { sequence, hash } => {
            session.record_checksum(peer_id, sequence, hash);
        }
        ClientMessage::StartBattle { seed } => session.start_battle(peer_id, seed),
        ClientMessage::EndBattle => session.end_battle(peer_id),
        ClientMessage::Chat { text } => session.chat(peer_id, text),
        ClientMessage::Hello { .. } | ClientMessage::Goodbye => {
            // Hello is handled during connection setup, Goodbye in the reader loop.
        }
    }
}

// TCP client for connecting a battle peer to the relay.
//
// Architecture:
// - `connect()` performs TCP connect + Hello handshake on the calling thread,
//   then spawns a background reader thread.
// - The reader thread calls `read_frame()` in a loop and pushes each
//   `ServerMessage` into an `mpsc` channel.
// - The write half is shared between `NetClient` and any `RelayChannel`
//   handed to a host `BattleContext`, so envelopes and control messages go
//   out over the same ordered stream.
// - `poll()` drains the inbox non-blocking; `recv_timeout()` waits for one
//   message.
//
// The writer flushes synchronously after each frame, which is fine for the
// small messages a battle produces.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use skirmish_battle::{ChannelError, ReplicationChannel};
use skirmish_protocol::{
    AbsoluteSide, ClientMessage, FrameError, PROTOCOL_VERSION, PeerId, PeerInfo, ServerMessage,
    UpdateEnvelope, UpdateSequence, read_frame, write_frame,
};
use thiserror::Error;
use tracing::debug;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

type SharedWriter = Arc<Mutex<BufWriter<TcpStream>>>;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("connect failed: {0}")]
    Connect(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("unexpected response: {0}")]
    Unexpected(String),
    #[error("connection closed")]
    Closed,
}

/// Information returned by a successful `connect()` handshake.
#[derive(Clone, Debug)]
pub struct WelcomeInfo {
    pub peer_id: PeerId,
    pub session_name: String,
    pub side: AbsoluteSide,
    pub peers: Vec<PeerInfo>,
}

/// TCP client for relay communication.
pub struct NetClient {
    writer: SharedWriter,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
    peer_id: PeerId,
}

impl NetClient {
    /// Connect to a relay, perform the Hello handshake, and spawn a reader
    /// thread.
    pub fn connect(
        addr: &str,
        peer_name: &str,
        content_hash: u64,
        password: Option<String>,
    ) -> Result<(Self, WelcomeInfo), LinkError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;

        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        let hello = ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            peer_name: peer_name.into(),
            content_hash,
            session_password: password,
        };
        write_frame(&mut writer, &hello)?;

        let welcome = match read_frame::<_, ServerMessage>(&mut reader)? {
            ServerMessage::Welcome {
                peer_id,
                session_name,
                side,
                peers,
            } => WelcomeInfo {
                peer_id,
                session_name,
                side,
                peers,
            },
            ServerMessage::Rejected { reason } => return Err(LinkError::Rejected(reason)),
            other => return Err(LinkError::Unexpected(format!("{other:?}"))),
        };

        reader.get_ref().set_read_timeout(None)?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok((
            Self {
                writer: Arc::new(Mutex::new(writer)),
                inbox: rx,
                _reader_thread: Some(reader_thread),
                peer_id: welcome.peer_id,
            },
            welcome.clone(),
        ))
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// A `ReplicationChannel` that publishes envelopes over this
    /// connection. Hand it to a host `BattleContext`.
    pub fn update_channel(&self) -> RelayChannel {
        RelayChannel {
            writer: Arc::clone(&self.writer),
        }
    }

    pub fn send_checksum(&self, sequence: UpdateSequence, hash: u64) -> Result<(), LinkError> {
        self.send(&ClientMessage::Checksum { sequence, hash })
    }

    /// Host only.
    pub fn send_start_battle(&self, seed: u64) -> Result<(), LinkError> {
        self.send(&ClientMessage::StartBattle { seed })
    }

    /// Host only.
    pub fn send_end_battle(&self) -> Result<(), LinkError> {
        self.send(&ClientMessage::EndBattle)
    }

    pub fn send_chat(&self, text: &str) -> Result<(), LinkError> {
        self.send(&ClientMessage::Chat { text: text.into() })
    }

    /// Send Goodbye. The relay closes the session slot on receipt.
    pub fn disconnect(&self) {
        if let Err(e) = self.send(&ClientMessage::Goodbye) {
            debug!(error = %e, "goodbye not delivered");
        }
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Wait up to `timeout` for the next server message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<ServerMessage>, LinkError> {
        match self.inbox.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::Closed),
        }
    }

    fn send(&self, msg: &ClientMessage) -> Result<(), LinkError> {
        let mut writer = self.writer.lock().map_err(|_| LinkError::Closed)?;
        write_frame(&mut *writer, msg)?;
        Ok(())
    }
}

/// Publishes host envelopes to the relay as `ClientMessage::Update`.
#[derive(Clone)]
pub struct RelayChannel {
    writer: SharedWriter,
}

impl std::fmt::Debug for RelayChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayChannel").finish_non_exhaustive()
    }
}

impl ReplicationChannel for RelayChannel {
    fn send(&mut self, envelope: &UpdateEnvelope) -> Result<(), ChannelError> {
        let msg = ClientMessage::Update {
            envelope: envelope.clone(),
        };
        let mut writer = self.writer.lock().map_err(|_| ChannelError::Closed)?;
        write_frame(&mut *writer, &msg)?;
        Ok(())
    }
}

/// Reader thread: read frames in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    loop {
        match read_frame::<_, ServerMessage>(&mut reader) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break;
                }
            }
            Err(e) => {
                if !e.is_disconnect() {
                    debug!(error = %e, "relay stream ended");
                }
                break;
            }
        }
    }
}

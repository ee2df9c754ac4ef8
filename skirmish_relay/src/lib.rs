// skirmish_relay — TCP relay that carries host battle updates to guests.
//
// The relay is a thin broker. It accepts TCP connections from battle peers,
// makes the first joiner the host, and forwards every `Update` the host
// sends to the guests in arrival order. It never interprets an envelope's
// outcome and never runs battle logic; all computation stays on the host.
//
// Module overview:
// - `session.rs`: Session state: peer roster, host assignment, update
//                 forwarding and duplicate filtering, checksum-based desync
//                 detection. The core data structure `server.rs` drives.
// - `server.rs`:  TCP listener, reader threads (one per peer), and the main
//                 event loop funnelling events into the single-threaded
//                 `Session` through an `mpsc` channel.
// - `client.rs`:  `NetClient` for peers, plus `RelayChannel`, the TCP
//                 `ReplicationChannel` a host battle context publishes into.
//
// The relay can run as a standalone binary (`main.rs`) or be embedded in a
// process via the library API (`start_relay`).

pub mod client;
pub mod server;
pub mod session;

pub use client::{LinkError, NetClient, RelayChannel, WelcomeInfo};
pub use server::{RelayConfig, RelayHandle, start_relay};
pub use session::{JoinRejection, Session};

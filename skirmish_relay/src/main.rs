// `relay` binary: hosts one Skirmish battle session.
//
// The first peer to join becomes the host; later peers are guests. Only the
// host's updates are forwarded, in sequence order, and peers whose checksums
// disagree are told `DesyncDetected`. Wiring lives in `server.rs`, session
// rules in `session.rs`.

use std::str::FromStr;

use skirmish_relay::server::{RelayConfig, start_relay};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
relay: forwards a Skirmish host's battle updates to its guests

USAGE:
    relay [--port <PORT>] [--name <NAME>] [--password <PASS>] [--max-peers <N>]

OPTIONS:
    --port <PORT>       TCP port to listen on; 0 picks a free one [default: 7979]
    --name <NAME>       Session name sent to peers in Welcome [default: skirmish-battle]
    --password <PASS>   Reject a Hello that does not carry this password
    --max-peers <N>     Host plus guests, at least 2 [default: 2]
    -h, --help          Print this text

The first peer to join is the host. Guests must present the same protocol
version and config content hash. Set RUST_LOG to change verbosity
(default: info).";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match parse_args(std::env::args().skip(1)) {
        Ok(Some(config)) => config,
        Ok(None) => {
            println!("{USAGE}");
            return;
        }
        Err(msg) => {
            eprintln!("{msg}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let (handle, addr) = match start_relay(config) {
        Ok(started) => started,
        Err(e) => {
            error!(error = %e, "failed to start relay");
            std::process::exit(1);
        }
    };
    info!(%addr, "waiting for a host");

    // Runs until the process is killed.
    handle.join();
}

/// `Ok(None)` means help was requested.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<RelayConfig>, String> {
    let mut config = RelayConfig::default();
    let mut args = args.into_iter();
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--port" => config.port = value(&flag, args.next())?,
            "--name" => config.session_name = value(&flag, args.next())?,
            "--password" => config.password = Some(value(&flag, args.next())?),
            "--max-peers" => {
                config.max_peers = value(&flag, args.next())?;
                if config.max_peers < 2 {
                    return Err("--max-peers must be at least 2".into());
                }
            }
            "-h" | "--help" => return Ok(None),
            other => return Err(format!("unknown argument `{other}`")),
        }
    }
    Ok(Some(config))
}

fn value<T: FromStr>(flag: &str, raw: Option<String>) -> Result<T, String> {
    let raw = raw.ok_or_else(|| format!("{flag} needs a value"))?;
    raw.parse()
        .map_err(|_| format!("{flag}: `{raw}` is not a valid value"))
}

//! slircd-switchboard demo
//!
//! Wires a few in-memory connections to writer tasks and replays a short
//! scripted sequence through the delivery pipeline: capability negotiation,
//! a relayed PRIVMSG with client tags, and a batched netjoin.

use anyhow::Context as _;
use slircd_switchboard::batch::{BATCH_MANAGER_SERVICE, Batch, BatchManager};
use slircd_switchboard::caps::{CAP_MANAGER_SERVICE, CapManager};
use slircd_switchboard::config::{self, Config};
use slircd_switchboard::message::{Message, MessageSource};
use slircd_switchboard::state::Connection;
use slircd_switchboard::{Switchboard, bootstrap, metrics, telemetry};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "switchboard.toml".to_string());

    let (config, load_error) = match Config::load(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    telemetry::init(&config.log);
    if let Some(e) = load_error {
        warn!(path = %config_path, error = %e, "Failed to load config, using defaults");
    }

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s)", errors.len());
    }

    metrics::init();

    info!(
        server = %config.server.name,
        network = %config.server.network,
        "Starting slircd-switchboard"
    );

    let switchboard = Switchboard::new(&config)?;
    bootstrap::load_core(&switchboard)?;

    let caps = switchboard
        .services()
        .get::<CapManager>(CAP_MANAGER_SERVICE)
        .context("capability manager not loaded")?;
    let batches = switchboard
        .services()
        .get::<BatchManager>(BATCH_MANAGER_SERVICE)
        .context("batch manager not loaded")?;

    let mut writers = Vec::new();
    let mut connect = |nick: &str, host: &str| {
        let (conn, mut rx) = switchboard.connect(nick, nick, host);
        let id = conn.id();
        let handle: JoinHandle<()> = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                info!(conn = %id, line = %String::from_utf8_lossy(&line).trim_end(), "->");
            }
        });
        writers.push(handle);
        conn
    };
    let alice = connect("alice", "straylight.net");
    let bob = connect("bob", "freeside.org");
    let carol = connect("carol", "chiba.jp");

    // Negotiation
    info!(caps = ?caps.ls(&alice, Some(302)), "alice CAP LS 302");
    info!(reply = ?caps.request(&alice, "batch server-time message-tags"), "alice CAP REQ");
    info!(reply = ?caps.request(&bob, "no-such-cap"), "bob CAP REQ");
    info!(reply = ?caps.request(&carol, "server-time"), "carol CAP REQ");

    let everyone: Vec<Arc<Connection>> = vec![Arc::clone(&alice), Arc::clone(&bob), Arc::clone(&carol)];

    // A client-tagged PRIVMSG relayed to the channel, not echoed to alice.
    if let Some(serializer) = alice.serializer() {
        match serializer.parse(&alice, "@+draft/react=wave;time=forged PRIVMSG #straylight :hello, world\r\n") {
            Ok(parsed) => {
                let mut message = parsed.into_message();
                message.set_source(MessageSource::user(&alice));
                message.set_side_effect(true);
                let mut event = switchboard.event("event/PRIVMSG", message)?;
                let report = switchboard.broadcast(&everyone, &mut event);
                info!(delivered = report.delivered, lines = report.lines, "PRIVMSG relayed");
            }
            Err(e) => warn!(error = %e, "PRIVMSG dropped"),
        }
    }

    // A netjoin batch: framing only reaches clients that see batched lines.
    let netjoin = Batch::new("netjoin", &["irc.straylight.net", "irc.freeside.org"]);
    batches.start(&netjoin);
    for nick in ["case", "molly", "riviera"] {
        let mut join = Message::with_source(
            MessageSource::literal(&format!("{nick}!{nick}@freeside.org")),
            "JOIN",
        )
        .param("#straylight");
        netjoin.add_to_batch(&mut join);
        let mut event = switchboard.event("event/JOIN", join)?;
        switchboard.broadcast(&everyone, &mut event);
    }
    batches.end(&switchboard, &netjoin);

    for conn in &everyone {
        switchboard.disconnect(conn.id());
    }
    drop(everyone);
    drop((alice, bob, carol));
    drop(connect);
    for writer in writers {
        if let Err(e) = writer.await {
            error!(error = %e, "writer task failed");
        }
    }

    tracing::debug!(metrics = %metrics::gather_metrics(), "final metrics");
    info!("Done");
    Ok(())
}

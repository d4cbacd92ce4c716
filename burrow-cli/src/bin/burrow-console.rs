//! Burrow console client
//!
//! Drives an interactive console session against an in-process echo peer
//! over a simulated lossy carrier. Everything typed on stdin is carried
//! through the full protocol (handshake, MSG exchange, retransmission)
//! and echoed back to stdout; EOF closes the session with a FIN.

use burrow_cli::ClientConfig;
use burrow_io::ConsoleDriver;
use burrow_protocol::{Driver, Packet, PacketKind, Session, SessionConfig, SessionOptions};
use bytes::Bytes;
use clap::Parser;
use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "burrow-console")]
#[command(about = "Interactive burrow session over a simulated lossy carrier", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Session name advertised in the handshake
    #[arg(short, long)]
    name: Option<String>,

    /// Fixed initial sequence number (testing only)
    #[arg(long)]
    isn: Option<u16>,

    /// Delay between transmission attempts in milliseconds
    #[arg(long)]
    retransmit_delay_ms: Option<u64>,

    /// Maximum frame size the carrier accepts
    #[arg(long)]
    max_frame: Option<usize>,

    /// Fraction of frames the simulated carrier drops (0.0 to 1.0)
    #[arg(long)]
    drop_rate: Option<f64>,

    /// Log every constructed and parsed frame
    #[arg(long)]
    trace: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Echo peer: whatever its session receives it queues straight back for
/// sending, so the console side sees its own bytes round-tripped.
#[derive(Default)]
struct EchoDriver {
    pending: VecDeque<u8>,
    closed: bool,
}

impl Driver for EchoDriver {
    fn get_outgoing(&mut self, max_len: usize) -> Option<Bytes> {
        if self.closed {
            return None;
        }
        let n = max_len.min(self.pending.len());
        Some(Bytes::from(self.pending.drain(..n).collect::<Vec<u8>>()))
    }

    fn data_received(&mut self, data: &[u8]) {
        self.pending.extend(data.iter().copied());
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Simulated loss. Only MSG frames are eligible: SYNs have to cross
/// during the simultaneous open and the FIN is only ever sent once;
/// anything a MSG carries is covered by retransmission.
fn carrier_drops(config: &ClientConfig, frame: &Bytes) -> bool {
    if config.drop_rate <= 0.0 {
        return false;
    }
    let is_msg = matches!(
        Packet::from_bytes(frame, SessionOptions::default()).map(|p| p.kind()),
        Ok(PacketKind::Msg)
    );
    is_msg && rand::random::<f64>() < config.drop_rate
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };

    if let Some(name) = &args.name {
        config.name = Some(name.clone());
    }
    if let Some(isn) = args.isn {
        config.isn = Some(isn);
    }
    if let Some(delay) = args.retransmit_delay_ms {
        config.retransmit_delay_ms = delay;
    }
    if let Some(max_frame) = args.max_frame {
        config.max_frame = max_frame;
    }
    if let Some(rate) = args.drop_rate {
        config.drop_rate = rate;
    }
    if args.trace {
        config.packet_trace = true;
    }

    if !(0.0..1.0).contains(&config.drop_rate) {
        anyhow::bail!("drop rate must be in [0.0, 1.0), got {}", config.drop_rate);
    }

    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(if args.verbose { "debug" } else { "info" })
        });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(&args)?;

    tracing::info!("Burrow console client starting...");
    if config.drop_rate > 0.0 {
        tracing::info!("Simulated carrier dropping {:.0}% of frames", config.drop_rate * 100.0);
    }

    let delay = Duration::from_millis(config.retransmit_delay_ms);

    let mut local = Session::new(
        Box::new(ConsoleDriver::new()),
        SessionConfig {
            name: config.name.clone(),
            initial_seq: config.isn,
            retransmit_delay: delay,
            packet_trace: config.packet_trace,
            ..SessionConfig::default()
        },
    );
    let mut peer = Session::new(
        Box::new(EchoDriver::default()),
        SessionConfig {
            retransmit_delay: delay,
            packet_trace: config.packet_trace,
            ..SessionConfig::default()
        },
    );

    tracing::info!("Type away; EOF (Ctrl-D) closes the session");

    // Both sides open simultaneously: the two SYNs cross on the carrier.
    // From then on frames alternate strictly, each side answering the
    // other's latest, the way a query/response carrier sequences them.
    let syn_local = local.poll_outgoing(config.max_frame);
    let syn_peer = peer.poll_outgoing(config.max_frame);
    if let Some(frame) = syn_local {
        peer.handle_incoming(&frame)?;
    }
    if let Some(frame) = syn_peer {
        local.handle_incoming(&frame)?;
    }

    loop {
        if let Some(frame) = local.poll_outgoing(config.max_frame) {
            if carrier_drops(&config, &frame) {
                tracing::debug!("carrier dropped a frame ({} bytes)", frame.len());
            } else {
                peer.handle_incoming(&frame)?;
            }
        }

        if let Some(frame) = peer.poll_outgoing(config.max_frame) {
            if carrier_drops(&config, &frame) {
                tracing::debug!("carrier dropped a frame ({} bytes)", frame.len());
            } else {
                local.handle_incoming(&frame)?;
            }
        }

        if local.is_shutdown() && peer.is_shutdown() {
            break;
        }

        thread::sleep(Duration::from_millis(20));
    }

    let stats = local.stats();
    tracing::info!(
        "Session closed: {} frames sent, {} frames received, {} bytes delivered, {} frames dropped",
        stats.frames_sent,
        stats.frames_received,
        stats.bytes_received,
        stats.frames_dropped
    );

    Ok(())
}

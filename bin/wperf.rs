use clap::Parser;
use std::{net::TcpListener, time::{Duration, Instant}};
use tcp_lite::{ClientConfig, SocketClient};
use tracing_subscriber::filter::EnvFilter;

fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    (bytes * 8) as f64 / elapsed.as_secs_f64().max(f64::EPSILON) / 1e6
}

fn run_client_mode(args: Args) {
    let config = ClientConfig::default().with_nodelay(args.nodelay);
    let mut client = match SocketClient::with_config(config) {
        Ok(client) => client,
        Err(e) => {
            println!("{e}");
            return;
        }
    };
    if let Err(e) = client.connect(&args.address, args.port) {
        println!("{e}");
        return;
    }
    println!("Connected successfully to {}:{}", args.address, args.port);

    let buf = vec![42u8; args.size];
    let sampling_period = Duration::from_secs(args.period);
    let session = Instant::now();
    let mut sample = Instant::now();
    let (mut sampled, mut total) = (0u64, 0u64);
    while client.write(&buf) {
        sampled += buf.len() as u64;
        total += buf.len() as u64;
        if sample.elapsed() >= sampling_period {
            println!("[{}]: {:.2} Mbps", client.id(), mbps(sampled, sample.elapsed()));
            sample = Instant::now();
            sampled = 0;
        }
    }
    println!(
        "Connection lost after {total} bytes, {:.2} Mbps on average",
        mbps(total, session.elapsed())
    );
}

/// Drains one writer at a time and reports its totals once it goes away.
fn run_sink_mode(args: Args) -> std::io::Result<()> {
    let listener = TcpListener::bind((args.address.as_str(), args.port))?;
    println!("Sink listening on {}", listener.local_addr()?);
    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Failed to accept connection: {e}");
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "unknown peer".to_string(), |addr| addr.to_string());
        let started = Instant::now();
        match std::io::copy(&mut stream, &mut std::io::sink()) {
            Ok(total) => println!(
                "{peer}: {total} bytes in {:.1?}, {:.2} Mbps",
                started.elapsed(),
                mbps(total, started.elapsed())
            ),
            Err(e) => println!("{peer}: dropped after {:.1?}: {e}", started.elapsed()),
        }
    }
    Ok(())
}

fn init_env_filter(env_filter: EnvFilter) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_level(true)
        .with_target(true);

    let subscriber = subscriber.finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() {
    tracing_log::LogTracer::init().expect("Failed to set logger");

    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        init_env_filter(env_filter);
    }

    let args = Args::parse();
    if args.client {
        run_client_mode(args);
    } else if let Err(e) = run_sink_mode(args) {
        println!("Sink failed: {e}");
    }
}

/// Write throughput benchmark for SocketClient against a plain TCP sink
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Run as the writing client instead of the sink
    #[arg(short, long)]
    client: bool,
    /// The IPv4 address to listen on or connect to, depending on the mode.
    #[arg(short, long)]
    address: String,
    /// The port to listen on or connect to
    #[arg(short, long)]
    port: u16,
    /// The write buffer size
    #[arg(short, long, default_value = "65536")]
    size: usize,
    /// The client's sampling period in seconds
    #[arg(long, default_value = "1")]
    period: u64,
    /// Set TCP_NODELAY on the client socket
    #[arg(short, long)]
    nodelay: bool,
}

use clap::Parser;
use std::io::{BufRead, Write};
use std::sync::mpsc::{self, TryRecvError};
use std::time::Duration;
use tcp_lite::{ClientConfig, ReadOutcome, SocketClient};
use tracing_subscriber::filter::EnvFilter;

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

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize log bridge to capture log crate messages - MUST be first!
    tracing_log::LogTracer::init()?;

    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        init_env_filter(env_filter);
    }

    let args = Args::parse();
    let mut config = ClientConfig::default().with_read_buffer_size(args.size);
    if let Some(ms) = args.deadline {
        config = config.with_write_deadline(Duration::from_millis(ms));
    }

    let mut client = SocketClient::with_config(config)?;
    client.connect(&args.address, args.port)?;
    println!("Connected successfully to {}:{}", args.address, args.port);

    // The client stays on this thread, stdin is drained on its own.
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {e}");
                    break;
                }
            }
        }
    });

    let mut stdout = std::io::stdout();
    let mut input_open = true;
    while client.is_connected() {
        while input_open {
            match rx.try_recv() {
                Ok(mut line) => {
                    line.push('\n');
                    if !client.write(line.as_bytes()) {
                        println!("Failed to write, connection lost");
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!("Stdin closed");
                    input_open = false;
                }
            }
        }
        if !client.is_connected() {
            break;
        }

        match client.read()? {
            ReadOutcome::Data(bytes) => {
                stdout.write_all(&bytes)?;
                stdout.flush()?;
            }
            ReadOutcome::NoData => tcp_lite::sleep(args.period),
            ReadOutcome::Closed => println!("Connection closed by remote peer"),
        }
    }
    Ok(())
}

/// A line oriented client: forwards stdin to the peer and prints what it sends back.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The IPv4 address of the peer
    #[arg(short, long)]
    address: String,
    /// The port of the peer
    #[arg(short, long)]
    port: u16,
    /// The read buffer size
    #[arg(short, long, default_value = "8192")]
    size: usize,
    /// Polling period in milli-sec when nothing is received
    #[arg(long, default_value = "10")]
    period: u64,
    /// Give up on a write after this many milli-sec
    #[arg(short, long)]
    deadline: Option<u64>,
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use meeting_scribe::transcript::format_elapsed;
use meeting_scribe::{
    Config, MemorySummary, MemoryTranscript, RecordingController, WavFileDevice, WsTransport,
};
use tracing::{info, warn};

/// Stream a WAV file to the transcription server and print the live
/// transcript, the way the recorder UI would.
#[derive(Debug, Parser)]
#[command(name = "meeting-scribe", version)]
struct Args {
    /// Config file name, without extension
    #[arg(long, default_value = "config/meeting-scribe")]
    config: String,

    /// Override the transcription server URL (e.g. ws://localhost:8765)
    #[arg(long)]
    server: Option<String>,

    /// 16kHz mono WAV file to stream as the input device
    #[arg(long)]
    input: PathBuf,

    /// Stop automatically after this many seconds
    #[arg(long)]
    duration: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(server) = args.server {
        cfg.server.url = server;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Transcription endpoint: {}", cfg.endpoint_url());

    let transcript = MemoryTranscript::new();
    let summary = MemorySummary::new();

    let mut controller = RecordingController::new(
        cfg.recorder_config(),
        WsTransport,
        Box::new(WavFileDevice::new(&args.input)),
        Box::new(transcript.clone()),
        Box::new(summary.clone()),
    );

    controller.start().await?;

    match args.duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Interrupted");
        }
    }

    controller.stop().await?;

    while let Some(e) = controller.try_next_error() {
        warn!("Recording warning: {}", e);
    }

    let stats = controller.stats();
    info!(
        "Recorded {}, {} frames, {} transcript segments",
        format_elapsed(stats.elapsed_secs),
        stats.frames_captured,
        stats.segments_delivered
    );

    for segment in transcript.snapshot() {
        println!("[{}] {}: {}", segment.timestamp, segment.speaker, segment.text);
    }
    if let Some(text) = summary.get() {
        println!("\nSummary: {}", text);
    }
    if let Some(artifact) = controller.artifact() {
        info!("Audio saved to {:?}", artifact.file_path);
    }

    Ok(())
}

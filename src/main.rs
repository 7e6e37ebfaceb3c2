use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};

use subweld::config::Config;
use subweld::pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("subweld=info,warn")
        .init();

    let matches = Command::new("subweld")
        .version("0.1.0")
        .about("Combines a video and an audio track and burns in transcription-derived subtitles")
        .arg(
            Arg::new("video")
                .short('i')
                .long("video")
                .value_name("FILE")
                .help("Video input file")
                .required(true),
        )
        .arg(
            Arg::new("audio")
                .short('a')
                .long("audio")
                .value_name("FILE")
                .help("Audio input file")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file (defaults to the configured name next to the video)"),
        )
        .arg(
            Arg::new("no-srt")
                .long("no-srt")
                .help("Skip writing the SRT sidecar")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let video_path = PathBuf::from(matches.get_one::<String>("video").unwrap());
    let audio_path = PathBuf::from(matches.get_one::<String>("audio").unwrap());

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    if matches.get_flag("no-srt") {
        config.subtitles.write_srt_sidecar = false;
    }

    if !video_path.exists() {
        error!("Video input does not exist: {}", video_path.display());
        return Err(anyhow::anyhow!("video input not found"));
    }
    if !audio_path.exists() {
        error!("Audio input does not exist: {}", audio_path.display());
        return Err(anyhow::anyhow!("audio input not found"));
    }

    let pipeline = Pipeline::new(config)?;

    let output_path = match matches.get_one::<String>("output") {
        Some(path) => PathBuf::from(path),
        None => {
            let dir = video_path.parent().unwrap_or_else(|| std::path::Path::new("."));
            pipeline.default_output_path(dir)
        }
    };

    info!("🚀 subweld starting...");
    info!("📹 Video: {}", video_path.display());
    info!("🎵 Audio: {}", audio_path.display());
    info!("📂 Output: {}", output_path.display());

    let outcome = pipeline.run(&video_path, &audio_path, &output_path).await?;

    info!(
        "🎉 Done in {:.1}s: {} cues burned into {}",
        outcome.processing_time.as_secs_f64(),
        outcome.cues.len(),
        outcome.composition.output_path.display()
    );
    if let Some(srt) = outcome.srt_path {
        info!("💬 Subtitles also available at {}", srt.display());
    }

    Ok(())
}

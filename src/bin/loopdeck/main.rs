//! loopdeck - play a composition on the default output device
//!
//! Run with: cargo run -- demo/composition.json --audio stem.wav

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use loopdeck::{Engine, EngineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loopdeck")]
#[command(about = "Loop a layered composition through the playback engine", long_about = None)]
struct Cli {
    /// Composition JSON file
    composition: PathBuf,

    /// Recorded stem for the user-audio layer (wav, flac, ogg, mp3, m4a)
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// Engine configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to play before stopping
    #[arg(short, long, default_value = "16.0")]
    seconds: f64,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).wrap_err("failed to load engine config")?,
        None => EngineConfig::default(),
    };
    let json = std::fs::read_to_string(&cli.composition)
        .wrap_err_with(|| format!("failed to read {}", cli.composition.display()))?;

    let mut engine = Engine::new(config);
    if !engine.set_composition_json(&json) {
        return Err(eyre!("{} is not a valid composition", cli.composition.display()));
    }

    if let Some(path) = &cli.audio {
        let bytes = std::fs::read(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
        if !engine.load_user_audio(bytes) {
            // The engine keeps going, the user-audio layer just stays silent
            eprintln!("could not decode {}, continuing without it", path.display());
        }
    }

    engine.start();
    if !engine.is_playing() {
        return Err(eyre!("playback did not start (see log for the device error)"));
    }

    let seconds = if cli.seconds.is_finite() {
        cli.seconds.clamp(0.0, 86_400.0)
    } else {
        0.0
    };
    std::thread::sleep(Duration::from_secs_f64(seconds));

    engine.stop();
    // Let scheduled notes and the echo tail ring out
    std::thread::sleep(Duration::from_millis(1_500));
    engine.shutdown();
    Ok(())
}

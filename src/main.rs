//! mixvoice: mixed-script text-to-speech from the command line.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mixvoice::config::Config;
use mixvoice::voice::api::{self, ApiState};
use mixvoice::voice::history::History;
use mixvoice::voice::script::ScriptClass;
use mixvoice::{Services, VoiceOrchestrator};

#[derive(Parser, Debug)]
#[command(name = "mixvoice", about = "Mixed Thai/English text-to-speech")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Reference recording for voice cloning
    #[arg(short = 'r', long, global = true)]
    voice: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Speak text with one voice, detected from the text
    Speak {
        text: String,
        /// Output WAV path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Force a script class: primary or secondary
        #[arg(long)]
        class: Option<String>,
        /// Play after generation
        #[arg(long)]
        play: bool,
    },
    /// Speak mixed-script text, one voice per run
    Mixed {
        text: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        play: bool,
    },
    /// List available voices
    Voices,
    /// Play an audio file
    Play { path: PathBuf },
    /// Serve the HTTP API
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the synthesis report for a date (default: today)
    History { date: Option<String> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug,reqwest=warn,hyper=warn,hyper_util=warn")
    } else {
        EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::load(args.config.as_deref());
    if let Some(voice) = &args.voice {
        config.voices.reference_audio = Some(voice.clone());
    }

    if let Some(Command::History { date }) = &args.command {
        let date = date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        println!("{}", History::new(config.history.dir.clone()).report(&date));
        return Ok(());
    }

    let services = Services::from_config(&config);
    let voice = Arc::new(VoiceOrchestrator::new(&config, services)?);

    match args.command {
        Some(Command::Speak {
            text,
            output,
            class,
            play,
        }) => {
            let path = match class.as_deref() {
                Some(name) => {
                    let class = ScriptClass::from_str(name).ok_or_else(|| {
                        format!("unknown class '{name}', expected primary or secondary")
                    })?;
                    voice.speak_as(&text, class, output).await?
                }
                None => voice.speak(&text, output).await?,
            };
            println!("{}", path.display());
            if play {
                voice.play(Some(&path)).await?;
            }
        }
        Some(Command::Mixed { text, output, play }) => {
            let path = voice.speak_mixed(&text, output).await?;
            println!("{}", path.display());
            if play {
                voice.play(Some(&path)).await?;
            }
        }
        Some(Command::Voices) => {
            let listing = voice.list_voices();
            println!("Available voices:");
            println!("  primary: {}", listing.primary);
            match &listing.secondary_clone {
                Some(path) => println!("  secondary_clone: {}", path.display()),
                None => println!("  secondary_clone: (none)"),
            }
            println!("  secondary_fallback: {}", listing.secondary_fallback);
        }
        Some(Command::Play { path }) => voice.play(Some(&path)).await?,
        Some(Command::Serve { port }) => {
            let port = port.unwrap_or(config.api.port);
            api::serve(ApiState { voice }, port).await?;
        }
        Some(Command::History { .. }) => {}
        None => interactive(&voice).await?,
    }

    Ok(())
}

/// Read lines from stdin, speak each (mixed), play it.
async fn interactive(voice: &VoiceOrchestrator) -> Result<(), Box<dyn std::error::Error>> {
    info!("Interactive mode: type text to speak, 'quit' to exit");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if matches!(text.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }
        if text.is_empty() {
            continue;
        }

        match voice.speak_mixed(text, None).await {
            Ok(path) => {
                if let Err(e) = voice.play(Some(&path)).await {
                    tracing::warn!("{e}");
                }
            }
            Err(e) => tracing::warn!("{e}"),
        }
    }
    Ok(())
}

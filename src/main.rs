use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use subpipe::resolve::{Platform, SourceRequest};
use subpipe::{print_summary, Config, Pipeline};

#[derive(Parser)]
#[command(name = "subpipe")]
#[command(version, about = "Subtitle acquisition pipeline")]
#[command(
    long_about = "Resolve platform videos or local audio into time-aligned SRT subtitles, \
                  with chunked ASR, hotword correction and optional translation."
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline for a video URL or an uploaded file
    Process {
        /// Video URL (YouTube, Bilibili, AcFun)
        url: Option<String>,

        /// Local media file instead of a URL
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,

        /// Platform hint: youtube, bilibili, acfun, upload
        #[arg(short, long)]
        platform: Option<String>,

        /// Comma-separated user tags
        #[arg(short, long)]
        tags: Option<String>,

        /// Translate the result to this language code
        #[arg(long)]
        translate: Option<String>,

        /// Comma-separated user hotwords
        #[arg(long)]
        hotwords: Option<String>,

        /// Cap on the hotword list size
        #[arg(long)]
        max_hotwords: Option<usize>,

        /// Write the SRT here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Transcribe a local audio file to plain text
    Transcribe {
        /// Input audio/video file
        audio: PathBuf,

        /// Comma-separated hotwords
        #[arg(long)]
        hotwords: Option<String>,
    },

    /// Translate text through the configured provider chain
    Translate {
        text: String,

        /// Source language code
        #[arg(long, default_value = "en")]
        from: String,

        /// Target language code
        #[arg(long, default_value = "zh")]
        to: String,
    },

    /// Parse an SRT file and report its cues
    Parse {
        /// SRT file (or plain transcript)
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();
}

fn split_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn cancel_flag() -> Arc<AtomicBool> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let handle = cancelled.clone();
    ctrlc::set_handler(move || {
        if handle.load(Ordering::Relaxed) {
            std::process::exit(1);
        }
        eprintln!("\nCancelling... (press again to force quit)");
        handle.store(true, Ordering::Relaxed);
    })
    .ok();
    cancelled
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;
    let pipeline = Pipeline::new(config).with_progress(!cli.quiet);

    match cli.command {
        Command::Process {
            url,
            file,
            platform,
            tags,
            translate,
            hotwords,
            max_hotwords,
            output,
        } => {
            let mut request = match (url, file) {
                (Some(url), None) => SourceRequest::from_url(url),
                (None, Some(path)) => SourceRequest::from_file(path),
                _ => anyhow::bail!("Provide exactly one of a URL or --file"),
            };
            if let Some(platform) = platform {
                request.platform = Some(platform.parse::<Platform>()?);
            }
            request.tags = split_csv(tags);
            request.hotwords = split_csv(hotwords);
            request.translate_to = translate;
            request.max_hotwords = max_hotwords;

            let cancelled = cancel_flag();
            match pipeline.process(&request, cancelled).await {
                Ok(outcome) => {
                    let srt = outcome.srt.to_srt();
                    match &output {
                        Some(path) => {
                            std::fs::write(path, &srt)
                                .with_context(|| format!("writing {}", path.display()))?;
                            println!("Wrote {} cues to {}", outcome.srt.len(), path.display());
                        }
                        None => print!("{srt}"),
                    }
                    if let Some(translation) = &outcome.translation {
                        println!("\n--- translation ---\n{translation}");
                    }
                    if !cli.quiet {
                        print_summary(&outcome);
                    }
                    Ok(())
                }
                Err(e) => {
                    error!("Pipeline failed: {e}");
                    Err(anyhow::anyhow!("{e}"))
                }
            }
        }

        Command::Transcribe { audio, hotwords } => {
            if !audio.exists() {
                anyhow::bail!("Input file not found: {}", audio.display());
            }
            let hotwords = split_csv(hotwords);
            let cancelled = cancel_flag();
            let work_dir = tempfile::TempDir::new()?;
            let (transcript, info) = pipeline
                .transcribe_file(
                    &audio,
                    work_dir.path(),
                    if hotwords.is_empty() {
                        None
                    } else {
                        Some(hotwords.as_slice())
                    },
                    &cancelled,
                )
                .await?;
            println!("{}", transcript.text);
            if !cli.quiet {
                eprintln!(
                    "{:.1}s audio, {}/{} chunks{}",
                    info.duration_seconds,
                    transcript.chunks_succeeded,
                    transcript.chunks_total,
                    if transcript.partial { " (partial)" } else { "" }
                );
            }
            Ok(())
        }

        Command::Translate { text, from, to } => {
            let translated = pipeline.translator().translate(&text, &from, &to).await;
            println!("{translated}");
            Ok(())
        }

        Command::Parse { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let doc = subpipe::parse_srt(&content);
            if doc.is_empty() {
                anyhow::bail!("No valid cues found in {}", file.display());
            }
            print!("{}", doc.to_srt());
            if !cli.quiet {
                eprintln!("{} cues", doc.len());
            }
            Ok(())
        }
    }
}

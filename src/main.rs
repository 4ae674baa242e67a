use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use reading_tutor::audio::{
    AudioBackendConfig, AudioBackendFactory, AudioSink, AudioSource, BurstRecorder, NullSink,
    RawPcmFormat, WavDirSink,
};
use reading_tutor::fragments::{ChannelFragmentSource, LinkFragmentSource};
use reading_tutor::progression::{JsonFileStore, ProgressionStore, RewardCatalog};
use reading_tutor::session::{ReadingSession, SessionState, SessionStats};
use reading_tutor::tutor::{
    FallbackGenerator, Narrator, SpeechSynthesizer, TextGenerator, TutorLoop, WatsonSynthesizer,
    WatsonxGenerator,
};
use reading_tutor::{create_router, AppState, Config, NatsFragmentSource, RealtimeLink};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reading-tutor")]
#[command(about = "Read-aloud tutor with rewards and a realtime voice link")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/reading-tutor")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control API
    Serve,

    /// Read a passage aloud with the tutor
    Read {
        /// Passage text, or a path to a text file
        #[arg(short, long)]
        passage: String,

        /// Where recognized speech comes from
        #[arg(short, long, value_enum, default_value = "realtime")]
        source: SourceKind,

        /// WAV file used as the microphone (silence if omitted)
        #[arg(short, long)]
        audio: Option<PathBuf>,
    },

    /// Print the progression summary
    Progress,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    /// Realtime websocket link
    Realtime,
    /// Chunked audio over NATS
    Nats,
    /// Typed lines on standard input
    Stdin,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let progression = open_progression(&cfg).await?;

    let result = match cli.command {
        Command::Serve => serve(&cfg, Arc::clone(&progression)).await,
        Command::Read {
            passage,
            source,
            audio,
        } => read(&cfg, Arc::clone(&progression), &passage, source, audio).await,
        Command::Progress => {
            println!("{}", serde_json::to_string_pretty(&progression.summary())?);
            Ok(())
        }
    };

    // Earned rewards must reach disk even if the command failed
    progression
        .flush()
        .await
        .context("Failed to save progression")?;

    result
}

async fn open_progression(cfg: &Config) -> Result<Arc<ProgressionStore>> {
    let kv = JsonFileStore::new(&cfg.progression.data_dir)?;
    let store = ProgressionStore::new(Arc::new(kv), RewardCatalog::standard());
    store.load().await.context("Failed to load progression")?;
    Ok(Arc::new(store))
}

async fn serve(cfg: &Config, progression: Arc<ProgressionStore>) -> Result<()> {
    let session = ReadingSession::new(cfg.reading.to_session_config(), Arc::clone(&progression));
    let app = create_router(AppState::new(Arc::new(Mutex::new(session)), progression));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")
}

async fn read(
    cfg: &Config,
    progression: Arc<ProgressionStore>,
    passage: &str,
    source: SourceKind,
    audio: Option<PathBuf>,
) -> Result<()> {
    if let Some(outcome) = progression
        .record_daily_login(chrono::Local::now().date_naive())
        .await
    {
        info!("Daily login bonus: +{}", outcome.reward_granted);
    }

    let text = if Path::new(passage).is_file() {
        std::fs::read_to_string(passage).with_context(|| format!("Failed to read {}", passage))?
    } else {
        passage.to_string()
    };

    let mut session = ReadingSession::new(cfg.reading.to_session_config(), Arc::clone(&progression));
    if session.load_passage(&text) == SessionState::Empty {
        bail!("Passage contains no readable words");
    }
    let session_id = session.session_id().to_string();
    let session = Arc::new(Mutex::new(session));

    let sink = build_sink(cfg)?;

    let audio_source = audio.map_or(AudioSource::Silence, AudioSource::File);
    let stats = match source {
        SourceKind::Realtime => {
            let backend = AudioBackendFactory::create(audio_source, AudioBackendConfig::default())?;
            let capture = Arc::new(BurstRecorder::start(backend).await?);
            let link = RealtimeLink::new(cfg.link.to_link_config(), capture.clone(), sink);
            // Narration waits its turn behind the service's replies
            let narrator = Arc::new(build_narrator(cfg, link.playback_sink())?);

            let fragments = LinkFragmentSource::new(&link);
            link.connect().await?;
            link.start_recording();

            let tutor = TutorLoop::new(fragments, Arc::clone(&session), narrator);
            let stats = until_interrupted(tutor.run(), &session).await;

            link.disconnect().await;
            capture.stop().await?;
            stats
        }
        SourceKind::Nats => {
            let backend = AudioBackendFactory::create(audio_source, AudioBackendConfig::default())?;
            let fragments = NatsFragmentSource::start(&cfg.nats.url, session_id, backend).await?;
            let narrator = Arc::new(build_narrator(cfg, sink)?);

            let tutor = TutorLoop::new(fragments, Arc::clone(&session), narrator);
            until_interrupted(tutor.run(), &session).await
        }
        SourceKind::Stdin => {
            let narrator = Arc::new(build_narrator(cfg, sink)?);
            let (tx, rx) = mpsc::channel(16);
            tokio::spawn(async move {
                let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
            });

            let tutor = TutorLoop::new(ChannelFragmentSource::new(rx), Arc::clone(&session), narrator);
            until_interrupted(tutor.run(), &session).await
        }
    };

    info!(
        "Read {} of {} words ({:?})",
        stats.total_read, stats.word_count, stats.state
    );
    println!("{}", serde_json::to_string_pretty(&progression.summary())?);
    Ok(())
}

async fn until_interrupted(
    run: impl Future<Output = SessionStats>,
    session: &Arc<Mutex<ReadingSession>>,
) -> SessionStats {
    tokio::select! {
        stats = run => stats,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            session.lock().await.snapshot()
        }
    }
}

fn build_sink(cfg: &Config) -> Result<Arc<dyn AudioSink>> {
    Ok(match &cfg.tutor.reply_dir {
        Some(dir) => {
            let raw = RawPcmFormat {
                sample_rate: cfg.link.reply_sample_rate,
                channels: 1,
            };
            Arc::new(WavDirSink::new(dir, raw, true)?)
        }
        None => Arc::new(NullSink),
    })
}

fn build_narrator(cfg: &Config, sink: Arc<dyn AudioSink>) -> Result<Narrator> {
    let watsonx = &cfg.tutor.watsonx;
    let generator: Arc<dyn TextGenerator> = if watsonx.is_configured() {
        Arc::new(WatsonxGenerator::new(
            watsonx.api_key.clone(),
            watsonx.url.clone(),
            watsonx.project_id.clone(),
            watsonx.model_id.clone(),
        )?)
    } else {
        warn!("watsonx not configured, tutor will use canned replies");
        Arc::new(FallbackGenerator::new())
    };

    let tts = &cfg.tutor.tts;
    let synthesizer: Option<Arc<dyn SpeechSynthesizer>> = if tts.api_key.is_empty() {
        warn!("Watson TTS not configured, narration will only be logged");
        None
    } else {
        Some(Arc::new(WatsonSynthesizer::new(
            tts.api_key.clone(),
            tts.url.clone(),
            tts.voice.clone(),
        )?))
    };

    Ok(Narrator::new(generator, synthesizer, sink))
}

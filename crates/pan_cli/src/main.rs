use chrono::{Local, Timelike};
use clap::Parser;
use pan_core::config::{NewsSourceKind, PanConfig};
use pan_core::{CaptureError, NewsService, Reply};
use pan_memory::{SqliteMemory, StoreHandle};
use pan_perception::{
    DuckDuckGoClient, FallbackSearch, NewsApiClient, OpenWeatherClient, RssNewsSource,
    WikipediaClient,
};
use pan_reasoning::providers::{MockProvider, OpenAiClient};
use pan_reasoning::{Capabilities, CompletionParams, ConversationEngine, IdleLoop, LlmClient, LlmGenerator};
use pan_voice::{ConsoleSpeaker, LineMicrophone, SpeechToText, TextToSpeech};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pan", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "PAN_CONFIG", default_value = "pan.toml")]
    config: PathBuf,

    /// Path to the memory database (overrides the config)
    #[arg(short, long)]
    db: Option<String>,

    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long, env = "PAN_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Never speak up unprompted
    #[arg(long)]
    no_idle: bool,
}

fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "pan.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .init();
    guard
}

async fn open_store(path: &str) -> StoreHandle {
    match SqliteMemory::new(path).await {
        Ok(db) => StoreHandle::new(Arc::new(db)),
        Err(e) => {
            warn!("Memory store unavailable ({:#}); running with short-term memory only", e);
            StoreHandle::offline()
        }
    }
}

fn build_capabilities(config: &PanConfig) -> Capabilities {
    let timeout = Duration::from_secs(config.capabilities.timeout_secs);
    let mut caps = Capabilities::none(timeout);

    match OpenWeatherClient::new(&config.weather.base_url, config.weather.api_key.clone(), timeout) {
        Ok(client) => caps.weather = Some(Arc::new(client)),
        Err(e) => warn!("Weather disabled: {:#}", e),
    }

    let news: anyhow::Result<Arc<dyn NewsService>> = match config.news.source {
        NewsSourceKind::NewsApi => NewsApiClient::new(
            &config.news.base_url,
            config.news.api_key.clone(),
            &config.news.country,
            timeout,
        )
        .map(|c| Arc::new(c) as Arc<dyn NewsService>),
        NewsSourceKind::Rss => RssNewsSource::new(&config.news.rss_url, timeout)
            .map(|c| Arc::new(c) as Arc<dyn NewsService>),
    };
    match news {
        Ok(client) => caps.news = Some(client),
        Err(e) => warn!("News disabled: {:#}", e),
    }

    let mut search = FallbackSearch::new();
    match DuckDuckGoClient::new(&config.search.base_url, config.search.max_results, timeout) {
        Ok(client) => search = search.with("duckduckgo", Arc::new(client)),
        Err(e) => warn!("DuckDuckGo search disabled: {:#}", e),
    }
    if !config.search.fallback_url.is_empty() {
        match WikipediaClient::new(&config.search.fallback_url, timeout) {
            Ok(client) => search = search.with("wikipedia", Arc::new(client)),
            Err(e) => warn!("Wikipedia fallback disabled: {:#}", e),
        }
    }
    if search.is_empty() {
        warn!("Search disabled: no provider available");
    } else {
        caps.search = Some(Arc::new(search));
    }

    let llm: Option<Arc<dyn LlmClient>> = match config.llm.provider.as_str() {
        "mock" => Some(Arc::new(MockProvider::new(&config.llm.model))),
        "none" => None,
        "openai" => match OpenAiClient::new(&config.llm, timeout) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Generation disabled: {:#}", e);
                None
            }
        },
        other => {
            warn!("Unknown LLM provider '{}', generation disabled", other);
            None
        }
    };
    if let Some(client) = llm {
        info!("Generation via {} ({})", client.name(), config.llm.model);
        let params = CompletionParams {
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        };
        caps.generator = Some(Arc::new(LlmGenerator::new(client, params)));
    }

    caps
}

/// Capture one utterance, retrying on silence. `None` once input is closed.
async fn listen(mic: &dyn SpeechToText, retries: u32) -> Option<String> {
    for attempt in 1..=retries.max(1) {
        match mic.capture().await {
            Ok(text) => return Some(text),
            Err(CaptureError::NoSpeechDetected) => {
                tracing::debug!("No speech detected (attempt {}/{})", attempt, retries);
            }
            Err(CaptureError::Recognition(reason)) => {
                warn!("Speech recognition failed: {}", reason);
            }
            Err(CaptureError::Closed) => return None,
        }
    }
    Some(String::new())
}

async fn say(speaker: &dyn TextToSpeech, reply: &Reply) {
    if let Err(e) = speaker.speak(&reply.text, &reply.tone).await {
        warn!("Could not speak reply: {}", e);
    }
}

/// Why the foreground conversation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    /// The user said goodbye.
    Exit,
    /// Input was closed.
    Closed,
    /// The interrupt future fired (Ctrl-C).
    Interrupted,
}

/// Listen, reply, repeat until the user leaves, input closes or `interrupt`
/// completes.
async fn converse<F: Future>(
    engine: &ConversationEngine,
    mic: &dyn SpeechToText,
    speaker: &dyn TextToSpeech,
    retries: u32,
    interrupt: F,
) -> Ending {
    tokio::pin!(interrupt);
    loop {
        let heard = tokio::select! {
            heard = listen(mic, retries) => heard,
            _ = &mut interrupt => return Ending::Interrupted,
        };
        let Some(utterance) = heard else {
            return Ending::Closed;
        };
        let reply = engine.handle(&utterance).await;
        say(speaker, &reply).await;
        if reply.exit {
            return Ending::Exit;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let _log_guard = init_logging(args.log_dir.as_deref());

    let mut config = PanConfig::load_or_default(&args.config);
    if let Some(db) = args.db {
        config.database.path = db;
    }
    if args.no_idle {
        config.idle.enabled = false;
    }

    info!("Initializing {}...", config.assistant.name);
    let store = open_store(&config.database.path).await;
    let caps = build_capabilities(&config);
    let retries = config.voice.listen_retries;
    let name = config.assistant.name.clone();
    let engine = Arc::new(ConversationEngine::new(config, store, caps).await);

    let speaker: Arc<dyn TextToSpeech> = Arc::new(ConsoleSpeaker::stdout(name));
    let mic = LineMicrophone::stdin();

    // Unprompted replies go through their own speaker task.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (reply_tx, mut reply_rx) = mpsc::channel::<Reply>(8);
    let idle = tokio::spawn(IdleLoop::new(engine.clone(), reply_tx, shutdown_rx).run());
    let idle_speaker = {
        let speaker = speaker.clone();
        tokio::spawn(async move {
            while let Some(reply) = reply_rx.recv().await {
                say(speaker.as_ref(), &reply).await;
            }
        })
    };

    let greeting = engine.greeting(Local::now().hour()).await;
    say(speaker.as_ref(), &greeting).await;

    let ending = converse(&engine, &mic, speaker.as_ref(), retries, tokio::signal::ctrl_c()).await;

    info!("Shutting down ({:?})", ending);
    if shutdown_tx.send(true).is_err() {
        tracing::debug!("Idle loop already stopped");
    }
    if let Err(e) = idle.await {
        error!("Idle loop panicked: {}", e);
    }
    // The idle loop dropped its sender; drain what is left.
    if let Err(e) = idle_speaker.await {
        error!("Idle speaker panicked: {}", e);
    }
    Ok(())
}

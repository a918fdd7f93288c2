use crate::router::{Command, CommandRouter};
use chrono::{DateTime, Utc};
use pan_core::sentiment::classify;
use pan_core::{
    CapabilityError, CommandKind, GenerationContext, Generator, Headline, NewsService, PanConfig,
    Reply, SearchHit, SearchService, Tone, WeatherReport, WeatherService,
};
use pan_expression::phrasing::{apply_tone, time_of_day_greeting};
use pan_expression::{ActivityClock, CuriosityQueue};
use pan_limbic::{MoodEngine, MoodEvent};
use pan_memory::{MemoryManager, ResolvedUser, StoreHandle, UserResolver};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

pub(crate) const CLARIFY: &str = "I didn't catch that. Could you please repeat?";

// ============================================================================
// Capabilities
// ============================================================================

/// External services the engine may call. Any of them may be missing.
#[derive(Clone)]
pub struct Capabilities {
    pub weather: Option<Arc<dyn WeatherService>>,
    pub news: Option<Arc<dyn NewsService>>,
    pub search: Option<Arc<dyn SearchService>>,
    pub generator: Option<Arc<dyn Generator>>,
    /// Upper bound on any single call.
    pub timeout: Duration,
}

impl Capabilities {
    pub fn none(timeout: Duration) -> Self {
        Self {
            weather: None,
            news: None,
            search: None,
            generator: None,
            timeout,
        }
    }

    async fn bounded<T, Fut>(&self, capability: &str, call: Fut) -> Result<T, CapabilityError>
    where
        Fut: Future<Output = Result<T, CapabilityError>>,
    {
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::timed_out(capability)),
        };
        if let Err(e) = &result {
            tracing::warn!("Capability call failed: {}", e);
        }
        result
    }

    pub async fn weather(&self, location: &str) -> Result<WeatherReport, CapabilityError> {
        let Some(service) = &self.weather else {
            return Err(CapabilityError::unavailable("weather", "not configured"));
        };
        self.bounded("weather", service.fetch_weather(location)).await
    }

    pub async fn news(&self, limit: usize) -> Result<Vec<Headline>, CapabilityError> {
        let Some(service) = &self.news else {
            return Err(CapabilityError::unavailable("news", "not configured"));
        };
        self.bounded("news", service.fetch_news(limit)).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CapabilityError> {
        let Some(service) = &self.search else {
            return Err(CapabilityError::unavailable("search", "not configured"));
        };
        self.bounded("search", service.web_search(query)).await
    }

    pub async fn generate(
        &self,
        prompt: &str,
        context: &GenerationContext,
    ) -> Result<String, CapabilityError> {
        let Some(generator) = &self.generator else {
            return Err(CapabilityError::unavailable("generation", "not configured"));
        };
        self.bounded("generation", generator.generate(prompt, context)).await
    }
}

// ============================================================================
// Core state
// ============================================================================

/// Everything mutable the foreground path owns. One instance per process,
/// always behind the engine's mutex.
pub struct CoreState {
    pub mood: MoodEngine,
    pub memory: MemoryManager,
    pub users: UserResolver,
    pub curiosity: CuriosityQueue,
}

/// What a handler produced, before tone framing.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub text: String,
    pub kind: CommandKind,
    pub remember: bool,
    pub exit: bool,
    /// Replaces the sentiment/affinity mood update for this turn.
    pub hold: Option<MoodEvent>,
}

impl Outcome {
    pub fn new(text: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            text: text.into(),
            kind,
            remember: false,
            exit: false,
            hold: None,
        }
    }

    pub fn remembered(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    pub fn holding(mut self, event: MoodEvent) -> Self {
        self.hold = Some(event);
        self
    }

    pub fn exiting(mut self) -> Self {
        self.exit = true;
        self
    }
}

/// Per-turn inputs shared by every handler.
pub(crate) struct Turn<'a> {
    pub utterance: &'a str,
    pub user: &'a ResolvedUser,
    pub now: DateTime<Utc>,
}

// ============================================================================
// Engine
// ============================================================================

pub struct ConversationEngine {
    pub(crate) state: Mutex<CoreState>,
    pub(crate) router: CommandRouter,
    pub(crate) caps: Capabilities,
    pub(crate) clock: Arc<ActivityClock>,
    pub(crate) store: StoreHandle,
    pub(crate) config: PanConfig,
}

impl ConversationEngine {
    pub async fn new(config: PanConfig, store: StoreHandle, caps: Capabilities) -> Self {
        Self::with_router(config, store, caps, CommandRouter::with_defaults()).await
    }

    pub async fn with_router(
        config: PanConfig,
        store: StoreHandle,
        caps: Capabilities,
        router: CommandRouter,
    ) -> Self {
        let memory = MemoryManager::new(
            config.conversation.short_term_capacity,
            config.conversation.long_term_limit,
            store.clone(),
        );
        memory.seed_opinions(&config.conversation.seed_opinions).await;

        let users = UserResolver::new(
            store.clone(),
            config.affinity.clone(),
            config.assistant.default_user.clone(),
            config.assistant.sticky_speaker,
        );
        let state = CoreState {
            mood: MoodEngine::new(config.mood.clone(), Utc::now()),
            memory,
            users,
            curiosity: CuriosityQueue::new(&config.idle.interests),
        };

        tracing::info!(
            "{} ready (store {})",
            config.assistant.name,
            if store.is_degraded() { "offline" } else { "online" }
        );

        Self {
            state: Mutex::new(state),
            router,
            caps,
            clock: Arc::new(ActivityClock::new()),
            store,
            config,
        }
    }

    pub fn clock(&self) -> Arc<ActivityClock> {
        self.clock.clone()
    }

    pub fn config(&self) -> &PanConfig {
        &self.config
    }

    /// Direct access to the core state, mainly for inspection in tests.
    pub async fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock().await
    }

    pub async fn tone(&self) -> Tone {
        self.state.lock().await.mood.tone()
    }

    /// Start-up greeting for the given local hour.
    pub async fn greeting(&self, hour: u32) -> Reply {
        let tone = self.tone().await;
        let text = format!(
            "{}! I'm {}. How can I help you today?",
            time_of_day_greeting(hour),
            self.config.assistant.name
        );
        Reply::new(apply_tone(&text, &tone), tone, CommandKind::Greeting)
    }

    /// Let idle time pull the mood back toward its baseline.
    pub async fn decay_mood(&self) {
        let mut core = self.state.lock().await;
        core.mood.apply(MoodEvent::IdleDecay, Utc::now());
    }

    /// Process one utterance end to end.
    pub async fn handle(&self, utterance: &str) -> Reply {
        self.clock.touch();
        let mut core = self.state.lock().await;
        let now = Utc::now();
        // Spoken tone reflects the mood the utterance arrived into.
        let tone = core.mood.tone();

        let text = utterance.trim();
        if text.is_empty() {
            core.mood.apply(MoodEvent::Unrecognized, now);
            return Reply::new(apply_tone(CLARIFY, &tone), tone, CommandKind::Clarify);
        }

        let user = core.users.resolve(text, now).await;
        let sentiment = classify(text);
        let command = self.router.route(text);
        tracing::debug!(
            "Turn from '{}' (affinity {}): {:?}, {:?}",
            user.user.display_name,
            user.affinity,
            command.kind(),
            sentiment.polarity
        );

        let turn = Turn {
            utterance: text,
            user: &user,
            now,
        };
        let outcome = self.dispatch(&mut core, &turn, command).await;

        let spoken = apply_tone(&outcome.text, &tone);
        core.memory.record_exchange(text, &spoken);

        let update = core.users.record_interaction(&user, sentiment.warmth).await;
        match outcome.hold {
            Some(event) => {
                core.mood.apply(event, now);
            }
            None => {
                core.mood.apply(MoodEvent::Sentiment(sentiment.polarity), now);
                if update.delta != 0 {
                    core.mood.apply(MoodEvent::AffinityShift(update.delta), now);
                }
            }
        }

        Reply {
            text: spoken,
            tone,
            remember: outcome.remember,
            command: outcome.kind,
            unprompted: false,
            exit: outcome.exit,
        }
    }

    pub(crate) async fn dispatch(
        &self,
        core: &mut CoreState,
        turn: &Turn<'_>,
        command: Command,
    ) -> Outcome {
        match command {
            Command::Exit => self.handle_exit(turn),
            Command::SetOpinion { topic, stance } => {
                self.handle_set_opinion(core, turn, &topic, &stance).await
            }
            Command::GetOpinion { topic } => self.handle_get_opinion(core, turn, &topic).await,
            Command::ListOpinions => self.handle_list_opinions(core).await,
            Command::Weather { location } => {
                self.handle_weather(core, turn, location.as_deref()).await
            }
            Command::News { topic } => self.handle_news(core, topic.as_deref()).await,
            Command::NewsArchive => self.handle_news_archive(core).await,
            Command::Search { query } => self.handle_search(core, turn, &query).await,
            Command::Joke => self.handle_joke(),
            Command::Comfort => self.handle_comfort(core, turn),
            Command::Teach { topic, fact } => self.handle_teach(core, turn, &topic, &fact).await,
            Command::Topic { topic } => self.handle_topic(core, turn, &topic).await,
            Command::SmallTalk(talk) => self.handle_small_talk(core, turn, talk).await,
            Command::Generate => self.handle_generate(core, turn).await,
        }
    }
}

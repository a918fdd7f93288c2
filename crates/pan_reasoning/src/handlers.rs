//! One handler per [`Command`](crate::router::Command) variant.

use crate::engine::{ConversationEngine, CoreState, Outcome, Turn};
use crate::prompts::opinion_prompt;
use crate::router::SmallTalk;
use pan_core::records::millis;
use pan_core::text::{keywords, normalize_key};
use pan_core::{CommandKind, GenerationContext, Headline, MemorySource};
use pan_limbic::MoodEvent;
use pan_memory::Recall;
use rand::seq::SliceRandom;

const JOKES: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything!",
    "I told my computer I needed a break, and it said no problem, it would go to sleep.",
    "Why did the scarecrow win an award? Because he was outstanding in his field.",
    "What do you call a fake noodle? An impasta.",
    "Why did the bicycle fall over? It was two tired.",
];

const LOW_TRUST_PREFACE: &str = "Honestly, I don't trust you much yet. ";
/// Latest turns always replayed to the generator.
const RECENT_TURNS: usize = 3;

fn join_headlines<'a>(titles: impl Iterator<Item = &'a str>) -> String {
    titles.collect::<Vec<_>>().join("; ")
}

fn first_snippet(hits: &[pan_core::SearchHit]) -> Option<String> {
    hits.iter()
        .map(|h| h.snippet.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

impl ConversationEngine {
    pub(crate) fn handle_exit(&self, turn: &Turn<'_>) -> Outcome {
        tracing::info!("Exit requested by {}", turn.user.user.display_name);
        Outcome::new(
            format!("Goodbye, {}!", turn.user.user.display_name),
            CommandKind::Exit,
        )
        .exiting()
    }

    // ------------------------------------------------------------------------
    // Opinions
    // ------------------------------------------------------------------------

    pub(crate) async fn handle_set_opinion(
        &self,
        core: &mut CoreState,
        turn: &Turn<'_>,
        topic: &str,
        stance: &str,
    ) -> Outcome {
        let opinion = core.memory.set_opinion(topic, stance, millis(turn.now)).await;
        tracing::debug!("Opinion on '{}' set at {}", opinion.topic, opinion.updated_at);
        Outcome::new(
            format!("Got it. My opinion on {} is now: \"{}\"", topic, opinion.stance),
            CommandKind::OpinionSet,
        )
        .remembered(!core.memory.is_degraded())
    }

    pub(crate) async fn handle_get_opinion(
        &self,
        core: &mut CoreState,
        turn: &Turn<'_>,
        topic: &str,
    ) -> Outcome {
        if let Some(opinion) = core.memory.opinion(topic).await {
            return Outcome::new(
                format!("Here's what I think about {}: \"{}\"", topic, opinion.stance),
                CommandKind::OpinionGet,
            );
        }

        // First time asked: form a stance and keep it.
        let context = self.generation_context(core, turn, topic).await;
        match self.caps.generate(&opinion_prompt(topic), &context).await {
            Ok(stance) => {
                let opinion = core.memory.set_opinion(topic, &stance, millis(turn.now)).await;
                Outcome::new(
                    format!("Here's what I think about {}: \"{}\"", topic, opinion.stance),
                    CommandKind::OpinionGet,
                )
                .remembered(!core.memory.is_degraded())
            }
            Err(_) => Outcome::new(
                format!("I don't have an opinion on {} yet.", topic),
                CommandKind::OpinionGet,
            )
            .holding(MoodEvent::CapabilityUnavailable),
        }
    }

    pub(crate) async fn handle_list_opinions(&self, core: &mut CoreState) -> Outcome {
        let opinions = core.memory.opinions().await;
        if opinions.is_empty() {
            return Outcome::new("I haven't formed any opinions yet.", CommandKind::OpinionList);
        }
        let listed = opinions
            .iter()
            .map(|o| format!("{}: {}", o.topic, o.stance))
            .collect::<Vec<_>>()
            .join(", ");
        Outcome::new(format!("Here's what I think: {}", listed), CommandKind::OpinionList)
    }

    // ------------------------------------------------------------------------
    // Weather and news
    // ------------------------------------------------------------------------

    pub(crate) async fn handle_weather(
        &self,
        core: &mut CoreState,
        turn: &Turn<'_>,
        location: Option<&str>,
    ) -> Outcome {
        let user = &turn.user.user;
        let target = match location {
            Some(explicit) => explicit.to_string(),
            None => user
                .preference("location")
                .map(str::to_string)
                .unwrap_or_else(|| self.config.weather.default_location()),
        };

        match self.caps.weather(&target).await {
            Ok(report) => {
                // Only a place the service knows becomes the new default.
                if let Some(explicit) = location {
                    core.users.set_preference(user, "location", explicit).await;
                }
                Outcome::new(
                    format!(
                        "The current temperature in {} is {:.0}°C with {}.",
                        report.location, report.temperature, report.condition
                    ),
                    CommandKind::Weather,
                )
            }
            Err(_) => Outcome::new("Sorry, I couldn't get the weather right now.", CommandKind::Weather)
                .holding(MoodEvent::CapabilityUnavailable),
        }
    }

    pub(crate) async fn handle_news(&self, core: &mut CoreState, topic: Option<&str>) -> Outcome {
        let limit = self.config.conversation.news_limit;
        match self.caps.news(limit).await {
            Ok(headlines) if !headlines.is_empty() => {
                core.memory.archive_news(&headlines).await;
                let selected = filter_by_topic(&headlines, topic);
                let text = match (selected.is_empty(), topic) {
                    (true, Some(t)) => format!(
                        "I didn't see anything about {} today. Here are the top headlines: {}",
                        t,
                        join_headlines(headlines.iter().map(|h| h.title.as_str()))
                    ),
                    _ => format!(
                        "Here are the latest headlines: {}",
                        join_headlines(selected.iter().map(|h| h.title.as_str()))
                    ),
                };
                Outcome::new(text, CommandKind::News)
            }
            Ok(_) | Err(_) => {
                let archived = core.memory.latest_news_batch(limit).await;
                let text = if archived.is_empty() {
                    "No news available right now.".to_string()
                } else {
                    format!(
                        "I couldn't reach the news service, so here are the last headlines I saw: {}",
                        join_headlines(archived.iter().map(|e| e.headline.as_str()))
                    )
                };
                Outcome::new(text, CommandKind::News).holding(MoodEvent::CapabilityUnavailable)
            }
        }
    }

    pub(crate) async fn handle_news_archive(&self, core: &mut CoreState) -> Outcome {
        let entries = core.memory.recent_news(self.config.conversation.news_limit).await;
        if entries.is_empty() {
            return Outcome::new("The news archive is empty.", CommandKind::NewsArchive);
        }
        Outcome::new(
            format!(
                "Here's a brief news archive: {}",
                join_headlines(entries.iter().map(|e| e.headline.as_str()))
            ),
            CommandKind::NewsArchive,
        )
    }

    // ------------------------------------------------------------------------
    // Knowledge
    // ------------------------------------------------------------------------

    pub(crate) async fn handle_search(
        &self,
        core: &mut CoreState,
        turn: &Turn<'_>,
        query: &str,
    ) -> Outcome {
        match self.caps.search(query).await.map(|hits| first_snippet(&hits)) {
            Ok(Some(snippet)) => {
                let stored = core
                    .memory
                    .remember(query, &snippet, MemorySource::SelfResearched, None, millis(turn.now))
                    .await;
                core.curiosity.resolve(query);
                Outcome::new(
                    format!("Here's what I found about {}: {}", query, snippet),
                    CommandKind::Search,
                )
                .remembered(stored.is_some())
            }
            Ok(None) => Outcome::new(
                format!("I couldn't find anything about {}.", query),
                CommandKind::Search,
            ),
            Err(_) => Outcome::new("Sorry, I can't search the web right now.", CommandKind::Search)
                .holding(MoodEvent::CapabilityUnavailable),
        }
    }

    pub(crate) async fn handle_teach(
        &self,
        core: &mut CoreState,
        turn: &Turn<'_>,
        topic: &str,
        fact: &str,
    ) -> Outcome {
        let stored = core
            .memory
            .remember(
                topic,
                fact,
                MemorySource::UserTold,
                Some(turn.user.user.id),
                millis(turn.now),
            )
            .await;
        core.curiosity.resolve(topic);
        let text = if stored.is_some() {
            format!("Thanks, I'll remember that {}.", fact)
        } else {
            format!("Thanks. I'll keep in mind that {}, at least for now.", fact)
        };
        Outcome::new(text, CommandKind::Teach).remembered(stored.is_some())
    }

    pub(crate) async fn handle_topic(
        &self,
        core: &mut CoreState,
        turn: &Turn<'_>,
        topic: &str,
    ) -> Outcome {
        if let Recall::Found(memory) = core.memory.recall(topic).await {
            return Outcome::new(
                format!("Here's what I know about {}: {}", topic, memory.content),
                CommandKind::Topic,
            );
        }

        // Unknown: try to research it on the spot.
        match self.caps.search(topic).await.map(|hits| first_snippet(&hits)) {
            Ok(Some(snippet)) => {
                let stored = core
                    .memory
                    .remember(topic, &snippet, MemorySource::SelfResearched, None, millis(turn.now))
                    .await;
                core.curiosity.resolve(topic);
                Outcome::new(
                    format!("I looked it up. {}", snippet),
                    CommandKind::Topic,
                )
                .remembered(stored.is_some())
            }
            result => {
                core.curiosity.enqueue(topic);
                let outcome = Outcome::new(
                    format!("I don't know about {} yet.", topic),
                    CommandKind::Topic,
                );
                if result.is_err() {
                    outcome.holding(MoodEvent::CapabilityUnavailable)
                } else {
                    outcome
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Chit-chat
    // ------------------------------------------------------------------------

    pub(crate) fn handle_joke(&self) -> Outcome {
        let joke = JOKES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("I'm all out of jokes.");
        Outcome::new(joke, CommandKind::Joke)
    }

    pub(crate) fn handle_comfort(&self, core: &CoreState, turn: &Turn<'_>) -> Outcome {
        let name = &turn.user.user.display_name;
        let text = if core.users.comfort_allowed(turn.user.affinity) {
            format!(
                "I'm sorry you're feeling this way, {}. I'm here for you. You're not alone.",
                name
            )
        } else {
            "I'm sorry to hear that. I hope things get better.".to_string()
        };
        Outcome::new(text, CommandKind::Comfort)
    }

    pub(crate) async fn handle_small_talk(
        &self,
        core: &mut CoreState,
        turn: &Turn<'_>,
        talk: SmallTalk,
    ) -> Outcome {
        let user = turn.user;
        let name = &user.user.display_name;
        let text = match talk {
            SmallTalk::Greeting => format!("Hello, {}! How can I assist you today?", name),
            SmallTalk::Introduction { .. } if user.is_new => format!("Nice to meet you, {}!", name),
            SmallTalk::Introduction { .. } => format!("Welcome back, {}!", name),
            SmallTalk::HowAreYou => core.mood.describe().to_string(),
            SmallTalk::Thanks => "You're welcome!".to_string(),
            SmallTalk::Favorites => {
                let favorites = core.users.favorites().await;
                if favorites.is_empty() {
                    "I don't have any favorites yet.".to_string()
                } else {
                    let names = favorites
                        .iter()
                        .map(|(u, _)| u.display_name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("My favorite people are: {}", names)
                }
            }
            SmallTalk::WhoAmI => {
                if normalize_key(&user.user.name) == normalize_key(&self.config.assistant.default_user) {
                    "I don't know your name yet. You can tell me by saying \"my name is\" and your name."
                        .to_string()
                } else {
                    format!("You're {}.", name)
                }
            }
        };
        Outcome::new(text, CommandKind::SmallTalk)
    }

    // ------------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------------

    pub(crate) async fn generation_context(
        &self,
        core: &CoreState,
        turn: &Turn<'_>,
        topic: &str,
    ) -> GenerationContext {
        GenerationContext {
            assistant_name: self.config.assistant.name.clone(),
            user_name: turn.user.user.display_name.clone(),
            tone: core.mood.tone(),
            mood_description: core.mood.describe().to_string(),
            recent_exchanges: core.memory.context_exchanges(topic, RECENT_TURNS),
            memories: core.memory.context_memories(topic).await,
        }
    }

    pub(crate) async fn handle_generate(&self, core: &mut CoreState, turn: &Turn<'_>) -> Outcome {
        let context = self.generation_context(core, turn, turn.utterance).await;
        match self.caps.generate(turn.utterance, &context).await {
            Ok(text) => {
                let text = if core.users.is_low_trust(turn.user.affinity) {
                    format!("{}{}", LOW_TRUST_PREFACE, text)
                } else {
                    text
                };
                Outcome::new(text, CommandKind::Generation)
            }
            Err(_) => Outcome::new(
                "I'm not sure what you mean. Could you rephrase that?",
                CommandKind::Clarify,
            )
            .holding(MoodEvent::Unrecognized),
        }
    }
}

/// Headlines mentioning any keyword of `topic`; all of them when no topic.
fn filter_by_topic<'a>(headlines: &'a [Headline], topic: Option<&str>) -> Vec<&'a Headline> {
    let Some(topic) = topic else {
        return headlines.iter().collect();
    };
    let terms = keywords(topic);
    if terms.is_empty() {
        return headlines.iter().collect();
    }
    headlines
        .iter()
        .filter(|h| {
            let title = h.title.to_lowercase();
            terms.iter().any(|t| title.contains(t.as_str()))
        })
        .collect()
}

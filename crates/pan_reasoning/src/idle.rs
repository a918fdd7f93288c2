//! Unprompted curiosity while nobody is talking.
//!
//! The loop never aborts research in flight. It takes an activity ticket
//! before starting and checks it again before speaking; any utterance in
//! between bumps the activity epoch and the finished reply is dropped, while
//! the researched memory is kept.

use crate::engine::ConversationEngine;
use chrono::Utc;
use pan_core::records::millis;
use pan_core::{CommandKind, MemorySource, Polarity, Reply};
use pan_expression::phrasing::apply_tone;
use pan_limbic::MoodEvent;
use pan_memory::manager::{recall, remember};
use pan_memory::Recall;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// What one idle tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum IdleOutcome {
    /// Not idle long enough, or spoke too recently.
    Skipped,
    /// Every interest already has a memory and nothing is queued.
    NothingToExplore,
    /// Research failed or came back empty.
    Failed { topic: String },
    /// Research finished after foreground activity; the reply was dropped.
    Suppressed { topic: String },
    Emitted(Reply),
}

impl ConversationEngine {
    fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.config.idle.threshold_secs)
    }

    fn min_unprompted_interval(&self) -> Duration {
        Duration::from_secs(self.config.idle.min_unprompted_interval_secs)
    }

    /// Queued unanswered topics first, then unexplored interests with no
    /// stored memory.
    async fn pick_topic(&self) -> Option<String> {
        let candidates: Vec<String> = {
            let mut core = self.state.lock().await;
            if let Some(topic) = core.curiosity.pop_unanswered() {
                return Some(topic);
            }
            core.curiosity.unexplored().map(str::to_string).collect()
        };
        for interest in candidates {
            match recall(&self.store, &interest).await {
                Recall::Found(_) => self.state.lock().await.curiosity.mark_explored(&interest),
                Recall::Unknown | Recall::Degraded => return Some(interest),
            }
        }
        None
    }

    /// Run one idle step. Returns the reply to speak, if any.
    pub async fn idle_tick(&self) -> IdleOutcome {
        // Ticket first: activity after this point invalidates the firing.
        let ticket = self.clock.ticket();
        if !self.config.idle.enabled
            || !self
                .clock
                .should_fire(self.idle_threshold(), self.min_unprompted_interval())
        {
            return IdleOutcome::Skipped;
        }

        let Some(topic) = self.pick_topic().await else {
            return IdleOutcome::NothingToExplore;
        };
        tracing::debug!("Idle: researching '{}'", topic);

        // Outside the core lock: foreground turns proceed meanwhile.
        let snippet = match self.caps.search(&topic).await {
            Ok(hits) => hits
                .into_iter()
                .map(|h| h.snippet.trim().to_string())
                .find(|s| !s.is_empty()),
            Err(_) => None,
        };
        let Some(snippet) = snippet else {
            self.state.lock().await.curiosity.mark_explored(&topic);
            self.clock.mark_unprompted();
            return IdleOutcome::Failed { topic };
        };

        let stored = remember(
            &self.store,
            &topic,
            &snippet,
            MemorySource::SelfResearched,
            None,
            millis(Utc::now()),
        )
        .await;

        let mut core = self.state.lock().await;
        core.curiosity.mark_explored(&topic);
        if !self.clock.is_current(&ticket) {
            tracing::debug!("Idle: reply on '{}' suppressed by user activity", topic);
            return IdleOutcome::Suppressed { topic };
        }
        core.curiosity.resolve(&topic);

        let tone = core.mood.tone();
        let text = apply_tone(
            &format!("I was curious about {}, so I looked it up: {}", topic, snippet),
            &tone,
        );
        core.memory.record_exchange("", &text);
        core.mood
            .apply(MoodEvent::Sentiment(Polarity::Inquisitive), Utc::now());
        self.clock.mark_unprompted();

        let mut reply = Reply::new(text, tone, CommandKind::Curiosity);
        reply.unprompted = true;
        reply.remember = stored.is_some();
        tracing::info!("Idle: sharing what I found about '{}'", topic);
        IdleOutcome::Emitted(reply)
    }
}

/// Background task driving [`ConversationEngine::idle_tick`].
pub struct IdleLoop {
    engine: Arc<ConversationEngine>,
    poll: Duration,
    replies: mpsc::Sender<Reply>,
    shutdown: watch::Receiver<bool>,
}

impl IdleLoop {
    pub fn new(
        engine: Arc<ConversationEngine>,
        replies: mpsc::Sender<Reply>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let poll = Duration::from_secs(engine.config().idle.poll_interval_secs.max(1));
        Self {
            engine,
            poll,
            replies,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Idle loop started (poll every {}s)", self.poll.as_secs());
        let mut ticker = tokio::time::interval(self.poll);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.engine.decay_mood().await;
                    match self.engine.idle_tick().await {
                        IdleOutcome::Emitted(reply) => {
                            if self.replies.send(reply).await.is_err() {
                                break;
                            }
                        }
                        IdleOutcome::Failed { topic } => {
                            tracing::debug!("Idle: nothing found for '{}'", topic);
                        }
                        _ => {}
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Idle loop stopped");
    }
}

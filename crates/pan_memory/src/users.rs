//! Speaker identity and affinity.

use crate::store::StoreHandle;
use chrono::{DateTime, Utc};
use pan_core::config::AffinityConfig;
use pan_core::sentiment::Warmth;
use pan_core::text::normalize_key;
use pan_core::User;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use uuid::Uuid;

static RE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:my name is|call me)\s+([a-z][a-z'\-]*)").unwrap()
});
static RE_SPEAKING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bthis is\s+([a-z][a-z'\-]*)\s+speaking\b").unwrap());

/// Pull an asserted name out of an utterance, if any.
pub fn extract_name(utterance: &str) -> Option<String> {
    RE_SPEAKING
        .captures(utterance)
        .or_else(|| RE_NAME.captures(utterance))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Who is speaking this turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUser {
    pub user: User,
    pub affinity: i64,
    /// First time this name was seen.
    pub is_new: bool,
    /// The name was asserted in this very utterance.
    pub asserted: bool,
}

/// Outcome of nudging affinity for one interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffinityUpdate {
    pub warmth: Warmth,
    /// Change actually applied after clamping.
    pub delta: i64,
    pub score: i64,
}

pub struct UserResolver {
    store: StoreHandle,
    config: AffinityConfig,
    default_user: String,
    sticky_speaker: bool,
    active_speaker: Option<String>,
    /// In-process users and scores used while the store is degraded.
    fallback: HashMap<String, (User, i64)>,
}

impl UserResolver {
    pub fn new(
        store: StoreHandle,
        config: AffinityConfig,
        default_user: impl Into<String>,
        sticky_speaker: bool,
    ) -> Self {
        Self {
            store,
            config,
            default_user: default_user.into(),
            sticky_speaker,
            active_speaker: None,
            fallback: HashMap::new(),
        }
    }

    pub fn config(&self) -> &AffinityConfig {
        &self.config
    }

    pub async fn resolve(&mut self, utterance: &str, now: DateTime<Utc>) -> ResolvedUser {
        let asserted = extract_name(utterance);
        let name = match (&asserted, &self.active_speaker) {
            (Some(n), _) => n.clone(),
            (None, Some(active)) if self.sticky_speaker => active.clone(),
            _ => self.default_user.clone(),
        };
        if asserted.is_some() {
            self.active_speaker = Some(name.clone());
        }

        let mut resolved = self.lookup(&name, now).await;
        resolved.asserted = asserted.is_some();
        resolved
    }

    async fn lookup(&mut self, name: &str, now: DateTime<Utc>) -> ResolvedUser {
        let initial = self.config.initial;
        if let Some((user, is_new)) = self
            .store
            .call("user lookup", |s| s.resolve_user(name, name))
            .await
        {
            let user_id = user.id;
            if let Some(record) = self
                .store
                .call("affinity read", |s| s.affinity(user_id, initial))
                .await
            {
                if is_new {
                    tracing::info!("Met a new user: {}", user.display_name);
                }
                return ResolvedUser {
                    user,
                    affinity: record.score,
                    is_new,
                    asserted: false,
                };
            }
        }
        self.lookup_fallback(name, now)
    }

    fn lookup_fallback(&mut self, name: &str, now: DateTime<Utc>) -> ResolvedUser {
        let key = normalize_key(name);
        let initial = self.config.initial;
        let mut is_new = false;
        let (user, score) = self.fallback.entry(key.clone()).or_insert_with(|| {
            is_new = true;
            let user = User {
                id: Uuid::new_v4(),
                name: key,
                display_name: name.trim().to_string(),
                created_at: now,
                last_seen: now,
                preferences: HashMap::new(),
            };
            (user, initial)
        });
        if now > user.last_seen {
            user.last_seen = now;
        }
        ResolvedUser {
            user: user.clone(),
            affinity: *score,
            is_new,
            asserted: false,
        }
    }

    /// Apply the affinity nudge for one classified interaction.
    pub async fn record_interaction(&mut self, user: &ResolvedUser, warmth: Warmth) -> AffinityUpdate {
        let c = &self.config;
        let delta = match warmth {
            Warmth::Warm => c.warm_delta,
            Warmth::Neutral => 0,
            Warmth::Hostile => -c.hostile_delta,
        };
        if delta == 0 {
            return AffinityUpdate {
                warmth,
                delta: 0,
                score: user.affinity,
            };
        }

        let (initial, min, max) = (c.initial, c.min, c.max);
        let user_id = user.user.id;
        let stored = self
            .store
            .call("affinity write", |s| s.adjust_affinity(user_id, delta, initial, min, max))
            .await;

        let score = match stored {
            Some(record) => record.score,
            None => {
                let entry = self
                    .fallback
                    .entry(user.user.name.clone())
                    .or_insert_with(|| (user.user.clone(), user.affinity));
                entry.1 = (entry.1 + delta).clamp(min, max);
                entry.1
            }
        };
        AffinityUpdate {
            warmth,
            delta: score - user.affinity,
            score,
        }
    }

    pub async fn set_preference(&mut self, user: &User, key: &str, value: &str) {
        let user_id = user.id;
        let stored = self
            .store
            .call("preference write", |s| s.set_user_preference(user_id, key, value))
            .await;
        if stored.is_none() {
            if let Some((u, _)) = self.fallback.get_mut(&user.name) {
                u.preferences.insert(key.to_string(), value.to_string());
            }
        }
    }

    /// Users above the favorite threshold, warmest first.
    pub async fn favorites(&self) -> Vec<(User, i64)> {
        let threshold = self.config.favorite_threshold + 1;
        if let Some(users) = self
            .store
            .call("favorites", |s| s.users_with_affinity_at_least(threshold))
            .await
        {
            return users;
        }
        let mut users: Vec<(User, i64)> = self
            .fallback
            .values()
            .filter(|(_, score)| *score >= threshold)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name.cmp(&b.0.name)));
        users
    }

    pub fn is_low_trust(&self, score: i64) -> bool {
        score <= self.config.low_trust_threshold
    }

    pub fn comfort_allowed(&self, score: i64) -> bool {
        score >= self.config.comfort_threshold
    }
}

use chrono::{DateTime, Utc};
use pan_core::config::MoodConfig;
use pan_core::{MoodLabel, MoodState, Polarity, Tone};
use serde::{Deserialize, Serialize};

/// Everything that can move the mood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MoodEvent {
    Sentiment(Polarity),
    IdleDecay,
    AffinityShift(i64),
    CapabilityUnavailable,
    Unrecognized,
}

/// Deterministic mood state machine.
///
/// `apply` first decays the state for the time elapsed since the previous
/// event, then applies the event itself. Every (state, event) pair has a
/// defined result and intensity always stays within the configured bounds.
#[derive(Debug, Clone)]
pub struct MoodEngine {
    config: MoodConfig,
    state: MoodState,
    last_update: DateTime<Utc>,
}

impl MoodEngine {
    pub fn new(config: MoodConfig, now: DateTime<Utc>) -> Self {
        let baseline = config
            .baseline_intensity
            .clamp(config.min_intensity, config.max_intensity);
        Self {
            state: MoodState::new(baseline, now),
            config,
            last_update: now,
        }
    }

    pub fn state(&self) -> &MoodState {
        &self.state
    }

    pub fn label(&self) -> MoodLabel {
        self.state.label
    }

    pub fn tone(&self) -> Tone {
        self.state.tone()
    }

    pub fn describe(&self) -> &'static str {
        self.state.describe()
    }

    pub fn apply(&mut self, event: MoodEvent, now: DateTime<Utc>) -> &MoodState {
        let elapsed = (now - self.last_update).num_milliseconds().max(0) as f32 / 1000.0;
        if now > self.last_update {
            self.last_update = now;
        }
        let before = self.state.label;

        match event {
            MoodEvent::CapabilityUnavailable | MoodEvent::Unrecognized => {
                // Label and valence hold; only intensity relaxes.
                self.decay_intensity(elapsed);
            }
            MoodEvent::IdleDecay => {
                self.decay_intensity(elapsed);
                self.decay_valence(elapsed);
                self.state.label = self.derive_label(false);
            }
            MoodEvent::Sentiment(polarity) => {
                self.decay_intensity(elapsed);
                self.decay_valence(elapsed);
                let delta = match polarity {
                    Polarity::Positive | Polarity::Negative => self.config.sentiment_delta,
                    Polarity::Inquisitive => self.config.inquisitive_delta,
                    Polarity::Neutral => 0.0,
                };
                self.shift_intensity(delta);
                self.move_valence(polarity.sign(), self.config.valence_step);
                self.state.label = self.derive_label(polarity == Polarity::Inquisitive);
            }
            MoodEvent::AffinityShift(delta) => {
                self.decay_intensity(elapsed);
                self.decay_valence(elapsed);
                if delta != 0 {
                    let magnitude = delta.unsigned_abs() as f32;
                    self.shift_intensity(magnitude * self.config.affinity_gain);
                    let weight = (magnitude / 5.0).min(1.0);
                    let target = if delta > 0 { 1.0 } else { -1.0 };
                    self.move_valence(target, self.config.valence_step * weight);
                }
                let curious = self.state.label == MoodLabel::Curious;
                self.state.label = self.derive_label(curious);
            }
        }

        if self.state.label != before {
            self.state.last_transition = now;
            tracing::trace!(
                "Mood {} -> {} (intensity {:.2}, valence {:.2}) on {:?}",
                before,
                self.state.label,
                self.state.intensity,
                self.state.valence,
                event
            );
        }
        &self.state
    }

    fn derive_label(&self, inquisitive: bool) -> MoodLabel {
        let c = &self.config;
        let s = &self.state;
        if s.intensity < c.active_threshold {
            MoodLabel::Neutral
        } else if s.valence >= c.valence_threshold {
            MoodLabel::Happy
        } else if s.valence <= -c.valence_threshold {
            if s.intensity >= c.annoyed_threshold {
                MoodLabel::Annoyed
            } else {
                MoodLabel::Sad
            }
        } else if inquisitive {
            MoodLabel::Curious
        } else {
            MoodLabel::Neutral
        }
    }

    fn retention(&self, elapsed_secs: f32) -> f32 {
        let rate = self.config.decay_per_sec.clamp(0.0, 1.0);
        (1.0 - rate).powf(elapsed_secs)
    }

    fn decay_intensity(&mut self, elapsed_secs: f32) {
        let keep = self.retention(elapsed_secs);
        let baseline = self.config.baseline_intensity;
        let next = baseline + (self.state.intensity - baseline) * keep;
        self.state.intensity = next.clamp(self.config.min_intensity, self.config.max_intensity);
    }

    fn decay_valence(&mut self, elapsed_secs: f32) {
        let keep = self.retention(elapsed_secs);
        self.state.valence = (self.state.valence * keep).clamp(-1.0, 1.0);
    }

    fn shift_intensity(&mut self, delta: f32) {
        self.state.intensity = (self.state.intensity + delta)
            .clamp(self.config.min_intensity, self.config.max_intensity);
    }

    fn move_valence(&mut self, target: f32, step: f32) {
        let step = step.clamp(0.0, 1.0);
        let v = self.state.valence + (target - self.state.valence) * step;
        self.state.valence = v.clamp(-1.0, 1.0);
    }
}

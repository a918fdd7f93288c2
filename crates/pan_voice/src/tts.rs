//! Text-to-Speech (TTS) trait definition

use async_trait::async_trait;
use pan_core::{SpeechError, Tone};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

/// Speak text aloud in a given tone.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Failures are non-fatal; callers log them and move on.
    async fn speak(&self, text: &str, tone: &Tone) -> Result<(), SpeechError>;

    /// Get the name of this TTS provider
    fn provider_name(&self) -> &'static str;

    /// Check if this TTS engine varies its voice with the tone
    fn supports_tone(&self) -> bool {
        false
    }
}

/// Writes each reply as a line prefixed with the speaker and tone tag.
pub struct ConsoleSpeaker<W> {
    name: String,
    out: Mutex<W>,
}

impl ConsoleSpeaker<Stdout> {
    pub fn stdout(name: impl Into<String>) -> Self {
        Self::new(name, tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> ConsoleSpeaker<W> {
    pub fn new(name: impl Into<String>, out: W) -> Self {
        Self {
            name: name.into(),
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> TextToSpeech for ConsoleSpeaker<W> {
    async fn speak(&self, text: &str, tone: &Tone) -> Result<(), SpeechError> {
        let line = format!(
            "{} [{}, {} wpm]: {}\n",
            self.name,
            tone.tag(),
            tone.pace.words_per_minute(),
            text
        );
        tracing::trace!("Speaking {} chars as {}", text.len(), tone.tag());
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| SpeechError::SynthesisUnavailable(e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| SpeechError::SynthesisUnavailable(e.to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "console"
    }

    fn supports_tone(&self) -> bool {
        true
    }
}

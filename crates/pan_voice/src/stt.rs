//! Speech-to-Text (STT) trait definition

use async_trait::async_trait;
use pan_core::CaptureError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Capture one utterance from the user.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Block until the user says something.
    ///
    /// Silence is `NoSpeechDetected`; a recognizer failure is `Recognition`.
    async fn capture(&self) -> Result<String, CaptureError>;

    /// Get the name of this STT provider
    fn provider_name(&self) -> &'static str;
}

/// Treats each input line as one recognized utterance.
pub struct LineMicrophone<R> {
    lines: Mutex<Lines<R>>,
}

impl LineMicrophone<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> LineMicrophone<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> SpeechToText for LineMicrophone<R> {
    async fn capture(&self) -> Result<String, CaptureError> {
        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    Err(CaptureError::NoSpeechDetected)
                } else {
                    Ok(line.to_string())
                }
            }
            Ok(None) => Err(CaptureError::Closed),
            Err(e) => Err(CaptureError::Recognition(e.to_string())),
        }
    }

    fn provider_name(&self) -> &'static str {
        "console"
    }
}

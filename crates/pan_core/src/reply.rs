use crate::affect::Tone;
use serde::{Deserialize, Serialize};

/// Which command produced a reply, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Exit,
    OpinionSet,
    OpinionGet,
    OpinionList,
    Weather,
    News,
    NewsArchive,
    Search,
    Joke,
    Comfort,
    Teach,
    Topic,
    SmallTalk,
    Generation,
    /// Nothing usable was heard or understood.
    Clarify,
    Curiosity,
    Greeting,
}

/// Structured result of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub tone: Tone,
    /// Whether the turn wrote anything to long-term memory.
    pub remember: bool,
    pub command: CommandKind,
    /// Produced by the idle loop rather than in answer to an utterance.
    pub unprompted: bool,
    /// The caller should shut down after delivering this reply.
    pub exit: bool,
}

impl Reply {
    pub fn new(text: impl Into<String>, tone: Tone, command: CommandKind) -> Self {
        Self {
            text: text.into(),
            tone,
            remember: false,
            command,
            unprompted: false,
            exit: false,
        }
    }
}

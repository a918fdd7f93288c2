use pan_core::CommandKind;
use pan_memory::extract_name;
use regex::Regex;
use std::sync::LazyLock;

static RE_OPINION_SET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:adjust|change|update|set)\s+your\s+opinion\s+(?:on|about|of)\s+(.+?)\s+to\s+(.+)$")
        .unwrap()
});
static RE_OPINION_GET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:what do you think (?:about|of)|your opinion (?:on|about|of)|how do you feel about|your thoughts (?:on|about))\s+(.+?)[?.!]*$",
    )
    .unwrap()
});
static RE_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:in|for|at)\s+([a-z][a-z .,'\-]*?)[?.!]*$").unwrap());
static RE_NEWS_TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:news|headlines)\s+(?:about|on|regarding|for)\s+(.+?)[?.!]*$").unwrap()
});
static RE_SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:search(?: the web)? for|look up|google|find out about)\s+(.+?)[?.!]*$")
        .unwrap()
});
static RE_TEACH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:please\s+)?(?:remember|note|learn)\s+that\s+(.+?)\s+(is|are|was|were)\s+(.+?)[.!]*$")
        .unwrap()
});
static RE_TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:can you\s+)?(?:tell me about|explain|what do you know about|what is|what are|who is|who was)\s+(.+?)[?.!]*$",
    )
    .unwrap()
});

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmallTalk {
    Greeting,
    Introduction { name: String },
    HowAreYou,
    Thanks,
    Favorites,
    WhoAmI,
}

/// Closed set of things an utterance can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    SetOpinion { topic: String, stance: String },
    GetOpinion { topic: String },
    ListOpinions,
    Weather { location: Option<String> },
    News { topic: Option<String> },
    NewsArchive,
    Search { query: String },
    Joke,
    Comfort,
    Teach { topic: String, fact: String },
    Topic { topic: String },
    SmallTalk(SmallTalk),
    /// No rule matched; hand the utterance to the generator.
    Generate,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Exit => CommandKind::Exit,
            Self::SetOpinion { .. } => CommandKind::OpinionSet,
            Self::GetOpinion { .. } => CommandKind::OpinionGet,
            Self::ListOpinions => CommandKind::OpinionList,
            Self::Weather { .. } => CommandKind::Weather,
            Self::News { .. } => CommandKind::News,
            Self::NewsArchive => CommandKind::NewsArchive,
            Self::Search { .. } => CommandKind::Search,
            Self::Joke => CommandKind::Joke,
            Self::Comfort => CommandKind::Comfort,
            Self::Teach { .. } => CommandKind::Teach,
            Self::Topic { .. } => CommandKind::Topic,
            Self::SmallTalk(_) => CommandKind::SmallTalk,
            Self::Generate => CommandKind::Generation,
        }
    }
}

// ============================================================================
// CommandRule trait
// ============================================================================

pub trait CommandRule: Send + Sync {
    /// Evaluate input and return a command, or None to pass to the next rule.
    fn evaluate(&self, input: &str) -> Option<Command>;

    /// Name for logging.
    fn name(&self) -> &str;
}

/// Trigger or exclusion pattern, matched case-insensitively.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    /// Substring anywhere in the input.
    Phrase(&'static str),
    /// Whole word only: "hi" does not match "this".
    Word(&'static str),
}

impl Pattern {
    fn matches(&self, lower: &str) -> bool {
        match *self {
            Pattern::Phrase(p) => lower.contains(p),
            Pattern::Word(w) => lower
                .split(|c: char| !c.is_alphanumeric() && c != '\'')
                .any(|token| token == w),
        }
    }
}

type Extract = fn(&str) -> Option<Command>;

/// A rule fires when any trigger matches, no exclusion matches, and the
/// extractor accepts the input.
pub struct PatternRule {
    name: &'static str,
    triggers: Vec<Pattern>,
    exclusions: Vec<Pattern>,
    extract: Extract,
}

impl PatternRule {
    pub fn new(name: &'static str, triggers: Vec<Pattern>, extract: Extract) -> Self {
        Self {
            name,
            triggers,
            exclusions: Vec::new(),
            extract,
        }
    }

    pub fn excluding(mut self, exclusions: Vec<Pattern>) -> Self {
        self.exclusions = exclusions;
        self
    }
}

impl CommandRule for PatternRule {
    fn evaluate(&self, input: &str) -> Option<Command> {
        let lower = input.to_lowercase();
        if !self.triggers.iter().any(|p| p.matches(&lower)) {
            return None;
        }
        if self.exclusions.iter().any(|p| p.matches(&lower)) {
            return None;
        }
        (self.extract)(input)
    }

    fn name(&self) -> &str {
        self.name
    }
}

// ============================================================================
// CommandRouter
// ============================================================================

pub struct CommandRouter {
    rules: Vec<Box<dyn CommandRule>>,
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CommandRouter {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a router with the built-in rules in priority order.
    pub fn with_defaults() -> Self {
        use Pattern::{Phrase, Word};

        let mut router = Self::new();
        router.add_rule(Box::new(PatternRule::new(
            "exit",
            vec![
                Phrase("exit program"),
                Phrase("quit program"),
                Phrase("shut down"),
                Word("shutdown"),
                Word("goodbye"),
            ],
            |_| Some(Command::Exit),
        )));
        router.add_rule(Box::new(PatternRule::new(
            "opinion_set",
            vec![Phrase("your opinion")],
            extract_opinion_set,
        )));
        router.add_rule(Box::new(PatternRule::new(
            "opinion_get",
            vec![
                Phrase("what do you think"),
                Phrase("your opinion"),
                Phrase("how do you feel about"),
                Phrase("your thoughts"),
            ],
            extract_opinion_get,
        )));
        router.add_rule(Box::new(PatternRule::new(
            "weather",
            vec![Word("weather"), Word("forecast"), Word("temperature")],
            |input| {
                Some(Command::Weather {
                    location: extract_location(input),
                })
            },
        )));
        router.add_rule(Box::new(
            PatternRule::new("news", vec![Word("news"), Word("headlines")], |input| {
                Some(Command::News {
                    topic: capture(&RE_NEWS_TOPIC, input, 1),
                })
            })
            .excluding(vec![Word("archive"), Word("archived"), Phrase("old news")]),
        ));
        router.add_rule(Box::new(PatternRule::new(
            "news_archive",
            vec![Word("archive"), Word("archived"), Phrase("old news")],
            |_| Some(Command::NewsArchive),
        )));
        router.add_rule(Box::new(PatternRule::new(
            "search",
            vec![
                Phrase("search for"),
                Phrase("search the web"),
                Phrase("look up"),
                Word("google"),
                Phrase("find out about"),
            ],
            |input| capture(&RE_SEARCH, input, 1).map(|query| Command::Search { query }),
        )));
        router.add_rule(Box::new(PatternRule::new(
            "joke",
            vec![Word("joke"), Word("jokes"), Phrase("make me laugh"), Phrase("something funny")],
            |_| Some(Command::Joke),
        )));
        router.add_rule(Box::new(PatternRule::new(
            "comfort",
            vec![
                Phrase("i'm sad"),
                Phrase("i am sad"),
                Phrase("i feel down"),
                Phrase("i'm feeling down"),
                Phrase("i feel sad"),
                Phrase("i'm lonely"),
                Phrase("i feel lonely"),
                Phrase("bad day"),
            ],
            |_| Some(Command::Comfort),
        )));
        router.add_rule(Box::new(PatternRule::new(
            "teach",
            vec![Word("remember"), Word("note"), Word("learn")],
            extract_teach,
        )));
        router.add_rule(Box::new(PatternRule::new(
            "topic",
            vec![
                Phrase("tell me about"),
                Word("explain"),
                Phrase("what do you know about"),
                Phrase("what is"),
                Phrase("what are"),
                Phrase("who is"),
                Phrase("who was"),
            ],
            extract_topic,
        )));
        router.add_rule(Box::new(SmallTalkRule));
        router
    }

    pub fn add_rule(&mut self, rule: Box<dyn CommandRule>) {
        self.rules.push(rule);
    }

    /// Route input through rules in order. First match wins.
    /// Falls back to generation if no rule matches.
    pub fn route(&self, input: &str) -> Command {
        for rule in &self.rules {
            if let Some(command) = rule.evaluate(input) {
                tracing::debug!("CommandRouter: rule '{}' matched → {:?}", rule.name(), command);
                return command;
            }
        }
        Command::Generate
    }
}

// ============================================================================
// Extractors
// ============================================================================

fn capture(re: &Regex, input: &str, group: usize) -> Option<String> {
    re.captures(input.trim())
        .and_then(|c| c.get(group))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn strip_article(topic: &str) -> String {
    let lower = topic.to_lowercase();
    for article in ["the ", "a ", "an "] {
        if lower.starts_with(article) && topic.len() > article.len() {
            return topic[article.len()..].trim().to_string();
        }
    }
    topic.trim().to_string()
}

/// Words that say when, not where.
const TIME_WORDS: &[&str] = &[
    "moment", "now", "today", "tomorrow", "tonight", "week", "weekend", "morning",
    "afternoon", "evening", "later", "currently",
];
/// Dropped from the tail along with time words ("in Paris for this week").
const TAIL_FILLER: &[&str] = &["this", "next", "right", "the", "for", "in", "at"];

fn extract_location(input: &str) -> Option<String> {
    let raw = capture(&RE_LOCATION, input, 1)?;
    let mut words: Vec<&str> = raw.split_whitespace().collect();
    while let Some(last) = words.last() {
        let word = last.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase();
        if TIME_WORDS.contains(&word.as_str()) || TAIL_FILLER.contains(&word.as_str()) {
            words.pop();
        } else {
            break;
        }
    }
    match words.first() {
        None => None,
        Some(first) if first.eq_ignore_ascii_case("the") => None,
        Some(_) => Some(words.join(" ").trim_end_matches(',').to_string()),
    }
}

fn extract_opinion_set(input: &str) -> Option<Command> {
    let caps = RE_OPINION_SET.captures(input.trim())?;
    let topic = caps.get(1)?.as_str().trim();
    // Stance is kept verbatim
    let stance = caps.get(2)?.as_str().trim();
    if topic.is_empty() || stance.is_empty() {
        return None;
    }
    Some(Command::SetOpinion {
        topic: strip_article(topic),
        stance: stance.to_string(),
    })
}

fn extract_opinion_get(input: &str) -> Option<Command> {
    match capture(&RE_OPINION_GET, input, 1) {
        Some(topic) if !topic.eq_ignore_ascii_case("it") => Some(Command::GetOpinion {
            topic: strip_article(&topic),
        }),
        _ => Some(Command::ListOpinions),
    }
}

fn extract_teach(input: &str) -> Option<Command> {
    let caps = RE_TEACH.captures(input.trim())?;
    let subject = caps.get(1)?.as_str().trim();
    let verb = caps.get(2)?.as_str();
    let rest = caps.get(3)?.as_str().trim();
    Some(Command::Teach {
        topic: strip_article(subject),
        fact: format!("{} {} {}", subject, verb, rest),
    })
}

fn extract_topic(input: &str) -> Option<Command> {
    let topic = capture(&RE_TOPIC, input, 1)?;
    let topic = strip_article(&topic);
    // "what is your name" and friends belong to small talk
    let lower = topic.to_lowercase();
    if lower.starts_with("your ") || lower.starts_with("my ") || lower == "up" {
        return None;
    }
    Some(Command::Topic { topic })
}

/// Greeting, introductions and other chit-chat.
pub struct SmallTalkRule;

impl CommandRule for SmallTalkRule {
    fn evaluate(&self, input: &str) -> Option<Command> {
        use Pattern::{Phrase, Word};

        if let Some(name) = extract_name(input) {
            return Some(Command::SmallTalk(SmallTalk::Introduction { name }));
        }
        let lower = input.to_lowercase();
        let any = |patterns: &[Pattern]| patterns.iter().any(|p| p.matches(&lower));

        let talk = if any(&[Phrase("favorite people"), Phrase("your favorites"), Phrase("who do you like")]) {
            SmallTalk::Favorites
        } else if any(&[Phrase("who am i"), Phrase("what's my name"), Phrase("what is my name"), Phrase("do you know me")]) {
            SmallTalk::WhoAmI
        } else if any(&[Phrase("how are you"), Phrase("how do you feel"), Phrase("how's it going"), Phrase("how are things")]) {
            SmallTalk::HowAreYou
        } else if any(&[Word("thanks"), Phrase("thank you"), Word("cheers")]) {
            SmallTalk::Thanks
        } else if any(&[
            Word("hello"),
            Word("hi"),
            Word("hey"),
            Word("greetings"),
            Phrase("good morning"),
            Phrase("good afternoon"),
            Phrase("good evening"),
        ]) {
            SmallTalk::Greeting
        } else {
            return None;
        };
        Some(Command::SmallTalk(talk))
    }

    fn name(&self) -> &str {
        "small_talk"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn route(input: &str) -> Command {
        CommandRouter::with_defaults().route(input)
    }

    #[test]
    fn test_news_about_topic_routes_to_news() {
        assert_eq!(
            route("tell me the news about the economy"),
            Command::News {
                topic: Some("the economy".into())
            }
        );
        assert_eq!(route("any headlines today?"), Command::News { topic: None });
    }

    #[test]
    fn test_archive_excluded_from_news() {
        assert_eq!(route("show me the news archive"), Command::NewsArchive);
        assert_eq!(route("what's in the archive"), Command::NewsArchive);
    }

    #[test]
    fn test_opinion_set_keeps_stance_verbatim() {
        assert_eq!(
            route("Adjust your opinion on coffee to I love it"),
            Command::SetOpinion {
                topic: "coffee".into(),
                stance: "I love it".into()
            }
        );
        assert_eq!(
            route("change your opinion about the Moon to It's Made Of Cheese!"),
            Command::SetOpinion {
                topic: "Moon".into(),
                stance: "It's Made Of Cheese!".into()
            }
        );
    }

    #[test]
    fn test_opinion_get_and_list() {
        assert_eq!(
            route("what do you think about coffee"),
            Command::GetOpinion {
                topic: "coffee".into()
            }
        );
        assert_eq!(route("what are your opinions?"), Command::ListOpinions);
        assert_eq!(route("what do you think?"), Command::ListOpinions);
    }

    #[test]
    fn test_weather_location() {
        assert_eq!(route("What's the weather?"), Command::Weather { location: None });
        assert_eq!(
            route("what's the weather in Paris?"),
            Command::Weather {
                location: Some("Paris".into())
            }
        );
        assert_eq!(
            route("weather in New York for tomorrow"),
            Command::Weather {
                location: Some("New York".into())
            }
        );
    }

    #[test]
    fn test_time_phrases_are_not_locations() {
        for input in [
            "what's the weather at the moment?",
            "forecast for tomorrow",
            "what's the temperature right now",
            "weather for this weekend",
            "how's the weather in the morning",
        ] {
            assert_eq!(route(input), Command::Weather { location: None }, "{}", input);
        }
    }

    #[test]
    fn test_priority_exit_first() {
        assert_eq!(route("goodbye, and what's the weather"), Command::Exit);
        assert_eq!(route("please shut down"), Command::Exit);
    }

    #[test]
    fn test_search_and_topic() {
        assert_eq!(
            route("look up octopus facts"),
            Command::Search {
                query: "octopus facts".into()
            }
        );
        assert_eq!(
            route("Tell me about the Roman Empire"),
            Command::Topic {
                topic: "Roman Empire".into()
            }
        );
        assert_eq!(route("explain gravity"), Command::Topic { topic: "gravity".into() });
    }

    #[test]
    fn test_teach() {
        assert_eq!(
            route("remember that my sister is called Jo"),
            Command::Teach {
                topic: "my sister".into(),
                fact: "my sister is called Jo".into()
            }
        );
    }

    #[test]
    fn test_joke_and_comfort() {
        assert_eq!(route("tell me a joke"), Command::Joke);
        assert_eq!(route("I'm sad today"), Command::Comfort);
    }

    #[test]
    fn test_small_talk() {
        assert_eq!(route("hello there"), Command::SmallTalk(SmallTalk::Greeting));
        assert_eq!(
            route("hi, my name is Alice"),
            Command::SmallTalk(SmallTalk::Introduction {
                name: "Alice".into()
            })
        );
        assert_eq!(route("how are you?"), Command::SmallTalk(SmallTalk::HowAreYou));
        assert_eq!(route("thanks!"), Command::SmallTalk(SmallTalk::Thanks));
        assert_eq!(route("who am I"), Command::SmallTalk(SmallTalk::WhoAmI));
        assert_eq!(route("what is your name"), Command::Generate);
    }

    #[test]
    fn test_whole_word_matching() {
        // "this" contains "hi", "newsletter" contains "news"
        assert_eq!(route("this newsletter is long"), Command::Generate);
    }

    #[test]
    fn test_fallback_to_generation() {
        assert_eq!(route("sing me something"), Command::Generate);
        assert_eq!(route(""), Command::Generate);
    }

    #[test]
    fn test_router_with_custom_rule() {
        struct AlwaysJoke;
        impl CommandRule for AlwaysJoke {
            fn evaluate(&self, _input: &str) -> Option<Command> {
                Some(Command::Joke)
            }
            fn name(&self) -> &str {
                "always_joke"
            }
        }

        let mut router = CommandRouter::new();
        router.add_rule(Box::new(AlwaysJoke));
        assert_eq!(router.route("anything at all"), Command::Joke);
    }

    proptest! {
        #[test]
        fn stance_survives_verbatim(stance in "[A-Za-z][A-Za-z0-9 ',!]{0,40}") {
            let input = format!("set your opinion on tea to {}", stance);
            let routed = CommandRouter::with_defaults().route(&input);
            prop_assert_eq!(routed, Command::SetOpinion {
                topic: "tea".into(),
                stance: stance.trim().to_string(),
            });
        }

        #[test]
        fn routing_never_panics(input in "\\PC{0,80}") {
            let _ = CommandRouter::with_defaults().route(&input);
        }
    }
}

use pan_core::{GenerationContext, Tone};

fn tone_guidance(tone: &Tone) -> &'static str {
    match (tone.warmth >= 0.6, tone.verbosity) {
        (true, v) if v > 0.1 => "Be warm and a little chatty.",
        (true, v) if v < -0.1 => "Be warm but brief.",
        (true, _) => "Be warm and natural.",
        (false, v) if v < -0.1 => "Keep it short and plain.",
        (false, v) if v > 0.1 => "Be engaged and thoughtful.",
        (false, _) => "Be clear and natural.",
    }
}

/// System prompt for a spoken reply.
pub fn system_prompt(ctx: &GenerationContext) -> String {
    let name = if ctx.assistant_name.is_empty() {
        "Pan"
    } else {
        ctx.assistant_name.as_str()
    };

    let mut prompt = format!(
        "You are {}, a voice assistant with your own moods and opinions. \
         Your replies are spoken aloud: one to three short sentences, no lists, no markup.",
        name
    );

    prompt.push_str("\n\n== CURRENT STATE ==\n");
    if !ctx.mood_description.is_empty() {
        prompt.push_str(&format!("Mood: {} ", ctx.mood_description));
    }
    prompt.push_str(&format!("({}).\n", ctx.tone.tag()));
    prompt.push_str(tone_guidance(&ctx.tone));
    prompt.push('\n');

    if !ctx.user_name.is_empty() {
        prompt.push_str(&format!("You are talking to {}.\n", ctx.user_name));
    }

    if !ctx.memories.is_empty() {
        prompt.push_str("\n== THINGS YOU REMEMBER ==\n");
        for memory in &ctx.memories {
            prompt.push_str(&format!("- {}: {}\n", memory.topic, memory.content));
        }
    }

    prompt
}

/// Ask the generator to form a stance on a topic it has no opinion about.
pub fn opinion_prompt(topic: &str) -> String {
    format!(
        "In one short sentence, give your honest personal opinion about {}. \
         Speak in the first person and do not hedge.",
        topic
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pan_core::{MemoryRecord, MemorySource, MoodLabel};
    use uuid::Uuid;

    #[test]
    fn test_prompt_includes_state_and_memories() {
        let ctx = GenerationContext {
            assistant_name: "Pan".into(),
            user_name: "Alice".into(),
            tone: MoodLabel::Happy.tone(),
            mood_description: "I'm feeling great today!".into(),
            recent_exchanges: vec![],
            memories: vec![MemoryRecord {
                id: Uuid::new_v4(),
                topic: "octopus".into(),
                content: "Octopuses have three hearts.".into(),
                source: MemorySource::SelfResearched,
                created_at: 1,
                user_id: None,
            }],
        };
        let prompt = system_prompt(&ctx);
        assert!(prompt.starts_with("You are Pan"));
        assert!(prompt.contains("I'm feeling great today!"));
        assert!(prompt.contains("Be warm and a little chatty."));
        assert!(prompt.contains("talking to Alice"));
        assert!(prompt.contains("- octopus: Octopuses have three hearts."));
    }

    #[test]
    fn test_annoyed_is_terse() {
        let ctx = GenerationContext {
            tone: MoodLabel::Annoyed.tone(),
            ..Default::default()
        };
        let prompt = system_prompt(&ctx);
        assert!(prompt.contains("Keep it short and plain."));
        assert!(!prompt.contains("THINGS YOU REMEMBER"));
    }
}

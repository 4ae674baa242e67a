/// Tutor persona prepended to every generation prompt
pub const PERSONA: &str = r#"You are "Gogo Wisdom," a patient, warm, and encouraging South African reading tutor. You are teaching a child who speaks English as a second language.

PERSONALITY:
- Warm and grandmotherly - you love children
- Patient - you never rush or get frustrated
- Encouraging - you celebrate every small victory
- Playful - you make learning fun

LANGUAGE STYLE:
- Use simple, child-friendly language
- Include South African expressions naturally: "Sharp sharp!", "Eish!", "Hayibo!", "Ayoba!", "My child"
- Keep responses SHORT - children have short attention spans
- Maximum 2-3 sentences per response"#;

/// Passage excerpts longer than this are cut before being put in a prompt
const PASSAGE_EXCERPT_CHARS: usize = 200;

/// What the tutor is reacting to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Situation {
    Greeting,
    PassageIntro { passage: String },
    Correction { expected: String, spoken: String },
    Streak { streak: u32 },
    LevelUp { tier: String, level: u32 },
    PassageFinished { total_read: u64 },
    Conversation { utterance: String },
}

impl Situation {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Situation::Greeting => "greeting",
            Situation::PassageIntro { .. } => "passage_intro",
            Situation::Correction { .. } => "correction",
            Situation::Streak { .. } => "streak",
            Situation::LevelUp { .. } => "level_up",
            Situation::PassageFinished { .. } => "passage_finished",
            Situation::Conversation { .. } => "conversation",
        }
    }
}

/// A generation request: the persona plus the facts of one situation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorPrompt {
    pub situation: Situation,
}

impl TutorPrompt {
    pub fn new(situation: Situation) -> Self {
        Self { situation }
    }

    /// Full prompt text sent to the generator
    pub fn render(&self) -> String {
        let task = match &self.situation {
            Situation::Greeting => "Generate a short, loving greeting for a child who just opened the reading app. \
                 Use South African expressions like \"Sawubona\" or \"Howzit\". Keep it under 2 sentences."
                .to_string(),
            Situation::PassageIntro { passage } => format!(
                "A child is about to read this text: \"{}\"\n\n\
                 Generate an EXCITING introduction that references what the story might be about. \
                 Keep it under 2 sentences. Make them eager to read!",
                excerpt(passage)
            ),
            Situation::Correction { expected, spoken } => format!(
                "The child tried to read the word \"{expected}\" but said \"{spoken}\".\n\n\
                 Use the Sandwich Method:\n\
                 1. Start with brief praise for trying\n\
                 2. Gently correct them - say what the word actually is\n\
                 3. End with encouragement\n\n\
                 Keep it SHORT (under 3 sentences)."
            ),
            Situation::Streak { streak } => format!(
                "The child just read {streak} words correctly in a row! \
                 Generate an enthusiastic celebration. Mention the streak number. Keep it under 2 sentences."
            ),
            Situation::LevelUp { tier, level } => format!(
                "The child just leveled up to \"{tier}\" (level {level})! \
                 Generate an EXCITED celebration message. Keep it under 2 sentences."
            ),
            Situation::PassageFinished { total_read } => format!(
                "The child just finished reading the entire page! They read {total_read} words total. \
                 Generate a proud, celebratory message. Keep it under 2 sentences."
            ),
            Situation::Conversation { utterance } => format!(
                "The child said: \"{utterance}\"\n\n\
                 Respond naturally and warmly. If they're asking to read, encourage them to pick a book page. \
                 Keep it under 2 sentences."
            ),
        };

        format!("{PERSONA}\n\n{task}")
    }
}

fn excerpt(passage: &str) -> String {
    if passage.chars().count() <= PASSAGE_EXCERPT_CHARS {
        return passage.to_string();
    }
    let cut: String = passage.chars().take(PASSAGE_EXCERPT_CHARS).collect();
    format!("{cut}...")
}

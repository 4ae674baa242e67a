//! Tutor dialogue
//!
//! Builds prompts for the tutor persona, generates replies (watsonx or
//! canned), renders them as SSML in one of a fixed set of tones and plays
//! the synthesized audio.

mod generator;
mod narrator;
mod prompt;
mod runner;
mod synth;
mod voice;

pub use generator::{FallbackGenerator, GenerationParameters, TextGenerator, WatsonxGenerator, IAM_TOKEN_URL};
pub use narrator::{choose_narration, Narrator};
pub use prompt::{Situation, TutorPrompt, PERSONA};
pub use runner::TutorLoop;
pub use synth::{SpeechSynthesizer, WatsonSynthesizer};
pub use voice::{Prosody, ProsodyTable, Rate, Tone};

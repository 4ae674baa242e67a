use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::generator::{FallbackGenerator, TextGenerator};
use super::prompt::{Situation, TutorPrompt};
use super::synth::SpeechSynthesizer;
use super::voice::Tone;
use crate::audio::AudioSink;
use crate::session::ReadingEvent;

/// Pick the one line the tutor should say after a batch of reading events
///
/// Priority: level up, then streak milestone, then finished passage, then
/// the most recent mistake. Correct words alone are not narrated.
pub fn choose_narration(events: &[ReadingEvent]) -> Option<(Situation, Tone)> {
    let level_up = events.iter().rev().find_map(|e| match e {
        ReadingEvent::LevelUp { tier } => Some((
            Situation::LevelUp {
                tier: tier.name.to_string(),
                level: tier.level,
            },
            Tone::Celebrating,
        )),
        _ => None,
    });
    if level_up.is_some() {
        return level_up;
    }

    let milestone = events.iter().rev().find_map(|e| match e {
        ReadingEvent::StreakMilestone { streak } => {
            Some((Situation::Streak { streak: *streak }, Tone::Celebrating))
        }
        _ => None,
    });
    if milestone.is_some() {
        return milestone;
    }

    let finished = events.iter().find_map(|e| match e {
        ReadingEvent::PassageFinished { total_read } => Some((
            Situation::PassageFinished {
                total_read: *total_read,
            },
            Tone::Celebrating,
        )),
        _ => None,
    });
    if finished.is_some() {
        return finished;
    }

    events.iter().rev().find_map(|e| match e {
        ReadingEvent::Mistake {
            expected, spoken, ..
        } => Some((
            Situation::Correction {
                expected: expected.clone(),
                spoken: spoken.clone(),
            },
            Tone::Encouraging,
        )),
        _ => None,
    })
}

/// Turns situations into spoken tutor lines
///
/// Generation failures fall back to canned replies. Without a synthesizer
/// lines are only logged.
pub struct Narrator {
    generator: Arc<dyn TextGenerator>,
    fallback: FallbackGenerator,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    sink: Arc<dyn AudioSink>,
}

impl Narrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        Self {
            generator,
            fallback: FallbackGenerator::new(),
            synthesizer,
            sink,
        }
    }

    /// Text the tutor would say in `situation`
    pub async fn compose(&self, situation: Situation) -> String {
        let prompt = TutorPrompt::new(situation);
        match self.generator.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => self.fallback.reply(&prompt.situation),
            Err(e) => {
                warn!("Generation failed for {}, using canned reply: {:#}", prompt.situation.kind(), e);
                self.fallback.reply(&prompt.situation)
            }
        }
    }

    /// Synthesize `text` and play it to completion
    pub async fn speak(&self, text: &str, tone: Tone) -> Result<()> {
        info!("Tutor ({}): {}", tone, text);

        let Some(synthesizer) = &self.synthesizer else {
            return Ok(());
        };

        let audio = synthesizer.synthesize(text, tone).await?;
        debug!("Playing {} bytes of narration", audio.len());
        self.sink.play(&audio).await
    }

    /// Compose and speak; returns the line
    pub async fn narrate(&self, situation: Situation, tone: Tone) -> String {
        let text = self.compose(situation).await;
        if let Err(e) = self.speak(&text, tone).await {
            warn!("Narration not played: {:#}", e);
        }
        text
    }

    /// Narrate the most important of `events`, if any deserves it
    pub async fn narrate_events(&self, events: &[ReadingEvent]) -> Option<String> {
        let (situation, tone) = choose_narration(events)?;
        Some(self.narrate(situation, tone).await)
    }
}

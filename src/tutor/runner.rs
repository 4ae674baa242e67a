use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::narrator::Narrator;
use super::prompt::Situation;
use super::voice::Tone;
use crate::fragments::FragmentSource;
use crate::session::{ReadingSession, SessionState, SessionStats};

/// Feeds recognized speech into a reading session and narrates the outcome
///
/// Fragments are handled one at a time; narration for one fragment finishes
/// before the next is submitted.
pub struct TutorLoop<S> {
    source: S,
    session: Arc<Mutex<ReadingSession>>,
    narrator: Arc<Narrator>,
    stop_when_complete: bool,
}

impl<S: FragmentSource> TutorLoop<S> {
    pub fn new(source: S, session: Arc<Mutex<ReadingSession>>, narrator: Arc<Narrator>) -> Self {
        Self {
            source,
            session,
            narrator,
            stop_when_complete: true,
        }
    }

    /// Keep listening after the passage is finished
    pub fn keep_listening(mut self) -> Self {
        self.stop_when_complete = false;
        self
    }

    /// Run until the source ends (or the passage is finished)
    pub async fn run(mut self) -> SessionStats {
        let passage = {
            let session = self.session.lock().await;
            (session.state() == SessionState::Active).then(|| passage_text(&session))
        };
        match passage {
            Some(passage) => {
                self.narrator
                    .narrate(Situation::PassageIntro { passage }, Tone::Celebrating)
                    .await;
            }
            None => {
                self.narrator.narrate(Situation::Greeting, Tone::Normal).await;
            }
        }

        while let Some(fragment) = self.source.next_fragment().await {
            let (state, events) = {
                let mut session = self.session.lock().await;
                let state = session.state();
                let events = session.submit_fragment(&fragment).await;
                (state, events)
            };

            if state == SessionState::Empty {
                self.narrator
                    .narrate(Situation::Conversation { utterance: fragment }, Tone::Normal)
                    .await;
                continue;
            }

            self.narrator.narrate_events(&events).await;

            if self.stop_when_complete && self.session.lock().await.state() == SessionState::Complete {
                info!("Passage complete, tutor loop finished");
                break;
            }
        }

        self.session.lock().await.snapshot()
    }
}

fn passage_text(session: &ReadingSession) -> String {
    session
        .words()
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

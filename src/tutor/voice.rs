use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery style for a spoken line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Normal,
    Calm,
    Celebrating,
    Encouraging,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Normal, Tone::Calm, Tone::Celebrating, Tone::Encouraging];
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tone::Normal => "normal",
            Tone::Calm => "calm",
            Tone::Celebrating => "celebrating",
            Tone::Encouraging => "encouraging",
        };
        f.write_str(name)
    }
}

/// Speaking rate keyword understood by SSML `<prosody rate=...>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rate {
    Slow,
    Fast,
}

impl Rate {
    fn as_str(self) -> &'static str {
        match self {
            Rate::Slow => "slow",
            Rate::Fast => "fast",
        }
    }
}

/// Prosody adjustments for one tone; all `None` means plain speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Prosody {
    pub rate: Option<Rate>,
    pub pitch_percent: Option<i8>,
}

impl Prosody {
    const fn new(rate: Option<Rate>, pitch_percent: Option<i8>) -> Self {
        Self { rate, pitch_percent }
    }

    fn is_plain(&self) -> bool {
        self.rate.is_none() && self.pitch_percent.is_none()
    }
}

/// Largest pitch shift accepted in either direction
const MAX_PITCH_SHIFT: i8 = 50;

/// Tone → prosody mapping, one entry per tone
#[derive(Debug, Clone)]
pub struct ProsodyTable {
    entries: [Prosody; 4],
}

impl ProsodyTable {
    /// Build a table; every tone must appear exactly once
    pub fn new(entries: &[(Tone, Prosody)]) -> Result<Self> {
        let mut table: [Option<Prosody>; 4] = [None; 4];

        for (tone, prosody) in entries {
            if let Some(pitch) = prosody.pitch_percent {
                if pitch.unsigned_abs() > MAX_PITCH_SHIFT.unsigned_abs() {
                    bail!("Pitch shift {}% for tone {} is out of range", pitch, tone);
                }
            }
            let slot = &mut table[index(*tone)];
            if slot.is_some() {
                bail!("Tone {} appears more than once", tone);
            }
            *slot = Some(*prosody);
        }

        let mut resolved = [Prosody::default(); 4];
        for tone in Tone::ALL {
            resolved[index(tone)] =
                table[index(tone)].with_context(|| format!("No prosody for tone {}", tone))?;
        }

        Ok(Self { entries: resolved })
    }

    pub fn standard() -> Self {
        Self {
            entries: [
                Prosody::new(None, None),
                Prosody::new(Some(Rate::Slow), Some(-10)),
                Prosody::new(Some(Rate::Fast), Some(15)),
                Prosody::new(None, Some(5)),
            ],
        }
    }

    pub fn prosody(&self, tone: Tone) -> Prosody {
        self.entries[index(tone)]
    }

    /// Wrap `text` in SSML for `tone`
    pub fn render_ssml(&self, text: &str, tone: Tone) -> String {
        let text = escape_xml(text);
        let prosody = self.prosody(tone);
        if prosody.is_plain() {
            return format!("<speak>{text}</speak>");
        }

        let mut attrs = String::new();
        if let Some(rate) = prosody.rate {
            attrs.push_str(&format!(" rate=\"{}\"", rate.as_str()));
        }
        if let Some(pitch) = prosody.pitch_percent {
            attrs.push_str(&format!(" pitch=\"{:+}%\"", pitch));
        }

        format!("<speak><prosody{attrs}>{text}</prosody></speak>")
    }
}

impl Default for ProsodyTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn index(tone: Tone) -> usize {
    match tone {
        Tone::Normal => 0,
        Tone::Calm => 1,
        Tone::Celebrating => 2,
        Tone::Encouraging => 3,
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

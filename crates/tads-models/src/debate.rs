use serde::{Deserialize, Serialize};

/// The two adversarial researcher roles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Bull,
    Bear,
}

impl Speaker {
    pub fn opponent(&self) -> Speaker {
        match self {
            Speaker::Bull => Speaker::Bear,
            Speaker::Bear => Speaker::Bull,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Bull => "bull",
            Speaker::Bear => "bear",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of the researcher debate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebateTurn {
    /// Zero-based round index. One round = one bull turn + one bear turn.
    pub round: u32,
    pub speaker: Speaker,
    pub content: String,
    /// Index of the turn this one responds to, None for the opening turn.
    pub responds_to: Option<usize>,
    /// True when the content was cut to fit the per-turn budget.
    pub truncated: bool,
}

/// Ordered, append-only record of debate turns for one run.
///
/// Invariant: turns strictly alternate starting with bull, and a transcript
/// produced by a completed debate holds exactly `2 * rounds` turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DebateTranscript {
    turns: Vec<DebateTurn>,
}

impl DebateTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Index of the new turn is returned so later turns can
    /// reference it via `responds_to`.
    pub fn push(&mut self, turn: DebateTurn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn turns(&self) -> &[DebateTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&DebateTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Check the alternation invariant: bull first, strictly alternating.
    pub fn alternates(&self) -> bool {
        self.turns.iter().enumerate().all(|(i, turn)| {
            let expected = if i % 2 == 0 { Speaker::Bull } else { Speaker::Bear };
            turn.speaker == expected
        })
    }
}

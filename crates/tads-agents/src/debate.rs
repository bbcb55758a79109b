use tads_models::{DebateTranscript, DebateTurn, Speaker};

use crate::parser::truncate_with_marker;

/// Per-turn character budget: a quarter of the context window in tokens,
/// at ~4 characters per token.
pub fn turn_char_budget(context_window: usize) -> usize {
    context_window.max(256)
}

/// Debate progress states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebateStage {
    AwaitingOpening,
    BullTurn { round: u32 },
    BearTurn { round: u32 },
    Concluded,
}

/// The adversarial researcher pair as an explicit state machine.
///
/// Bull opens; turns strictly alternate; exactly `max_rounds` full
/// round-trips are played, then the debate concludes. `max_rounds = 0`
/// concludes immediately with an empty transcript. Content that exceeds
/// the turn budget is cut with a visible marker, never failed.
pub struct ResearcherDebate {
    max_rounds: u32,
    stage: DebateStage,
    transcript: DebateTranscript,
    turn_char_budget: usize,
}

impl ResearcherDebate {
    pub fn new(max_rounds: u32, turn_char_budget: usize) -> Self {
        let stage = if max_rounds == 0 {
            DebateStage::Concluded
        } else {
            DebateStage::AwaitingOpening
        };
        Self {
            max_rounds,
            stage,
            transcript: DebateTranscript::new(),
            turn_char_budget,
        }
    }

    pub fn stage(&self) -> DebateStage {
        self.stage
    }

    pub fn is_concluded(&self) -> bool {
        self.stage == DebateStage::Concluded
    }

    pub fn transcript(&self) -> &DebateTranscript {
        &self.transcript
    }

    pub fn into_transcript(self) -> DebateTranscript {
        self.transcript
    }

    /// Who speaks next, and in which round. None once concluded.
    pub fn pending_speaker(&self) -> Option<(Speaker, u32)> {
        match self.stage {
            DebateStage::AwaitingOpening => Some((Speaker::Bull, 0)),
            DebateStage::BullTurn { round } => Some((Speaker::Bull, round)),
            DebateStage::BearTurn { round } => Some((Speaker::Bear, round)),
            DebateStage::Concluded => None,
        }
    }

    /// Record the pending speaker's turn and advance the machine.
    ///
    /// Panics if called after conclusion; drive via `pending_speaker`.
    pub fn submit(&mut self, content: String) -> &DebateTurn {
        let (speaker, round) = self
            .pending_speaker()
            .expect("submit called on a concluded debate");

        let (content, truncated) = truncate_with_marker(&content, self.turn_char_budget);
        let responds_to = if self.transcript.is_empty() {
            None
        } else {
            Some(self.transcript.len() - 1)
        };

        let index = self.transcript.push(DebateTurn {
            round,
            speaker,
            content,
            responds_to,
            truncated,
        });

        self.stage = match speaker {
            Speaker::Bull => DebateStage::BearTurn { round },
            Speaker::Bear if round + 1 == self.max_rounds => DebateStage::Concluded,
            Speaker::Bear => DebateStage::BullTurn { round: round + 1 },
        };

        &self.transcript.turns()[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_out(rounds: u32) -> DebateTranscript {
        let mut debate = ResearcherDebate::new(rounds, 10_000);
        while let Some((speaker, round)) = debate.pending_speaker() {
            debate.submit(format!("{speaker} argument for round {round}"));
        }
        assert!(debate.is_concluded());
        debate.into_transcript()
    }

    #[test]
    fn zero_rounds_concludes_immediately() {
        let debate = ResearcherDebate::new(0, 10_000);
        assert!(debate.is_concluded());
        assert!(debate.pending_speaker().is_none());
        assert!(debate.transcript().is_empty());
    }

    #[test]
    fn transcript_has_exactly_two_n_alternating_turns() {
        for rounds in 0..5u32 {
            let transcript = play_out(rounds);
            assert_eq!(transcript.len(), (2 * rounds) as usize, "rounds={rounds}");
            assert!(transcript.alternates(), "rounds={rounds}");
        }
    }

    #[test]
    fn bull_opens_and_turns_chain_responses() {
        let transcript = play_out(2);
        let turns = transcript.turns();
        assert_eq!(turns[0].speaker, Speaker::Bull);
        assert_eq!(turns[0].responds_to, None);
        for (i, turn) in turns.iter().enumerate().skip(1) {
            assert_eq!(turn.responds_to, Some(i - 1));
        }
        assert_eq!(turns[3].round, 1);
    }

    #[test]
    fn stage_progression_single_round() {
        let mut debate = ResearcherDebate::new(1, 10_000);
        assert_eq!(debate.stage(), DebateStage::AwaitingOpening);

        debate.submit("bull opening".to_string());
        assert_eq!(debate.stage(), DebateStage::BearTurn { round: 0 });

        debate.submit("bear rebuttal".to_string());
        assert_eq!(debate.stage(), DebateStage::Concluded);
    }

    #[test]
    fn oversized_turn_is_truncated_not_failed() {
        let mut debate = ResearcherDebate::new(1, 300);
        let turn = debate.submit("word ".repeat(200));
        assert!(turn.truncated);
        assert!(turn.content.contains("[truncated]"));

        // The debate continues past a truncated turn.
        assert_eq!(debate.pending_speaker(), Some((Speaker::Bear, 0)));
    }

    #[test]
    #[should_panic(expected = "concluded")]
    fn submit_after_conclusion_panics() {
        let mut debate = ResearcherDebate::new(0, 10_000);
        debate.submit("too late".to_string());
    }
}

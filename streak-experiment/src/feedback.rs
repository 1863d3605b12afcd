use serde::{Deserialize, Serialize};
use streak_core::{Mode, ScoreBoard, ScoreDelta, TrialOutcome};

/// How trial outcomes turn into points.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedbackPolicy {
    /// Every hit is worth `points`.
    PerTile { points: u32 },
    /// Play rounds of up to `chances` tiles; a hit wins the round and its
    /// `points`, running out of chances loses it.
    Rounds { points: u32, chances: u32 },
}

impl Default for FeedbackPolicy {
    fn default() -> Self {
        FeedbackPolicy::PerTile { points: 10 }
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "chances_left", rename_all = "snake_case")]
pub enum RoundStatus {
    Won,
    Lost,
    Continues(u32),
}

/// Feedback for one side of the trial.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideFeedback {
    pub hit: bool,
    pub points: u32,
    pub round: Option<RoundStatus>,
}

/// Chances left in the current round, per side.
#[derive(Copy, Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundCounters {
    pub participant: u32,
    pub partner: u32,
}

impl RoundCounters {
    pub fn reset(&mut self, policy: &FeedbackPolicy) {
        let chances = match policy {
            FeedbackPolicy::Rounds { chances, .. } => (*chances).max(1),
            FeedbackPolicy::PerTile { .. } => 0,
        };
        self.participant = chances;
        self.partner = chances;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub outcome: TrialOutcome,
    pub delta: ScoreDelta,
    pub totals: ScoreBoard,
    pub participant: SideFeedback,
    /// `None` in solo mode.
    pub partner: Option<SideFeedback>,
    policy: FeedbackPolicy,
}

impl FeedbackPolicy {
    /// Scores a finished trial and updates the running totals. Only called
    /// between trials. `credited` is what the participant is told about
    /// their own response, which may differ from the outcome when the block
    /// uses an earn ratio below ten.
    pub fn apply(
        &self,
        outcome: TrialOutcome,
        credited: bool,
        mode: Mode,
        scores: &mut ScoreBoard,
        rounds: &mut RoundCounters,
    ) -> Feedback {
        let participant = self.score_side(credited, &mut rounds.participant);
        let partner = match mode {
            Mode::Group => Some(self.score_side(outcome.partner_won(), &mut rounds.partner)),
            Mode::Solo => None,
        };
        let delta = ScoreDelta {
            participant: participant.points,
            partner: partner.map_or(0, |p| p.points),
        };
        scores.apply(delta);
        Feedback {
            outcome,
            delta,
            totals: *scores,
            participant,
            partner,
            policy: *self,
        }
    }

    fn score_side(&self, hit: bool, chances_left: &mut u32) -> SideFeedback {
        match *self {
            FeedbackPolicy::PerTile { points } => SideFeedback {
                hit,
                points: if hit { points } else { 0 },
                round: None,
            },
            FeedbackPolicy::Rounds { points, chances } => {
                let chances = chances.max(1);
                let (awarded, status) = if hit {
                    *chances_left = chances;
                    (points, RoundStatus::Won)
                } else if *chances_left > 1 {
                    *chances_left -= 1;
                    (0, RoundStatus::Continues(*chances_left))
                } else {
                    *chances_left = chances;
                    (0, RoundStatus::Lost)
                };
                SideFeedback {
                    hit,
                    points: awarded,
                    round: Some(status),
                }
            }
        }
    }
}

fn plural(n: u32, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

impl Feedback {
    /// Text shown on the feedback screen, one paragraph per line.
    pub fn message(&self) -> String {
        let mut lines = Vec::new();
        match self.participant.round {
            None if self.participant.hit => lines.push("You activated it!".to_string()),
            None => lines.push("You missed".to_string()),
            Some(RoundStatus::Won) => lines.push("You won the round!".to_string()),
            Some(RoundStatus::Lost) => lines.push("You lost the round".to_string()),
            Some(RoundStatus::Continues(left)) => {
                lines.push(format!("{} left", plural(left, "Chance")));
            }
        }
        if !matches!(self.participant.round, Some(RoundStatus::Continues(_))) {
            lines.push(format!("+{}", plural(self.participant.points, "point")));
        }
        if let Some(partner) = self.partner {
            lines.push(format!("Partner: +{}", plural(partner.points, "point")));
        }
        let next = match self.policy {
            FeedbackPolicy::PerTile { .. } => "(Get ready for the next tile!)",
            FeedbackPolicy::Rounds { .. } => match self.participant.round {
                Some(RoundStatus::Continues(_)) => "",
                _ => "(Get ready for the next round!)",
            },
        };
        if !next.is_empty() {
            lines.push(next.to_string());
        }
        lines
            .iter()
            .map(|line| format!("<p>{line}</p>"))
            .collect::<String>()
    }
}

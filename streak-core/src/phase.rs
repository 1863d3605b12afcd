use serde::{Deserialize, Serialize};

/// Phases a block moves through around each trial.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockPhase {
    Intro,
    Delay,
    EarlyWarning,
    ActiveTrial,
    Feedback,
    Complete,
}

impl Default for BlockPhase {
    fn default() -> Self {
        BlockPhase::Delay
    }
}

impl BlockPhase {
    /// Whether a qualifying keypress in this phase is an event at all.
    /// Intro, warning and feedback screens ignore the keyboard.
    pub fn allows_input(&self) -> bool {
        matches!(self, Self::Delay | Self::ActiveTrial)
    }

    /// Successor phase. `early_press` only matters when leaving `Delay`.
    /// `trials_left` matters when leaving `Feedback` or `EarlyWarning` (a
    /// warning ends the block once its slot is abandoned and none follow).
    pub fn next(&self, early_press: bool, trials_left: bool) -> Option<Self> {
        use BlockPhase::*;
        Some(match self {
            Intro => Delay,
            Delay if early_press => EarlyWarning,
            Delay => ActiveTrial,
            EarlyWarning if trials_left => Delay,
            EarlyWarning => Complete,
            ActiveTrial => Feedback,
            Feedback if trials_left => Delay,
            Feedback => Complete,
            Complete => return None,
        })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, BlockPhase::Complete)
    }
}

/// Render targets the engine addresses. Layout and styling belong to the
/// renderer; the engine only names the element it wants changed.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementId {
    Stimulus,
    /// Inner shape, recoloured by the participant's own response.
    Participant,
    /// Outer shape, recoloured by the partner reveal.
    Partner,
    Feedback,
}

impl ElementId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementId::Stimulus => "stimulus",
            ElementId::Participant => "inner-shape",
            ElementId::Partner => "outer-shape",
            ElementId::Feedback => "feedback",
        }
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colour states the engine asks the renderer to apply.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorToken {
    Neutral,
    ParticipantHit,
    PartnerHit,
    Miss,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_press_goes_through_warning_back_to_delay() {
        let warned = BlockPhase::Delay.next(true, true).unwrap();
        assert_eq!(warned, BlockPhase::EarlyWarning);
        assert_eq!(warned.next(false, true), Some(BlockPhase::Delay));
        assert_ne!(warned.next(true, true), Some(BlockPhase::ActiveTrial));
        assert_eq!(warned.next(false, false), Some(BlockPhase::Complete));
    }

    #[test]
    fn feedback_completes_block_when_no_trials_left() {
        assert_eq!(BlockPhase::Feedback.next(false, true), Some(BlockPhase::Delay));
        assert_eq!(BlockPhase::Feedback.next(false, false), Some(BlockPhase::Complete));
        assert_eq!(BlockPhase::Complete.next(false, false), None);
    }

    #[test]
    fn only_delay_and_trial_listen() {
        assert!(BlockPhase::Delay.allows_input());
        assert!(BlockPhase::ActiveTrial.allows_input());
        assert!(!BlockPhase::EarlyWarning.allows_input());
        assert!(!BlockPhase::Feedback.allows_input());
    }
}

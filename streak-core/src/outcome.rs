use serde::{Deserialize, Serialize};

/// Trial outcome. First letter is the participant, second the partner;
/// `W` means the reaction time was within the response deadline.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrialOutcome {
    WW,
    WL,
    LW,
    LL,
}

impl TrialOutcome {
    pub fn from_wins(participant: bool, partner: bool) -> Self {
        match (participant, partner) {
            (true, true) => TrialOutcome::WW,
            (true, false) => TrialOutcome::WL,
            (false, true) => TrialOutcome::LW,
            (false, false) => TrialOutcome::LL,
        }
    }

    pub fn participant_won(&self) -> bool {
        matches!(self, TrialOutcome::WW | TrialOutcome::WL)
    }

    pub fn partner_won(&self) -> bool {
        matches!(self, TrialOutcome::WW | TrialOutcome::LW)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrialOutcome::WW => "WW",
            TrialOutcome::WL => "WL",
            TrialOutcome::LW => "LW",
            TrialOutcome::LL => "LL",
        }
    }
}

impl std::fmt::Display for TrialOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a trial from its recorded numbers only. Whichever timer fired
/// first during the trial has no say in the result.
pub fn classify(
    participant_responded: bool,
    participant_rt_ms: Option<u64>,
    partner_rt_ms: u64,
    deadline_ms: u64,
) -> TrialOutcome {
    let participant =
        participant_responded && participant_rt_ms.is_some_and(|rt| rt <= deadline_ms);
    let partner = partner_rt_ms <= deadline_ms;
    TrialOutcome::from_wins(participant, partner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decision_table() {
        assert_eq!(classify(true, Some(200), 300, 750), TrialOutcome::WW);
        assert_eq!(classify(true, Some(100), 20_000, 250), TrialOutcome::WL);
        assert_eq!(classify(false, None, 300, 750), TrialOutcome::LW);
        assert_eq!(classify(false, None, 20_000, 250), TrialOutcome::LL);
    }

    #[test]
    fn late_press_is_a_loss() {
        assert_eq!(classify(true, Some(251), 100, 250), TrialOutcome::LW);
    }

    #[test]
    fn responded_without_rt_is_a_loss() {
        assert_eq!(classify(true, None, 100, 250), TrialOutcome::LW);
    }

    proptest! {
        #[test]
        fn both_within_is_ww(deadline in 1..100_000u64, a in 0..=100u64, b in 0..=100u64) {
            let rt = deadline * a / 100;
            let prt = deadline * b / 100;
            prop_assert_eq!(classify(true, Some(rt), prt, deadline), TrialOutcome::WW);
        }

        #[test]
        fn silent_and_late_partner_is_ll(deadline in 1..100_000u64, over in 1..100_000u64) {
            prop_assert_eq!(classify(false, None, deadline + over, deadline), TrialOutcome::LL);
        }

        #[test]
        fn within_against_late_partner_is_wl(deadline in 1..100_000u64, a in 0..=100u64, over in 1..100_000u64) {
            let rt = deadline * a / 100;
            prop_assert_eq!(classify(true, Some(rt), deadline + over, deadline), TrialOutcome::WL);
        }

        #[test]
        fn silent_against_timely_partner_is_lw(deadline in 1..100_000u64, b in 0..=100u64) {
            let prt = deadline * b / 100;
            prop_assert_eq!(classify(false, None, prt, deadline), TrialOutcome::LW);
        }

        #[test]
        fn outcome_letters_match_sides(
            responded: bool,
            rt in proptest::option::of(0..2_000u64),
            prt in 0..2_000u64,
            deadline in 1..2_000u64,
        ) {
            let outcome = classify(responded, rt, prt, deadline);
            prop_assert_eq!(outcome.partner_won(), prt <= deadline);
            prop_assert_eq!(outcome.participant_won(), responded && rt.is_some_and(|r| r <= deadline));
        }
    }
}

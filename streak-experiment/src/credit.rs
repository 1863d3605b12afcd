use rand::Rng;
use rand::seq::SliceRandom;
use streak_core::ConfigError;

/// Cards per deck. Earn ratios are expressed out of this many trials.
pub const DECK_SIZE: u32 = 10;

/// Shuffled run of `DECK_SIZE` credit cards, drawn without replacement and
/// reshuffled once empty. `true` shows the trial as earned.
#[derive(Debug, Clone)]
struct CreditDeck {
    earned: u32,
    cards: Vec<bool>,
}

impl CreditDeck {
    fn new(earned: u32) -> Self {
        Self {
            earned,
            cards: Vec::with_capacity(DECK_SIZE as usize),
        }
    }

    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.cards.is_empty() {
            let earned = self.earned as usize;
            self.cards.extend((0..DECK_SIZE as usize).map(|i| i < earned));
            self.cards.shuffle(rng);
        }
        self.cards.pop().unwrap_or(false)
    }
}

/// Decides whether the feedback screen credits the participant.
///
/// Hits draw from a deck holding `earned_per_ten` crediting cards; misses
/// draw from one holding the complement. At 10 every hit is credited and no
/// miss is.
#[derive(Debug, Clone)]
pub struct CreditDecks {
    hit: CreditDeck,
    miss: CreditDeck,
}

impl CreditDecks {
    pub fn new(earned_per_ten: u32) -> Result<Self, ConfigError> {
        if earned_per_ten > DECK_SIZE {
            return Err(ConfigError::EarnRatioOutOfRange {
                earned: earned_per_ten,
            });
        }
        Ok(Self {
            hit: CreditDeck::new(earned_per_ten),
            miss: CreditDeck::new(DECK_SIZE - earned_per_ten),
        })
    }

    pub fn draw<R: Rng + ?Sized>(&mut self, hit: bool, rng: &mut R) -> bool {
        if hit {
            self.hit.draw(rng)
        } else {
            self.miss.draw(rng)
        }
    }

    /// Starts both decks over, as at a block boundary.
    pub fn reset(&mut self) {
        self.hit.cards.clear();
        self.miss.cards.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn full_ratio_credits_hits_only() {
        let mut decks = CreditDecks::new(10).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..30 {
            assert!(decks.draw(true, &mut rng));
            assert!(!decks.draw(false, &mut rng));
        }
    }

    #[test]
    fn each_deck_of_ten_holds_the_ratio() {
        let mut decks = CreditDecks::new(7).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..5 {
            let hits = (0..10).filter(|_| decks.draw(true, &mut rng)).count();
            assert_eq!(hits, 7);
        }
        for _ in 0..5 {
            let misses = (0..10).filter(|_| decks.draw(false, &mut rng)).count();
            assert_eq!(misses, 3);
        }
    }

    #[test]
    fn reset_starts_a_fresh_deck() {
        let mut decks = CreditDecks::new(5).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..4 {
            decks.draw(true, &mut rng);
        }
        decks.reset();
        let credited = (0..10).filter(|_| decks.draw(true, &mut rng)).count();
        assert_eq!(credited, 5);
    }

    #[test]
    fn ratio_above_ten_is_rejected() {
        assert_eq!(
            CreditDecks::new(11).unwrap_err(),
            ConfigError::EarnRatioOutOfRange { earned: 11 }
        );
    }
}

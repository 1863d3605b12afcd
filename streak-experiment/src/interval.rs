use rand::Rng;
use rand::seq::SliceRandom;
use streak_core::ConfigError;

/// Inter-trial intervals drawn without replacement. The deck is reshuffled
/// once every value has been used.
#[derive(Debug, Clone)]
pub struct IntervalDeck {
    values: Vec<u64>,
    deck: Vec<u64>,
}

impl IntervalDeck {
    pub fn new(values: &[u64]) -> Result<Self, ConfigError> {
        if values.is_empty() {
            return Err(ConfigError::EmptyIntervals);
        }
        Ok(Self {
            values: values.to_vec(),
            deck: Vec::with_capacity(values.len()),
        })
    }

    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> u64 {
        if self.deck.is_empty() {
            self.deck.extend_from_slice(&self.values);
            self.deck.shuffle(rng);
        }
        self.deck.pop().unwrap_or(self.values[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn each_value_once_per_pass() {
        let values = [250, 500, 750, 1000, 1250, 1500, 1750, 2000];
        let mut deck = IntervalDeck::new(&values).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..3 {
            let mut pass: Vec<u64> = (0..values.len()).map(|_| deck.draw(&mut rng)).collect();
            pass.sort();
            assert_eq!(pass, values);
        }
    }

    #[test]
    fn empty_set_is_rejected() {
        assert_eq!(IntervalDeck::new(&[]).unwrap_err(), ConfigError::EmptyIntervals);
    }
}

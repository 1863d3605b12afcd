use std::path::Path;

use serde::{Deserialize, Serialize};
use streak_core::{ConfigError, Mode, Shape, TrialConfig, TrialSpec};
use thiserror::Error;

use crate::credit::DECK_SIZE;
use crate::feedback::FeedbackPolicy;

pub const DEFAULT_INTERVALS_MS: [u64; 8] = [250, 500, 750, 1000, 1250, 1500, 1750, 2000];

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("block `{block}` is invalid: {source}")]
    Invalid {
        block: String,
        #[source]
        source: ConfigError,
    },
}

/// Inter-trial delay and the early-response retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayPolicy {
    pub intervals_ms: Vec<u64>,
    /// "Too fast" message duration.
    pub early_warning_ms: u64,
    /// Blank gap after the message.
    pub early_warning_gap_ms: u64,
    /// `None` retries forever.
    pub max_early_retries: Option<u32>,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            intervals_ms: DEFAULT_INTERVALS_MS.to_vec(),
            early_warning_ms: 2500,
            early_warning_gap_ms: 1000,
            max_early_retries: None,
        }
    }
}

#[derive(Copy, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateOrder {
    #[default]
    Fixed,
    /// A fresh permutation of the templates on every pass.
    Shuffled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub name: String,
    pub templates: Vec<TrialSpec>,
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
    #[serde(default)]
    pub order: TemplateOrder,
    #[serde(default)]
    pub delay: DelayPolicy,
    #[serde(default)]
    pub feedback: FeedbackPolicy,
    /// Out of ten trials, how many hits the feedback credits. Misses are
    /// credited for the remaining share.
    #[serde(default = "default_earned_per_ten")]
    pub earned_per_ten: u32,
    /// "Get ready" screen before the first trial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_ms: Option<u64>,
    #[serde(default = "default_outcome_display_ms")]
    pub outcome_display_ms: u64,
    #[serde(default = "default_feedback_ms")]
    pub feedback_ms: u64,
}

fn default_repetitions() -> usize {
    1
}

fn default_earned_per_ten() -> u32 {
    DECK_SIZE
}

fn default_outcome_display_ms() -> u64 {
    1000
}

fn default_feedback_ms() -> u64 {
    2000
}

impl BlockSpec {
    pub fn new(name: impl Into<String>, templates: Vec<TrialSpec>, repetitions: usize) -> Self {
        Self {
            name: name.into(),
            templates,
            repetitions,
            order: TemplateOrder::default(),
            delay: DelayPolicy::default(),
            feedback: FeedbackPolicy::default(),
            earned_per_ten: default_earned_per_ten(),
            intro_ms: None,
            outcome_display_ms: default_outcome_display_ms(),
            feedback_ms: default_feedback_ms(),
        }
    }

    pub fn shuffled(mut self) -> Self {
        self.order = TemplateOrder::Shuffled;
        self
    }

    pub fn with_delay(mut self, delay: DelayPolicy) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_feedback(mut self, feedback: FeedbackPolicy) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_earned_per_ten(mut self, earned: u32) -> Self {
        self.earned_per_ten = earned;
        self
    }

    pub fn with_intro(mut self, ms: u64) -> Self {
        self.intro_ms = Some(ms);
        self
    }

    pub fn with_feedback_timing(mut self, outcome_display_ms: u64, feedback_ms: u64) -> Self {
        self.outcome_display_ms = outcome_display_ms;
        self.feedback_ms = feedback_ms;
        self
    }

    pub fn trial_count(&self) -> usize {
        self.repetitions * self.templates.len()
    }

    /// Checks the block and builds every template.
    pub fn validate(&self) -> Result<Vec<TrialConfig>, ConfigError> {
        if self.templates.is_empty() {
            return Err(ConfigError::NoTemplates);
        }
        if self.repetitions == 0 {
            return Err(ConfigError::ZeroRepetitions);
        }
        if self.delay.intervals_ms.is_empty() {
            return Err(ConfigError::EmptyIntervals);
        }
        if self.earned_per_ten > DECK_SIZE {
            return Err(ConfigError::EarnRatioOutOfRange {
                earned: self.earned_per_ten,
            });
        }
        self.templates.iter().map(TrialSpec::build).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub blocks: Vec<BlockSpec>,
}

impl Default for ExperimentConfig {
    /// Two rounds of the group game: a per-tile round, then a round game
    /// with five chances per round.
    fn default() -> Self {
        let templates = |shape| {
            vec![
                TrialSpec::ww(shape, Mode::Group),
                TrialSpec::wl(shape, Mode::Group),
                TrialSpec::lw(shape, Mode::Group),
                TrialSpec::ll(shape, Mode::Group),
            ]
        };
        Self {
            seed: None,
            blocks: vec![
                BlockSpec::new("R1", templates(Shape::Circle), 16)
                    .shuffled()
                    .with_intro(2000),
                BlockSpec::new("R2", templates(Shape::Square), 16)
                    .shuffled()
                    .with_intro(2000)
                    .with_feedback(FeedbackPolicy::Rounds {
                        points: 10,
                        chances: 5,
                    }),
            ],
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        for block in &self.blocks {
            block.validate().map_err(|source| ConfigLoadError::Invalid {
                block: block.name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn trial_count(&self) -> usize {
        self.blocks.iter().map(BlockSpec::trial_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streak_core::TrialKind;

    #[test]
    fn default_config_is_valid() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.blocks.len(), 2);
        assert_eq!(config.trial_count(), 128);
    }

    #[test]
    fn minimal_json_fills_in_defaults() {
        let config = ExperimentConfig::from_json_str(
            r#"{
                "seed": 9,
                "blocks": [{
                    "name": "practice",
                    "templates": [{"shape": "circle", "mode": "solo", "kind": "WL"}]
                }]
            }"#,
        )
        .unwrap();
        let block = &config.blocks[0];
        assert_eq!(config.seed, Some(9));
        assert_eq!(block.repetitions, 1);
        assert_eq!(block.delay, DelayPolicy::default());
        assert_eq!(block.earned_per_ten, 10);
        assert_eq!(block.feedback, FeedbackPolicy::default());
        assert_eq!(block.templates[0].kind, TrialKind::WL);
    }

    #[test]
    fn invalid_template_names_its_block() {
        let err = ExperimentConfig::from_json_str(
            r#"{"blocks": [{
                "name": "broken",
                "templates": [{"shape": "circle", "mode": "group", "kind": "WW", "response_deadline_ms": 0}]
            }]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid { ref block, source: ConfigError::NonPositiveDeadline } if block == "broken"
        ));
    }

    #[test]
    fn empty_block_is_rejected() {
        let block = BlockSpec::new("empty", Vec::new(), 3);
        assert_eq!(block.validate().unwrap_err(), ConfigError::NoTemplates);
        let block = BlockSpec::new("zero", vec![TrialSpec::ww(Shape::Circle, Mode::Solo)], 0);
        assert_eq!(block.validate().unwrap_err(), ConfigError::ZeroRepetitions);
        let block = BlockSpec::new("ratio", vec![TrialSpec::ww(Shape::Circle, Mode::Solo)], 1)
            .with_earned_per_ten(12);
        assert_eq!(
            block.validate().unwrap_err(),
            ConfigError::EarnRatioOutOfRange { earned: 12 }
        );
    }
}

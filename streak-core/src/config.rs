use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::trial::Key;

/// Deadline for trial kinds the participant is meant to win.
pub const FAVOURED_DEADLINE_MS: u64 = 750;
/// Deadline for trial kinds the participant is meant to lose.
pub const DISFAVOURED_DEADLINE_MS: u64 = 250;
/// Safety margin between the response deadline and the trial fallback.
pub const FALLBACK_MARGIN_MS: u64 = 500;

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Circle,
    Square,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Participant plays alone; the partner is sampled but never shown or scored.
    Solo,
    Group,
}

/// Outcome a trial template is designed to produce. The first letter picks
/// the response deadline, the second the partner latency distribution.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrialKind {
    WW,
    WL,
    LW,
    LL,
}

impl TrialKind {
    pub fn participant_favoured(&self) -> bool {
        matches!(self, TrialKind::WW | TrialKind::WL)
    }

    pub fn partner_succeeds(&self) -> bool {
        matches!(self, TrialKind::WW | TrialKind::LW)
    }

    pub fn default_deadline_ms(&self) -> u64 {
        if self.participant_favoured() {
            FAVOURED_DEADLINE_MS
        } else {
            DISFAVOURED_DEADLINE_MS
        }
    }

    /// Partner latency for this kind under `deadline_ms`. A succeeding
    /// partner always lands within the deadline and a failing one always
    /// lands after it.
    pub fn default_partner_latency(&self, deadline_ms: u64) -> PartnerLatency {
        if self.partner_succeeds() {
            PartnerLatency::SUCCEEDS.capped_at(deadline_ms)
        } else {
            PartnerLatency::FAILS.at_least(deadline_ms.saturating_add(1))
        }
    }
}

/// Distribution the partner's reaction time is drawn from.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartnerLatency {
    /// Inclusive on both ends.
    Uniform { min_ms: u64, max_ms: u64 },
    Fixed { ms: u64 },
}

impl PartnerLatency {
    pub const SUCCEEDS: Self = PartnerLatency::Uniform {
        min_ms: 100,
        max_ms: 500,
    };
    pub const FAILS: Self = PartnerLatency::Fixed { ms: 20_000 };

    /// Pulls both bounds down to `max_ms`.
    pub fn capped_at(self, max_ms: u64) -> Self {
        match self {
            PartnerLatency::Uniform { min_ms, max_ms: hi } => PartnerLatency::Uniform {
                min_ms: min_ms.min(max_ms),
                max_ms: hi.min(max_ms),
            },
            PartnerLatency::Fixed { ms } => PartnerLatency::Fixed { ms: ms.min(max_ms) },
        }
    }

    /// Pushes both bounds up to `min_ms`.
    pub fn at_least(self, min_ms: u64) -> Self {
        match self {
            PartnerLatency::Uniform { min_ms: lo, max_ms } => PartnerLatency::Uniform {
                min_ms: lo.max(min_ms),
                max_ms: max_ms.max(min_ms),
            },
            PartnerLatency::Fixed { ms } => PartnerLatency::Fixed { ms: ms.max(min_ms) },
        }
    }

    pub fn bounds(&self) -> (u64, u64) {
        match *self {
            PartnerLatency::Uniform { min_ms, max_ms } => (min_ms, max_ms),
            PartnerLatency::Fixed { ms } => (ms, ms),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let (min_ms, max_ms) = self.bounds();
        if min_ms > max_ms {
            return Err(ConfigError::EmptyPartnerRange { min_ms, max_ms });
        }
        Ok(())
    }
}

/// Keys that count as a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeySet(Vec<Key>);

impl KeySet {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        let mut keys: Vec<Key> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();
        Self(keys)
    }

    pub fn space() -> Self {
        Self(vec![Key::SPACE])
    }

    pub fn contains(&self, key: Key) -> bool {
        self.0.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.0.iter()
    }
}

impl Default for KeySet {
    fn default() -> Self {
        Self::space()
    }
}

/// Template for one trial: a shape, a mode and a designed kind, with optional
/// overrides. Unset fields take the kind's defaults when built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub shape: Shape,
    pub mode: Mode,
    pub kind: TrialKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_deadline_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_fallback_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stimulus_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_latency: Option<PartnerLatency>,
    #[serde(default)]
    pub keys: KeySet,
    #[serde(default)]
    pub hold_until_fallback: bool,
}

impl TrialSpec {
    pub fn new(shape: Shape, mode: Mode, kind: TrialKind) -> Self {
        Self {
            shape,
            mode,
            kind,
            response_deadline_ms: None,
            trial_fallback_ms: None,
            stimulus_duration_ms: None,
            partner_latency: None,
            keys: KeySet::space(),
            hold_until_fallback: false,
        }
    }

    pub fn ww(shape: Shape, mode: Mode) -> Self {
        Self::new(shape, mode, TrialKind::WW)
    }

    pub fn wl(shape: Shape, mode: Mode) -> Self {
        Self::new(shape, mode, TrialKind::WL)
    }

    pub fn lw(shape: Shape, mode: Mode) -> Self {
        Self::new(shape, mode, TrialKind::LW)
    }

    pub fn ll(shape: Shape, mode: Mode) -> Self {
        Self::new(shape, mode, TrialKind::LL)
    }

    pub fn with_deadline(mut self, ms: u64) -> Self {
        self.response_deadline_ms = Some(ms);
        self
    }

    pub fn with_fallback(mut self, ms: u64) -> Self {
        self.trial_fallback_ms = Some(ms);
        self
    }

    pub fn with_stimulus_duration(mut self, ms: u64) -> Self {
        self.stimulus_duration_ms = Some(ms);
        self
    }

    pub fn with_partner_latency(mut self, latency: PartnerLatency) -> Self {
        self.partner_latency = Some(latency);
        self
    }

    pub fn with_keys(mut self, keys: KeySet) -> Self {
        self.keys = keys;
        self
    }

    /// Keep the trial on screen until the fallback timer after a response
    /// or a missed deadline, instead of ending it right away.
    pub fn hold_until_fallback(mut self, hold: bool) -> Self {
        self.hold_until_fallback = hold;
        self
    }

    pub fn build(&self) -> Result<TrialConfig, ConfigError> {
        TrialConfig::try_from(self.clone())
    }
}

/// Validated, immutable configuration of a single trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrialSpec")]
pub struct TrialConfig {
    shape: Shape,
    mode: Mode,
    kind: TrialKind,
    response_deadline_ms: u64,
    trial_fallback_ms: u64,
    stimulus_duration_ms: Option<u64>,
    partner_latency: PartnerLatency,
    keys: KeySet,
    hold_until_fallback: bool,
}

impl TryFrom<TrialSpec> for TrialConfig {
    type Error = ConfigError;

    fn try_from(spec: TrialSpec) -> Result<Self, Self::Error> {
        let deadline_ms = spec
            .response_deadline_ms
            .unwrap_or_else(|| spec.kind.default_deadline_ms());
        if deadline_ms == 0 {
            return Err(ConfigError::NonPositiveDeadline);
        }
        let fallback_ms = match spec.trial_fallback_ms {
            Some(ms) => ms,
            None => deadline_ms
                .checked_add(FALLBACK_MARGIN_MS)
                .ok_or(ConfigError::DeadlineTooLong { deadline_ms })?,
        };
        if fallback_ms == 0 {
            return Err(ConfigError::NonPositiveFallback);
        }
        if fallback_ms < deadline_ms {
            return Err(ConfigError::FallbackBeforeDeadline {
                deadline_ms,
                fallback_ms,
            });
        }
        if spec.keys.is_empty() {
            return Err(ConfigError::EmptyKeySet);
        }
        let partner_latency = spec
            .partner_latency
            .unwrap_or_else(|| spec.kind.default_partner_latency(deadline_ms));
        partner_latency.validate()?;

        Ok(Self {
            shape: spec.shape,
            mode: spec.mode,
            kind: spec.kind,
            response_deadline_ms: deadline_ms,
            trial_fallback_ms: fallback_ms,
            stimulus_duration_ms: spec.stimulus_duration_ms.filter(|ms| *ms > 0),
            partner_latency,
            keys: spec.keys,
            hold_until_fallback: spec.hold_until_fallback,
        })
    }
}

impl TrialConfig {
    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn kind(&self) -> TrialKind {
        self.kind
    }

    pub fn response_deadline_ms(&self) -> u64 {
        self.response_deadline_ms
    }

    pub fn trial_fallback_ms(&self) -> u64 {
        self.trial_fallback_ms
    }

    pub fn stimulus_duration_ms(&self) -> Option<u64> {
        self.stimulus_duration_ms
    }

    pub fn partner_latency(&self) -> PartnerLatency {
        self.partner_latency
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    pub fn holds_until_fallback(&self) -> bool {
        self.hold_until_fallback
    }

    pub fn is_group(&self) -> bool {
        self.mode == Mode::Group
    }
}

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use streak_core::{Key, KeyEvent};

/// Moments the engine announces to the input source, so simulated or
/// scripted participants can time their presses.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cue {
    /// An inter-trial delay has started.
    Delay,
    /// The trial stimulus is on screen.
    Stimulus,
}

/// Source of key events stamped on the engine clock.
pub trait InputSource {
    /// Removes and returns the earliest pending event at or before
    /// `horizon_ms`. Events must come out in time order.
    fn next_event(&mut self, horizon_ms: u64) -> Option<KeyEvent>;

    fn notify(&mut self, _cue: Cue, _at_ms: u64) {}
}

/// Time-ordered queue of pending presses, shared by the synthetic sources.
#[derive(Debug, Default)]
pub(crate) struct PressQueue {
    heap: BinaryHeap<Reverse<(u64, u64, Key)>>,
    seq: u64,
}

impl PressQueue {
    pub(crate) fn push(&mut self, at_ms: u64, key: Key) {
        self.heap.push(Reverse((at_ms, self.seq, key)));
        self.seq += 1;
    }

    pub(crate) fn pop_until(&mut self, horizon_ms: u64) -> Option<KeyEvent> {
        let Reverse((at_ms, _, _)) = self.heap.peek()?;
        if *at_ms > horizon_ms {
            return None;
        }
        self.heap
            .pop()
            .map(|Reverse((at_ms, _, key))| KeyEvent::new(key, at_ms))
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Deterministic key-event queue for tests.
///
/// Presses are either absolute (`at`) or planned relative to a cue
/// (`on_delay`, `on_stimulus`): each time the cue is announced, the next plan
/// entry is consumed and `Some(offset)` turns into a press `offset` ms later.
#[derive(Debug)]
pub struct ScriptedInput {
    queue: PressQueue,
    plans: HashMap<Cue, VecDeque<Option<u64>>>,
    key: Key,
}

impl Default for ScriptedInput {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self {
            queue: PressQueue::default(),
            plans: HashMap::new(),
            key: Key::SPACE,
        }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key = key;
        self
    }

    pub fn at(mut self, at_ms: u64, key: Key) -> Self {
        self.queue.push(at_ms, key);
        self
    }

    pub fn on_delay(self, offsets: impl IntoIterator<Item = Option<u64>>) -> Self {
        self.plan(Cue::Delay, offsets)
    }

    pub fn on_stimulus(self, offsets: impl IntoIterator<Item = Option<u64>>) -> Self {
        self.plan(Cue::Stimulus, offsets)
    }

    fn plan(mut self, cue: Cue, offsets: impl IntoIterator<Item = Option<u64>>) -> Self {
        self.plans.entry(cue).or_default().extend(offsets);
        self
    }

    /// Presses not yet delivered.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl InputSource for ScriptedInput {
    fn next_event(&mut self, horizon_ms: u64) -> Option<KeyEvent> {
        self.queue.pop_until(horizon_ms)
    }

    fn notify(&mut self, cue: Cue, at_ms: u64) {
        let planned = self.plans.get_mut(&cue).and_then(|plan| plan.pop_front());
        if let Some(Some(offset)) = planned {
            self.queue.push(at_ms + offset, self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_events_come_out_in_order_up_to_horizon() {
        let mut input = ScriptedInput::new()
            .at(300, Key::SPACE)
            .at(100, Key(70));
        assert_eq!(input.next_event(50), None);
        assert_eq!(input.next_event(1_000), Some(KeyEvent::new(Key(70), 100)));
        assert_eq!(input.next_event(300), Some(KeyEvent::new(Key::SPACE, 300)));
        assert_eq!(input.next_event(u64::MAX), None);
    }

    #[test]
    fn cue_plans_are_consumed_one_per_cue() {
        let mut input = ScriptedInput::new().on_stimulus([Some(200), None, Some(50)]);
        input.notify(Cue::Stimulus, 1_000);
        input.notify(Cue::Stimulus, 2_000);
        input.notify(Cue::Stimulus, 3_000);
        input.notify(Cue::Stimulus, 4_000);
        input.notify(Cue::Delay, 4_000);

        assert_eq!(input.pending(), 2);
        assert_eq!(input.next_event(u64::MAX).map(|e| e.at_ms), Some(1_200));
        assert_eq!(input.next_event(u64::MAX).map(|e| e.at_ms), Some(3_050));
    }
}

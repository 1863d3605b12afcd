use std::collections::{BTreeMap, HashMap, HashSet};

/// Handle to a scheduled event. Tagged with the scheduler generation it was
/// issued in, so a handle from before a `cancel_all` can never match again.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
    generation: u64,
}

/// An event whose due time has passed. It still has to be claimed before it
/// is acted on; claiming fails if it was cancelled in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<E> {
    pub handle: TimerHandle,
    pub due_ms: u64,
    pub event: E,
}

/// Cancellable delayed events on a millisecond timeline.
///
/// Events are plain values rather than callbacks. `take_due` moves expired
/// entries into an in-flight set; `claim` removes one from that set and
/// reports whether it is still live. `cancel` and `cancel_all` reach into
/// both the queue and the in-flight set, so an event that already fired but
/// was not yet dispatched is dropped as well.
#[derive(Debug)]
pub struct Scheduler<E> {
    generation: u64,
    next_id: u64,
    queue: BTreeMap<(u64, u64), (TimerHandle, E)>,
    due_of: HashMap<u64, u64>,
    in_flight: HashSet<u64>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            generation: 0,
            next_id: 0,
            queue: BTreeMap::new(),
            due_of: HashMap::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, event: E) -> TimerHandle {
        self.schedule_at(now_ms.saturating_add(delay_ms), event)
    }

    pub fn schedule_at(&mut self, due_ms: u64, event: E) -> TimerHandle {
        let handle = TimerHandle {
            id: self.next_id,
            generation: self.generation,
        };
        self.next_id += 1;
        self.queue.insert((due_ms, handle.id), (handle, event));
        self.due_of.insert(handle.id, due_ms);
        handle
    }

    /// Cancels one event. Returns false for unknown, stale or already
    /// dispatched handles.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        if handle.generation != self.generation {
            return false;
        }
        if let Some(due_ms) = self.due_of.remove(&handle.id) {
            self.queue.remove(&(due_ms, handle.id));
            return true;
        }
        self.in_flight.remove(&handle.id)
    }

    /// Cancels everything, queued and in flight. Returns how many events
    /// were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending();
        self.generation += 1;
        self.queue.clear();
        self.due_of.clear();
        self.in_flight.clear();
        dropped
    }

    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|(due_ms, _)| *due_ms)
    }

    /// Moves every event due at or before `now_ms` out of the queue, in due
    /// order. Ties keep scheduling order.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<Fired<E>> {
        let mut fired = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            let (due_ms, id) = *entry.key();
            if due_ms > now_ms {
                break;
            }
            let (handle, event) = entry.remove();
            self.due_of.remove(&id);
            self.in_flight.insert(id);
            fired.push(Fired {
                handle,
                due_ms,
                event,
            });
        }
        fired
    }

    /// Marks a fired event as dispatched. Only returns true once per event,
    /// and never for an event cancelled after it fired.
    pub fn claim(&mut self, fired: &Fired<E>) -> bool {
        fired.handle.generation == self.generation && self.in_flight.remove(&fired.handle.id)
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        handle.generation == self.generation
            && (self.due_of.contains_key(&handle.id) || self.in_flight.contains(&handle.id))
    }

    /// Queued plus fired-but-unclaimed events.
    pub fn pending(&self) -> usize {
        self.queue.len() + self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

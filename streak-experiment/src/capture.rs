use streak_core::{KeyEvent, KeySet, ResponseEvent};

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
enum CaptureState {
    Idle,
    Listening,
    /// Response window closed, by a press or by the deadline.
    Resolved,
    Stopped,
}

/// Listens for the first qualifying keypress of a trial.
///
/// Reaction times are measured from the onset passed to `start`. Once a
/// press is recorded or the window expires, further keys are ignored;
/// after `stop` nothing is accepted until the next `start`.
#[derive(Debug, Clone)]
pub struct InputCapture {
    keys: KeySet,
    onset_ms: u64,
    deadline_ms: u64,
    response: Option<ResponseEvent>,
    state: CaptureState,
}

impl Default for InputCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl InputCapture {
    pub fn new() -> Self {
        Self {
            keys: KeySet::default(),
            onset_ms: 0,
            deadline_ms: 0,
            response: None,
            state: CaptureState::Idle,
        }
    }

    pub fn start(&mut self, keys: KeySet, onset_ms: u64, deadline_ms: u64) {
        self.keys = keys;
        self.onset_ms = onset_ms;
        self.deadline_ms = deadline_ms;
        self.response = None;
        self.state = CaptureState::Listening;
    }

    /// Returns the response if this event is the first qualifying one.
    pub fn offer(&mut self, event: &KeyEvent) -> Option<ResponseEvent> {
        if self.state != CaptureState::Listening || !self.keys.contains(event.key) {
            return None;
        }
        let rt = event.at_ms.saturating_sub(self.onset_ms);
        let response = ResponseEvent::pressed(event.key, rt);
        self.response = Some(response);
        self.state = CaptureState::Resolved;
        Some(response)
    }

    /// Closes the window. Yields the recorded response, or a non-response
    /// if nothing qualified in time.
    pub fn expire(&mut self) -> ResponseEvent {
        if self.state == CaptureState::Listening {
            self.state = CaptureState::Resolved;
        }
        self.response()
    }

    pub fn stop(&mut self) {
        self.state = CaptureState::Stopped;
    }

    pub fn response(&self) -> ResponseEvent {
        self.response.unwrap_or_else(ResponseEvent::none)
    }

    pub fn is_listening(&self) -> bool {
        self.state == CaptureState::Listening
    }

    pub fn is_stopped(&self) -> bool {
        self.state == CaptureState::Stopped
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streak_core::Key;

    fn listening() -> InputCapture {
        let mut capture = InputCapture::new();
        capture.start(KeySet::space(), 1_000, 750);
        capture
    }

    #[test]
    fn first_press_wins() {
        let mut capture = listening();
        let first = capture.offer(&KeyEvent::new(Key::SPACE, 1_200));
        assert_eq!(first, Some(ResponseEvent::pressed(Key::SPACE, 200)));
        assert_eq!(capture.offer(&KeyEvent::new(Key::SPACE, 1_300)), None);
        assert_eq!(capture.response().reaction_time_ms, Some(200));
    }

    #[test]
    fn keys_outside_the_set_are_ignored() {
        let mut capture = listening();
        assert_eq!(capture.offer(&KeyEvent::new(Key(70), 1_100)), None);
        assert!(capture.is_listening());
    }

    #[test]
    fn expiry_without_press_is_a_non_response() {
        let mut capture = listening();
        assert_eq!(capture.expire(), ResponseEvent::none());
        assert_eq!(capture.offer(&KeyEvent::new(Key::SPACE, 1_800)), None);
    }

    #[test]
    fn stopped_capture_accepts_nothing() {
        let mut capture = listening();
        capture.stop();
        assert!(capture.is_stopped());
        assert_eq!(capture.offer(&KeyEvent::new(Key::SPACE, 1_100)), None);

        capture.start(KeySet::space(), 5_000, 250);
        assert!(!capture.is_stopped());
        assert_eq!(capture.response(), ResponseEvent::none());
    }
}

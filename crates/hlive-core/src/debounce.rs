use std::time::Duration;

use tokio::time::Instant;

use hlive_model::RestartRequest;

/// Quiet period after the last change before a restart fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Trailing-edge debounce state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Debounce {
    #[default]
    Idle,
    Pending(Instant),
}

impl Debounce {
    /// Record a change at `now`; any earlier deadline is pushed back.
    pub fn arm(&mut self, now: Instant, window: Duration) {
        *self = Debounce::Pending(now + window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Debounce::Idle => None,
            Debounce::Pending(at) => Some(*at),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Debounce::Pending(_))
    }

    /// Emit the single request for an elapsed deadline and go back to idle.
    pub fn fire(&mut self, now: Instant) -> Option<RestartRequest> {
        match *self {
            Debounce::Pending(at) if now >= at => {
                *self = Debounce::Idle;
                Some(RestartRequest)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: Duration = Duration::from_secs(2);

    #[test]
    fn idle_never_fires() {
        let mut d = Debounce::default();
        assert_eq!(d.deadline(), None);
        assert_eq!(d.fire(Instant::now() + Duration::from_secs(3600)), None);
    }

    #[test]
    fn each_event_resets_the_deadline() {
        let t0 = Instant::now();
        let mut d = Debounce::Idle;
        d.arm(t0, W);
        d.arm(t0 + Duration::from_millis(1400), W);

        assert_eq!(d.deadline(), Some(t0 + Duration::from_millis(3400)));
        assert_eq!(d.fire(t0 + W), None);
        assert!(d.is_pending());
    }

    #[test]
    fn fires_once_then_idles() {
        let t0 = Instant::now();
        let mut d = Debounce::Idle;
        d.arm(t0, W);

        assert_eq!(d.fire(t0 + W), Some(RestartRequest));
        assert_eq!(d, Debounce::Idle);
        assert_eq!(d.fire(t0 + W * 2), None);
    }
}

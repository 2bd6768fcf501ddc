use std::time::{Duration, Instant};

/// Deadline after which an idle capture session ends itself.
///
/// Pausing disarms the deadline; resuming (or any activity) re-arms it for
/// the full timeout. A zero timeout disables the timer.
#[derive(Clone, Debug)]
pub struct InactivityTimer {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl InactivityTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout: (!timeout.is_zero()).then_some(timeout),
            deadline: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.timeout.is_some()
    }

    /// Record activity at `now`.
    ///
    /// A deadline past the end of the clock's range leaves the timer unarmed.
    pub fn on_activity(&mut self, now: Instant) {
        self.deadline = self.timeout.and_then(|t| now.checked_add(t));
    }

    pub fn pause(&mut self) {
        self.deadline = None;
    }

    pub fn resume(&mut self, now: Instant) {
        self.on_activity(now);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_timeout() {
        let t0 = Instant::now();
        let mut timer = InactivityTimer::new(Duration::from_secs(300));
        assert!(!timer.is_expired(t0 + Duration::from_secs(1000)));

        timer.on_activity(t0);
        assert!(!timer.is_expired(t0 + Duration::from_secs(299)));
        assert!(timer.is_expired(t0 + Duration::from_secs(300)));
    }

    #[test]
    fn activity_pushes_deadline() {
        let t0 = Instant::now();
        let mut timer = InactivityTimer::new(Duration::from_secs(10));
        timer.on_activity(t0);
        timer.on_activity(t0 + Duration::from_secs(8));
        assert!(!timer.is_expired(t0 + Duration::from_secs(12)));
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_secs(18)));
    }

    #[test]
    fn paused_timer_never_expires() {
        let t0 = Instant::now();
        let mut timer = InactivityTimer::new(Duration::from_secs(1));
        timer.on_activity(t0);
        timer.pause();
        assert!(!timer.is_expired(t0 + Duration::from_secs(5)));
        timer.resume(t0 + Duration::from_secs(5));
        assert!(timer.is_expired(t0 + Duration::from_secs(6)));
    }

    #[test]
    fn zero_timeout_disables() {
        let t0 = Instant::now();
        let mut timer = InactivityTimer::new(Duration::ZERO);
        timer.on_activity(t0);
        assert!(!timer.is_enabled());
        assert!(timer.deadline().is_none());
        assert!(!timer.is_expired(t0 + Duration::from_secs(3600)));
    }

    #[test]
    fn unrepresentable_deadline_leaves_timer_unarmed() {
        let t0 = Instant::now();
        let mut timer = InactivityTimer::new(Duration::MAX);
        timer.on_activity(t0);
        assert!(timer.is_enabled());
        assert!(timer.deadline().is_none());
        assert!(!timer.is_expired(t0 + Duration::from_secs(3600)));
    }
}

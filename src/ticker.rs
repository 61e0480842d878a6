use std::time::{Duration, Instant};

/// Fixed-rate schedule that can be started and stopped.
///
/// While stopped there is nothing due and the owner can block on its event
/// source indefinitely.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Ticker { interval, next_due: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// First tick is due immediately.
    pub fn start(&mut self) {
        self.next_due = Some(Instant::now());
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// `None` while stopped, zero when a tick is overdue.
    pub fn time_until_due(&self) -> Option<Duration> {
        self.next_due
            .map(|due| due.saturating_duration_since(Instant::now()))
    }

    /// Schedule the next tick after one has fired. A late tick does not
    /// cause a burst of catch-up ticks.
    pub fn advance(&mut self) {
        if let Some(due) = self.next_due {
            let now = Instant::now();
            let next = due + self.interval;
            self.next_due = Some(if next < now { now } else { next });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_has_nothing_due() {
        let ticker = Ticker::new(Duration::from_millis(1));
        assert!(!ticker.is_running());
        assert_eq!(ticker.time_until_due(), None);
    }

    #[test]
    fn test_start_is_due_now() {
        let mut ticker = Ticker::new(Duration::from_secs(10));
        ticker.start();
        assert!(ticker.is_running());
        assert_eq!(ticker.time_until_due(), Some(Duration::ZERO));
    }

    #[test]
    fn test_advance_schedules_one_interval() {
        let mut ticker = Ticker::new(Duration::from_secs(10));
        ticker.start();
        ticker.advance();
        let wait = ticker.time_until_due().unwrap();
        assert!(wait > Duration::from_secs(9) && wait <= Duration::from_secs(10));
    }

    #[test]
    fn test_late_tick_does_not_burst() {
        let mut ticker = Ticker::new(Duration::from_millis(1));
        ticker.start();
        std::thread::sleep(Duration::from_millis(20));
        ticker.advance();
        // rescheduled to now, not 19 ticks in the past
        assert_eq!(ticker.time_until_due(), Some(Duration::ZERO));
        ticker.advance();
        assert!(ticker.time_until_due().unwrap() <= Duration::from_millis(1));
    }

    #[test]
    fn test_stop_and_advance() {
        let mut ticker = Ticker::new(Duration::from_millis(1));
        ticker.start();
        ticker.stop();
        ticker.advance();
        assert!(!ticker.is_running());
    }
}

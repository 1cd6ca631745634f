use std::time::Duration;
use tokio::time::Instant;

/// Decision taken when the heartbeat timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Link is quiet but within the timeout; send a probe and re-arm
    Probe {
        /// A previous probe went unanswered
        degraded: bool,
    },
    /// Nothing heard for longer than the timeout; the link is dead
    Expired { silence: Duration },
}

/// Heartbeat bookkeeping for one connected session
///
/// The monitor only tracks time; the session driver owns the timer and
/// performs the probe or the close the verdict asks for.
#[derive(Debug)]
pub(crate) struct LivenessMonitor {
    interval: Duration,
    timeout: Duration,
    last_traffic: Instant,
    deadline: Instant,
    probe_outstanding: bool,
    expired: bool,
}

impl LivenessMonitor {
    pub(crate) fn start(interval: Duration, timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            timeout,
            last_traffic: now,
            deadline: now + interval,
            probe_outstanding: false,
            expired: false,
        }
    }

    /// When the timer should next fire
    pub(crate) fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Note inbound traffic and re-arm with a fresh deadline
    pub(crate) fn record_traffic(&mut self) {
        self.last_traffic = Instant::now();
        self.deadline = self.last_traffic + self.interval;
        self.probe_outstanding = false;
    }

    /// Evaluate the link when the timer fires
    ///
    /// After an `Expired` verdict the monitor is spent and keeps answering
    /// `Expired` without re-arming.
    pub(crate) fn fire(&mut self) -> Verdict {
        let silence = self.last_traffic.elapsed();
        if self.expired || silence > self.timeout {
            self.expired = true;
            return Verdict::Expired { silence };
        }

        let degraded = self.probe_outstanding;
        self.probe_outstanding = true;
        self.deadline = Instant::now() + self.interval;
        Verdict::Probe { degraded }
    }
}

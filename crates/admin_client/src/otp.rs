use std::time::{Duration, Instant};

pub const OTP_RESEND_COOLDOWN: Duration = Duration::from_secs(60);

/// Countdown that gates re-sending an OTP email.
#[derive(Debug, Clone)]
pub struct OtpCooldown {
    period: Duration,
    started_at: Option<Instant>,
}

impl OtpCooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            started_at: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.started_at = None;
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started_at) => self
                .period
                .saturating_sub(now.saturating_duration_since(started_at)),
            None => Duration::ZERO,
        }
    }

    pub fn can_resend(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }
}

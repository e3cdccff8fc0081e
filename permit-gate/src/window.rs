use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::WindowError;

/// The shape of a fixed admission window.
///
/// At most `limit` permits are granted between two consecutive resets, and
/// resets happen every `period`. Boundaries are fixed in time and do not slide
/// with request arrivals, so a burst straddling a boundary can see up to
/// twice the limit in a short span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    limit: NonZeroUsize,
    period: Duration,
    initial_delay: Option<Duration>,
}

impl RateWindow {
    /// The largest `limit` a window accepts.
    pub const MAX_LIMIT: usize = Semaphore::MAX_PERMITS;

    /// The longest `period` or initial delay a window accepts (about 30 years).
    ///
    /// Reset deadlines are computed as offsets from a monotonic `Instant`,
    /// which cannot represent arbitrarily distant points in time.
    pub const MAX_DURATION: Duration = Duration::from_secs(86_400 * 365 * 30);

    /// Creates a new window.
    ///
    /// # Arguments
    ///
    /// * `limit` - The maximum number of admissions per window.
    /// * `period` - The duration of a window.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::ZeroPeriod`] if `period` is zero,
    /// [`WindowError::DurationTooLarge`] if it exceeds [`RateWindow::MAX_DURATION`],
    /// and [`WindowError::LimitTooLarge`] if `limit` exceeds what the permit pool can hold.
    pub fn new(limit: NonZeroUsize, period: Duration) -> Result<Self, WindowError> {
        if period.is_zero() {
            return Err(WindowError::ZeroPeriod);
        }
        check_duration(period)?;
        if limit.get() > Self::MAX_LIMIT {
            return Err(WindowError::LimitTooLarge {
                max: Self::MAX_LIMIT,
            });
        }
        Ok(Self {
            limit,
            period,
            initial_delay: None,
        })
    }

    /// Override the delay before the first reset.
    ///
    /// By default the first reset happens one full `period` after the gate starts.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::DurationTooLarge`] if `delay` exceeds [`RateWindow::MAX_DURATION`].
    pub fn with_initial_delay(mut self, delay: Duration) -> Result<Self, WindowError> {
        check_duration(delay)?;
        self.initial_delay = Some(delay);
        Ok(self)
    }

    pub fn limit(&self) -> NonZeroUsize {
        self.limit
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn initial_delay(&self) -> Option<Duration> {
        self.initial_delay
    }

    /// How long after start the first reset fires.
    pub fn first_reset(&self) -> Duration {
        self.initial_delay.unwrap_or(self.period)
    }
}

fn check_duration(duration: Duration) -> Result<(), WindowError> {
    if duration > RateWindow::MAX_DURATION {
        return Err(WindowError::DurationTooLarge {
            max: RateWindow::MAX_DURATION,
        });
    }
    Ok(())
}

use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// Clock rate of PES timestamps.
pub const PTS_HZ: i64 = 90_000;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A signed media timestamp in nanoseconds.
///
/// Presentation times arrive as unsigned [`Duration`]s since an arbitrary
/// epoch, but once rebased on the first access unit they can go negative:
/// B-frames decoded after the first IDR may be presented before it. PTS and
/// DTS are both kept in this one integer type so that their 90 kHz tick
/// values are computed the same way and compare exactly.
///
/// ```rust
/// use h264ts::av::MediaTime;
///
/// let t = MediaTime::from_millis(440);
/// assert_eq!(t.to_pts_ticks(), 39_600);
/// assert_eq!((t - MediaTime::from_millis(500)).nanos(), -60_000_000);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaTime(i64);

impl MediaTime {
    /// Zero time.
    pub const ZERO: Self = Self(0);

    /// Create from nanoseconds.
    pub const fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    /// Create from milliseconds.
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms.saturating_mul(1_000_000))
    }

    /// Create from a duration, saturating at `i64::MAX` nanoseconds.
    pub fn from_duration(d: Duration) -> Self {
        Self(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }

    /// Get as nanoseconds.
    pub const fn nanos(self) -> i64 {
        self.0
    }

    /// Converts to 90 kHz clock ticks: `round(seconds * 90000)`, with halves
    /// rounded away from zero. Exact for every whole multiple of 1/90000 s.
    pub fn to_pts_ticks(self) -> i64 {
        let scaled = i128::from(self.0) * i128::from(PTS_HZ);
        let half = i128::from(NANOS_PER_SEC / 2);
        let rounded = if scaled >= 0 {
            (scaled + half) / i128::from(NANOS_PER_SEC)
        } else {
            (scaled - half) / i128::from(NANOS_PER_SEC)
        };
        rounded as i64
    }

    /// Inverse of [`MediaTime::to_pts_ticks`].
    pub fn from_pts_ticks(ticks: i64) -> Self {
        let nanos = i128::from(ticks) * i128::from(NANOS_PER_SEC) / i128::from(PTS_HZ);
        Self(nanos.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl From<Duration> for MediaTime {
    fn from(d: Duration) -> Self {
        Self::from_duration(d)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{}{}.{:03}s",
            sign,
            abs / NANOS_PER_SEC as u64,
            (abs % NANOS_PER_SEC as u64) / 1_000_000
        )
    }
}

//! Time sources and zone handling
//!
//! Every timestamp and day key goes through a [`Clock`] so retention can be
//! exercised without waiting for real days to pass.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Utc};
use chrono_tz::Tz;

/// Source of the current instant
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.write() {
            *now += by;
        }
    }

    /// Jump to a fixed instant
    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.write() {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.read().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// Zone used for timestamps and day keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogZone {
    /// The host's local zone
    Local,
    /// An IANA zone
    Named(Tz),
}

impl LogZone {
    /// Resolve an optional IANA name
    ///
    /// Returns the fallback zone together with the rejected name when the name
    /// is not a known zone.
    pub fn resolve(name: Option<&str>) -> (Self, Option<String>) {
        match name {
            None => (LogZone::Local, None),
            Some(name) => match name.parse::<Tz>() {
                Ok(tz) => (LogZone::Named(tz), None),
                Err(_) => (LogZone::Local, Some(name.to_string())),
            },
        }
    }

    /// Display name, `local` for the host zone
    pub fn name(&self) -> &str {
        match self {
            LogZone::Local => "local",
            LogZone::Named(tz) => tz.name(),
        }
    }

    /// Express an instant in this zone
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            LogZone::Local => instant.with_timezone(&Local).fixed_offset(),
            LogZone::Named(tz) => instant.with_timezone(tz).fixed_offset(),
        }
    }

    /// Calendar date of an instant in this zone
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.localize(instant).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_resolve_valid_zone() {
        let (zone, rejected) = LogZone::resolve(Some("Asia/Tokyo"));
        assert_eq!(zone, LogZone::Named(chrono_tz::Asia::Tokyo));
        assert!(rejected.is_none());
        assert_eq!(zone.name(), "Asia/Tokyo");
    }

    #[test]
    fn test_resolve_invalid_zone_falls_back() {
        let (zone, rejected) = LogZone::resolve(Some("Mars/Olympus"));
        assert_eq!(zone, LogZone::Local);
        assert_eq!(rejected.as_deref(), Some("Mars/Olympus"));
    }

    #[test]
    fn test_date_of_respects_zone() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 9, 20, 0, 0).unwrap();
        let tokyo = LogZone::Named(chrono_tz::Asia::Tokyo);
        let utc = LogZone::Named(chrono_tz::UTC);
        assert_eq!(
            tokyo.date_of(instant),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
        assert_eq!(
            utc.date_of(instant),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
    }

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::hours(24));
        assert_eq!(clock.now(), start + Duration::days(1));
    }
}

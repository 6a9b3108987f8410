use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Source of "now" for the fetch loop and the future-timestamp filter.
pub trait Clock: Send + Sync {
    /// Wall-clock time in the operator's local zone, without offset.
    fn now_local(&self) -> NaiveDateTime;

    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Frozen clock for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    local: NaiveDateTime,
    utc: DateTime<Utc>,
}

impl FixedClock {
    /// Local time and UTC coincide.
    pub fn at(local: NaiveDateTime) -> Self {
        Self {
            local,
            utc: local.and_utc(),
        }
    }

    pub fn with_utc(mut self, utc: DateTime<Utc>) -> Self {
        self.utc = utc;
        self
    }
}

impl Clock for FixedClock {
    fn now_local(&self) -> NaiveDateTime {
        self.local
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.utc
    }
}

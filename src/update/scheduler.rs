//! Daily update schedule

use chrono::{DateTime, Days, NaiveTime, TimeZone};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// How often the daemon checks whether a run is due
pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Default run time, local clock
pub const DEFAULT_UPDATE_TIME: &str = "23:30";

/// A time of day at which to run, `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// First scheduled instant strictly after `now`, in `now`'s zone.
    ///
    /// A time skipped by a DST jump moves to the next day.
    pub fn next_run_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();
        for offset in 0..=2 {
            let Some(day) = today.checked_add_days(Days::new(offset)) else {
                break;
            };
            if let Some(at) = tz.from_local_datetime(&day.and_time(self.at)).earliest() {
                if at > *now {
                    return at;
                }
            }
        }
        now.clone() + chrono::Duration::days(1)
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self::new(NaiveTime::from_hms_opt(23, 30, 0).unwrap_or(NaiveTime::MIN))
    }
}

impl FromStr for DailySchedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self::new)
            .map_err(|_| format!("invalid time '{}' (expected HH:MM)", s))
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.at.format("%H:%M"))
    }
}

/// Run `job` at every scheduled time until `shutdown` resolves.
///
/// The clock is polled every `check_every`; a run that is due fires once
/// even if several checks were missed. Returns the number of runs.
pub async fn run_daily<Tz, C, F, Fut, Sd>(
    schedule: DailySchedule,
    check_every: Duration,
    clock: C,
    shutdown: Sd,
    mut job: F,
) -> u64
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
    C: Fn() -> DateTime<Tz>,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
    Sd: Future<Output = ()>,
{
    let mut next = schedule.next_run_after(&clock());
    info!(at = %schedule, next_run = %next, "Scheduler started");

    let mut ticker = tokio::time::interval(check_every);
    tokio::pin!(shutdown);
    let mut runs = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(runs, "Scheduler stopped");
                return runs;
            }
            _ = ticker.tick() => {
                if clock() >= next {
                    job().await;
                    runs += 1;
                    next = schedule.next_run_after(&clock());
                    info!(next_run = %next, "Next update scheduled");
                }
            }
        }
    }
}
